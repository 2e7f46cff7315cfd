//! Filter evaluation and sort ordering over in-memory documents.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use restlayer_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, FieldOp, QueryVisitor, Sort, SortDirection},
};

use crate::path::get_path;

/// Borrowed view of a BSON value that can be compared across numeric widths.
///
/// `Int32`, `Int64` and `Double` all become `Number`, so `age=42` matches a stored
/// `42.0`. Types with no comparison semantics here (binary, regex, ...) read as `Null`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Boolean(flag) => Comparable::Bool(*flag),
            Bson::Int32(n) => Comparable::Number(f64::from(*n)),
            Bson::Int64(n) => Comparable::Number(*n as f64),
            Bson::Double(n) => Comparable::Number(*n),
            Bson::DateTime(at) => Comparable::DateTime(*at),
            Bson::String(text) => Comparable::String(text),
            Bson::ObjectId(oid) => Comparable::ObjectId(*oid),
            Bson::Array(items) => Comparable::Array(items.iter().map(Comparable::from).collect()),
            Bson::Document(fields) => Comparable::Map(
                fields.iter().map(|(name, value)| (name.as_str(), Comparable::from(value))).collect(),
            ),
            _ => Comparable::Null,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Position of the value's type in the cross-type sort order.
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
        }
    }

    /// Total order used for sorting: values of different types order by type.
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }

    /// Equality that also matches an array field holding the value.
    fn matches(&self, value: &Comparable<'_>) -> bool {
        match self {
            Comparable::Array(items) if !matches!(value, Comparable::Array(_)) => {
                items.iter().any(|item| item == value)
            }
            _ => self == value,
        }
    }
}

impl<'a, 'b> PartialEq<Comparable<'b>> for Comparable<'a> {
    fn eq(&self, other: &Comparable<'b>) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(left), Comparable::Bool(right)) => left == right,
            (Comparable::Number(left), Comparable::Number(right)) => left == right,
            (Comparable::DateTime(left), Comparable::DateTime(right)) => left == right,
            (Comparable::String(left), Comparable::String(right)) => left == right,
            (Comparable::ObjectId(left), Comparable::ObjectId(right)) => left == right,
            (Comparable::Array(a), Comparable::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x == y)
            }
            (Comparable::Map(a), Comparable::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(*k).is_some_and(|other| v == other))
            }
            _ => false,
        }
    }
}

impl<'a, 'b> PartialOrd<Comparable<'b>> for Comparable<'a> {
    fn partial_cmp(&self, other: &Comparable<'b>) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(left), Comparable::Bool(right)) => left.partial_cmp(right),
            (Comparable::Number(left), Comparable::Number(right)) => left.partial_cmp(right),
            (Comparable::DateTime(left), Comparable::DateTime(right)) => left.partial_cmp(right),
            (Comparable::String(left), Comparable::String(right)) => left.partial_cmp(right),
            (Comparable::ObjectId(left), Comparable::ObjectId(right)) => left.partial_cmp(right),
            _ => None,
        }
    }
}

pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns `true` if the document matches the optional filter.
    pub fn matches(document: &Document, filter: Option<&Expr>) -> DocumentStoreResult<bool> {
        match filter {
            Some(expr) => DocumentEvaluator::new(document).evaluate(expr),
            None => Ok(true),
        }
    }

    /// Orders two documents by a list of sort keys.
    pub fn compare(left: &Document, right: &Document, sort: &[Sort]) -> Ordering {
        for key in sort {
            let l = get_path(left, &key.field).map(Comparable::from).unwrap_or(Comparable::Null);
            let r = get_path(right, &key.field).map(Comparable::from).unwrap_or(Comparable::Null);

            let ordering = match key.direction {
                SortDirection::Asc => l.sort_cmp(&r),
                SortDirection::Desc => r.sort_cmp(&l),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        Ordering::Equal
    }
}

impl QueryVisitor for DocumentEvaluator<'_> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, terms: &[Expr]) -> DocumentStoreResult<bool> {
        for term in terms {
            if !self.visit_expr(term)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn visit_or(&mut self, terms: &[Expr]) -> DocumentStoreResult<bool> {
        for term in terms {
            if self.visit_expr(term)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn visit_not(&mut self, inner: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(inner).map(|matched| !matched)
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> DocumentStoreResult<bool> {
        Ok(get_path(self.document, field).is_some() == should_exist)
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> DocumentStoreResult<bool> {
        let Some(stored) = get_path(self.document, field) else {
            // A missing field only satisfies the negative operators.
            return Ok(matches!(op, FieldOp::Ne | FieldOp::NotContains | FieldOp::NoneOf));
        };
        let stored = Comparable::from(stored);
        let operand = Comparable::from(value);

        let matched = match op {
            FieldOp::Eq => stored.matches(&operand),
            FieldOp::Ne => !stored.matches(&operand),
            FieldOp::Gt => stored.partial_cmp(&operand) == Some(Ordering::Greater),
            FieldOp::Gte => matches!(stored.partial_cmp(&operand), Some(Ordering::Greater | Ordering::Equal)),
            FieldOp::Lt => stored.partial_cmp(&operand) == Some(Ordering::Less),
            FieldOp::Lte => matches!(stored.partial_cmp(&operand), Some(Ordering::Less | Ordering::Equal)),
            FieldOp::Contains => contains(&stored, &operand),
            FieldOp::NotContains => !contains(&stored, &operand),
            FieldOp::StartsWith => text_pair(&stored, &operand).is_some_and(|(text, prefix)| text.starts_with(prefix)),
            FieldOp::EndsWith => text_pair(&stored, &operand).is_some_and(|(text, suffix)| text.ends_with(suffix)),
            FieldOp::AnyOf => any_of(&stored, &operand),
            FieldOp::NoneOf => !any_of(&stored, &operand),
        };

        Ok(matched)
    }
}

fn text_pair<'a>(stored: &Comparable<'a>, operand: &Comparable<'a>) -> Option<(&'a str, &'a str)> {
    match (stored, operand) {
        (Comparable::String(text), Comparable::String(pattern)) => Some((*text, *pattern)),
        _ => None,
    }
}

fn contains(left: &Comparable<'_>, right: &Comparable<'_>) -> bool {
    match (left, right) {
        (Comparable::Array(array), value) => array.iter().any(|item| contains(item, value) || item == value),
        (Comparable::String(left), Comparable::String(right)) => left.contains(right),
        _ => false,
    }
}

fn any_of(left: &Comparable<'_>, right: &Comparable<'_>) -> bool {
    match right {
        Comparable::Array(values) => values.iter().any(|value| left.matches(value)),
        single_value => left.matches(single_value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use restlayer_core::query::Filter;

    fn bob() -> Document {
        doc! {
            "_id": "0001",
            "name": "Bob",
            "email": "bob@example.com",
            "age": 42,
            "tags": ["admin", "ops"],
            "address": { "city": "Paris" },
        }
    }

    fn eval(expr: Expr) -> bool {
        DocumentEvaluator::new(&bob()).evaluate(&expr).unwrap()
    }

    #[test]
    fn compares_numbers_across_integer_widths() {
        assert!(eval(Filter::eq("age", 42.0)));
        assert!(eval(Filter::gte("age", 42i64)));
        assert!(!eval(Filter::lt("age", 42)));
    }

    #[test]
    fn evaluates_nested_paths_and_arrays() {
        assert!(eval(Filter::eq("address.city", "Paris")));
        assert!(eval(Filter::eq("tags", "ops")));
        assert!(eval(Filter::any_of("tags", vec!["dev", "admin"])));
        assert!(eval(Filter::none_of("name", vec!["Judy", "Alice"])));
    }

    #[test]
    fn missing_fields_satisfy_only_negative_operators() {
        assert!(!eval(Filter::eq("phone", "123")));
        assert!(eval(Filter::ne("phone", "123")));
        assert!(eval(Filter::not_exists("phone")));
        assert!(!eval(Filter::exists("phone")));
    }

    #[test]
    fn evaluates_string_operators_and_logic() {
        assert!(eval(Filter::starts_with("email", "bob@")));
        assert!(eval(Filter::ends_with("email", ".com")));
        assert!(eval(Filter::contains("email", "example")));
        assert!(eval(Filter::or([Filter::eq("name", "Judy"), Filter::eq("name", "Bob")])));
        assert!(eval(Filter::eq("name", "Judy").not()));
    }

    #[test]
    fn sorts_missing_values_first() {
        let judy = doc! { "name": "Judy" };
        let sort = vec![Sort { field: "age".into(), direction: SortDirection::Asc }];

        assert_eq!(DocumentEvaluator::compare(&judy, &bob(), &sort), Ordering::Less);
    }
}
