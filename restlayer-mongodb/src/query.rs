//! Filter, sort and projection documents for the MongoDB driver.

use bson::{Bson, Document, doc};

use restlayer_core::{
    error::DocumentStoreError,
    key::KEY_FIELD,
    query::{Expr, FieldOp, Projection, QueryVisitor, Sort, SortDirection},
};

/// Builds MongoDB query documents from [`Expr`] trees.
///
/// Text operators become anchored, escaped, case-sensitive `$regex` matches.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates an optional filter, matching every document when absent.
    pub fn filter(expr: Option<&Expr>) -> Result<Document, DocumentStoreError> {
        match expr {
            Some(expr) => MongoQueryTranslator.visit_expr(expr),
            None => Ok(doc! {}),
        }
    }

    /// Translates sort keys into a sort document, preserving their precedence.
    pub fn sort(sort: &[Sort]) -> Option<Document> {
        if sort.is_empty() {
            return None;
        }

        Some(
            sort.iter()
                .map(|key| (
                    key.field.clone(),
                    Bson::Int32(match key.direction {
                        SortDirection::Asc => 1,
                        SortDirection::Desc => -1,
                    }),
                ))
                .collect::<Document>()
        )
    }

    /// Converts a window bound to the signed integer the server expects.
    ///
    /// MongoDB reads a negative limit as a single batch, so values past `i64::MAX`
    /// are refused rather than wrapped.
    pub fn window_bound(name: &str, value: Option<u64>) -> Result<Option<i64>, DocumentStoreError> {
        value
            .map(|value| {
                i64::try_from(value)
                    .map_err(|_| DocumentStoreError::InvalidQuery(format!("{name} {value} is too large")))
            })
            .transpose()
    }

    /// Translates a projection. The key field is always returned.
    pub fn projection(projection: &Projection) -> Document {
        match projection {
            Projection::Include(fields) => fields
                .iter()
                .map(|field| (field.clone(), Bson::Int32(1)))
                .collect(),
            Projection::Exclude(fields) => fields
                .iter()
                .filter(|field| field.as_str() != KEY_FIELD)
                .map(|field| (field.clone(), Bson::Int32(0)))
                .collect(),
        }
    }
}

fn escape_regex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        if "\\^$.|?*+()[]{}/-".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

fn require_string<'a>(op: &str, value: &'a Bson) -> Result<&'a str, DocumentStoreError> {
    match value {
        Bson::String(s) => Ok(s),
        _ => Err(DocumentStoreError::InvalidQuery(format!("{op} operator requires a string value"))),
    }
}

fn as_list(value: &Bson) -> Bson {
    match value {
        Bson::Array(_) => value.clone(),
        single => Bson::Array(vec![single.clone()]),
    }
}

impl MongoQueryTranslator {
    fn translate_all(&mut self, terms: &[Expr]) -> Result<Vec<Document>, DocumentStoreError> {
        terms.iter().map(|term| self.visit_expr(term)).collect()
    }
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    // MongoDB refuses empty `$and`/`$or` arrays.
    fn visit_and(&mut self, terms: &[Expr]) -> Result<Document, DocumentStoreError> {
        if terms.is_empty() {
            return Ok(doc! {});
        }
        Ok(doc! { "$and": self.translate_all(terms)? })
    }

    fn visit_or(&mut self, terms: &[Expr]) -> Result<Document, DocumentStoreError> {
        if terms.is_empty() {
            return Ok(doc! { "$nor": [{}] });
        }
        Ok(doc! { "$or": self.translate_all(terms)? })
    }

    fn visit_not(&mut self, inner: &Expr) -> Result<Document, DocumentStoreError> {
        Ok(doc! { "$nor": [self.visit_expr(inner)?] })
    }

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: { "$exists": should_exist },
        })
    }

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            field: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::Contains => match value {
                    Bson::Array(arr) => doc! { "$all": arr },
                    _ => doc! { "$regex": escape_regex(require_string("Contains", value)?) },
                },
                FieldOp::NotContains => match value {
                    Bson::Array(arr) => doc! { "$nin": arr },
                    _ => doc! { "$not": { "$regex": escape_regex(require_string("NotContains", value)?) } },
                },
                FieldOp::StartsWith => {
                    doc! { "$regex": format!("^{}", escape_regex(require_string("StartsWith", value)?)) }
                },
                FieldOp::EndsWith => {
                    doc! { "$regex": format!("{}$", escape_regex(require_string("EndsWith", value)?)) }
                },
                FieldOp::AnyOf => doc! { "$in": as_list(value) },
                FieldOp::NoneOf => doc! { "$nin": as_list(value) },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restlayer_core::query::Filter;

    #[test]
    fn translates_conjunctions_of_comparisons() {
        let expr = Filter::and([Filter::eq("name", "Bob"), Filter::gte("age", 18)]);

        assert_eq!(
            MongoQueryTranslator::filter(Some(&expr)).unwrap(),
            doc! { "$and": [{ "name": { "$eq": "Bob" } }, { "age": { "$gte": 18 } }] }
        );
        assert_eq!(MongoQueryTranslator::filter(None).unwrap(), doc! {});
        assert_eq!(
            MongoQueryTranslator::filter(Some(&Filter::or(Vec::<Expr>::new()))).unwrap(),
            doc! { "$nor": [{}] }
        );
    }

    #[test]
    fn escapes_text_matches() {
        let expr = Filter::starts_with("email", "bob.smith+");

        assert_eq!(
            MongoQueryTranslator::filter(Some(&expr)).unwrap(),
            doc! { "email": { "$regex": "^bob\\.smith\\+" } }
        );
        assert!(MongoQueryTranslator::filter(Some(&Filter::ends_with("age", 3))).is_err());
    }

    #[test]
    fn wraps_single_values_for_set_membership() {
        assert_eq!(
            MongoQueryTranslator::filter(Some(&Filter::none_of("tag", "x"))).unwrap(),
            doc! { "tag": { "$nin": ["x"] } }
        );
    }

    #[test]
    fn refuses_window_bounds_beyond_the_signed_range() {
        assert_eq!(MongoQueryTranslator::window_bound("limit", Some(20)).unwrap(), Some(20));
        assert_eq!(MongoQueryTranslator::window_bound("limit", None).unwrap(), None);
        assert!(matches!(
            MongoQueryTranslator::window_bound("limit", Some(u64::MAX)),
            Err(DocumentStoreError::InvalidQuery(_))
        ));
        assert!(MongoQueryTranslator::window_bound("offset", Some(i64::MAX as u64 + 1)).is_err());
    }

    #[test]
    fn translates_sort_keys_and_projections() {
        let sort = vec![
            Sort { field: "last".into(), direction: SortDirection::Asc },
            Sort { field: "first".into(), direction: SortDirection::Desc },
        ];

        assert_eq!(MongoQueryTranslator::sort(&sort), Some(doc! { "last": 1, "first": -1 }));
        assert_eq!(MongoQueryTranslator::sort(&[]), None);
        assert_eq!(
            MongoQueryTranslator::projection(&Projection::Exclude(vec!["_id".into(), "email".into()])),
            doc! { "email": 0 }
        );
    }
}
