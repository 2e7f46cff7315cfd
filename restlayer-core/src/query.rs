//! Store-independent queries.
//!
//! A [`Query`] selects documents of one collection: an optional filter [`Expr`], sort
//! keys, a projection and an offset/limit window. Backends never inspect the
//! expression tree directly; they walk it with a [`QueryVisitor`] and produce their
//! native form (an evaluator result, a MongoDB filter document).
//!
//! ```ignore
//! use restlayer_core::query::{Filter, Query, SortDirection};
//!
//! let adults = Query::builder()
//!     .filter(Filter::gte("age", 18).and(Filter::exists("email")))
//!     .sort("name", SortDirection::Asc)
//!     .limit(20)
//!     .build();
//! ```
//!
//! Field names may be dotted paths (`address.city`) reaching into nested documents.

use bson::Bson;

use crate::error::DocumentStoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort key. Keys earlier in [`Query::sort`] take precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

/// Field selection applied to every returned document.
///
/// The internal key field is always returned, whatever the projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    /// Substring of a string field, or member of an array field.
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    /// The value is an array; the field equals one of its elements, or an array
    /// field shares one with it.
    AnyOf,
    NoneOf,
}

/// Filter expression tree.
///
/// Leaves compare a single field or test for its presence. Text operators match
/// literally and case-sensitively.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    /// `Exists(field, true)` requires the field, `Exists(field, false)` forbids it.
    Exists(String, bool),
    Field {
        field: String,
        op: FieldOp,
        value: Bson,
    },
}

impl Expr {
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Conjunction with `other`, extending `self` in place when it already is one.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut terms) => {
                terms.push(other);
                Expr::And(terms)
            }
            single => Expr::And(vec![single, other]),
        }
    }

    /// Disjunction with `other`, extending `self` in place when it already is one.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut terms) => {
                terms.push(other);
                Expr::Or(terms)
            }
            single => Expr::Or(vec![single, other]),
        }
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Option<Expr>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub sort: Vec<Sort>,
    pub projection: Option<Projection>,
}

impl Query {
    /// Every document, in store order.
    pub fn new() -> Self {
        Query::default()
    }

    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    /// Every document selected by `filter`, unwindowed and unsorted.
    pub fn matching(filter: Option<Expr>) -> Self {
        Query { filter, ..Query::default() }
    }
}

/// Shorthand constructors for [`Expr`] leaves and groups.
///
/// ```ignore
/// let expr = Filter::eq("name", "Alice").and(Filter::any_of("tags", vec!["a", "b"]));
/// ```
pub struct Filter;

impl Filter {
    fn compare(field: impl Into<String>, op: FieldOp, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), op, value.into())
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::Lte, value)
    }

    pub fn starts_with(field: impl Into<String>, prefix: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::StartsWith, prefix)
    }

    pub fn ends_with(field: impl Into<String>, suffix: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::EndsWith, suffix)
    }

    /// Substring match on strings, membership on arrays.
    pub fn contains(field: impl Into<String>, needle: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::Contains, needle)
    }

    pub fn not_contains(field: impl Into<String>, needle: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::NotContains, needle)
    }

    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    pub fn and(terms: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(terms.into_iter().collect())
    }

    pub fn or(terms: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(terms.into_iter().collect())
    }

    /// `values` should convert to a BSON array.
    pub fn any_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::AnyOf, values)
    }

    pub fn none_of(field: impl Into<String>, values: impl Into<Bson>) -> Expr {
        Self::compare(field, FieldOp::NoneOf, values)
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Query,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any filter set earlier.
    pub fn filter(mut self, filter: Expr) -> Self {
        self.query.filter = Some(filter);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.query.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.query.offset = Some(offset);
        self
    }

    /// Adds a sort key after the ones already present.
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort.push(Sort { field: field.into(), direction });
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.query.projection = Some(projection);
        self
    }

    pub fn build(self) -> Query {
        self.query
    }
}

/// Walks an [`Expr`] tree, one method per node kind.
///
/// Implementors only supply the node handlers; [`QueryVisitor::visit_expr`] does the
/// dispatch and is what recursive handlers call on their children.
pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, terms: &[Expr]) -> Result<Self::Output, Self::Error>;

    fn visit_or(&mut self, terms: &[Expr]) -> Result<Self::Output, Self::Error>;

    fn visit_not(&mut self, inner: &Expr) -> Result<Self::Output, Self::Error>;

    fn visit_exists(&mut self, field: &str, should_exist: bool) -> Result<Self::Output, Self::Error>;

    fn visit_field(&mut self, field: &str, op: &FieldOp, value: &Bson) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(terms) => self.visit_and(terms),
            Expr::Or(terms) => self.visit_or(terms),
            Expr::Not(inner) => self.visit_not(inner),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn and_flattens_into_existing_conjunction() {
        let expr = Filter::eq("a", 1).and(Filter::eq("b", 2)).and(Filter::eq("c", 3));

        match expr {
            Expr::And(terms) => assert_eq!(terms.len(), 3),
            other => panic!("expected a conjunction, got {other:?}"),
        }
    }

    #[test]
    fn or_wraps_a_conjunction_instead_of_extending_it() {
        let expr = Filter::and([Filter::exists("a")]).or(Filter::not_exists("b"));

        assert_eq!(
            expr,
            Expr::Or(vec![Expr::And(vec![Expr::Exists("a".into(), true)]), Expr::Exists("b".into(), false)])
        );
    }

    #[test]
    fn builder_accumulates_sort_keys_in_order() {
        let query = Query::builder()
            .sort("last", SortDirection::Asc)
            .sort("first", SortDirection::Desc)
            .limit(5)
            .build();

        assert_eq!(query.sort[0].field, "last");
        assert_eq!(query.sort[1].direction, SortDirection::Desc);
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, None);
    }
}
