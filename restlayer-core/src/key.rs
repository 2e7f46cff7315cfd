//! Document key normalization.
//!
//! Every document is identified by its internal key field ([`KEY_FIELD`]).
//! Identifiers arrive from URL path segments as plain strings; [`DocumentKey::parse`]
//! turns such a string into the value the store actually keys documents by.
//!
//! A string made of exactly 24 hexadecimal characters is the canonical encoding of
//! an [`ObjectId`] and is decoded into one. Any other string is used verbatim, so an
//! unrecognized identifier simply fails to match rather than failing to parse.
//!
//! ```ignore
//! use restlayer_core::key::DocumentKey;
//!
//! let generated = DocumentKey::parse("507f1f77bcf86cd799439011");
//! assert!(generated.is_object_id());
//!
//! let raw = DocumentKey::parse("0001");
//! assert_eq!(raw.to_string(), "0001");
//! ```

use std::fmt;

use bson::{Bson, oid::ObjectId};

use crate::query::{Expr, Filter};

/// Name of the field holding a document's internal key.
pub const KEY_FIELD: &str = "_id";

/// Name of the field exposing a document's key publicly.
pub const PUBLIC_KEY_FIELD: &str = "id";

/// A normalized document key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentKey {
    /// A 12-byte object id decoded from its 24 hex character form.
    ObjectId(ObjectId),
    /// Any other identifier, kept exactly as received.
    Raw(String),
}

impl DocumentKey {
    /// Normalizes an identifier string into a document key.
    ///
    /// Never fails: strings that are not a canonical object id encoding become
    /// [`DocumentKey::Raw`].
    pub fn parse(id: &str) -> Self {
        if id.len() == 24 {
            if let Ok(oid) = ObjectId::parse_str(id) {
                return DocumentKey::ObjectId(oid);
            }
        }

        DocumentKey::Raw(id.to_string())
    }

    /// Returns `true` if this key holds a decoded object id.
    pub fn is_object_id(&self) -> bool {
        matches!(self, DocumentKey::ObjectId(_))
    }

    /// Returns the key as a BSON value suitable for the internal key field.
    pub fn to_bson(&self) -> Bson {
        match self {
            DocumentKey::ObjectId(oid) => Bson::ObjectId(*oid),
            DocumentKey::Raw(raw) => Bson::String(raw.clone()),
        }
    }

    /// Returns the match criterion selecting the document with this key.
    pub fn filter(&self) -> Expr {
        Filter::eq(KEY_FIELD, self.to_bson())
    }
}

impl From<DocumentKey> for Bson {
    fn from(key: DocumentKey) -> Self {
        match key {
            DocumentKey::ObjectId(oid) => Bson::ObjectId(oid),
            DocumentKey::Raw(raw) => Bson::String(raw),
        }
    }
}

impl From<ObjectId> for DocumentKey {
    fn from(oid: ObjectId) -> Self {
        DocumentKey::ObjectId(oid)
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKey::ObjectId(oid) => write!(f, "{}", oid.to_hex()),
            DocumentKey::Raw(raw) => f.write_str(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::FieldOp;

    #[test]
    fn decodes_canonical_object_ids() {
        let key = DocumentKey::parse("507f1f77bcf86cd799439011");

        assert!(key.is_object_id());
        assert_eq!(key.to_string(), "507f1f77bcf86cd799439011");
        assert!(matches!(key.to_bson(), Bson::ObjectId(_)));
    }

    #[test]
    fn keeps_other_identifiers_verbatim() {
        for id in ["0001", "none", "507f1f77bcf86cd79943901z", "507f1f77bcf86cd7994390111"] {
            let key = DocumentKey::parse(id);

            assert_eq!(key, DocumentKey::Raw(id.to_string()));
            assert_eq!(key.to_bson(), Bson::String(id.to_string()));
        }
    }

    #[test]
    fn filter_matches_on_the_internal_key() {
        match DocumentKey::parse("0002").filter() {
            Expr::Field { field, op: FieldOp::Eq, value } => {
                assert_eq!(field, KEY_FIELD);
                assert_eq!(value, Bson::String("0002".into()));
            }
            other => panic!("unexpected criterion {other:?}"),
        }
    }
}
