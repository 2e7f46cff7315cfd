//! Document representation and JSON conversion.
//!
//! Documents are schemaless ordered maps ([`bson::Document`]). Requests and responses
//! carry JSON, so this module converts between the two representations. The conversion
//! is intentionally lossy in the BSON to JSON direction: object ids are rendered as their
//! hex string and datetimes as RFC 3339 strings, matching what API clients expect.

use bson::{Bson, Document as BsonDocument};
use serde_json::{Map, Number, Value};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// A stored document.
pub type Document = BsonDocument;

/// Conversion utilities between stored documents and JSON payloads.
pub trait DocumentExt {
    /// Creates a document from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] if the value is not a JSON object.
    fn from_json(value: Value) -> DocumentStoreResult<Document>;

    /// Converts this document to a JSON object.
    fn to_json(&self) -> Value;
}

impl DocumentExt for Document {
    fn from_json(value: Value) -> DocumentStoreResult<Document> {
        match json_to_bson(value) {
            Bson::Document(document) => Ok(document),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "expected an object, found {:?}",
                other.element_type()
            ))),
        }
    }

    fn to_json(&self) -> Value {
        Value::Object(
            self.iter()
                .map(|(k, v)| (k.clone(), bson_to_json(v)))
                .collect::<Map<_, _>>(),
        )
    }
}

/// Converts a JSON value into its BSON equivalent.
///
/// Integers that fit in 32 bits become `Int32`, other integers `Int64`, and every other
/// number a `Double`.
pub fn json_to_bson(value: Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => match i32::try_from(i) {
                Ok(small) => Bson::Int32(small),
                Err(_) => Bson::Int64(i),
            },
            None => Bson::Double(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Bson::String(s),
        Value::Array(items) => Bson::Array(items.into_iter().map(json_to_bson).collect()),
        Value::Object(map) => Bson::Document(
            map.into_iter()
                .map(|(k, v)| (k, json_to_bson(v)))
                .collect::<BsonDocument>(),
        ),
    }
}

/// Converts a BSON value into the JSON shape returned to API clients.
pub fn bson_to_json(value: &Bson) -> Value {
    match value {
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::Number((*i).into()),
        Bson::Int64(i) => Value::Number((*i).into()),
        Bson::Double(d) => Number::from_f64(*d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::String(s) => Value::String(s.clone()),
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => dt
            .try_to_rfc3339_string()
            .map(Value::String)
            .unwrap_or(Value::Null),
        Bson::Array(items) => Value::Array(items.iter().map(bson_to_json).collect()),
        Bson::Document(doc) => doc.to_json(),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};
    use serde_json::json;

    #[test]
    fn rejects_non_object_bodies() {
        assert!(matches!(
            Document::from_json(json!([1, 2])),
            Err(DocumentStoreError::InvalidDocument(_))
        ));
        assert!(Document::from_json(json!("Bob")).is_err());
    }

    #[test]
    fn converts_nested_values_and_numbers() {
        let document = Document::from_json(json!({
            "name": "Bob",
            "age": 42,
            "big": 8_000_000_000i64,
            "score": 1.5,
            "address": { "city": "Paris" },
            "tags": ["a", null],
        }))
        .unwrap();

        assert_eq!(
            document,
            doc! {
                "name": "Bob",
                "age": 42,
                "big": 8_000_000_000i64,
                "score": 1.5,
                "address": { "city": "Paris" },
                "tags": ["a", Bson::Null],
            }
        );
    }

    #[test]
    fn renders_object_ids_as_hex() {
        let oid = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        let document = doc! { "_id": oid, "nested": { "ref": oid } };

        assert_eq!(
            document.to_json(),
            json!({
                "_id": "507f1f77bcf86cd799439011",
                "nested": { "ref": "507f1f77bcf86cd799439011" },
            })
        );
    }
}
