//! Response shaping.
//!
//! Results leave the service in two steps. The internal key field of every document
//! is renamed to its public name, then the result is optionally wrapped in an
//! envelope named after the collection.

use axum::{
    Json,
    http::{HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};

use restlayer_core::{
    document::{Document, DocumentExt},
    key::{KEY_FIELD, PUBLIC_KEY_FIELD},
};

use crate::context::RequestContext;

/// Header reporting the number of documents matching a list request.
pub const X_TOTAL_COUNT: HeaderName = HeaderName::from_static("x-total-count");

/// The result of a handled operation.
#[derive(Debug)]
pub enum Outcome {
    /// A single document.
    Document(Document),
    /// A newly created document and its location.
    Created {
        document: Document,
        location: String,
    },
    /// A window of documents with the total number of matches.
    List {
        documents: Vec<Document>,
        total: u64,
        link: Option<String>,
    },
    /// Nothing to return.
    NoContent,
}

/// Decides whether responses are enveloped.
///
/// The `requested` value only matters when it spells out the opposite of the
/// default, `"true"` or `"false"`. Anything else leaves the default in place.
pub fn envelope_enabled(default: bool, requested: Option<&str>) -> bool {
    match requested {
        Some(value) if value == (!default).to_string() => !default,
        _ => default,
    }
}

/// Converts a document into its public JSON form, exposing the key as `id`.
pub fn public_document(document: &Document) -> Value {
    match document.to_json() {
        Value::Object(map) => {
            let has_key = map.contains_key(KEY_FIELD);

            Value::Object(
                map.into_iter()
                    .filter(|(field, _)| !(has_key && field == PUBLIC_KEY_FIELD))
                    .map(|(field, value)| match field.as_str() {
                        KEY_FIELD => (PUBLIC_KEY_FIELD.to_string(), value),
                        _ => (field, value),
                    })
                    .collect::<Map<_, _>>(),
            )
        }
        other => other,
    }
}

fn envelope(name: &str, body: Value) -> Value {
    let mut map = Map::new();
    map.insert(name.to_string(), body);
    Value::Object(map)
}

/// Turns an outcome into the response sent to the client.
pub fn shape(outcome: Outcome, context: &RequestContext) -> Response {
    let single = |document: &Document| {
        let body = public_document(document);
        match context.envelope {
            true => envelope(&context.singular, body),
            false => body,
        }
    };

    match outcome {
        Outcome::Document(document) => (StatusCode::OK, Json(single(&document))).into_response(),
        Outcome::Created { document, location } => {
            let mut response = (StatusCode::CREATED, Json(single(&document))).into_response();
            if let Ok(location) = HeaderValue::from_str(&location) {
                response.headers_mut().insert(header::LOCATION, location);
            }
            response
        }
        Outcome::List { documents, total, link } => {
            let body = Value::Array(documents.iter().map(public_document).collect());
            let body = match context.envelope {
                true => envelope(&context.plural, body),
                false => body,
            };

            let mut response = (StatusCode::OK, Json(body)).into_response();
            let headers = response.headers_mut();
            headers.insert(X_TOTAL_COUNT, HeaderValue::from(total));
            if let Some(link) = link.and_then(|link| HeaderValue::from_str(&link).ok()) {
                headers.insert(header::LINK, link);
            }
            response
        }
        Outcome::NoContent => StatusCode::NO_CONTENT.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};
    use serde_json::json;

    #[test]
    fn envelope_default_flips_only_on_its_negation() {
        assert!(!envelope_enabled(false, None));
        assert!(envelope_enabled(false, Some("true")));
        assert!(!envelope_enabled(false, Some("yes")));
        assert!(!envelope_enabled(false, Some("false")));
        assert!(envelope_enabled(true, Some("TRUE")));
        assert!(!envelope_enabled(true, Some("false")));
    }

    #[test]
    fn exposes_the_key_in_place() {
        let oid = ObjectId::new();
        let body = public_document(&doc! { "_id": oid, "name": "Bob" });

        assert_eq!(body, json!({ "id": oid.to_hex(), "name": "Bob" }));
        assert_eq!(
            body.as_object().and_then(|map| map.keys().next().cloned()),
            Some("id".to_string())
        );
    }

    #[test]
    fn stored_key_wins_over_a_public_field() {
        let body = public_document(&doc! { "id": "stale", "_id": "0001" });

        assert_eq!(body, json!({ "id": "0001" }));
    }
}
