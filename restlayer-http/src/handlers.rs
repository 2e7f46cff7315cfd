use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, Query, State},
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use bson::{Bson, doc};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde_json::Value;
use tracing::debug;

use restlayer_core::{
    collection::DynCollection,
    document::{Document, DocumentExt},
    key::{DocumentKey, KEY_FIELD, PUBLIC_KEY_FIELD},
    patch::{PatchOperation, Update},
    query::Expr,
};

use crate::{
    context::{RequestContext, absolute_url},
    error::{RestError, Result},
    hooks::{Operation, OperationRequest},
    query::{ENVELOPE_PARAM, ListQuery, Pagination},
    router::{COLLECTION_METHODS, DOCUMENT_METHODS, RestApi},
    shape::{Outcome, envelope_enabled, shape},
};

const NO_REQUEST_BODY: &str = "No Request Body";

/// Characters escaped in a URL path segment, `/` and `%` included.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

pub(crate) async fn collection_endpoint(
    State(api): State<Arc<RestApi>>,
    Path(collection): Path<String>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(&api, &method, &collection, None, &uri, &headers, &body).await
}

pub(crate) async fn document_endpoint(
    State(api): State<Arc<RestApi>>,
    Path((collection, id)): Path<(String, String)>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(&api, &method, &collection, Some(&id), &uri, &headers, &body).await
}

fn operation_of(method: &Method, addresses_document: bool) -> Operation {
    match (addresses_document, method.as_str()) {
        (false, "GET" | "HEAD") => Operation::List,
        (false, "POST") => Operation::Create,
        (false, "PUT") => Operation::ReplaceAll,
        (false, "PATCH") => Operation::PatchAll,
        (false, "DELETE") => Operation::DeleteAll,
        (true, "GET" | "HEAD") => Operation::Read,
        (true, "POST") => Operation::CreateWithId,
        (true, "PUT") => Operation::Replace,
        (true, "PATCH") => Operation::Patch,
        (true, "DELETE") => Operation::Delete,
        _ => Operation::Unsupported,
    }
}

async fn handle(
    api: &RestApi,
    method: &Method,
    collection: &str,
    id: Option<&str>,
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
) -> Response {
    let operation = operation_of(method, id.is_some());
    debug!(%operation, collection, id = ?id, "handling request");

    match dispatch(api, operation, collection, id, uri, headers, body).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn dispatch(
    api: &RestApi,
    operation: Operation,
    name: &str,
    id: Option<&str>,
    uri: &Uri,
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<Response> {
    let body = parse_body(body);
    let request = OperationRequest {
        operation,
        collection: name,
        id,
        headers,
        body: body.as_ref().ok().and_then(Option::as_ref),
    };
    api.validator.validate(&request).await?;
    api.authorizer.authorize(&request).await?;

    let params = query_params(uri)?;
    let collection = api.store.collection(name)?;
    let body = body?;

    let requested_envelope = params
        .iter()
        .find(|(param, _)| param == ENVELOPE_PARAM)
        .map(|(_, value)| value.as_str());
    let context = RequestContext {
        plural: name.to_string(),
        singular: (api.singularize)(name),
        key: id.map(DocumentKey::parse),
        envelope: envelope_enabled(api.envelope, requested_envelope),
        url: absolute_url(headers, uri),
    };
    let criterion = context.criterion();

    let outcome = match (operation, criterion.as_ref(), context.key.as_ref()) {
        (Operation::List, ..) => list(&collection, &params, &api.pagination, &context).await?,
        (Operation::Create, ..) => create(&collection, body, &context).await?,
        (Operation::DeleteAll, ..) => delete_all(&collection).await?,
        (Operation::Read, Some(criterion), _) => read(&collection, criterion).await?,
        (Operation::Replace, Some(criterion), Some(key)) => {
            replace(&collection, criterion, key, body).await?
        }
        (Operation::Patch, Some(criterion), _) => patch(&collection, criterion, body).await?,
        (Operation::Delete, Some(criterion), _) => delete(&collection, criterion).await?,
        (_, None, _) => return Err(RestError::MethodNotAllowed { allow: COLLECTION_METHODS }),
        (_, Some(_), _) => return Err(RestError::MethodNotAllowed { allow: DOCUMENT_METHODS }),
    };

    Ok(shape(outcome, &context))
}

fn query_params(uri: &Uri) -> Result<Vec<(String, String)>> {
    Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map(|Query(params)| params)
        .map_err(|rejection| RestError::bad_request(rejection.body_text()))
}

/// Parses a request body, `None` when there is none.
fn parse_body(body: &Bytes) -> Result<Option<Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| RestError::bad_request(format!("Malformed request body: {e}")))
}

/// Returns the body unless it is absent or empty.
fn require_body(body: Option<Value>) -> Result<Value> {
    match body {
        None | Some(Value::Null) => Err(RestError::bad_request(NO_REQUEST_BODY)),
        Some(Value::Object(map)) if map.is_empty() => Err(RestError::bad_request(NO_REQUEST_BODY)),
        Some(Value::Array(items)) if items.is_empty() => Err(RestError::bad_request(NO_REQUEST_BODY)),
        Some(value) => Ok(value),
    }
}

/// Moves the key to the front of the document under its internal name.
///
/// With no explicit `key`, a key given in the body as `id` (or `_id`) is decoded
/// the way path identifiers are. Such a key must be a non-empty string, since only
/// strings can be addressed through the URL.
fn keyed(mut document: Document, key: Option<Bson>) -> Result<Document> {
    let public = document.remove(PUBLIC_KEY_FIELD);
    let stored = document.remove(KEY_FIELD);
    let key = match (key, public.or(stored)) {
        (Some(key), _) => Some(key),
        (None, Some(Bson::String(id))) if !id.is_empty() => Some(DocumentKey::parse(&id).into()),
        (None, Some(other)) => {
            return Err(RestError::bad_request(format!("Invalid id: {other}")));
        }
        (None, None) => None,
    };

    Ok(match key {
        Some(key) => {
            let mut keyed = doc! { KEY_FIELD: key };
            for (field, value) in document {
                keyed.insert(field, value);
            }
            keyed
        }
        None => document,
    })
}

/// Renders a stored key as a single, percent-encoded URL path segment.
fn key_segment(key: &Bson) -> String {
    let raw = match key {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(id) => id.clone(),
        other => other.to_string(),
    };

    utf8_percent_encode(&raw, PATH_SEGMENT).to_string()
}

async fn list(
    collection: &DynCollection<'_>,
    params: &[(String, String)],
    pagination: &Pagination,
    context: &RequestContext,
) -> Result<Outcome> {
    let query = ListQuery::parse(params, pagination)?;

    let total = collection.count(query.filter()).await?;
    let link = query.link_header(&context.url, total);
    let documents = collection.find(query.into_query()).await?;
    debug!(collection = collection.name(), total, returned = documents.len(), "listed documents");

    Ok(Outcome::List { documents, total, link })
}

async fn create(
    collection: &DynCollection<'_>,
    body: Option<Value>,
    context: &RequestContext,
) -> Result<Outcome> {
    let document = keyed(Document::from_json(require_body(body)?)?, None)?;

    let document = collection.insert(document).await?;
    let id = document.get(KEY_FIELD).map(key_segment).unwrap_or_default();
    debug!(collection = collection.name(), %id, "created document");

    Ok(Outcome::Created {
        location: format!("{}/{}", context.location(), id),
        document,
    })
}

async fn read(collection: &DynCollection<'_>, criterion: &Expr) -> Result<Outcome> {
    collection
        .find_one(criterion)
        .await?
        .map(Outcome::Document)
        .ok_or(RestError::NotFound)
}

async fn replace(
    collection: &DynCollection<'_>,
    criterion: &Expr,
    key: &DocumentKey,
    body: Option<Value>,
) -> Result<Outcome> {
    let document = keyed(Document::from_json(require_body(body)?)?, Some(key.to_bson()))?;

    collection.replace(criterion, document, true).await?;
    debug!(collection = collection.name(), %key, "replaced document");

    read(collection, criterion).await
}

async fn patch(collection: &DynCollection<'_>, criterion: &Expr, body: Option<Value>) -> Result<Outcome> {
    let operations: Vec<PatchOperation> = serde_json::from_value(require_body(body)?)
        .map_err(|e| RestError::bad_request(format!("Invalid patch: {e}")))?;
    let update = Update::from_patch(&operations)?;

    if !collection.update(criterion, &update).await? {
        return Err(RestError::NotFound);
    }

    read(collection, criterion).await
}

async fn delete(collection: &DynCollection<'_>, criterion: &Expr) -> Result<Outcome> {
    let deleted = collection.delete_one(criterion).await?;
    debug!(collection = collection.name(), deleted, "deleted document");

    Ok(Outcome::NoContent)
}

async fn delete_all(collection: &DynCollection<'_>) -> Result<Outcome> {
    let deleted = collection.delete_all().await?;
    debug!(collection = collection.name(), deleted, "deleted collection documents");

    Ok(Outcome::NoContent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::oid::ObjectId;
    use serde_json::json;

    #[test]
    fn maps_methods_to_operations() {
        assert_eq!(operation_of(&Method::GET, false), Operation::List);
        assert_eq!(operation_of(&Method::HEAD, true), Operation::Read);
        assert_eq!(operation_of(&Method::POST, true), Operation::CreateWithId);
        assert_eq!(operation_of(&Method::OPTIONS, false), Operation::Unsupported);
    }

    #[test]
    fn empty_bodies_are_rejected() {
        assert!(parse_body(&Bytes::from_static(b"  \n")).unwrap().is_none());
        assert!(parse_body(&Bytes::from_static(b"{ name: ")).is_err());

        for body in [None, Some(json!({})), Some(json!([])), Some(Value::Null)] {
            match require_body(body) {
                Err(RestError::BadRequest(message)) => assert_eq!(message, NO_REQUEST_BODY),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn body_keys_are_decoded_like_path_identifiers() {
        let oid = ObjectId::new();
        let document = keyed(doc! { "name": "Bob", "id": oid.to_hex() }, None).unwrap();

        assert_eq!(document, doc! { "_id": oid, "name": "Bob" });
        assert_eq!(document.keys().next().map(String::as_str), Some("_id"));
    }

    #[test]
    fn body_keys_must_be_non_empty_strings() {
        for body in [doc! { "id": 5 }, doc! { "id": Bson::Null }, doc! { "_id": "" }, doc! { "id": { "n": 1 } }] {
            assert!(matches!(keyed(body, None), Err(RestError::BadRequest(_))));
        }
        assert_eq!(keyed(doc! { "name": "Ann" }, None).unwrap(), doc! { "name": "Ann" });
    }

    #[test]
    fn key_segments_are_percent_encoded() {
        assert_eq!(key_segment(&Bson::String("0001".into())), "0001");
        assert_eq!(key_segment(&Bson::String("café".into())), "caf%C3%A9");
        assert_eq!(key_segment(&Bson::String("a/b c".into())), "a%2Fb%20c");
        assert_eq!(key_segment(&Bson::String("50%".into())), "50%25");
    }

    #[test]
    fn path_keys_override_body_keys() {
        let document = keyed(
            doc! { "id": "9999", "_id": "8888", "name": "Judy" },
            Some(Bson::String("0002".into())),
        )
        .unwrap();

        assert_eq!(document, doc! { "_id": "0002", "name": "Judy" });
    }
}
