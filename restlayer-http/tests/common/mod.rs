#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode},
};
use bson::doc;
use restlayer_core::{
    backend::StoreBackendBuilder,
    store::{DocumentStore, DynDocumentStore, IntoDynDocumentStore},
};
use restlayer_http::{RestApi, RestApiBuilder, config::ApiConfig, server::app};
use restlayer_memory::InMemoryStore;
use serde_json::Value;
use tower::ServiceExt;

pub async fn empty_store() -> Arc<DynDocumentStore> {
    Arc::new(DocumentStore::new(InMemoryStore::builder().build().await.unwrap()).into_dyn())
}

/// A store holding Bob under the key `0001` and Judy under a generated key.
pub async fn seeded_store() -> Arc<DynDocumentStore> {
    let store = empty_store().await;
    let users = store.collection("users").unwrap();

    users
        .insert(doc! { "_id": "0001", "name": "Bob", "email": "bob@example.com", "age": 42 })
        .await
        .unwrap();
    users
        .insert(doc! { "name": "Judy", "email": "judy@example.com", "age": 35 })
        .await
        .unwrap();

    store
}

pub async fn seeded_api() -> RestApiBuilder {
    RestApi::builder(seeded_store().await)
}

pub fn mount(api: RestApiBuilder) -> Router {
    app(api.build(), &ApiConfig::default())
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn json(&self) -> &Value {
        self.body.as_ref().expect("response has a body")
    }

    pub fn items(&self) -> &Vec<Value> {
        self.json().as_array().expect("response is a list")
    }
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
    send_raw(app, method, uri, body.map(|body| body.to_string()).unwrap_or_default()).await
}

pub async fn send_raw(app: &Router, method: &str, uri: &str, body: impl Into<String>) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("host", "localhost")
        .header("content-type", "application/json")
        .body(Body::from(body.into()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    TestResponse {
        status,
        headers,
        body: match bytes.is_empty() {
            true => None,
            false => Some(serde_json::from_slice(&bytes).unwrap()),
        },
    }
}
