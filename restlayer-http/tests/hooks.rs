mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use restlayer_http::{
    RestError,
    hooks::{Authorizer, Operation, OperationRequest, RequestValidator},
};
use serde_json::json;

use common::{mount, seeded_api, send, send_raw};

struct ReadOnly;

#[async_trait]
impl Authorizer for ReadOnly {
    async fn authorize(&self, request: &OperationRequest<'_>) -> Result<(), RestError> {
        match request.operation.is_read() {
            true => Ok(()),
            false => Err(RestError::Forbidden(format!("{} is not allowed", request.operation))),
        }
    }
}

struct RequireName;

#[async_trait]
impl RequestValidator for RequireName {
    async fn validate(&self, request: &OperationRequest<'_>) -> Result<(), RestError> {
        match (request.operation, request.body) {
            (Operation::Create, Some(body)) if body.get("name").is_none() => {
                Err(RestError::bad_request("name is required"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Default)]
struct Recorder {
    seen: Arc<Mutex<Vec<(Operation, Option<String>)>>>,
}

#[async_trait]
impl RequestValidator for Recorder {
    async fn validate(&self, request: &OperationRequest<'_>) -> Result<(), RestError> {
        self.seen
            .lock()
            .unwrap()
            .push((request.operation, request.id.map(str::to_string)));

        Err(RestError::Unauthorized("missing credentials".into()))
    }
}

#[tokio::test]
async fn authorizers_guard_writes() {
    let app = mount(seeded_api().await.authorizer(ReadOnly));

    let denied = send(&app, "DELETE", "/api/v1/users/0001", None).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.json()["error"], "Forbidden: delete is not allowed");

    assert_eq!(send(&app, "GET", "/api/v1/users/0001", None).await.status, StatusCode::OK);
    assert_eq!(send(&app, "GET", "/api/v1/users", None).await.header("x-total-count"), Some("2"));
}

#[tokio::test]
async fn authorizers_answer_before_requests_are_checked() {
    let app = mount(seeded_api().await.authorizer(ReadOnly));

    let bad_collection = send_raw(&app, "POST", "/api/v1/%24cmd", "{}").await;
    assert_eq!(bad_collection.status, StatusCode::FORBIDDEN);

    let malformed = send_raw(&app, "POST", "/api/v1/users", "{\"name\":").await;
    assert_eq!(malformed.status, StatusCode::FORBIDDEN);

    assert_eq!(send(&app, "GET", "/api/v1/%24cmd", None).await.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn validators_see_parsed_bodies() {
    let app = mount(seeded_api().await.validator(RequireName));

    let rejected = send(&app, "POST", "/api/v1/users", Some(json!({ "age": 7 }))).await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert_eq!(rejected.json()["error"], "name is required");

    let accepted = send(&app, "POST", "/api/v1/users", Some(json!({ "name": "Ann" }))).await;
    assert_eq!(accepted.status, StatusCode::CREATED);
}

#[tokio::test]
async fn hooks_run_before_methods_are_refused() {
    let recorder = Recorder::default();
    let app = mount(seeded_api().await.validator(recorder.clone()));

    assert_eq!(send(&app, "PUT", "/api/v1/users", None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(send(&app, "POST", "/api/v1/users/0001", None).await.status, StatusCode::UNAUTHORIZED);

    assert_eq!(
        *recorder.seen.lock().unwrap(),
        vec![
            (Operation::ReplaceAll, None),
            (Operation::CreateWithId, Some("0001".to_string())),
        ]
    );
}
