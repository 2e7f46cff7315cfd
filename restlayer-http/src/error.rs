//! Error types and HTTP response conversion

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use restlayer_core::error::DocumentStoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for request handling
pub type Result<T, E = RestError> = std::result::Result<T, E>;

/// Errors answered to API clients
#[derive(Debug, Error)]
pub enum RestError {
    /// The request is malformed
    #[error("{0}")]
    BadRequest(String),

    /// The addressed document does not exist
    #[error("Not found")]
    NotFound,

    /// The endpoint does not support the method
    #[error("Method not allowed")]
    MethodNotAllowed {
        /// Methods the endpoint supports, as sent in the `Allow` header
        allow: &'static str,
    },

    /// Authentication is required or failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The caller may not perform the operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The document conflicts with an existing one
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The document store failed
    #[error(transparent)]
    Store(DocumentStoreError),
}

impl RestError {
    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Machine readable code sent in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            RestError::BadRequest(_) => "BAD_REQUEST",
            RestError::NotFound => "NOT_FOUND",
            RestError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            RestError::Unauthorized(_) => "UNAUTHORIZED",
            RestError::Forbidden(_) => "FORBIDDEN",
            RestError::Conflict(_) => "CONFLICT",
            RestError::Store(_) => "STORE_ERROR",
        }
    }

    /// HTTP status of the error.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RestError::NotFound => StatusCode::NOT_FOUND,
            RestError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RestError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            RestError::Forbidden(_) => StatusCode::FORBIDDEN,
            RestError::Conflict(_) => StatusCode::CONFLICT,
            RestError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DocumentStoreError> for RestError {
    fn from(err: DocumentStoreError) -> Self {
        match err {
            err if err.is_client_error() => RestError::BadRequest(err.to_string()),
            DocumentStoreError::DocumentAlreadyExists(..) => RestError::Conflict(err.to_string()),
            err => RestError::Store(err),
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Error code
    pub code: String,

    /// HTTP status code
    pub status: u16,
}

impl ErrorResponse {
    /// Create an error response
    pub fn new(status: StatusCode, code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            status: status.as_u16(),
        }
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status();

        match self {
            // Missing documents answer with an empty body.
            RestError::NotFound => status.into_response(),

            RestError::MethodNotAllowed { allow } => (
                status,
                [(header::ALLOW, allow)],
                Json(ErrorResponse::new(status, self.code(), self.to_string())),
            )
                .into_response(),

            RestError::Store(ref e) => {
                tracing::error!(error = %e, "Document store error");

                (status, Json(ErrorResponse::new(status, self.code(), e.to_string()))).into_response()
            }

            _ => {
                tracing::debug!(status = status.as_u16(), error = %self, "Request rejected");

                (status, Json(ErrorResponse::new(status, self.code(), self.to_string()))).into_response()
            }
        }
    }
}

/// Errors raised while starting or running the service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Tracing could not be initialized
    #[error("Tracing error: {0}")]
    Tracing(String),

    /// The document store could not be built or shut down
    #[error("Store error: {0}")]
    Store(#[from] DocumentStoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ServiceError {
    fn from(err: figment::Error) -> Self {
        ServiceError::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_store_errors_by_cause() {
        let bad = RestError::from(DocumentStoreError::InvalidPatch("empty".into()));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let duplicate = RestError::from(DocumentStoreError::DocumentAlreadyExists(
            "0001".into(),
            "users".into(),
        ));
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let backend = RestError::from(DocumentStoreError::Backend("connection reset".into()));
        assert_eq!(backend.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(backend.code(), "STORE_ERROR");
    }

    #[test]
    fn not_found_has_no_body() {
        let response = RestError::NotFound.into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn method_not_allowed_lists_supported_methods() {
        let response = RestError::MethodNotAllowed { allow: "GET, POST" }.into_response();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[header::ALLOW], "GET, POST");
    }
}
