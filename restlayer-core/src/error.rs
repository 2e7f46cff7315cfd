//! Errors raised by stores and by the identifier, patch and query translation helpers.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Failure of a store operation.
///
/// The `Invalid*` variants describe bad input and map to client errors in the REST
/// layer; see [`DocumentStoreError::is_client_error`].
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// BSON or JSON conversion failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// Key, then collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),
    /// The value is not a JSON object, or its key field has an unusable type.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("Invalid patch: {0}")]
    InvalidPatch(String),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// The storage itself failed (I/O, driver, server).
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// `true` for errors caused by the request, `false` for store failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DocumentStoreError::InvalidCollection(_)
                | DocumentStoreError::InvalidDocument(_)
                | DocumentStoreError::InvalidPatch(_)
                | DocumentStoreError::InvalidQuery(_)
        )
    }
}

pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
