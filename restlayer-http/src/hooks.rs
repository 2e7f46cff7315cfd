//! Request validation and authorization hooks.
//!
//! Both hooks see every request first: before the collection name and the body are
//! checked, before any store access and before unsupported methods are answered. Either may reject the request by
//! returning an error, which is sent to the client as is.
//!
//! ```ignore
//! use async_trait::async_trait;
//! use restlayer_http::{error::RestError, hooks::{Authorizer, Operation, OperationRequest}};
//!
//! struct ReadOnly;
//!
//! #[async_trait]
//! impl Authorizer for ReadOnly {
//!     async fn authorize(&self, request: &OperationRequest<'_>) -> Result<(), RestError> {
//!         match request.operation.is_read() {
//!             true => Ok(()),
//!             false => Err(RestError::Forbidden("read only".into())),
//!         }
//!     }
//! }
//! ```

use std::fmt;

use async_trait::async_trait;
use axum::http::HeaderMap;
use serde_json::Value;

use crate::error::RestError;

/// The operation a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `GET /:collection`
    List,
    /// `POST /:collection`
    Create,
    /// `PUT /:collection`
    ReplaceAll,
    /// `PATCH /:collection`
    PatchAll,
    /// `DELETE /:collection`
    DeleteAll,
    /// `GET /:collection/:id`
    Read,
    /// `POST /:collection/:id`
    CreateWithId,
    /// `PUT /:collection/:id`
    Replace,
    /// `PATCH /:collection/:id`
    Patch,
    /// `DELETE /:collection/:id`
    Delete,
    /// Any other method.
    Unsupported,
}

impl Operation {
    /// Returns `true` for operations that do not modify the collection.
    pub fn is_read(&self) -> bool {
        matches!(self, Operation::List | Operation::Read)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "list",
            Operation::Create => "create",
            Operation::ReplaceAll => "replace_all",
            Operation::PatchAll => "patch_all",
            Operation::DeleteAll => "delete_all",
            Operation::Read => "read",
            Operation::CreateWithId => "create_with_id",
            Operation::Replace => "replace",
            Operation::Patch => "patch",
            Operation::Delete => "delete",
            Operation::Unsupported => "unsupported",
        };

        f.write_str(name)
    }
}

/// What the hooks know about a request.
#[derive(Debug, Clone, Copy)]
pub struct OperationRequest<'a> {
    pub operation: Operation,
    pub collection: &'a str,
    /// Identifier from the path, as received.
    pub id: Option<&'a str>,
    pub headers: &'a HeaderMap,
    /// Parsed body, `None` when the request has none or it is not valid JSON.
    pub body: Option<&'a Value>,
}

/// Validates requests before they are authorized.
#[async_trait]
pub trait RequestValidator: Send + Sync {
    async fn validate(&self, request: &OperationRequest<'_>) -> Result<(), RestError>;
}

/// Decides whether a request may proceed.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, request: &OperationRequest<'_>) -> Result<(), RestError>;
}

/// Accepts every request. Used when no hook is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermitAll;

#[async_trait]
impl RequestValidator for PermitAll {
    async fn validate(&self, _request: &OperationRequest<'_>) -> Result<(), RestError> {
        Ok(())
    }
}

#[async_trait]
impl Authorizer for PermitAll {
    async fn authorize(&self, _request: &OperationRequest<'_>) -> Result<(), RestError> {
        Ok(())
    }
}
