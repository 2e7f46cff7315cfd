//! A store-agnostic document model for serving collections over REST.
//!
//! This crate is the core of the restlayer project and provides:
//!
//! - **Documents** ([`document`]) - The document type and its JSON conversion
//! - **Document keys** ([`key`]) - Normalization of identifiers into store keys
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Query and filtering API** ([`query`]) - Filters, sort keys, projection and windowing
//! - **Partial updates** ([`patch`]) - Translation of patch operations into update instructions
//! - **Collections interface** ([`collection`]) - Per-request handles on a named collection
//! - **Document store** ([`store`]) - The process-wide store handle
//! - **Pagination** ([`page`]) - Windows and navigation links
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use restlayer_core::{key::DocumentKey, store::{DocumentStore, IntoDynDocumentStore}};
//!
//! let store = DocumentStore::new(backend).into_dyn();
//! let users = store.collection("users")?;
//! let bob = users.find_one(&DocumentKey::parse("0001").filter()).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as restlayer_core;

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod key;
pub mod page;
pub mod patch;
pub mod query;
pub mod store;
