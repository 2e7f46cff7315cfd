//! Generic REST resources over JSON document store collections.
//!
//! restlayer serves every collection of a document store over HTTP without declaring
//! any of them up front. `GET /users` lists the `users` collection, `GET /users/0001`
//! reads one of its documents, and `POST`, `PUT`, `PATCH` and `DELETE` write to it.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use restlayer::{prelude::*, memory::InMemoryStore, http::{config::ApiConfig, server::app}};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await.unwrap()).into_dyn();
//!
//!     let api = RestApi::builder(Arc::new(store))
//!         .envelope(false)
//!         .default_limit(100)
//!         .build();
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await.unwrap();
//!     axum::serve(listener, app(api, &ApiConfig::default())).await.unwrap();
//! }
//! ```
//!
//! # Querying
//!
//! List requests take their filters from the query string:
//!
//! ```text
//! GET /api/v1/users?name=Bob&age>=18&sort=-created&fields=name,email&offset=20&limit=10
//! ```
//!
//! The response carries the total number of matches in `X-Total-Count` and links to
//! the neighbouring pages in `Link`.
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB storage (requires the `mongodb` feature)

pub mod prelude;

pub use restlayer_core::{backend, collection, document, error, key, page, patch, query, store};
pub use restlayer_http as http;

pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use restlayer_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use restlayer_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
