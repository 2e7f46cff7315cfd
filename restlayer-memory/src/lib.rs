//! In-memory document storage backend for restlayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development,
//! testing, and small-scale deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Schemaless storage** - Stores documents as BSON, keyed by their `_id` field
//! - **Full query support** - Filtering on dotted paths, multi-key sorting, windowing and projection
//! - **Partial updates** - Applies translated patches in place
//!
//! # Quick Start
//!
//! ```ignore
//! use restlayer_core::store::{DocumentStore, IntoDynDocumentStore};
//! use restlayer_memory::InMemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = InMemoryStore::builder().build().await?;
//!     let store = DocumentStore::new(backend).into_dyn();
//!
//!     let users = store.collection("users")?;
//!     users.insert(bson::doc! { "name": "Alice" }).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as restlayer_memory;

pub mod store;
mod evaluator;
mod path;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
