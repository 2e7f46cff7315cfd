//! Collection handles for document store operations.
//!
//! A collection handle binds a collection name to a storage backend for the duration
//! of a unit of work, typically a single HTTP request. Handles are cheap: they hold
//! the name and a reference to the backend, nothing else.
//! [`DynCollection`] is the form the HTTP handlers use.
//!
//! ```ignore
//! use restlayer_core::{key::DocumentKey, query::Query};
//!
//! let users = store.collection("users")?;
//! let created = users.insert(bson::doc! { "name": "Alice" }).await?;
//! let everyone = users.find(Query::new()).await?;
//! let nobody = users.find_one(&DocumentKey::parse("missing").filter()).await?;
//! ```

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    document::Document,
    error::DocumentStoreResult,
    patch::Update,
    query::{Expr, Query},
};

/// Named collection over a concrete backend `B`.
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { name, backend }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Counts the documents matching an optional filter.
    pub async fn count(&self, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        self.backend
            .count_documents(&self.name, filter)
            .await
    }

    /// Retrieves the documents matching a query.
    pub async fn find(&self, query: Query) -> DocumentStoreResult<Vec<Document>> {
        self.backend
            .find_documents(&self.name, query)
            .await
    }

    /// Retrieves the first document matching a filter.
    pub async fn find_one(&self, filter: &Expr) -> DocumentStoreResult<Option<Document>> {
        self.backend
            .find_document(&self.name, filter)
            .await
    }

    /// Inserts a document, returning it as stored.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the key is
    /// already taken or the backend fails.
    pub async fn insert(&self, document: Document) -> DocumentStoreResult<Document> {
        self.backend
            .insert_document(&self.name, document)
            .await
    }

    /// Replaces the document matching `filter`, inserting it when `upsert` is set.
    pub async fn replace(
        &self,
        filter: &Expr,
        document: Document,
        upsert: bool,
    ) -> DocumentStoreResult<bool> {
        self.backend
            .replace_document(&self.name, filter, document, upsert)
            .await
    }

    /// Applies a partial update to the document matching `filter`.
    pub async fn update(&self, filter: &Expr, update: &Update) -> DocumentStoreResult<bool> {
        self.backend
            .update_document(&self.name, filter, update)
            .await
    }

    /// Deletes at most one document matching `filter`.
    pub async fn delete_one(&self, filter: &Expr) -> DocumentStoreResult<u64> {
        self.backend
            .delete_documents(&self.name, Some(filter))
            .await
    }

    /// Deletes every document of the collection.
    pub async fn delete_all(&self) -> DocumentStoreResult<u64> {
        self.backend
            .delete_documents(&self.name, None)
            .await
    }
}

/// Named collection over a boxed backend. Methods mirror [`Collection`].
#[derive(Debug)]
pub struct DynCollection<'a> {
    name: String,
    backend: &'a dyn DynStoreBackend,
}

impl<'a> DynCollection<'a> {
    pub(crate) fn new(name: String, backend: &'a dyn DynStoreBackend) -> Self {
        Self { name, backend }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn count(&self, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        self.backend
            .count_documents(&self.name, filter)
            .await
    }

    pub async fn find(&self, query: Query) -> DocumentStoreResult<Vec<Document>> {
        self.backend
            .find_documents(&self.name, query)
            .await
    }

    pub async fn find_one(&self, filter: &Expr) -> DocumentStoreResult<Option<Document>> {
        self.backend
            .find_document(&self.name, filter)
            .await
    }

    pub async fn insert(&self, document: Document) -> DocumentStoreResult<Document> {
        self.backend
            .insert_document(&self.name, document)
            .await
    }

    pub async fn replace(
        &self,
        filter: &Expr,
        document: Document,
        upsert: bool,
    ) -> DocumentStoreResult<bool> {
        self.backend
            .replace_document(&self.name, filter, document, upsert)
            .await
    }

    pub async fn update(&self, filter: &Expr, update: &Update) -> DocumentStoreResult<bool> {
        self.backend
            .update_document(&self.name, filter, update)
            .await
    }

    pub async fn delete_one(&self, filter: &Expr) -> DocumentStoreResult<u64> {
        self.backend
            .delete_documents(&self.name, Some(filter))
            .await
    }

    pub async fn delete_all(&self) -> DocumentStoreResult<u64> {
        self.backend
            .delete_documents(&self.name, None)
            .await
    }
}
