//! The seam between the REST layer and a storage engine.
//!
//! [`StoreBackend`] lists the seven operations the HTTP handlers need, each taking the
//! collection name as its first argument; a collection springs into existence on its
//! first write. [`DynStoreBackend`] is the object-safe mirror every `StoreBackend`
//! gets for free, and [`StoreBackendBuilder`] opens a backend asynchronously.
//!
//! ```ignore
//! let created = backend.insert_document("users", doc! { "name": "Alice" }).await?;
//! let found = backend.find_document("users", &DocumentKey::parse("0001").filter()).await?;
//! ```

use async_trait::async_trait;
use std::{any::Any, fmt::Debug};

use crate::{
    document::Document,
    error::DocumentStoreResult,
    patch::Update,
    query::{Expr, Query},
};

/// A document storage engine.
///
/// Every document is keyed by its `_id` field; documents inserted without one receive
/// a generated [`ObjectId`](bson::oid::ObjectId). Handlers share one backend across
/// tasks, so implementations synchronize internally.
///
/// Storage failures surface as
/// [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend) and are
/// not retried.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Counts the documents of a collection matching an optional filter.
    ///
    /// A collection that was never written to counts zero documents.
    async fn count_documents(
        &self,
        collection: &str,
        filter: Option<&Expr>,
    ) -> DocumentStoreResult<u64>;

    /// Retrieves the documents matching a query.
    ///
    /// The filter is applied first, then the sort keys, then the offset and limit
    /// window, then the projection. Without sort keys documents are returned in the
    /// store's natural order.
    async fn find_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Retrieves the first document matching a filter, if any.
    async fn find_document(
        &self,
        collection: &str,
        filter: &Expr,
    ) -> DocumentStoreResult<Option<Document>>;

    /// Inserts a single document and returns it as stored.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists)
    /// if a document with the same `_id` is already present.
    async fn insert_document(
        &self,
        collection: &str,
        document: Document,
    ) -> DocumentStoreResult<Document>;

    /// Replaces the first document matching `filter` entirely.
    ///
    /// When nothing matches and `upsert` is set, `document` is inserted instead.
    /// Returns `true` if a document was replaced or inserted.
    async fn replace_document(
        &self,
        collection: &str,
        filter: &Expr,
        document: Document,
        upsert: bool,
    ) -> DocumentStoreResult<bool>;

    /// Applies a partial update to the first document matching `filter`.
    ///
    /// Returns `true` if a document matched. Never inserts.
    async fn update_document(
        &self,
        collection: &str,
        filter: &Expr,
        update: &Update,
    ) -> DocumentStoreResult<bool>;

    /// Deletes documents from a collection.
    ///
    /// With a filter, at most one matching document is removed. Without one, every
    /// document of the collection is removed. Returns the number of deleted documents;
    /// deleting nothing is not an error.
    async fn delete_documents(
        &self,
        collection: &str,
        filter: Option<&Expr>,
    ) -> DocumentStoreResult<u64>;

    /// Closes connections. Nothing to do by default.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn count_documents(
        &self,
        collection: &str,
        filter: Option<&Expr>,
    ) -> DocumentStoreResult<u64>;
    async fn find_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> DocumentStoreResult<Vec<Document>>;
    async fn find_document(
        &self,
        collection: &str,
        filter: &Expr,
    ) -> DocumentStoreResult<Option<Document>>;
    async fn insert_document(
        &self,
        collection: &str,
        document: Document,
    ) -> DocumentStoreResult<Document>;
    async fn replace_document(
        &self,
        collection: &str,
        filter: &Expr,
        document: Document,
        upsert: bool,
    ) -> DocumentStoreResult<bool>;
    async fn update_document(
        &self,
        collection: &str,
        filter: &Expr,
        update: &Update,
    ) -> DocumentStoreResult<bool>;
    async fn delete_documents(
        &self,
        collection: &str,
        filter: Option<&Expr>,
    ) -> DocumentStoreResult<u64>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

#[async_trait]
impl<B: StoreBackend + Send + Sync + 'static> DynStoreBackend for B {
    async fn count_documents(
        &self,
        collection: &str,
        filter: Option<&Expr>,
    ) -> DocumentStoreResult<u64> {
        StoreBackend::count_documents(self, collection, filter).await
    }

    async fn find_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> DocumentStoreResult<Vec<Document>> {
        StoreBackend::find_documents(self, collection, query).await
    }

    async fn find_document(
        &self,
        collection: &str,
        filter: &Expr,
    ) -> DocumentStoreResult<Option<Document>> {
        StoreBackend::find_document(self, collection, filter).await
    }

    async fn insert_document(
        &self,
        collection: &str,
        document: Document,
    ) -> DocumentStoreResult<Document> {
        StoreBackend::insert_document(self, collection, document).await
    }

    async fn replace_document(
        &self,
        collection: &str,
        filter: &Expr,
        document: Document,
        upsert: bool,
    ) -> DocumentStoreResult<bool> {
        StoreBackend::replace_document(self, collection, filter, document, upsert).await
    }

    async fn update_document(
        &self,
        collection: &str,
        filter: &Expr,
        update: &Update,
    ) -> DocumentStoreResult<bool> {
        StoreBackend::update_document(self, collection, filter, update).await
    }

    async fn delete_documents(
        &self,
        collection: &str,
        filter: Option<&Expr>,
    ) -> DocumentStoreResult<u64> {
        StoreBackend::delete_documents(self, collection, filter).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        (*self).shutdown().await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
