//! Store handles.
//!
//! [`DocumentStore`] wraps a concrete backend; [`DynDocumentStore`] boxes one chosen at
//! startup and is what the HTTP layer shares between requests. Collections are never
//! declared: any name accepted by [`validate_collection_name`] binds to a handle, and
//! the backend creates the collection on its first write.
//!
//!
//! ```ignore
//! use restlayer_core::store::{DocumentStore, IntoDynDocumentStore};
//!
//! let store = DocumentStore::new(backend).into_dyn();
//! let users = store.collection("users")?;
//! ```

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::{Collection, DynCollection},
    error::{DocumentStoreError, DocumentStoreResult},
};

/// Checks that `name` can be used as a collection name.
///
/// A valid name is non-empty, contains neither `$` nor NUL characters and does not
/// live in the reserved `system.` namespace.
///
/// # Errors
///
/// Returns [`DocumentStoreError::InvalidCollection`] for any other name.
pub fn validate_collection_name(name: &str) -> DocumentStoreResult<()> {
    if name.is_empty() {
        return Err(DocumentStoreError::InvalidCollection("name is empty".into()));
    }
    if name.contains('$') || name.contains('\0') {
        return Err(DocumentStoreError::InvalidCollection(format!(
            "'{name}' contains a reserved character"
        )));
    }
    if name.starts_with("system.") {
        return Err(DocumentStoreError::InvalidCollection(format!(
            "'{name}' is in the reserved system namespace"
        )));
    }

    Ok(())
}

#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Binds `name` to a collection handle, rejecting names [`validate_collection_name`] refuses.
    pub fn collection<'a>(&'a self, name: &str) -> DocumentStoreResult<Collection<'a, B>> {
        validate_collection_name(name)?;
        Ok(Collection::new(name.to_string(), &self.backend))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

/// Store over a boxed backend.
#[derive(Debug)]
pub struct DynDocumentStore {
    backend: Box<dyn DynStoreBackend>,
}

impl DynDocumentStore {
    pub fn new(backend: Box<dyn DynStoreBackend>) -> Self {
        Self { backend }
    }

    /// See [`DocumentStore::collection`].
    pub fn collection<'a>(&'a self, name: &str) -> DocumentStoreResult<DynCollection<'a>> {
        validate_collection_name(name)?;
        Ok(DynCollection::new(name.to_string(), &*self.backend))
    }

    /// Closes the backend's connections, if it holds any.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown_boxed().await
    }
}

pub trait IntoDynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore;
}

impl<B: StoreBackend + 'static> IntoDynDocumentStore for DocumentStore<B> {
    fn into_dyn(self) -> DynDocumentStore {
        DynDocumentStore::new(Box::new(self.backend))
    }
}

impl IntoDynDocumentStore for DynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore {
        self
    }
}

/// Access to the concrete backend behind a [`DynDocumentStore`].
pub trait AsStaticDocumentStore {
    /// `None` unless the boxed backend is a `B`.
    fn backend_as<B>(&self) -> Option<&B>
    where
        B: StoreBackend + 'static;
}

impl AsStaticDocumentStore for DynDocumentStore {
    fn backend_as<B>(&self) -> Option<&B>
    where
        B: StoreBackend + 'static,
    {
        self.backend.as_any().downcast_ref()
    }
}

pub trait IntoStaticDocumentStore {
    /// Unboxes the backend, or drops the store and returns `None` when it is not a `B`.
    fn into_static<B>(self) -> Option<DocumentStore<B>>
    where
        B: StoreBackend + 'static;
}

impl IntoStaticDocumentStore for DynDocumentStore {
    fn into_static<B>(self) -> Option<DocumentStore<B>>
    where
        B: StoreBackend + 'static,
    {
        let backend = self.backend.into_any().downcast::<B>().ok()?;
        Some(DocumentStore::new(*backend))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_collection_names() {
        for name in ["users", "user-profiles", "audit.log", "ÉTÉ"] {
            assert!(validate_collection_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_reserved_collection_names() {
        for name in ["", "$cmd", "us\0ers", "system.indexes"] {
            assert!(
                matches!(
                    validate_collection_name(name),
                    Err(DocumentStoreError::InvalidCollection(_))
                ),
                "{name:?}"
            );
        }
    }
}
