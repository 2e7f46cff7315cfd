//! Process-local backend.
//!
//! Each collection is a `Vec` of documents in insertion order, which is also the
//! order unsorted queries return. All collections share one `mea` read-write lock.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use mea::rwlock::RwLock;
use tracing::debug;

use restlayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    key::KEY_FIELD,
    patch::Update,
    query::{Expr, Query},
};

use crate::{
    evaluator::{Comparable, DocumentEvaluator},
    path::{project, remove_path, set_path},
};

type CollectionMap = HashMap<String, Vec<Document>>;

/// Backend keeping every collection in memory.
///
/// Clones share their data. Filters are evaluated by scanning the whole collection,
/// so this backend suits tests and small deployments; use the MongoDB backend for
/// anything larger.
///
/// ```ignore
/// let store = InMemoryStore::new();
/// store.insert_document("users", doc! { "_id": "0001", "name": "Alice" }).await?;
///
/// let alice = store.find_document("users", &DocumentKey::parse("0001").filter()).await?;
/// assert!(alice.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    collections: Arc<RwLock<CollectionMap>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(CollectionMap::new())),
        }
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}

/// Returns the document with its key field first, generating an object id if absent.
fn with_key(document: Document) -> Document {
    if document.contains_key(KEY_FIELD) {
        return document;
    }

    let mut keyed = Document::new();
    keyed.insert(KEY_FIELD, ObjectId::new());
    for (field, value) in document {
        keyed.insert(field, value);
    }
    keyed
}

fn key_of(document: &Document) -> Option<&Bson> {
    document.get(KEY_FIELD)
}

fn position(documents: &[Document], filter: &Expr) -> DocumentStoreResult<Option<usize>> {
    for (index, document) in documents.iter().enumerate() {
        if DocumentEvaluator::matches(document, Some(filter))? {
            return Ok(Some(index));
        }
    }

    Ok(None)
}

fn ensure_unique(documents: &[Document], document: &Document, collection: &str) -> DocumentStoreResult<()> {
    let Some(key) = key_of(document) else {
        return Ok(());
    };
    let taken = documents
        .iter()
        .filter_map(key_of)
        .any(|existing| Comparable::from(existing) == Comparable::from(key));

    if taken {
        return Err(DocumentStoreError::DocumentAlreadyExists(
            key.to_string(),
            collection.to_string(),
        ));
    }

    Ok(())
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn count_documents(&self, collection: &str, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(0);
        };

        let mut count = 0;
        for document in documents {
            if DocumentEvaluator::matches(document, filter)? {
                count += 1;
            }
        }

        Ok(count)
    }

    async fn find_documents(&self, collection: &str, query: Query) -> DocumentStoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(vec![]);
        };

        let mut matched = Vec::new();
        for document in documents {
            if DocumentEvaluator::matches(document, query.filter.as_ref())? {
                matched.push(document);
            }
        }

        if !query.sort.is_empty() {
            // Stable sort keeps insertion order between equal keys.
            matched.sort_by(|a, b| DocumentEvaluator::compare(a, b, &query.sort));
        }

        let window = matched
            .into_iter()
            .skip(query.offset.unwrap_or(0) as usize)
            .take(query.limit.map(|l| l as usize).unwrap_or(usize::MAX));

        Ok(match &query.projection {
            Some(projection) => window.map(|d| project(d, projection)).collect(),
            None => window.cloned().collect(),
        })
    }

    async fn find_document(&self, collection: &str, filter: &Expr) -> DocumentStoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(collection) else {
            return Ok(None);
        };

        Ok(position(documents, filter)?.map(|index| documents[index].clone()))
    }

    async fn insert_document(&self, collection: &str, document: Document) -> DocumentStoreResult<Document> {
        let document = with_key(document);
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        ensure_unique(documents, &document, collection)?;
        documents.push(document.clone());
        debug!(collection, total = documents.len(), "inserted document");

        Ok(document)
    }

    async fn replace_document(
        &self,
        collection: &str,
        filter: &Expr,
        document: Document,
        upsert: bool,
    ) -> DocumentStoreResult<bool> {
        let mut collections = self.collections.write().await;
        if !upsert && !collections.contains_key(collection) {
            return Ok(false);
        }
        let documents = collections.entry(collection.to_string()).or_default();

        match position(documents, filter)? {
            Some(index) => {
                let mut replacement = document;
                // A replacement keeps the key of the document it replaces.
                if let Some(key) = key_of(&documents[index]).cloned() {
                    replacement.remove(KEY_FIELD);
                    let mut keyed = Document::new();
                    keyed.insert(KEY_FIELD, key);
                    for (field, value) in replacement {
                        keyed.insert(field, value);
                    }
                    replacement = keyed;
                }
                documents[index] = replacement;
                Ok(true)
            }
            None if upsert => {
                let document = with_key(document);
                ensure_unique(documents, &document, collection)?;
                documents.push(document);
                debug!(collection, "upserted document");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_document(
        &self,
        collection: &str,
        filter: &Expr,
        update: &Update,
    ) -> DocumentStoreResult<bool> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(index) = position(documents, filter)? else {
            return Ok(false);
        };

        // Work on a copy so a failing path leaves the stored document untouched.
        let mut updated = documents[index].clone();
        for (path, value) in update.set.iter() {
            set_path(&mut updated, path, value.clone())?;
        }
        for path in &update.unset {
            remove_path(&mut updated, path);
        }
        documents[index] = updated;

        Ok(true)
    }

    async fn delete_documents(&self, collection: &str, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(0);
        };

        match filter {
            Some(filter) => match position(documents, filter)? {
                Some(index) => {
                    documents.remove(index);
                    Ok(1)
                }
                None => Ok(0),
            },
            None => {
                let removed = documents.len() as u64;
                documents.clear();
                debug!(collection, removed, "cleared collection");
                Ok(removed)
            }
        }
    }
}

/// [`StoreBackendBuilder`] for [`InMemoryStore`]; building never fails.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use restlayer_core::{
        key::DocumentKey,
        patch::PatchOperation,
        query::{Filter, Projection, SortDirection},
        store::{AsStaticDocumentStore, DocumentStore, IntoDynDocumentStore, IntoStaticDocumentStore},
    };
    use serde_json::json;

    async fn seeded() -> DocumentStore<InMemoryStore> {
        let store = DocumentStore::new(InMemoryStore::builder().build().await.unwrap());
        let users = store.collection("users").unwrap();

        users.insert(doc! { "_id": "0001", "name": "Bob", "email": "bob@example.com", "age": 42 }).await.unwrap();
        users.insert(doc! { "name": "Judy", "email": "judy@example.com", "age": 35 }).await.unwrap();
        users.insert(doc! { "name": "Alice", "age": 35 }).await.unwrap();

        store
    }

    #[tokio::test]
    async fn generates_object_ids_first_in_the_document() {
        let store = InMemoryStore::new();
        let created = store.insert_document("users", doc! { "name": "Judy" }).await.unwrap();

        assert_eq!(created.keys().next().map(String::as_str), Some(KEY_FIELD));
        assert!(matches!(created.get(KEY_FIELD), Some(Bson::ObjectId(_))));
    }

    #[tokio::test]
    async fn rejects_duplicate_keys() {
        let store = seeded().await;
        let users = store.collection("users").unwrap();

        let err = users.insert(doc! { "_id": "0001", "name": "Bobby" }).await.unwrap_err();

        assert!(matches!(err, DocumentStoreError::DocumentAlreadyExists(_, _)));
        assert_eq!(users.count(None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn counts_and_windows_sorted_queries() {
        let store = seeded().await;
        let users = store.collection("users").unwrap();
        let filter = Filter::eq("age", 35);

        assert_eq!(users.count(Some(&filter)).await.unwrap(), 2);

        let query = Query::builder()
            .sort("age", SortDirection::Asc)
            .sort("name", SortDirection::Desc)
            .offset(1)
            .limit(1)
            .projection(Projection::Include(vec!["name".into()]))
            .build();
        let page = users.find(query).await.unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page[0].get_str("name").unwrap(), "Alice");
        assert!(page[0].contains_key(KEY_FIELD));
        assert!(!page[0].contains_key("age"));
    }

    #[tokio::test]
    async fn unsorted_queries_keep_insertion_order() {
        let store = seeded().await;
        let names = store
            .collection("users")
            .unwrap()
            .find(Query::new())
            .await
            .unwrap()
            .iter()
            .map(|d| d.get_str("name").unwrap().to_string())
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["Bob", "Judy", "Alice"]);
    }

    #[tokio::test]
    async fn upserts_under_the_requested_key() {
        let store = InMemoryStore::new();
        let key = DocumentKey::parse("0002");

        let replaced = store
            .replace_document("users", &key.filter(), doc! { "_id": "0002", "name": "Ann" }, false)
            .await
            .unwrap();
        assert!(!replaced);
        assert!(!store.collections.read().await.contains_key("users"));

        store
            .replace_document("users", &key.filter(), doc! { "_id": "0002", "name": "Ann" }, true)
            .await
            .unwrap();
        store
            .replace_document("users", &key.filter(), doc! { "name": "Anna" }, true)
            .await
            .unwrap();

        let stored = store.find_document("users", &key.filter()).await.unwrap().unwrap();
        assert_eq!(stored, doc! { "_id": "0002", "name": "Anna" });
        assert_eq!(store.count_documents("users", None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn applies_translated_patches() {
        let store = seeded().await;
        let users = store.collection("users").unwrap();
        let filter = DocumentKey::parse("0001").filter();
        let update = Update::from_patch(&[
            PatchOperation::replace("/name", json!("Robert")),
            PatchOperation::add("/address/city", json!("Paris")),
            PatchOperation::remove("/email"),
        ])
        .unwrap();

        assert!(users.update(&filter, &update).await.unwrap());
        // Applying the same update again changes nothing.
        assert!(users.update(&filter, &update).await.unwrap());

        let bob = users.find_one(&filter).await.unwrap().unwrap();
        assert_eq!(bob, doc! { "_id": "0001", "name": "Robert", "age": 42, "address": { "city": "Paris" } });

        let missing = DocumentKey::parse("9999").filter();
        assert!(!users.update(&missing, &update).await.unwrap());
    }

    #[tokio::test]
    async fn deletes_one_or_all() {
        let store = seeded().await;
        let users = store.collection("users").unwrap();

        assert_eq!(users.delete_one(&DocumentKey::parse("0001").filter()).await.unwrap(), 1);
        assert_eq!(users.delete_one(&DocumentKey::parse("0001").filter()).await.unwrap(), 0);
        assert_eq!(users.delete_all().await.unwrap(), 2);
        assert_eq!(users.count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dynamic_store_round_trips_to_the_concrete_backend() {
        let store = seeded().await.into_dyn();

        assert_eq!(store.collection("users").unwrap().count(None).await.unwrap(), 3);
        assert!(store.backend_as::<InMemoryStore>().is_some());
        assert!(store.collection("system.users").is_err());

        let typed = store.into_static::<InMemoryStore>().unwrap();
        assert!(format!("{:?}", typed.backend()).starts_with("InMemoryStore"));
        typed.shutdown().await.unwrap();
    }
}
