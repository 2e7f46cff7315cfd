use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions},
};
use tracing::{debug, info};

use restlayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    key::KEY_FIELD,
    patch::Update,
    query::{Expr, Query},
};

use crate::query::MongoQueryTranslator;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    fn handle(&self, name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(name)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

fn backend_error(err: MongoError) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

fn write_error(err: MongoError, document: &Document, collection: &str) -> DocumentStoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY => {
            DocumentStoreError::DocumentAlreadyExists(
                document
                    .get(KEY_FIELD)
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                collection.to_string(),
            )
        }
        _ => backend_error(err),
    }
}

/// Builds the update document for a translated patch.
fn update_modifications(update: &Update) -> Document {
    let mut document = Document::new();

    if !update.set.is_empty() {
        document.insert("$set", update.set.clone());
    }
    if !update.unset.is_empty() {
        document.insert(
            "$unset",
            update.unset
                .iter()
                .map(|path| (path.clone(), Bson::String(String::new())))
                .collect::<Document>(),
        );
    }

    document
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn count_documents(&self, collection: &str, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        self.handle(collection)
            .count_documents(MongoQueryTranslator::filter(filter)?)
            .await
            .map_err(backend_error)
    }

    async fn find_documents(&self, collection: &str, query: Query) -> DocumentStoreResult<Vec<Document>> {
        let mut options = FindOptions::default();

        options.limit = MongoQueryTranslator::window_bound("limit", query.limit)?;
        MongoQueryTranslator::window_bound("offset", query.offset)?;
        options.skip = query.offset;
        options.sort = MongoQueryTranslator::sort(&query.sort);
        options.projection = query.projection.as_ref().map(MongoQueryTranslator::projection);

        self.handle(collection)
            .find(MongoQueryTranslator::filter(query.filter.as_ref())?)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn find_document(&self, collection: &str, filter: &Expr) -> DocumentStoreResult<Option<Document>> {
        self.handle(collection)
            .find_one(MongoQueryTranslator::filter(Some(filter))?)
            .await
            .map_err(backend_error)
    }

    async fn insert_document(&self, collection: &str, document: Document) -> DocumentStoreResult<Document> {
        // The key is generated client side so the stored document can be returned as is.
        let document = if document.contains_key(KEY_FIELD) {
            document
        } else {
            let mut keyed = doc! { KEY_FIELD: ObjectId::new() };
            for (field, value) in document {
                keyed.insert(field, value);
            }
            keyed
        };

        self.handle(collection)
            .insert_one(&document)
            .await
            .map_err(|e| write_error(e, &document, collection))?;
        debug!(collection, "inserted document");

        Ok(document)
    }

    async fn replace_document(
        &self,
        collection: &str,
        filter: &Expr,
        document: Document,
        upsert: bool,
    ) -> DocumentStoreResult<bool> {
        let result = self.handle(collection)
            .replace_one(MongoQueryTranslator::filter(Some(filter))?, &document)
            .upsert(upsert)
            .await
            .map_err(|e| write_error(e, &document, collection))?;

        Ok(result.matched_count > 0 || result.upserted_id.is_some())
    }

    async fn update_document(
        &self,
        collection: &str,
        filter: &Expr,
        update: &Update,
    ) -> DocumentStoreResult<bool> {
        let filter = MongoQueryTranslator::filter(Some(filter))?;

        if update.is_empty() {
            return Ok(self.handle(collection)
                .find_one(filter)
                .await
                .map_err(backend_error)?
                .is_some());
        }

        let result = self.handle(collection)
            .update_one(filter, update_modifications(update))
            .await
            .map_err(backend_error)?;

        Ok(result.matched_count > 0)
    }

    async fn delete_documents(&self, collection: &str, filter: Option<&Expr>) -> DocumentStoreResult<u64> {
        let handle = self.handle(collection);
        let result = match filter {
            Some(filter) => handle.delete_one(MongoQueryTranslator::filter(Some(filter))?).await,
            None => handle.delete_many(doc! {}).await,
        }
        .map_err(backend_error)?;

        Ok(result.deleted_count)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdown().await
    }
}

pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
        }
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;
        let client = Client::with_options(options)
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        info!(database = %self.database, "connected mongodb client");

        Ok(MongoDbStore::new(client, self.database))
    }
}
