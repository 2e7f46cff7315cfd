use std::sync::Arc;

use restlayer::{
    memory::InMemoryStore,
    prelude::*,
    http::{
        ServiceError,
        config::{Config, StoreKind},
        observability::init_tracing,
        server::{Server, app},
    },
};

async fn open_store(config: &Config) -> Result<DynDocumentStore, ServiceError> {
    match config.store.backend {
        StoreKind::Memory => Ok(DocumentStore::new(InMemoryStore::builder().build().await?).into_dyn()),
        #[cfg(feature = "mongodb")]
        StoreKind::Mongodb => {
            use restlayer::mongodb::MongoDbStore;

            let backend = MongoDbStore::builder(&config.store.url, &config.store.database)
                .build()
                .await?;

            Ok(DocumentStore::new(backend).into_dyn())
        }
        #[cfg(not(feature = "mongodb"))]
        StoreKind::Mongodb => Err(ServiceError::Store(DocumentStoreError::Initialization(
            "restlayer was built without the mongodb feature".into(),
        ))),
    }
}

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    let config = Config::load()?;
    init_tracing(&config)?;

    let store = Arc::new(open_store(&config).await?);
    tracing::info!(backend = ?config.store.backend, "Document store ready");

    let api = RestApi::builder(store.clone())
        .envelope(config.api.envelope)
        .pagination(config.api.pagination_policy())
        .build();
    let router = app(api, &config.api);

    Server::new(config).serve(router).await?;

    match Arc::try_unwrap(store) {
        Ok(store) => store.shutdown().await?,
        Err(_) => tracing::warn!("Document store still in use, skipping shutdown"),
    }

    Ok(())
}
