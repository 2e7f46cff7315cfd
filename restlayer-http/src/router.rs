//! Resource routing.
//!
//! A [`RestApi`] serves every collection of a document store through two
//! endpoints, `/{collection}` and `/{collection}/{id}`. Collections are never
//! declared up front: any valid name in the path is bound on request.
//!
//! ```ignore
//! use std::sync::Arc;
//! use restlayer_http::router::RestApi;
//!
//! let app = RestApi::builder(Arc::new(store))
//!     .envelope(true)
//!     .default_limit(50)
//!     .build()
//!     .into_router();
//! ```

use std::{fmt, sync::Arc};

use axum::{Router, routing::any};
use restlayer_core::store::DynDocumentStore;

use crate::{
    handlers::{collection_endpoint, document_endpoint},
    hooks::{Authorizer, PermitAll, RequestValidator},
    query::{Pagination, PaginationStyle},
    singular::singularize,
};

/// Derives a collection's singular name from its plural one.
pub type Singularize = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Methods served by the collection endpoint.
pub const COLLECTION_METHODS: &str = "GET, HEAD, POST, DELETE";

/// Methods served by the document endpoint.
pub const DOCUMENT_METHODS: &str = "GET, HEAD, PUT, PATCH, DELETE";

/// A REST interface over every collection of a document store.
pub struct RestApi {
    pub(crate) store: Arc<DynDocumentStore>,
    pub(crate) envelope: bool,
    pub(crate) pagination: Pagination,
    pub(crate) singularize: Singularize,
    pub(crate) validator: Arc<dyn RequestValidator>,
    pub(crate) authorizer: Arc<dyn Authorizer>,
}

impl RestApi {
    pub fn builder(store: Arc<DynDocumentStore>) -> RestApiBuilder {
        RestApiBuilder::new(store)
    }

    /// The shared store handle.
    pub fn store(&self) -> &Arc<DynDocumentStore> {
        &self.store
    }

    /// Builds the router serving the collection and document endpoints.
    pub fn into_router(self) -> Router {
        Router::new()
            .route("/{collection}", any(collection_endpoint))
            .route("/{collection}/{id}", any(document_endpoint))
            .with_state(Arc::new(self))
    }
}

impl fmt::Debug for RestApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestApi")
            .field("store", &self.store)
            .field("envelope", &self.envelope)
            .field("pagination", &self.pagination)
            .finish_non_exhaustive()
    }
}

pub struct RestApiBuilder {
    store: Arc<DynDocumentStore>,
    envelope: bool,
    pagination: Pagination,
    singularize: Singularize,
    validator: Arc<dyn RequestValidator>,
    authorizer: Arc<dyn Authorizer>,
}

impl RestApiBuilder {
    pub fn new(store: Arc<DynDocumentStore>) -> Self {
        Self {
            store,
            envelope: false,
            pagination: Pagination::default(),
            singularize: Arc::new(singularize),
            validator: Arc::new(PermitAll),
            authorizer: Arc::new(PermitAll),
        }
    }

    /// Envelopes responses unless a request opts out.
    pub fn envelope(mut self, envelope: bool) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn pagination_style(mut self, style: PaginationStyle) -> Self {
        self.pagination.style = style;
        self
    }

    pub fn default_limit(mut self, limit: u64) -> Self {
        self.pagination.default_limit = Some(limit);
        self
    }

    pub fn max_limit(mut self, limit: u64) -> Self {
        self.pagination.max_limit = Some(limit);
        self
    }

    /// Replaces the English singularization used to name single document envelopes.
    pub fn singularize<F>(mut self, singularize: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.singularize = Arc::new(singularize);
        self
    }

    pub fn validator<V: RequestValidator + 'static>(mut self, validator: V) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn authorizer<A: Authorizer + 'static>(mut self, authorizer: A) -> Self {
        self.authorizer = Arc::new(authorizer);
        self
    }

    pub fn build(self) -> RestApi {
        RestApi {
            store: self.store,
            envelope: self.envelope,
            pagination: self.pagination,
            singularize: self.singularize,
            validator: self.validator,
            authorizer: self.authorizer,
        }
    }
}
