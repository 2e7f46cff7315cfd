//! Convenient re-exports of commonly used types from restlayer.
//!
//! ```ignore
//! use restlayer::prelude::*;
//! ```

pub use restlayer_core::{
    backend::{DynStoreBackend, StoreBackend, StoreBackendBuilder},
    collection::{Collection, DynCollection},
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    key::DocumentKey,
    page::{PageLinks, PageWindow},
    patch::{PatchOp, PatchOperation, Update},
    query::{Expr, FieldOp, Filter, Projection, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    store::{AsStaticDocumentStore, DocumentStore, DynDocumentStore, IntoDynDocumentStore, IntoStaticDocumentStore},
};

pub use restlayer_http::{
    RestApi, RestApiBuilder, RestError,
    hooks::{Authorizer, Operation, OperationRequest, PermitAll, RequestValidator},
    query::{Pagination, PaginationStyle},
};
