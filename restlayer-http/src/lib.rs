//! REST resources over the collections of a document store.
//!
//! [`router::RestApi`] maps `/{collection}` and `/{collection}/{id}` onto create,
//! read, replace, patch and delete operations of a [`restlayer_core::store::DynDocumentStore`].
//! List requests are filtered, sorted, projected and paginated through their query
//! string ([`query`]). Responses expose document keys as `id` and may be enveloped
//! under the collection name ([`shape`]). Validation and authorization plug in
//! through [`hooks`].
//!
//! The [`config`], [`observability`] and [`server`] modules run the API as a
//! standalone service.

pub mod config;
pub mod context;
pub mod error;
mod handlers;
pub mod hooks;
pub mod observability;
pub mod query;
pub mod router;
pub mod server;
pub mod shape;
pub mod singular;

pub use error::{RestError, ServiceError};
pub use router::{RestApi, RestApiBuilder};
