//! JSON read API for Rito.
//!
//! Exposes an axum [`Router`] backed by any [`rito_core::store::RitoStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rito_api::api_router(store.clone(), 12))
//! ```

pub mod bookmarks;
pub mod error;

use std::sync::Arc;

use axum::{Router, routing::get};
use rito_core::store::RitoStore;

pub use error::ApiError;

/// Shared handler state.
pub struct ApiState<S> {
  pub store:     Arc<S>,
  /// Used when a listing request carries no usable `page_size`.
  pub page_size: u32,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), page_size: self.page_size }
  }
}

/// Build the API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, page_size: u32) -> Router<()>
where
  S: RitoStore + 'static,
{
  Router::new()
    .route("/bookmarks", get(bookmarks::list::<S>))
    .route("/bookmark", get(bookmarks::get_one::<S>))
    .route("/subject", get(bookmarks::for_subject::<S>))
    .with_state(ApiState { store, page_size })
}
