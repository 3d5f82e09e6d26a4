//! Core types and read-side algorithms for Rito.
//!
//! Bookmarks reference URLs (or AT-URIs) exactly as users typed them. Every
//! read path here reconciles those textual variants into a canonical key
//! space before counting, joining likes, or filtering by the social graph.
//!
//! This crate is free of HTTP and database dependencies; storage is injected
//! through the traits in [`store`].

// Native `async fn` in traits; see `store` for the `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod aturi;
pub mod bookmark;
pub mod canonical;
pub mod enrich;
pub mod error;
pub mod feed;
pub mod filter;
pub mod ingest;
pub mod normalize;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
mod testing;
