//! Store traits.
//!
//! Read paths in this crate take the store as an explicit argument; there is
//! no process-wide client. Backends (e.g. `rito-store-sqlite`) implement
//! [`RitoStore`] for reads and [`IngestStore`] for the event-stream writer.
//!
//! All methods return `Send` futures so the traits can be used behind
//! `axum` on a multi-threaded tokio runtime.

use std::future::Future;

use crate::{
  bookmark::{BookmarkWrite, Like, RawBookmark, SubjectRow},
  filter::{BookmarkFilter, PageRequest, SortOrder},
};

// ─── Reads ───────────────────────────────────────────────────────────────────

pub trait RitoStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Bookmarks ─────────────────────────────────────────────────────────

  /// Bookmarks whose `subject` equals one of `exact` or starts with one of
  /// `prefixes` (case-sensitive). Each matching row is returned once.
  fn bookmarks_by_subject<'a>(
    &'a self,
    exact: &'a [String],
    prefixes: &'a [String],
  ) -> impl Future<Output = Result<Vec<SubjectRow>, Self::Error>> + Send + 'a;

  /// Full rows, with comments and tags, for the given URIs. Unknown URIs are
  /// skipped; order is unspecified.
  fn bookmarks_by_uri<'a>(
    &'a self,
    uris: &'a [String],
  ) -> impl Future<Output = Result<Vec<RawBookmark>, Self::Error>> + Send + 'a;

  /// One page of bookmarks matching `filter`.
  fn list_bookmarks<'a>(
    &'a self,
    filter: &'a BookmarkFilter,
    sort: SortOrder,
    page: PageRequest,
  ) -> impl Future<Output = Result<Vec<RawBookmark>, Self::Error>> + Send + 'a;

  /// Total number of bookmarks matching `filter`, independent of paging.
  fn count_bookmarks<'a>(
    &'a self,
    filter: &'a BookmarkFilter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  // ── Likes ─────────────────────────────────────────────────────────────

  /// Likes whose `subject` is exactly one of `subjects`.
  fn likes_by_subject<'a>(
    &'a self,
    subjects: &'a [String],
  ) -> impl Future<Output = Result<Vec<Like>, Self::Error>> + Send + 'a;

  // ── Social graph ──────────────────────────────────────────────────────

  /// DIDs that `observer_did` follows.
  fn following<'a>(
    &'a self,
    observer_did: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// DIDs that follow `target_did`.
  fn followers<'a>(
    &'a self,
    target_did: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// The write side, driven by [`crate::ingest`].
pub trait IngestStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Upsert a bookmark and reconcile its comments and tag joins to exactly
  /// the sets in `write`. Tags are created on first use and never deleted.
  fn put_bookmark(
    &self,
    write: BookmarkWrite,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete a bookmark with its comments and tag joins. Missing URIs are a
  /// no-op.
  fn delete_bookmark<'a>(
    &'a self,
    uri: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn put_like(
    &self,
    like: Like,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_like<'a>(
    &'a self,
    aturi: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Refresh the denormalised handle on every bookmark owned by `did`.
  fn update_handle<'a>(
    &'a self,
    did: &'a str,
    handle: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Upsert the follow edge recorded at `uri`. Re-putting a URI moves the
  /// edge to the new target.
  fn put_follow<'a>(
    &'a self,
    uri: &'a str,
    observer_did: &'a str,
    target_did: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove the follow edge recorded at `uri`. Missing URIs are a no-op.
  fn delete_follow<'a>(
    &'a self,
    uri: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Replace the follow edges of `observer_did` with exactly `targets`, as
  /// a periodic sync from a snapshot of the observer's follows.
  fn replace_follows<'a>(
    &'a self,
    observer_did: &'a str,
    targets: &'a [String],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
