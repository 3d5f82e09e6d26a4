//! Handlers for the bookmark read endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/bookmarks` | Filtered, paged listing; see [`ListParams`] |
//! | `GET`  | `/bookmark`  | `?uri=<at-uri>`; 404 if not found |
//! | `GET`  | `/subject`   | `?url=<url>`; every bookmark of that page |
//!
//! Every bookmark is returned enriched with its likes and comment count.

use axum::{
  Json,
  extract::{Query, State},
};
use rito_core::{
  bookmark::EnrichedBookmark,
  feed::{self, LatestPage},
  filter::{LatestQuery, Relationship, SortOrder},
  store::RitoStore,
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// Query parameters of `GET /bookmarks`. Values that fail to parse fall back
/// to their defaults instead of rejecting the request.
#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  /// Comma-separated; `-name` excludes a tag.
  pub tag:          Option<String>,
  /// Comma-separated; `-handle` excludes an account.
  pub handle:       Option<String>,
  pub did:          Option<String>,
  pub actor:        Option<String>,
  /// `following`, `followers` or `mutual`.
  pub relationship: Option<String>,
  /// `created` (default) or `updated`.
  pub sort:         Option<String>,
  pub page:         Option<String>,
  pub page_size:    Option<String>,
}

impl ListParams {
  fn into_query(self, default_page_size: u32) -> LatestQuery {
    LatestQuery {
      tags:         split_list(self.tag.as_deref()),
      handles:      split_list(self.handle.as_deref()),
      did:          self.did,
      actor:        self.actor.filter(|a| !a.is_empty()),
      relationship: Relationship::parse_lenient(self.relationship.as_deref()),
      sort:         SortOrder::parse_lenient(self.sort.as_deref()),
      page:         parse_positive(self.page.as_deref()).unwrap_or(1),
      page_size:    parse_positive(self.page_size.as_deref())
        .unwrap_or(default_page_size),
    }
  }
}

fn split_list(value: Option<&str>) -> Vec<String> {
  value
    .map(|s| s.split(',').map(|t| t.trim().to_owned()).collect())
    .unwrap_or_default()
}

fn parse_positive(value: Option<&str>) -> Option<u32> {
  value.and_then(|v| v.trim().parse().ok()).filter(|n| *n > 0)
}

/// `GET /bookmarks[?tag=..][&handle=..][&did=..][&actor=..&relationship=..][&sort=..][&page=..][&page_size=..]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<LatestPage>, ApiError>
where
  S: RitoStore,
{
  let query = params.into_query(state.page_size);
  let page = feed::latest_bookmarks(state.store.as_ref(), &query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(page))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UriParams {
  pub uri: Option<String>,
}

/// `GET /bookmark?uri=<at-uri>`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<UriParams>,
) -> Result<Json<EnrichedBookmark>, ApiError>
where
  S: RitoStore,
{
  let uri = required(params.uri, "uri")?;
  feed::bookmark_by_uri(state.store.as_ref(), &uri)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("bookmark {uri}")))
}

// ─── By subject ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubjectParams {
  pub url: Option<String>,
}

/// `GET /subject?url=<url>`
pub async fn for_subject<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<SubjectParams>,
) -> Result<Json<Vec<EnrichedBookmark>>, ApiError>
where
  S: RitoStore,
{
  let url = required(params.url, "url")?;
  let bookmarks = feed::bookmarks_for_subject(state.store.as_ref(), &url)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(bookmarks))
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
  value
    .filter(|v| !v.is_empty())
    .ok_or_else(|| ApiError::BadRequest(format!("missing `{name}` parameter")))
}
