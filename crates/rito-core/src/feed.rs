//! Composed read paths served to callers.
//!
//! Each function runs its store queries strictly one after another and
//! returns fully enriched bookmarks.

use serde::{Deserialize, Serialize};

use crate::{
  bookmark::EnrichedBookmark,
  canonical::{dedupe_key, trailing_slash_variants},
  enrich::enrich,
  filter::{LatestQuery, PageInfo, build_filter},
  store::RitoStore,
};

/// One page of the latest-bookmarks listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestPage {
  pub bookmarks: Vec<EnrichedBookmark>,
  #[serde(flatten)]
  pub page_info: PageInfo,
}

/// Filter, page, count and enrich.
pub async fn latest_bookmarks<S: RitoStore>(
  store: &S,
  query: &LatestQuery,
) -> Result<LatestPage, S::Error> {
  let filter = build_filter(store, query).await?;
  let page = query.page_request();

  let raw = store.list_bookmarks(&filter, query.sort, page).await?;
  let total_count = store.count_bookmarks(&filter).await?;
  let bookmarks = enrich(store, &raw).await?;

  Ok(LatestPage { bookmarks, page_info: PageInfo::new(total_count, page) })
}

pub async fn bookmark_by_uri<S: RitoStore>(
  store: &S,
  uri: &str,
) -> Result<Option<EnrichedBookmark>, S::Error> {
  let raw = store.bookmarks_by_uri(&[uri.to_owned()]).await?;
  if raw.is_empty() {
    return Ok(None);
  }
  Ok(enrich(store, &raw).await?.into_iter().next())
}

/// Every bookmark whose subject resolves to the same key as `url`, newest
/// first.
pub async fn bookmarks_for_subject<S: RitoStore>(
  store: &S,
  url: &str,
) -> Result<Vec<EnrichedBookmark>, S::Error> {
  let base = dedupe_key(url);
  let exact = trailing_slash_variants(url);
  let prefixes = [base.clone()];

  let uris: Vec<String> = store
    .bookmarks_by_subject(&exact, &prefixes)
    .await?
    .into_iter()
    .filter(|row| dedupe_key(&row.subject) == base)
    .map(|row| row.uri)
    .collect();
  if uris.is_empty() {
    return Ok(Vec::new());
  }

  let raw = store.bookmarks_by_uri(&uris).await?;
  let mut bookmarks = enrich(store, &raw).await?;
  bookmarks.sort_by(|a, b| b.bookmark.created_at.cmp(&a.bookmark.created_at));

  tracing::debug!(%base, found = bookmarks.len(), "bookmarks for subject");
  Ok(bookmarks)
}
