//! Listing filters: tags, handles, owner, social-graph scope and paging.
//!
//! [`build_filter`] turns caller-supplied query parameters into a
//! [`BookmarkFilter`], which backends translate into their own predicate. The
//! same filter value is used for both the page query and the count query.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::store::RitoStore;

pub const DEFAULT_PAGE_SIZE: u32 = 12;

/// Prefix marking a tag or handle as excluded.
const EXCLUDE_PREFIX: char = '-';

// ─── Parameters ──────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Serialize,
  Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
  /// Newest `created_at` first.
  #[default]
  Created,
  /// Newest `indexed_at` first.
  Updated,
}

impl SortOrder {
  /// Anything other than `"updated"` sorts by creation time.
  pub fn parse_lenient(value: Option<&str>) -> Self {
    value.and_then(|v| v.parse().ok()).unwrap_or_default()
  }
}

/// Social-graph scope, seen from the requesting actor.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
  /// Accounts the actor follows.
  Following,
  /// Accounts following the actor.
  Followers,
  /// Both of the above.
  Mutual,
}

impl Relationship {
  /// Unrecognised values mean "no relationship filter".
  pub fn parse_lenient(value: Option<&str>) -> Option<Self> {
    value.and_then(|v| v.parse().ok())
  }
}

/// Parameters of a latest-bookmarks listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestQuery {
  /// `name` must be present, `-name` must be absent.
  pub tags:         Vec<String>,
  /// `handle` allowed, `-handle` excluded.
  pub handles:      Vec<String>,
  /// A DID (`did:...`) or, failing that, a handle.
  pub did:          Option<String>,
  /// The observer for `relationship`; without one it is ignored.
  pub actor:        Option<String>,
  pub relationship: Option<Relationship>,
  pub sort:         SortOrder,
  /// 1-indexed.
  pub page:         u32,
  pub page_size:    u32,
}

impl Default for LatestQuery {
  fn default() -> Self {
    Self {
      tags:         Vec::new(),
      handles:      Vec::new(),
      did:          None,
      actor:        None,
      relationship: None,
      sort:         SortOrder::default(),
      page:         1,
      page_size:    DEFAULT_PAGE_SIZE,
    }
  }
}

impl LatestQuery {
  pub fn page_request(&self) -> PageRequest {
    PageRequest::new(self.page, self.page_size)
  }
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Exact owner match chosen by the shape of the `did` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Owner {
  Did(String),
  Handle(String),
}

/// A backend-neutral bookmark predicate. Every populated field is AND-ed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkFilter {
  /// Lower-cased; the bookmark must carry every one of these.
  pub required_tags:    Vec<String>,
  /// Lower-cased; the bookmark must carry none of these.
  pub excluded_tags:    Vec<String>,
  /// When non-empty, the owner handle must be one of these.
  pub handles:          Vec<String>,
  pub excluded_handles: Vec<String>,
  pub owner:            Option<Owner>,
  /// Relationship scope: when set, the owner DID must be one of these.
  pub dids:             Option<BTreeSet<String>>,
}

impl BookmarkFilter {
  /// The parts of the filter that need no store access.
  pub fn from_query(query: &LatestQuery) -> Self {
    let (required, excluded) = split_exclusions(&query.tags);
    let (handles, excluded_handles) = split_exclusions(&query.handles);

    let owner = query.did.as_deref().filter(|d| !d.is_empty()).map(|d| {
      if d.starts_with("did") {
        Owner::Did(d.to_owned())
      } else {
        Owner::Handle(d.to_owned())
      }
    });

    Self {
      required_tags: required.iter().map(|t| fold_tag(t)).collect(),
      excluded_tags: excluded.iter().map(|t| fold_tag(t)).collect(),
      handles,
      excluded_handles,
      owner,
      dids: None,
    }
  }
}

/// The case-folded form tag names are compared in. Stores must fold stored
/// names with this same function.
pub fn fold_tag(name: &str) -> String { name.to_lowercase() }

/// Partition entries into `(included, excluded)` by the `-` prefix. Empty
/// entries, including a bare `-`, are dropped.
pub fn split_exclusions(entries: &[String]) -> (Vec<String>, Vec<String>) {
  let mut included = Vec::new();
  let mut excluded = Vec::new();
  for entry in entries {
    match entry.strip_prefix(EXCLUDE_PREFIX) {
      Some(rest) if !rest.is_empty() => excluded.push(rest.to_owned()),
      Some(_) => {}
      None if !entry.is_empty() => included.push(entry.clone()),
      None => {}
    }
  }
  (included, excluded)
}

/// Build the full filter for `query`, resolving the relationship scope
/// against the social graph when an actor is present.
pub async fn build_filter<S: RitoStore>(
  store: &S,
  query: &LatestQuery,
) -> Result<BookmarkFilter, S::Error> {
  let mut filter = BookmarkFilter::from_query(query);

  if let (Some(actor), Some(relationship)) =
    (query.actor.as_deref(), query.relationship)
  {
    filter.dids = Some(relationship_scope(store, actor, relationship).await?);
  }

  tracing::debug!(?filter, "built bookmark filter");
  Ok(filter)
}

/// DIDs visible under `relationship` for `actor`, always including the actor.
pub async fn relationship_scope<S: RitoStore>(
  store: &S,
  actor: &str,
  relationship: Relationship,
) -> Result<BTreeSet<String>, S::Error> {
  let mut dids: BTreeSet<String> = match relationship {
    Relationship::Following => {
      store.following(actor).await?.into_iter().collect()
    }
    Relationship::Followers => {
      store.followers(actor).await?.into_iter().collect()
    }
    Relationship::Mutual => {
      let following: BTreeSet<String> =
        store.following(actor).await?.into_iter().collect();
      let followers: BTreeSet<String> =
        store.followers(actor).await?.into_iter().collect();
      following.intersection(&followers).cloned().collect()
    }
  };
  dids.insert(actor.to_owned());
  Ok(dids)
}

// ─── Paging ──────────────────────────────────────────────────────────────────

/// A validated page window; only [`PageRequest::new`] builds one, so the
/// page is at least 1 and the size is never 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
  page:      u32,
  page_size: u32,
}

impl PageRequest {
  /// Page 0 becomes 1; a page size of 0 becomes [`DEFAULT_PAGE_SIZE`].
  pub fn new(page: u32, page_size: u32) -> Self {
    Self {
      page:      page.max(1),
      page_size: if page_size == 0 { DEFAULT_PAGE_SIZE } else { page_size },
    }
  }

  /// 1-indexed.
  pub fn page(&self) -> u32 { self.page }

  pub fn page_size(&self) -> u32 { self.page_size }

  pub fn skip(&self) -> u64 {
    u64::from(self.page - 1) * u64::from(self.page_size)
  }

  pub fn take(&self) -> u64 { u64::from(self.page_size) }
}

/// Paging metadata for infinite scroll. `total_count` comes from a separate
/// count query, never from the length of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
  pub page:        u32,
  pub page_size:   u32,
  pub total_count: u64,
  pub total_pages: u64,
  pub has_more:    bool,
}

impl PageInfo {
  pub fn new(total_count: u64, request: PageRequest) -> Self {
    let total_pages = total_count.div_ceil(u64::from(request.page_size()));
    Self {
      page: request.page(),
      page_size: request.page_size(),
      total_count,
      total_pages,
      has_more: u64::from(request.page()) < total_pages,
    }
  }
}
