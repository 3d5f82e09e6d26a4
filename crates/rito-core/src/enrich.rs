//! Like and cross-post counts for a batch of bookmarks.
//!
//! Bookmark subjects and like subjects are both free-form, so neither side can
//! be joined verbatim. [`enrich`] fetches a superset of candidate bookmarks by
//! subject, discards the false positives by [`dedupe_key`], indexes the
//! survivors under every textual variant of their subject, and resolves each
//! like through that index.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{
  bookmark::{EnrichedBookmark, Like, RawBookmark, SubjectRow},
  canonical::{dedupe_key, is_http_url, trailing_slash_variants},
  normalize::normalize,
  store::RitoStore,
};

/// Normalise `raw` and attach likes and comment counts.
///
/// Runs two store queries in sequence. Store failures propagate unchanged;
/// nothing is partially filled in.
pub async fn enrich<S: RitoStore>(
  store: &S,
  raw: &[RawBookmark],
) -> Result<Vec<EnrichedBookmark>, S::Error> {
  let bookmarks = normalize(raw);
  if bookmarks.is_empty() {
    return Ok(Vec::new());
  }

  let exact: BTreeSet<String> = bookmarks
    .iter()
    .flat_map(|b| trailing_slash_variants(&b.subject))
    .collect();
  let bases: BTreeSet<String> =
    bookmarks.iter().map(|b| dedupe_key(&b.subject)).collect();

  let exact: Vec<String> = exact.into_iter().collect();
  let prefixes: Vec<String> = bases.iter().cloned().collect();
  let candidates = store.bookmarks_by_subject(&exact, &prefixes).await?;

  let index = SubjectIndex::build(candidates, &bases);

  let like_subjects = index.like_subjects();
  let likes = store.likes_by_subject(&like_subjects).await?;
  let likes_by_uri = index.attach(&likes);

  tracing::debug!(
    bookmarks = bookmarks.len(),
    related = index.uris.len(),
    likes = likes.len(),
    "enriched bookmarks"
  );

  Ok(
    bookmarks
      .into_iter()
      .map(|bookmark| {
        let comment_count = index.comment_count(&dedupe_key(&bookmark.subject));
        let likes = likes_by_uri.get(&bookmark.uri).cloned().unwrap_or_default();
        EnrichedBookmark { bookmark, likes, comment_count }
      })
      .collect(),
  )
}

// ─── Index ───────────────────────────────────────────────────────────────────

/// Related bookmarks, keyed two ways.
#[derive(Debug, Default)]
struct SubjectIndex {
  /// Dedupe key → distinct bookmark URIs sharing it.
  by_base:    HashMap<String, BTreeSet<String>>,
  /// Every slash variant of every subject and base → bookmark URIs.
  by_variant: HashMap<String, Vec<String>>,
  uris:       BTreeSet<String>,
}

impl SubjectIndex {
  /// Keep only rows whose dedupe key is one of `bases`; the prefix fetch
  /// also returns e.g. `/foo` for base `/fo`.
  fn build(rows: Vec<SubjectRow>, bases: &BTreeSet<String>) -> Self {
    let mut index = Self::default();

    for row in rows {
      let base = dedupe_key(&row.subject);
      if !bases.contains(&base) {
        continue;
      }

      let keys = trailing_slash_variants(&row.subject)
        .into_iter()
        .chain(trailing_slash_variants(&base));
      for key in keys {
        let uris = index.by_variant.entry(key).or_default();
        if !uris.contains(&row.uri) {
          uris.push(row.uri.clone());
        }
      }

      index.by_base.entry(base).or_default().insert(row.uri.clone());
      index.uris.insert(row.uri);
    }

    index
  }

  fn comment_count(&self, base: &str) -> u64 {
    self.by_base.get(base).map_or(0, |uris| uris.len() as u64)
  }

  /// Like subjects worth fetching: every URL variant plus every bookmark
  /// URI, for likes that point at a bookmark record directly.
  fn like_subjects(&self) -> Vec<String> {
    let subjects: BTreeSet<&String> =
      self.by_variant.keys().chain(self.uris.iter()).collect();
    subjects.into_iter().cloned().collect()
  }

  /// The bookmark URIs `like` credits.
  ///
  /// URL likes resolve through both slash variants. Any other like is keyed
  /// by its literal subject: it lands on a bookmark only when that subject
  /// is the bookmark's own URI. A like on an AT-URI that some bookmark
  /// merely references stays unattached.
  fn resolve(&self, like: &Like) -> BTreeSet<String> {
    if is_http_url(&like.subject) {
      return trailing_slash_variants(&like.subject)
        .iter()
        .filter_map(|variant| self.by_variant.get(variant))
        .flatten()
        .cloned()
        .collect();
    }
    BTreeSet::from([like.subject.clone()])
  }

  /// Bookmark URI → like AT-URIs, deduplicated, in fetch order.
  fn attach(&self, likes: &[Like]) -> HashMap<String, Vec<String>> {
    let mut attached: HashMap<String, Vec<String>> = HashMap::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();

    for like in likes {
      for uri in self.resolve(like) {
        if seen.insert((uri.clone(), like.aturi.clone())) {
          attached.entry(uri).or_default().push(like.aturi.clone());
        }
      }
    }

    attached
  }
}
