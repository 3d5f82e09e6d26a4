//! Bookmark, comment, tag and like types.
//!
//! `Raw*` types mirror rows as the store hands them back: nullable columns
//! stay `Option`, moderation flags are still a comma-joined string. The
//! public shapes ([`Bookmark`], [`EnrichedBookmark`]) are produced by
//! [`crate::normalize`] and [`crate::enrich`] and are what callers serialise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// A timestamp column that may already be text or may be a typed instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawTimestamp {
  Text(String),
  At(DateTime<Utc>),
}

impl From<DateTime<Utc>> for RawTimestamp {
  fn from(dt: DateTime<Utc>) -> Self { Self::At(dt) }
}

/// A persisted bookmark with its nested comments and tag joins.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBookmark {
  /// AT-URI of the bookmark record; immutable primary key.
  pub uri:               String,
  pub did:               String,
  /// Denormalised owner handle; may be stale or missing.
  pub handle:            Option<String>,
  /// The bookmarked URL or AT-URI, exactly as written by the user.
  pub subject:           String,
  pub ogp_title:         Option<String>,
  pub ogp_description:   Option<String>,
  pub ogp_image:         Option<String>,
  pub category:          Option<String>,
  /// Comma-joined moderation flags.
  pub moderation_result: Option<String>,
  pub created_at:        RawTimestamp,
  pub indexed_at:        RawTimestamp,
  pub comments:          Vec<RawComment>,
  /// `None` when the join collection was not fetched.
  pub tags:              Option<Vec<RawBookmarkTag>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComment {
  pub lang:              String,
  pub title:             Option<String>,
  pub comment:           Option<String>,
  pub moderation_result: Option<String>,
}

/// One row of the bookmark ↔ tag join, with the tag resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBookmarkTag {
  pub tag: Tag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
  pub id:   i64,
  /// Stored case-preserving; matched case-insensitively.
  pub name: String,
}

/// The `(uri, subject)` projection used when reconciling subjects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRow {
  pub uri:     String,
  pub subject: String,
}

// ─── Likes ───────────────────────────────────────────────────────────────────

/// A like record. `subject` is either a URL or the AT-URI of a bookmark and is
/// not guaranteed to match any bookmark verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
  pub aturi:      String,
  pub subject:    String,
  pub did:        String,
  pub created_at: DateTime<Utc>,
}

// ─── Public shapes ───────────────────────────────────────────────────────────

/// Comment languages. Anything unrecognised is read back as [`Lang::Ja`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
  #[default]
  Ja,
  En,
}

impl Lang {
  pub fn from_tag(tag: &str) -> Self {
    match tag {
      "en" => Self::En,
      _ => Self::Ja,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
  pub lang:        Lang,
  pub title:       String,
  pub comment:     String,
  pub moderations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
  pub uri:             String,
  pub did:             String,
  pub handle:          String,
  pub subject:         String,
  pub ogp_title:       String,
  pub ogp_description: String,
  pub ogp_image:       String,
  pub comments:        Vec<Comment>,
  /// `"Verified"` first, everything else in join order.
  pub tags:            Vec<String>,
  pub category:        Option<String>,
  pub moderations:     Vec<String>,
  pub created_at:      String,
  pub indexed_at:      String,
}

/// A bookmark with its like list and the number of bookmarks sharing its
/// canonical subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedBookmark {
  #[serde(flatten)]
  pub bookmark:      Bookmark,
  /// AT-URIs of the like records attached to this bookmark.
  pub likes:         Vec<String>,
  /// Counts bookmarks, not comment rows.
  pub comment_count: u64,
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// Input to [`crate::store::IngestStore::put_bookmark`].
#[derive(Debug, Clone)]
pub struct BookmarkWrite {
  pub uri:             String,
  pub did:             String,
  /// `None` keeps whatever handle is already stored.
  pub handle:          Option<String>,
  pub subject:         String,
  pub ogp_title:       Option<String>,
  pub ogp_description: Option<String>,
  pub ogp_image:       Option<String>,
  pub category:        Option<String>,
  pub moderations:     Vec<String>,
  /// At most one per language; the stored set is reconciled to exactly this.
  pub comments:        Vec<CommentWrite>,
  /// Tag names; the stored join set is reconciled to exactly this.
  pub tags:            Vec<String>,
  pub created_at:      DateTime<Utc>,
  pub indexed_at:      DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CommentWrite {
  /// Stored verbatim; narrowed to [`Lang`] only on read.
  pub lang:        String,
  pub title:       Option<String>,
  pub comment:     Option<String>,
  pub moderations: Vec<String>,
}
