//! Encoding and decoding helpers between Rito types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 with millisecond precision and a `Z`
//! suffix, so lexical order on the column is chronological order.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use rito_core::bookmark::{
  Like, RawBookmark, RawBookmarkTag, RawComment, RawTimestamp, Tag,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Moderation flags ────────────────────────────────────────────────────────

/// The column holds a comma-joined list; an empty list is stored as NULL.
pub fn encode_moderations(flags: &[String]) -> Option<String> {
  if flags.is_empty() { None } else { Some(flags.join(",")) }
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// Column order of [`BOOKMARK_COLUMNS`].
pub struct BookmarkRow {
  pub uri:               String,
  pub did:               String,
  pub handle:            Option<String>,
  pub subject:           String,
  pub ogp_title:         Option<String>,
  pub ogp_description:   Option<String>,
  pub ogp_image:         Option<String>,
  pub category:          Option<String>,
  pub moderation_result: Option<String>,
  pub created_at:        String,
  pub indexed_at:        String,
}

pub const BOOKMARK_COLUMNS: &str = "b.uri, b.did, b.handle, b.subject, \
  b.ogp_title, b.ogp_description, b.ogp_image, b.category, \
  b.moderation_result, b.created_at, b.indexed_at";

impl BookmarkRow {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      uri:               row.get(0)?,
      did:               row.get(1)?,
      handle:            row.get(2)?,
      subject:           row.get(3)?,
      ogp_title:         row.get(4)?,
      ogp_description:   row.get(5)?,
      ogp_image:         row.get(6)?,
      category:          row.get(7)?,
      moderation_result: row.get(8)?,
      created_at:        row.get(9)?,
      indexed_at:        row.get(10)?,
    })
  }
}

/// A bookmark page as fetched: rows plus their comments and tag joins keyed
/// by bookmark URI.
pub struct BookmarkBatch {
  pub rows:     Vec<BookmarkRow>,
  pub comments: HashMap<String, Vec<RawComment>>,
  pub tags:     HashMap<String, Vec<RawBookmarkTag>>,
}

impl BookmarkBatch {
  /// Assemble [`RawBookmark`]s, preserving row order.
  pub fn into_raw(mut self) -> Result<Vec<RawBookmark>> {
    self
      .rows
      .into_iter()
      .map(|row| {
        Ok(RawBookmark {
          comments:          self.comments.remove(&row.uri).unwrap_or_default(),
          tags:              Some(self.tags.remove(&row.uri).unwrap_or_default()),
          created_at:        RawTimestamp::At(decode_dt(&row.created_at)?),
          indexed_at:        RawTimestamp::At(decode_dt(&row.indexed_at)?),
          uri:               row.uri,
          did:               row.did,
          handle:            row.handle,
          subject:           row.subject,
          ogp_title:         row.ogp_title,
          ogp_description:   row.ogp_description,
          ogp_image:         row.ogp_image,
          category:          row.category,
          moderation_result: row.moderation_result,
        })
      })
      .collect()
  }
}

pub struct CommentRow {
  pub bookmark_uri: String,
  pub comment:      RawComment,
}

pub struct TagRow {
  pub bookmark_uri: String,
  pub tag:          Tag,
}

pub struct LikeRow {
  pub aturi:      String,
  pub subject:    String,
  pub did:        String,
  pub created_at: String,
}

impl LikeRow {
  pub fn into_like(self) -> Result<Like> {
    Ok(Like {
      created_at: decode_dt(&self.created_at)?,
      aturi:      self.aturi,
      subject:    self.subject,
      did:        self.did,
    })
  }
}
