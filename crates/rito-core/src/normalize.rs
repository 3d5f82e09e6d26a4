//! Mapping raw bookmark rows into the public [`Bookmark`] shape.
//!
//! Total and pure: nullable columns are defaulted, nothing is rejected.

use chrono::SecondsFormat;

use crate::bookmark::{
  Bookmark, Comment, Lang, RawBookmark, RawBookmarkTag, RawComment,
  RawTimestamp,
};

/// OGP title and description are cut to this many UTF-16 code units.
pub const MAX_OGP_LEN: usize = 255;

/// The tag that always sorts first.
pub const VERIFIED_TAG: &str = "Verified";

pub fn normalize(raw: &[RawBookmark]) -> Vec<Bookmark> {
  raw.iter().map(normalize_one).collect()
}

pub fn normalize_one(raw: &RawBookmark) -> Bookmark {
  Bookmark {
    uri:             raw.uri.clone(),
    did:             raw.did.clone(),
    handle:          raw.handle.clone().unwrap_or_default(),
    subject:         raw.subject.clone(),
    ogp_title:       truncate_utf16(
      raw.ogp_title.as_deref().unwrap_or_default(),
      MAX_OGP_LEN,
    ),
    ogp_description: truncate_utf16(
      raw.ogp_description.as_deref().unwrap_or_default(),
      MAX_OGP_LEN,
    ),
    ogp_image:       raw.ogp_image.clone().unwrap_or_default(),
    comments:        raw.comments.iter().map(normalize_comment).collect(),
    tags:            tag_names(raw.tags.as_deref()),
    category:        raw.category.clone(),
    moderations:     split_moderations(raw.moderation_result.as_deref()),
    created_at:      format_timestamp(&raw.created_at),
    indexed_at:      format_timestamp(&raw.indexed_at),
  }
}

fn normalize_comment(raw: &RawComment) -> Comment {
  Comment {
    lang:        Lang::from_tag(&raw.lang),
    title:       raw.title.clone().unwrap_or_default(),
    comment:     raw.comment.clone().unwrap_or_default(),
    moderations: split_moderations(raw.moderation_result.as_deref()),
  }
}

/// Split a comma-joined moderation column, trimming each flag.
///
/// An empty (but present) column yields a single empty flag.
pub fn split_moderations(stored: Option<&str>) -> Vec<String> {
  match stored {
    None => Vec::new(),
    Some(s) => s.split(',').map(|m| m.trim().to_owned()).collect(),
  }
}

fn tag_names(joins: Option<&[RawBookmarkTag]>) -> Vec<String> {
  let mut names: Vec<String> = joins
    .unwrap_or_default()
    .iter()
    .map(|j| j.tag.name.clone())
    .collect();
  // Stable: non-verified tags keep their join order.
  names.sort_by_key(|name| name != VERIFIED_TAG);
  names
}

/// ISO 8601 UTC with millisecond precision (`YYYY-MM-DDTHH:mm:ss.sssZ`).
pub fn format_timestamp(ts: &RawTimestamp) -> String {
  match ts {
    RawTimestamp::Text(s) => s.clone(),
    RawTimestamp::At(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
  }
}

/// Keep at most `max` UTF-16 code units.
///
/// A surrogate pair straddling the limit is dropped whole, since a `String`
/// cannot hold half of one.
pub fn truncate_utf16(s: &str, max: usize) -> String {
  let mut units = 0;
  for (idx, ch) in s.char_indices() {
    units += ch.len_utf16();
    if units > max {
      return s[..idx].to_owned();
    }
  }
  s.to_owned()
}
