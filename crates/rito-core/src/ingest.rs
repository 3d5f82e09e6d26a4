//! Applying event-stream records to an [`IngestStore`].
//!
//! Events follow the Jetstream JSON shape: a repository commit
//! (`create`/`update`/`delete` of one record) or an identity change. Only the
//! bookmark, like and follow collections are stored; everything else is
//! skipped.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use strum::Display;

use crate::{
  Error, Result,
  aturi::AtUri,
  bookmark::{BookmarkWrite, CommentWrite, Like},
  store::IngestStore,
};

pub const BOOKMARK_COLLECTION: &str = "blue.rito.feed.bookmark";
pub const LIKE_COLLECTION: &str = "blue.rito.feed.like";
/// Follow edges feed the social graph behind relationship filters.
pub const FOLLOW_COLLECTION: &str = "app.bsky.graph.follow";

// ─── Events ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
  pub did:      String,
  /// Event time in microseconds since the Unix epoch.
  pub time_us:  i64,
  /// `commit`, `identity`, `account`, ...
  pub kind:     String,
  pub commit:   Option<Commit>,
  pub identity: Option<Identity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Operation {
  Create,
  Update,
  Delete,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
  pub operation:  Operation,
  pub collection: String,
  pub rkey:       String,
  /// Absent on deletes.
  #[serde(default)]
  pub record:     Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Identity {
  pub did:    String,
  pub handle: Option<String>,
}

impl Event {
  pub fn from_json(line: &str) -> Result<Self> { Ok(serde_json::from_str(line)?) }

  /// Event time; falls back to now when `time_us` is out of range.
  pub fn time(&self) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(self.time_us).unwrap_or_else(Utc::now)
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkRecord {
  pub subject:         String,
  #[serde(default)]
  pub comments:        Vec<CommentRecord>,
  #[serde(default)]
  pub tags:            Vec<String>,
  pub ogp_title:       Option<String>,
  pub ogp_description: Option<String>,
  pub ogp_image:       Option<String>,
  pub created_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentRecord {
  pub lang:    String,
  pub title:   Option<String>,
  pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRecord {
  pub subject:    String,
  pub created_at: DateTime<Utc>,
}

/// `subject` is the followed DID.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRecord {
  pub subject:    String,
  pub created_at: Option<DateTime<Utc>>,
}

impl BookmarkRecord {
  /// Comments are keyed by language; a later duplicate replaces an earlier
  /// one. Tags are deduplicated keeping first occurrence.
  pub fn into_write(
    self,
    uri: String,
    did: String,
    indexed_at: DateTime<Utc>,
  ) -> BookmarkWrite {
    let mut comments: Vec<CommentWrite> = Vec::new();
    for c in self.comments {
      let write = CommentWrite {
        lang:        c.lang,
        title:       c.title,
        comment:     c.comment,
        moderations: Vec::new(),
      };
      match comments.iter_mut().find(|existing| existing.lang == write.lang) {
        Some(existing) => *existing = write,
        None => comments.push(write),
      }
    }

    let mut tags: Vec<String> = Vec::new();
    for tag in self.tags {
      if !tag.is_empty() && !tags.contains(&tag) {
        tags.push(tag);
      }
    }

    BookmarkWrite {
      uri,
      did,
      handle: None,
      subject: self.subject,
      ogp_title: self.ogp_title,
      ogp_description: self.ogp_description,
      ogp_image: self.ogp_image,
      category: None,
      moderations: Vec::new(),
      comments,
      tags,
      created_at: self.created_at,
      indexed_at,
    }
  }
}

// ─── Apply ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  Stored { uri: String },
  Deleted { uri: String },
  HandleUpdated { did: String },
  Skipped,
}

/// Apply one event. Unknown kinds and collections are [`Outcome::Skipped`];
/// a create or update without a decodable record is an error.
pub async fn apply_event<S>(store: &S, event: &Event) -> Result<Outcome, S::Error>
where
  S: IngestStore,
  S::Error: From<Error>,
{
  match event.kind.as_str() {
    "commit" => match &event.commit {
      Some(commit) => apply_commit(store, event, commit).await,
      None => Ok(Outcome::Skipped),
    },
    "identity" => match &event.identity {
      Some(Identity { did, handle: Some(handle) }) => {
        store.update_handle(did, handle).await?;
        Ok(Outcome::HandleUpdated { did: did.clone() })
      }
      _ => Ok(Outcome::Skipped),
    },
    _ => Ok(Outcome::Skipped),
  }
}

async fn apply_commit<S>(
  store: &S,
  event: &Event,
  commit: &Commit,
) -> Result<Outcome, S::Error>
where
  S: IngestStore,
  S::Error: From<Error>,
{
  let collection = commit.collection.as_str();
  if ![BOOKMARK_COLLECTION, LIKE_COLLECTION, FOLLOW_COLLECTION].contains(&collection) {
    return Ok(Outcome::Skipped);
  }
  let uri = AtUri::new(&event.did, collection, &commit.rkey).to_string();

  if commit.operation == Operation::Delete {
    match collection {
      BOOKMARK_COLLECTION => store.delete_bookmark(&uri).await?,
      LIKE_COLLECTION => store.delete_like(&uri).await?,
      _ => store.delete_follow(&uri).await?,
    }
    return Ok(Outcome::Deleted { uri });
  }

  let record = commit.record.clone().ok_or_else(|| Error::MissingRecord {
    operation: commit.operation.to_string(),
    uri:       uri.clone(),
  })?;

  match collection {
    BOOKMARK_COLLECTION => {
      let record: BookmarkRecord = decode(&uri, record)?;
      let write = record.into_write(uri.clone(), event.did.clone(), event.time());
      store.put_bookmark(write).await?;
    }
    LIKE_COLLECTION => {
      let record: LikeRecord = decode(&uri, record)?;
      store
        .put_like(Like {
          aturi:      uri.clone(),
          subject:    record.subject,
          did:        event.did.clone(),
          created_at: record.created_at,
        })
        .await?;
    }
    _ => {
      let record: FollowRecord = decode(&uri, record)?;
      store.put_follow(&uri, &event.did, &record.subject).await?;
    }
  }

  Ok(Outcome::Stored { uri })
}

fn decode<T: serde::de::DeserializeOwned>(
  uri: &str,
  record: serde_json::Value,
) -> Result<T> {
  serde_json::from_value(record).map_err(|source| Error::MalformedRecord {
    uri: uri.to_owned(),
    source,
  })
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{
    store::RitoStore,
    testing::{MemoryError, MemoryStore},
  };

  fn commit(
    operation: &str,
    collection: &str,
    rkey: &str,
    record: Option<serde_json::Value>,
  ) -> Event {
    let mut commit = json!({
      "rev": "3l",
      "operation": operation,
      "collection": collection,
      "rkey": rkey,
    });
    if let Some(record) = record {
      commit["record"] = record;
    }
    serde_json::from_value(json!({
      "did": "did:plc:alice",
      "time_us": 1_725_911_162_329_308_i64,
      "kind": "commit",
      "commit": commit,
    }))
    .unwrap()
  }

  fn bookmark_record(tags: &[&str], langs: &[&str]) -> serde_json::Value {
    json!({
      "$type": BOOKMARK_COLLECTION,
      "subject": "https://example.com/a",
      "tags": tags,
      "comments": langs
        .iter()
        .map(|l| json!({ "lang": l, "title": "t", "comment": format!("in {l}") }))
        .collect::<Vec<_>>(),
      "createdAt": "2024-09-09T19:46:02.102Z",
    })
  }

  #[tokio::test]
  async fn create_then_update_reconciles() {
    let store = MemoryStore::default();
    let uri = "at://did:plc:alice/blue.rito.feed.bookmark/3k";

    let created = commit(
      "create",
      BOOKMARK_COLLECTION,
      "3k",
      Some(bookmark_record(&["rust", "web"], &["ja", "en"])),
    );
    let outcome = apply_event(&store, &created).await.unwrap();
    assert_eq!(outcome, Outcome::Stored { uri: uri.into() });

    let updated = commit(
      "update",
      BOOKMARK_COLLECTION,
      "3k",
      Some(bookmark_record(&["rust"], &["en"])),
    );
    apply_event(&store, &updated).await.unwrap();

    let rows = store.bookmarks();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].uri, uri);
    assert_eq!(rows[0].comments.len(), 1);
    assert_eq!(rows[0].comments[0].lang, "en");
    let tags: Vec<&str> = rows[0]
      .tags
      .iter()
      .flatten()
      .map(|j| j.tag.name.as_str())
      .collect();
    assert_eq!(tags, ["rust"]);
  }

  #[tokio::test]
  async fn delete_removes_bookmark() {
    let store = MemoryStore::default();
    let created = commit(
      "create",
      BOOKMARK_COLLECTION,
      "3k",
      Some(bookmark_record(&[], &["ja"])),
    );
    apply_event(&store, &created).await.unwrap();
    apply_event(&store, &commit("delete", BOOKMARK_COLLECTION, "3k", None))
      .await
      .unwrap();
    assert!(store.bookmarks().is_empty());
  }

  #[tokio::test]
  async fn likes_are_stored_and_deleted() {
    let store = MemoryStore::default();
    let record = json!({ "subject": "https://example.com/a", "createdAt": "2024-09-09T19:46:02.102Z" });
    apply_event(&store, &commit("create", LIKE_COLLECTION, "l1", Some(record)))
      .await
      .unwrap();
    let likes = store.likes();
    assert_eq!(likes.len(), 1);
    assert_eq!(likes[0].aturi, "at://did:plc:alice/blue.rito.feed.like/l1");
    assert_eq!(likes[0].did, "did:plc:alice");

    apply_event(&store, &commit("delete", LIKE_COLLECTION, "l1", None))
      .await
      .unwrap();
    assert!(store.likes().is_empty());
  }

  #[tokio::test]
  async fn follows_feed_the_social_graph() {
    let store = MemoryStore::default();
    let record = |subject: &str| {
      json!({ "subject": subject, "createdAt": "2024-09-09T19:46:02.102Z" })
    };
    apply_event(&store, &commit("create", FOLLOW_COLLECTION, "f1", Some(record("did:plc:bob"))))
      .await
      .unwrap();
    apply_event(&store, &commit("create", FOLLOW_COLLECTION, "f2", Some(record("did:plc:carol"))))
      .await
      .unwrap();
    assert_eq!(store.following("did:plc:alice").await.unwrap(), [
      "did:plc:bob",
      "did:plc:carol"
    ]);
    assert_eq!(store.followers("did:plc:bob").await.unwrap(), ["did:plc:alice"]);

    // Updating a record moves its edge.
    apply_event(&store, &commit("update", FOLLOW_COLLECTION, "f1", Some(record("did:plc:dave"))))
      .await
      .unwrap();
    assert_eq!(store.following_now("did:plc:alice"), ["did:plc:carol", "did:plc:dave"]);

    let outcome = apply_event(&store, &commit("delete", FOLLOW_COLLECTION, "f2", None))
      .await
      .unwrap();
    assert_eq!(outcome, Outcome::Deleted {
      uri: "at://did:plc:alice/app.bsky.graph.follow/f2".into(),
    });
    assert_eq!(store.following_now("did:plc:alice"), ["did:plc:dave"]);
  }

  #[tokio::test]
  async fn other_collections_are_skipped() {
    let store = MemoryStore::default();
    let event = commit("create", "app.bsky.feed.post", "p", Some(json!({})));
    assert_eq!(apply_event(&store, &event).await.unwrap(), Outcome::Skipped);
  }

  #[tokio::test]
  async fn create_without_record_is_an_error() {
    let store = MemoryStore::default();
    let event = commit("create", BOOKMARK_COLLECTION, "3k", None);
    let err = apply_event(&store, &event).await.unwrap_err();
    assert!(matches!(err, MemoryError::Core(Error::MissingRecord { .. })));
  }

  #[tokio::test]
  async fn malformed_record_is_an_error() {
    let store = MemoryStore::default();
    let event = commit("create", BOOKMARK_COLLECTION, "3k", Some(json!({ "tags": [] })));
    let err = apply_event(&store, &event).await.unwrap_err();
    assert!(matches!(err, MemoryError::Core(Error::MalformedRecord { .. })));
  }

  #[tokio::test]
  async fn identity_updates_handle() {
    let store = MemoryStore::default();
    apply_event(
      &store,
      &commit("create", BOOKMARK_COLLECTION, "3k", Some(bookmark_record(&[], &[]))),
    )
    .await
    .unwrap();

    let event = Event::from_json(
      r#"{"did":"did:plc:alice","time_us":1,"kind":"identity",
          "identity":{"did":"did:plc:alice","handle":"alice.test","seq":1}}"#,
    )
    .unwrap();
    let outcome = apply_event(&store, &event).await.unwrap();
    assert_eq!(outcome, Outcome::HandleUpdated { did: "did:plc:alice".into() });
    assert_eq!(store.bookmarks()[0].handle.as_deref(), Some("alice.test"));
  }

  #[test]
  fn duplicate_langs_and_tags_collapse() {
    let record: BookmarkRecord = serde_json::from_value(json!({
      "subject": "https://example.com",
      "tags": ["a", "a", "", "b"],
      "comments": [
        { "lang": "ja", "comment": "first" },
        { "lang": "ja", "comment": "second" },
      ],
      "createdAt": "2024-09-09T19:46:02.102Z",
    }))
    .unwrap();
    let write = record.into_write("at://x/y/z".into(), "did:plc:x".into(), Utc::now());
    assert_eq!(write.tags, ["a", "b"]);
    assert_eq!(write.comments.len(), 1);
    assert_eq!(write.comments[0].comment.as_deref(), Some("second"));
  }
}
