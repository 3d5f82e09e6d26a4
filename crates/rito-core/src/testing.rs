//! In-memory store for unit tests.

use std::sync::Mutex;

use chrono::{TimeZone, Utc};
use thiserror::Error;

use crate::{
  bookmark::{
    BookmarkWrite, Like, RawBookmark, RawBookmarkTag, RawComment, RawTimestamp,
    SubjectRow, Tag,
  },
  filter::{BookmarkFilter, Owner, PageRequest, SortOrder, fold_tag},
  normalize::format_timestamp,
  store::{IngestStore, RitoStore},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("store unavailable")]
  Unavailable,
  #[error(transparent)]
  Core(#[from] crate::Error),
}

#[derive(Default)]
struct State {
  bookmarks: Vec<RawBookmark>,
  likes:     Vec<Like>,
  follows:   Vec<Edge>,
  tags:      Vec<String>,
}

struct Edge {
  /// Follow record the edge came from, if any.
  uri:      Option<String>,
  observer: String,
  target:   String,
}

#[derive(Default)]
pub struct MemoryStore {
  state: Mutex<State>,
  fail:  bool,
}

pub fn bookmark(uri: &str, subject: &str) -> RawBookmark {
  RawBookmark {
    uri:               uri.into(),
    did:               "did:plc:test".into(),
    handle:            Some("test.bsky.social".into()),
    subject:           subject.into(),
    ogp_title:         None,
    ogp_description:   None,
    ogp_image:         None,
    category:          None,
    moderation_result: None,
    created_at:        RawTimestamp::Text("2024-01-01T00:00:00.000Z".into()),
    indexed_at:        RawTimestamp::Text("2024-01-01T00:00:00.000Z".into()),
    comments:          Vec::new(),
    tags:              Some(Vec::new()),
  }
}

pub fn like(aturi: &str, subject: &str) -> Like {
  Like {
    aturi:      aturi.into(),
    subject:    subject.into(),
    did:        "did:plc:liker".into(),
    created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
  }
}

impl MemoryStore {
  /// Every call fails with [`MemoryError::Unavailable`].
  pub fn failing() -> Self { Self { fail: true, ..Default::default() } }

  pub fn push_bookmark(&self, b: RawBookmark) {
    self.state.lock().unwrap().bookmarks.push(b);
  }

  pub fn push_like(&self, l: Like) { self.state.lock().unwrap().likes.push(l); }

  pub fn follow(&self, observer: &str, target: &str) {
    self
      .state
      .lock()
      .unwrap()
      .follows
      .push(Edge { uri: None, observer: observer.into(), target: target.into() });
  }

  pub fn following_now(&self, observer: &str) -> Vec<String> {
    self
      .state
      .lock()
      .unwrap()
      .follows
      .iter()
      .filter(|e| e.observer == observer)
      .map(|e| e.target.clone())
      .collect()
  }

  pub fn bookmarks(&self) -> Vec<RawBookmark> {
    self.state.lock().unwrap().bookmarks.clone()
  }

  pub fn likes(&self) -> Vec<Like> { self.state.lock().unwrap().likes.clone() }

  fn check(&self) -> Result<(), MemoryError> {
    if self.fail { Err(MemoryError::Unavailable) } else { Ok(()) }
  }
}

fn matches(filter: &BookmarkFilter, b: &RawBookmark) -> bool {
  let tag_names: Vec<String> = b
    .tags
    .iter()
    .flatten()
    .map(|j| fold_tag(&j.tag.name))
    .collect();
  let handle = b.handle.as_deref();

  filter.required_tags.iter().all(|t| tag_names.contains(t))
    && !filter.excluded_tags.iter().any(|t| tag_names.contains(t))
    && (filter.handles.is_empty()
      || handle.is_some_and(|h| filter.handles.iter().any(|x| x == h)))
    && !handle.is_some_and(|h| filter.excluded_handles.iter().any(|x| x == h))
    && match &filter.owner {
      Some(Owner::Did(did)) => &b.did == did,
      Some(Owner::Handle(h)) => handle == Some(h.as_str()),
      None => true,
    }
    && filter.dids.as_ref().is_none_or(|dids| dids.contains(&b.did))
}

impl RitoStore for MemoryStore {
  type Error = MemoryError;

  async fn bookmarks_by_subject(
    &self,
    exact: &[String],
    prefixes: &[String],
  ) -> Result<Vec<SubjectRow>, MemoryError> {
    self.check()?;
    let state = self.state.lock().unwrap();
    Ok(
      state
        .bookmarks
        .iter()
        .filter(|b| {
          exact.contains(&b.subject)
            || prefixes.iter().any(|p| b.subject.starts_with(p.as_str()))
        })
        .map(|b| SubjectRow { uri: b.uri.clone(), subject: b.subject.clone() })
        .collect(),
    )
  }

  async fn bookmarks_by_uri(
    &self,
    uris: &[String],
  ) -> Result<Vec<RawBookmark>, MemoryError> {
    self.check()?;
    let state = self.state.lock().unwrap();
    Ok(
      state
        .bookmarks
        .iter()
        .filter(|b| uris.contains(&b.uri))
        .cloned()
        .collect(),
    )
  }

  async fn list_bookmarks(
    &self,
    filter: &BookmarkFilter,
    sort: SortOrder,
    page: PageRequest,
  ) -> Result<Vec<RawBookmark>, MemoryError> {
    self.check()?;
    let state = self.state.lock().unwrap();
    let mut rows: Vec<RawBookmark> = state
      .bookmarks
      .iter()
      .filter(|b| matches(filter, b))
      .cloned()
      .collect();
    rows.sort_by_key(|b| {
      std::cmp::Reverse(match sort {
        SortOrder::Created => format_timestamp(&b.created_at),
        SortOrder::Updated => format_timestamp(&b.indexed_at),
      })
    });
    Ok(
      rows
        .into_iter()
        .skip(page.skip() as usize)
        .take(page.take() as usize)
        .collect(),
    )
  }

  async fn count_bookmarks(
    &self,
    filter: &BookmarkFilter,
  ) -> Result<u64, MemoryError> {
    self.check()?;
    let state = self.state.lock().unwrap();
    Ok(state.bookmarks.iter().filter(|b| matches(filter, b)).count() as u64)
  }

  async fn likes_by_subject(
    &self,
    subjects: &[String],
  ) -> Result<Vec<Like>, MemoryError> {
    self.check()?;
    let state = self.state.lock().unwrap();
    Ok(
      state
        .likes
        .iter()
        .filter(|l| subjects.contains(&l.subject))
        .cloned()
        .collect(),
    )
  }

  async fn following(
    &self,
    observer_did: &str,
  ) -> Result<Vec<String>, MemoryError> {
    self.check()?;
    let state = self.state.lock().unwrap();
    Ok(
      state
        .follows
        .iter()
        .filter(|e| e.observer == observer_did)
        .map(|e| e.target.clone())
        .collect(),
    )
  }

  async fn followers(&self, target_did: &str) -> Result<Vec<String>, MemoryError> {
    self.check()?;
    let state = self.state.lock().unwrap();
    Ok(
      state
        .follows
        .iter()
        .filter(|e| e.target == target_did)
        .map(|e| e.observer.clone())
        .collect(),
    )
  }
}

impl IngestStore for MemoryStore {
  type Error = MemoryError;

  async fn put_bookmark(&self, write: BookmarkWrite) -> Result<(), MemoryError> {
    self.check()?;
    let mut state = self.state.lock().unwrap();

    let mut joins = Vec::new();
    for name in &write.tags {
      let id = match state.tags.iter().position(|t| t == name) {
        Some(i) => i,
        None => {
          state.tags.push(name.clone());
          state.tags.len() - 1
        }
      };
      joins.push(RawBookmarkTag { tag: Tag { id: id as i64, name: name.clone() } });
    }

    let existing = state.bookmarks.iter().position(|b| b.uri == write.uri);
    let handle = write.handle.or_else(|| {
      existing.and_then(|i| state.bookmarks[i].handle.clone())
    });

    let row = RawBookmark {
      uri: write.uri,
      did: write.did,
      handle,
      subject: write.subject,
      ogp_title: write.ogp_title,
      ogp_description: write.ogp_description,
      ogp_image: write.ogp_image,
      category: write.category,
      moderation_result: (!write.moderations.is_empty())
        .then(|| write.moderations.join(",")),
      created_at: write.created_at.into(),
      indexed_at: write.indexed_at.into(),
      comments: write
        .comments
        .into_iter()
        .map(|c| RawComment {
          lang:              c.lang,
          title:             c.title,
          comment:           c.comment,
          moderation_result: None,
        })
        .collect(),
      tags: Some(joins),
    };

    match existing {
      Some(i) => state.bookmarks[i] = row,
      None => state.bookmarks.push(row),
    }
    Ok(())
  }

  async fn delete_bookmark(&self, uri: &str) -> Result<(), MemoryError> {
    self.check()?;
    self.state.lock().unwrap().bookmarks.retain(|b| b.uri != uri);
    Ok(())
  }

  async fn put_like(&self, like: Like) -> Result<(), MemoryError> {
    self.check()?;
    let mut state = self.state.lock().unwrap();
    state.likes.retain(|l| l.aturi != like.aturi);
    state.likes.push(like);
    Ok(())
  }

  async fn delete_like(&self, aturi: &str) -> Result<(), MemoryError> {
    self.check()?;
    self.state.lock().unwrap().likes.retain(|l| l.aturi != aturi);
    Ok(())
  }

  async fn put_follow(
    &self,
    uri: &str,
    observer_did: &str,
    target_did: &str,
  ) -> Result<(), MemoryError> {
    self.check()?;
    let mut state = self.state.lock().unwrap();
    state.follows.retain(|e| {
      e.uri.as_deref() != Some(uri)
        && !(e.observer == observer_did && e.target == target_did)
    });
    state.follows.push(Edge {
      uri:      Some(uri.to_owned()),
      observer: observer_did.to_owned(),
      target:   target_did.to_owned(),
    });
    Ok(())
  }

  async fn delete_follow(&self, uri: &str) -> Result<(), MemoryError> {
    self.check()?;
    self
      .state
      .lock()
      .unwrap()
      .follows
      .retain(|e| e.uri.as_deref() != Some(uri));
    Ok(())
  }

  async fn update_handle(&self, did: &str, handle: &str) -> Result<(), MemoryError> {
    self.check()?;
    for b in self.state.lock().unwrap().bookmarks.iter_mut() {
      if b.did == did {
        b.handle = Some(handle.to_owned());
      }
    }
    Ok(())
  }

  async fn replace_follows(
    &self,
    observer_did: &str,
    targets: &[String],
  ) -> Result<(), MemoryError> {
    self.check()?;
    let mut state = self.state.lock().unwrap();
    state.follows.retain(|e| e.observer != observer_did);
    state.follows.extend(targets.iter().map(|t| Edge {
      uri:      None,
      observer: observer_did.to_owned(),
      target:   t.clone(),
    }));
    Ok(())
  }
}
