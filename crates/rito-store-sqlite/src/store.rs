//! [`SqliteStore`], the SQLite implementation of [`RitoStore`] and
//! [`IngestStore`].

use std::{collections::HashMap, path::Path};

use rito_core::{
  bookmark::{
    BookmarkWrite, Like, RawBookmark, RawBookmarkTag, RawComment, SubjectRow,
    Tag,
  },
  filter::{BookmarkFilter, PageRequest, SortOrder, fold_tag},
  store::{IngestStore, RitoStore},
};
use rusqlite::types::Value;

use crate::{
  Result,
  encode::{
    BOOKMARK_COLUMNS, BookmarkBatch, BookmarkRow, CommentRow, LikeRow, TagRow,
    encode_dt, encode_moderations,
  },
  filter::{placeholders, where_clause},
  schema::SCHEMA,
};

/// The only edge type the social graph stores today.
const FOLLOW: &str = "follow";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Rito store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch bookmarks matching `tail` (a `WHERE`/`ORDER BY`/`LIMIT` suffix)
  /// together with their comments and tags.
  async fn fetch_bookmarks(
    &self,
    tail: String,
    params: Vec<Value>,
  ) -> Result<Vec<RawBookmark>> {
    let batch = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {BOOKMARK_COLUMNS} FROM bookmarks b {tail}");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), BookmarkRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        if rows.is_empty() {
          return Ok(BookmarkBatch {
            rows,
            comments: HashMap::new(),
            tags: HashMap::new(),
          });
        }

        let uris: Vec<Value> =
          rows.iter().map(|r| Value::Text(r.uri.clone())).collect();
        let marks = placeholders(uris.len());

        let mut stmt = conn.prepare(&format!(
          "SELECT bookmark_uri, lang, title, comment, moderation_result
           FROM comments WHERE bookmark_uri IN ({marks})
           ORDER BY rowid"
        ))?;
        let comment_rows = stmt
          .query_map(rusqlite::params_from_iter(uris.iter()), |row| {
            Ok(CommentRow {
              bookmark_uri: row.get(0)?,
              comment:      RawComment {
                lang:              row.get(1)?,
                title:             row.get(2)?,
                comment:           row.get(3)?,
                moderation_result: row.get(4)?,
              },
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(&format!(
          "SELECT bt.bookmark_uri, t.id, t.name
           FROM bookmark_tags bt JOIN tags t ON t.id = bt.tag_id
           WHERE bt.bookmark_uri IN ({marks})
           ORDER BY bt.rowid"
        ))?;
        let tag_rows = stmt
          .query_map(rusqlite::params_from_iter(uris.iter()), |row| {
            Ok(TagRow {
              bookmark_uri: row.get(0)?,
              tag:          Tag { id: row.get(1)?, name: row.get(2)? },
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut comments: HashMap<String, Vec<RawComment>> = HashMap::new();
        for c in comment_rows {
          comments.entry(c.bookmark_uri).or_default().push(c.comment);
        }
        let mut tags: HashMap<String, Vec<RawBookmarkTag>> = HashMap::new();
        for t in tag_rows {
          tags
            .entry(t.bookmark_uri)
            .or_default()
            .push(RawBookmarkTag { tag: t.tag });
        }

        Ok(BookmarkBatch { rows, comments, tags })
      })
      .await?;

    batch.into_raw()
  }

  /// Run a single-column text query.
  async fn query_strings(&self, sql: &'static str, arg: String) -> Result<Vec<String>> {
    let values = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map(rusqlite::params![arg], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(values)
  }
}

// ─── RitoStore impl ──────────────────────────────────────────────────────────

impl RitoStore for SqliteStore {
  type Error = crate::Error;

  // ── Bookmarks ─────────────────────────────────────────────────────────────

  async fn bookmarks_by_subject(
    &self,
    exact: &[String],
    prefixes: &[String],
  ) -> Result<Vec<SubjectRow>> {
    if exact.is_empty() && prefixes.is_empty() {
      return Ok(Vec::new());
    }

    let mut conds: Vec<String> = Vec::new();
    if !exact.is_empty() {
      conds.push(format!("subject IN ({})", placeholders(exact.len())));
    }
    // `instr(..) = 1` is a case-sensitive prefix test with no LIKE escaping.
    conds.extend(prefixes.iter().map(|_| "instr(subject, ?) = 1".to_owned()));

    let sql = format!(
      "SELECT uri, subject FROM bookmarks WHERE {}",
      conds.join(" OR ")
    );
    let params: Vec<Value> = exact
      .iter()
      .chain(prefixes)
      .map(|s| Value::Text(s.clone()))
      .collect();

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(SubjectRow { uri: row.get(0)?, subject: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    tracing::debug!(
      exact = exact.len(),
      prefixes = prefixes.len(),
      found = rows.len(),
      "bookmarks by subject"
    );
    Ok(rows)
  }

  async fn bookmarks_by_uri(&self, uris: &[String]) -> Result<Vec<RawBookmark>> {
    if uris.is_empty() {
      return Ok(Vec::new());
    }
    let tail = format!("WHERE b.uri IN ({})", placeholders(uris.len()));
    let params = uris.iter().map(|u| Value::Text(u.clone())).collect();
    self.fetch_bookmarks(tail, params).await
  }

  async fn list_bookmarks(
    &self,
    filter: &BookmarkFilter,
    sort: SortOrder,
    page: PageRequest,
  ) -> Result<Vec<RawBookmark>> {
    let clause = where_clause(filter);
    let order = match sort {
      SortOrder::Created => "b.created_at",
      SortOrder::Updated => "b.indexed_at",
    };
    let tail = format!(
      "{} ORDER BY {order} DESC, b.uri DESC LIMIT ? OFFSET ?",
      clause.sql
    );

    let mut params = clause.params;
    params.push(Value::Integer(page.take() as i64));
    params.push(Value::Integer(page.skip() as i64));

    self.fetch_bookmarks(tail, params).await
  }

  async fn count_bookmarks(&self, filter: &BookmarkFilter) -> Result<u64> {
    let clause = where_clause(filter);
    let count: i64 = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT COUNT(*) FROM bookmarks b {}", clause.sql);
        Ok(conn.query_row(
          &sql,
          rusqlite::params_from_iter(clause.params.iter()),
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(count as u64)
  }

  // ── Likes ─────────────────────────────────────────────────────────────────

  async fn likes_by_subject(&self, subjects: &[String]) -> Result<Vec<Like>> {
    if subjects.is_empty() {
      return Ok(Vec::new());
    }
    let sql = format!(
      "SELECT aturi, subject, did, created_at FROM likes
       WHERE subject IN ({}) ORDER BY created_at",
      placeholders(subjects.len())
    );
    let params: Vec<Value> =
      subjects.iter().map(|s| Value::Text(s.clone())).collect();

    let rows: Vec<LikeRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(LikeRow {
              aturi:      row.get(0)?,
              subject:    row.get(1)?,
              did:        row.get(2)?,
              created_at: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows.into_iter().map(LikeRow::into_like).collect()
  }

  // ── Social graph ──────────────────────────────────────────────────────────

  async fn following(&self, observer_did: &str) -> Result<Vec<String>> {
    self
      .query_strings(
        "SELECT target_did FROM social_graph
         WHERE observer_did = ?1 AND type = 'follow'",
        observer_did.to_owned(),
      )
      .await
  }

  async fn followers(&self, target_did: &str) -> Result<Vec<String>> {
    self
      .query_strings(
        "SELECT observer_did FROM social_graph
         WHERE target_did = ?1 AND type = 'follow'",
        target_did.to_owned(),
      )
      .await
  }
}

// ─── IngestStore impl ────────────────────────────────────────────────────────

impl IngestStore for SqliteStore {
  type Error = crate::Error;

  async fn put_bookmark(&self, write: BookmarkWrite) -> Result<()> {
    let uri = write.uri.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        tx.execute(
          "INSERT INTO bookmarks (
             uri, did, handle, subject, ogp_title, ogp_description, ogp_image,
             category, moderation_result, created_at, indexed_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
           ON CONFLICT (uri) DO UPDATE SET
             did               = excluded.did,
             handle            = COALESCE(excluded.handle, bookmarks.handle),
             subject           = excluded.subject,
             ogp_title         = excluded.ogp_title,
             ogp_description   = excluded.ogp_description,
             ogp_image         = excluded.ogp_image,
             category          = excluded.category,
             moderation_result = excluded.moderation_result,
             created_at        = excluded.created_at,
             indexed_at        = excluded.indexed_at",
          rusqlite::params![
            write.uri,
            write.did,
            write.handle,
            write.subject,
            write.ogp_title,
            write.ogp_description,
            write.ogp_image,
            write.category,
            encode_moderations(&write.moderations),
            encode_dt(write.created_at),
            encode_dt(write.indexed_at),
          ],
        )?;

        // Comments: upsert each language, then drop the languages not written.
        for c in &write.comments {
          tx.execute(
            "INSERT INTO comments (bookmark_uri, lang, title, comment, moderation_result)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (bookmark_uri, lang) DO UPDATE SET
               title             = excluded.title,
               comment           = excluded.comment,
               moderation_result = excluded.moderation_result",
            rusqlite::params![
              write.uri,
              c.lang,
              c.title,
              c.comment,
              encode_moderations(&c.moderations),
            ],
          )?;
        }
        let mut params = vec![Value::Text(write.uri.clone())];
        params.extend(write.comments.iter().map(|c| Value::Text(c.lang.clone())));
        tx.execute(
          &format!(
            "DELETE FROM comments WHERE bookmark_uri = ? AND lang NOT IN ({})",
            placeholders(write.comments.len())
          ),
          rusqlite::params_from_iter(params.iter()),
        )?;

        // Tags: resolve ids, then reconcile the join rows.
        let mut tag_ids: Vec<i64> = Vec::with_capacity(write.tags.len());
        for name in &write.tags {
          tx.execute(
            "INSERT INTO tags (name, folded) VALUES (?1, ?2)
             ON CONFLICT (name) DO NOTHING",
            rusqlite::params![name, fold_tag(name)],
          )?;
          tag_ids.push(tx.query_row(
            "SELECT id FROM tags WHERE name = ?1",
            rusqlite::params![name],
            |row| row.get(0),
          )?);
        }
        let mut params = vec![Value::Text(write.uri.clone())];
        params.extend(tag_ids.iter().map(|id| Value::Integer(*id)));
        tx.execute(
          &format!(
            "DELETE FROM bookmark_tags WHERE bookmark_uri = ? AND tag_id NOT IN ({})",
            placeholders(tag_ids.len())
          ),
          rusqlite::params_from_iter(params.iter()),
        )?;
        for id in &tag_ids {
          tx.execute(
            "INSERT OR IGNORE INTO bookmark_tags (bookmark_uri, tag_id) VALUES (?1, ?2)",
            rusqlite::params![write.uri, id],
          )?;
        }

        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::debug!(%uri, "stored bookmark");
    Ok(())
  }

  async fn delete_bookmark(&self, uri: &str) -> Result<()> {
    let uri = uri.to_owned();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM comments WHERE bookmark_uri = ?1", [&uri])?;
        tx.execute("DELETE FROM bookmark_tags WHERE bookmark_uri = ?1", [&uri])?;
        tx.execute("DELETE FROM bookmarks WHERE uri = ?1", [&uri])?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn put_like(&self, like: Like) -> Result<()> {
    let at_str = encode_dt(like.created_at);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO likes (aturi, subject, did, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (aturi) DO UPDATE SET
             subject    = excluded.subject,
             did        = excluded.did,
             created_at = excluded.created_at",
          rusqlite::params![like.aturi, like.subject, like.did, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_like(&self, aturi: &str) -> Result<()> {
    let aturi = aturi.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM likes WHERE aturi = ?1", [&aturi])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn put_follow(
    &self,
    uri: &str,
    observer_did: &str,
    target_did: &str,
  ) -> Result<()> {
    let uri = uri.to_owned();
    let observer = observer_did.to_owned();
    let target = target_did.to_owned();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        // An update may point the record at a different target.
        tx.execute("DELETE FROM social_graph WHERE uri = ?1", [&uri])?;
        tx.execute(
          "INSERT INTO social_graph (uri, observer_did, target_did, type)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (observer_did, target_did, type)
           DO UPDATE SET uri = excluded.uri",
          rusqlite::params![uri, observer, target, FOLLOW],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete_follow(&self, uri: &str) -> Result<()> {
    let uri = uri.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM social_graph WHERE uri = ?1", [&uri])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn update_handle(&self, did: &str, handle: &str) -> Result<()> {
    let did = did.to_owned();
    let handle = handle.to_owned();
    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE bookmarks SET handle = ?1 WHERE did = ?2",
          rusqlite::params![handle, did],
        )?)
      })
      .await?;
    tracing::debug!(updated, "refreshed handles");
    Ok(())
  }

  async fn replace_follows(
    &self,
    observer_did: &str,
    targets: &[String],
  ) -> Result<()> {
    let observer = observer_did.to_owned();
    let targets = targets.to_vec();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM social_graph WHERE observer_did = ?1 AND type = ?2",
          rusqlite::params![observer, FOLLOW],
        )?;
        for target in &targets {
          tx.execute(
            "INSERT OR IGNORE INTO social_graph (observer_did, target_did, type)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![observer, target, FOLLOW],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
