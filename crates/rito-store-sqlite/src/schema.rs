//! SQL schema for the Rito SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- `subject` is stored exactly as the user wrote it. Canonicalisation only
-- happens on read.
CREATE TABLE IF NOT EXISTS bookmarks (
    uri               TEXT PRIMARY KEY,   -- AT-URI of the record; immutable
    did               TEXT NOT NULL,
    handle            TEXT,               -- denormalised; may be stale
    subject           TEXT NOT NULL,
    ogp_title         TEXT,
    ogp_description   TEXT,
    ogp_image         TEXT,
    category          TEXT,
    moderation_result TEXT,               -- comma-joined flags or NULL
    created_at        TEXT NOT NULL,      -- RFC 3339, millisecond precision
    indexed_at        TEXT NOT NULL
);

-- One comment per language per bookmark.
CREATE TABLE IF NOT EXISTS comments (
    bookmark_uri      TEXT NOT NULL REFERENCES bookmarks(uri) ON DELETE CASCADE,
    lang              TEXT NOT NULL,
    title             TEXT,
    comment           TEXT,
    moderation_result TEXT,
    PRIMARY KEY (bookmark_uri, lang)
);

-- Tags are created on first use and never deleted. `folded` is written by
-- the store with Unicode lower-casing; SQLite's `lower()` is ASCII-only.
CREATE TABLE IF NOT EXISTS tags (
    id     INTEGER PRIMARY KEY AUTOINCREMENT,
    name   TEXT NOT NULL UNIQUE,
    folded TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bookmark_tags (
    bookmark_uri TEXT    NOT NULL REFERENCES bookmarks(uri) ON DELETE CASCADE,
    tag_id       INTEGER NOT NULL REFERENCES tags(id),
    PRIMARY KEY (bookmark_uri, tag_id)
);

CREATE TABLE IF NOT EXISTS likes (
    aturi      TEXT PRIMARY KEY,
    subject    TEXT NOT NULL,             -- URL or bookmark AT-URI
    did        TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- `uri` is the follow record an edge came from; NULL for synced edges.
CREATE TABLE IF NOT EXISTS social_graph (
    uri          TEXT,
    observer_did TEXT NOT NULL,
    target_did   TEXT NOT NULL,
    type         TEXT NOT NULL DEFAULT 'follow',
    PRIMARY KEY (observer_did, target_did, type)
);

CREATE INDEX IF NOT EXISTS bookmarks_subject_idx ON bookmarks(subject);
CREATE INDEX IF NOT EXISTS bookmarks_did_idx     ON bookmarks(did);
CREATE INDEX IF NOT EXISTS bookmarks_created_idx ON bookmarks(created_at);
CREATE INDEX IF NOT EXISTS bookmarks_indexed_idx ON bookmarks(indexed_at);
CREATE INDEX IF NOT EXISTS tags_folded_idx       ON tags(folded);
CREATE INDEX IF NOT EXISTS likes_subject_idx     ON likes(subject);
CREATE UNIQUE INDEX IF NOT EXISTS social_graph_uri_idx ON social_graph(uri);
CREATE INDEX IF NOT EXISTS social_graph_target_idx
    ON social_graph(target_did, type);

PRAGMA user_version = 1;
";
