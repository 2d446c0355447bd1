//! SQL schema for the Quorum SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS posts (
    post_id          TEXT PRIMARY KEY,
    author_id        TEXT NOT NULL,
    title            TEXT NOT NULL,
    body             TEXT NOT NULL DEFAULT '',
    title_folded     TEXT NOT NULL,              -- fold_case(title), for search
    body_folded      TEXT NOT NULL DEFAULT '',   -- fold_case(body)
    created_at       TEXT NOT NULL,
    closed           INTEGER NOT NULL DEFAULT 0 CHECK (closed IN (0, 1)),
    target_count     INTEGER CHECK (target_count IS NULL OR target_count > 0),
    experiments_json TEXT NOT NULL DEFAULT '[]'   -- whole log, replaced on write
);

-- One admission fact per (post, member).
CREATE TABLE IF NOT EXISTS memberships (
    post_id   TEXT NOT NULL REFERENCES posts(post_id) ON DELETE CASCADE,
    member_id TEXT NOT NULL,
    joined_at TEXT NOT NULL,
    PRIMARY KEY (post_id, member_id)
);

CREATE TABLE IF NOT EXISTS comments (
    comment_id TEXT PRIMARY KEY,
    post_id    TEXT NOT NULL REFERENCES posts(post_id) ON DELETE CASCADE,
    author_id  TEXT NOT NULL,
    body       TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS votes (
    post_id  TEXT NOT NULL REFERENCES posts(post_id) ON DELETE CASCADE,
    voter_id TEXT NOT NULL,
    value    INTEGER NOT NULL CHECK (value IN (-1, 1)),
    PRIMARY KEY (post_id, voter_id)
);

CREATE INDEX IF NOT EXISTS posts_created_idx      ON posts(created_at);
CREATE INDEX IF NOT EXISTS memberships_member_idx ON memberships(member_id);
CREATE INDEX IF NOT EXISTS comments_post_idx      ON comments(post_id);

PRAGMA user_version = 1;
";
