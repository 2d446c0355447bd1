//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so they sort lexically. UUIDs are stored as
//! hyphenated lowercase strings. The experiment log is a JSON array.

use chrono::{DateTime, SecondsFormat, Utc};
use quorum_core::{
  experiment::Experiment,
  membership::Membership,
  post::Post,
  social::Comment,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Counts ───────────────────────────────────────────────────────────────────

pub fn decode_count(v: i64) -> Result<u32> {
  u32::try_from(v).map_err(|_| Error::Corrupt(format!("count out of range: {v}")))
}

// ─── Experiment log ───────────────────────────────────────────────────────────

pub fn encode_experiments(log: &[Experiment]) -> Result<String> { Ok(serde_json::to_string(log)?) }

pub fn decode_experiments(s: &str) -> Result<Vec<Experiment>> { Ok(serde_json::from_str(s)?) }

// ─── LIKE patterns ────────────────────────────────────────────────────────────

/// Unicode lowercase used for the `*_folded` search columns. SQLite's own
/// `lower()` and `LIKE` only fold ASCII, so both sides are folded here.
pub fn fold_case(text: &str) -> String { text.to_lowercase() }

/// Build a case-folded substring pattern for `LIKE ... ESCAPE '\'`, to be
/// matched against the `*_folded` columns.
pub fn like_pattern(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for c in fold_case(text).chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Columns selected by [`POST_COLUMNS`], in order.
pub const POST_COLUMNS: &str = "
  p.post_id, p.author_id, p.title, p.body, p.created_at, p.closed,
  p.target_count,
  (SELECT COUNT(*) FROM memberships m WHERE m.post_id = p.post_id),
  p.experiments_json";

/// Raw values read directly from a `posts` row plus its member count.
pub struct RawPost {
  pub post_id:          String,
  pub author_id:        String,
  pub title:            String,
  pub body:             String,
  pub created_at:       String,
  pub closed:           bool,
  pub target_count:     Option<i64>,
  pub member_count:     i64,
  pub experiments_json: String,
}

impl RawPost {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      post_id:          row.get(0)?,
      author_id:        row.get(1)?,
      title:            row.get(2)?,
      body:             row.get(3)?,
      created_at:       row.get(4)?,
      closed:           row.get(5)?,
      target_count:     row.get(6)?,
      member_count:     row.get(7)?,
      experiments_json: row.get(8)?,
    })
  }

  pub fn into_post(self) -> Result<Post> {
    Ok(Post {
      post_id:      decode_uuid(&self.post_id)?,
      author_id:    decode_uuid(&self.author_id)?,
      title:        self.title,
      body:         self.body,
      created_at:   decode_dt(&self.created_at)?,
      closed:       self.closed,
      target_count: self.target_count.map(decode_count).transpose()?,
      member_count: decode_count(self.member_count)?,
      experiments:  decode_experiments(&self.experiments_json)?,
    })
  }
}

/// Raw strings read directly from a `memberships` row.
pub struct RawMembership {
  pub post_id:   String,
  pub member_id: String,
  pub joined_at: String,
}

impl RawMembership {
  pub fn into_membership(self) -> Result<Membership> {
    Ok(Membership {
      post_id:   decode_uuid(&self.post_id)?,
      member_id: decode_uuid(&self.member_id)?,
      joined_at: decode_dt(&self.joined_at)?,
    })
  }
}

/// Raw strings read directly from a `comments` row.
pub struct RawComment {
  pub comment_id: String,
  pub post_id:    String,
  pub author_id:  String,
  pub body:       String,
  pub created_at: String,
}

impl RawComment {
  pub fn into_comment(self) -> Result<Comment> {
    Ok(Comment {
      comment_id: decode_uuid(&self.comment_id)?,
      post_id:    decode_uuid(&self.post_id)?,
      author_id:  decode_uuid(&self.author_id)?,
      body:       self.body,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
