//! [`SqliteStore`] — the SQLite implementation of [`PostStore`].

use std::{path::Path, time::Duration};

use chrono::Utc;
use quorum_core::{
  error::Classify as _,
  experiment::{Experiment, ExperimentOp, apply_op},
  membership::{
    Admission, AdmissionSnapshot, JoinOutcome, JoinStatus, Membership, decide,
  },
  post::{NewPost, Post},
  social::{Comment, VoteDirection, VoteTally, comment_body},
  store::{FeedQuery, PostQuery, PostStore},
};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior, params};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    POST_COLUMNS, RawComment, RawMembership, RawPost, decode_count, encode_dt,
    encode_experiments, encode_uuid, fold_case, like_pattern, decode_experiments,
  },
  schema::SCHEMA,
};

/// Keeps a closed post out of a listing unless the caller (`?1`) is a member.
const VISIBLE: &str = "(p.closed = 0 OR EXISTS (
    SELECT 1 FROM memberships v WHERE v.post_id = p.post_id AND v.member_id = ?1))";

// ─── Options ─────────────────────────────────────────────────────────────────

/// Connection tuning.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
  /// How long a writer waits for SQLite's write lock before giving up with a
  /// transient error.
  pub busy_timeout: Duration,
}

impl Default for StoreOptions {
  fn default() -> Self { Self { busy_timeout: Duration::from_secs(5) } }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Quorum post store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. Separate
/// stores opened on the same file contend on SQLite's write lock, which is
/// what serialises admission and experiment-log writes.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  pub async fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init(options).await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init(StoreOptions::default()).await?;
    Ok(store)
  }

  async fn init(&self, options: StoreOptions) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.busy_timeout(options.busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` against the connection without a write transaction.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(&*conn))).await?
  }

  /// Run `f` inside a `BEGIN IMMEDIATE` transaction. The transaction commits
  /// only if `f` succeeds; any error rolls back everything `f` wrote.
  async fn write<T, F>(&self, op: &'static str, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&*tx) {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(e) => Ok(Err(e)),
        }
      })
      .await
      .map_err(Error::from)
      .and_then(|inner| inner);

    if let Err(e) = &result
      && e.is_transient()
    {
      tracing::warn!(op, error = %e, "write lock wait timed out");
    }
    result
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────

fn not_found(post_id: Uuid) -> Error { quorum_core::Error::NotFound(post_id).into() }

fn load_post(conn: &Connection, post_id: Uuid) -> Result<Option<Post>> {
  let raw = conn
    .query_row(
      &format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.post_id = ?1"),
      params![encode_uuid(post_id)],
      RawPost::from_row,
    )
    .optional()?;
  raw.map(RawPost::into_post).transpose()
}

fn is_member(conn: &Connection, post_id: Uuid, member_id: Uuid) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM memberships WHERE post_id = ?1 AND member_id = ?2",
        params![encode_uuid(post_id), encode_uuid(member_id)],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

fn count_members(conn: &Connection, post_id: Uuid) -> Result<u32> {
  let n: i64 = conn.query_row(
    "SELECT COUNT(*) FROM memberships WHERE post_id = ?1",
    params![encode_uuid(post_id)],
    |r| r.get(0),
  )?;
  decode_count(n)
}

fn insert_membership(conn: &Connection, post_id: Uuid, member_id: Uuid) -> Result<()> {
  conn.execute(
    "INSERT INTO memberships (post_id, member_id, joined_at) VALUES (?1, ?2, ?3)",
    params![encode_uuid(post_id), encode_uuid(member_id), encode_dt(Utc::now())],
  )?;
  Ok(())
}

/// The visibility gate: the post if `caller` may see it, `NotFound` if it is
/// missing or closed to them.
fn visible_post(conn: &Connection, post_id: Uuid, caller: Option<Uuid>) -> Result<Post> {
  let post = load_post(conn, post_id)?.ok_or_else(|| not_found(post_id))?;
  if !post.closed {
    return Ok(post);
  }
  match caller {
    Some(c) if is_member(conn, post_id, c)? => Ok(post),
    _ => Err(not_found(post_id)),
  }
}

fn vote_tally(conn: &Connection, post_id: Uuid) -> Result<VoteTally> {
  let (up, down, score): (i64, i64, i64) = conn.query_row(
    "SELECT COALESCE(SUM(value = 1), 0), COALESCE(SUM(value = -1), 0), COALESCE(SUM(value), 0)
     FROM votes WHERE post_id = ?1",
    params![encode_uuid(post_id)],
    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
  )?;
  Ok(VoteTally { up: decode_count(up)?, down: decode_count(down)?, score })
}

/// `LIMIT`/`OFFSET` operand. Values past `i64::MAX` saturate, which SQLite
/// answers with an empty page instead of wrapping to a negative offset.
fn sql_count(n: usize) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

fn query_posts(
  conn: &Connection,
  caller: Option<Uuid>,
  pattern: Option<String>,
  page: FeedQuery,
) -> Result<Vec<Post>> {
  let sql = format!(
    "SELECT {POST_COLUMNS}
     FROM posts p
     WHERE {VISIBLE}
       AND (?2 IS NULL
            OR p.title_folded LIKE ?2 ESCAPE '\\'
            OR p.body_folded  LIKE ?2 ESCAPE '\\')
     ORDER BY p.created_at DESC, p.rowid DESC
     LIMIT ?3 OFFSET ?4"
  );
  let mut stmt = conn.prepare(&sql)?;
  let raws = stmt
    .query_map(
      params![
        caller.map(encode_uuid),
        pattern,
        sql_count(page.limit()),
        sql_count(page.offset()),
      ],
      RawPost::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawPost::into_post).collect()
}

// ─── PostStore impl ──────────────────────────────────────────────────────────

impl PostStore for SqliteStore {
  type Error = Error;

  // ── Lifecycle ─────────────────────────────────────────────────────────────

  async fn create_post(&self, input: NewPost) -> Result<Post> {
    let input = input.validate()?;
    let post_id = Uuid::new_v4();
    let created_at = Utc::now();
    let closed = input.closes_on_creation();

    let post = self
      .write("create_post", move |conn| {
        conn.execute(
          "INSERT INTO posts (post_id, author_id, title, body, title_folded, body_folded,
                              created_at, closed, target_count)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          params![
            encode_uuid(post_id),
            encode_uuid(input.author_id),
            input.title,
            input.body,
            fold_case(&input.title),
            fold_case(&input.body),
            encode_dt(created_at),
            closed,
            input.target_count.map(i64::from),
          ],
        )?;
        if input.target_count.is_some() {
          insert_membership(conn, post_id, input.author_id)?;
        }
        load_post(conn, post_id)?.ok_or_else(|| not_found(post_id))
      })
      .await?;

    tracing::info!(
      %post_id,
      target_count = ?post.target_count,
      closed = post.closed,
      "post created"
    );
    Ok(post)
  }

  async fn delete_post(&self, post_id: Uuid, caller: Uuid) -> Result<()> {
    self
      .write("delete_post", move |conn| {
        let post = visible_post(conn, post_id, Some(caller))?;
        if post.author_id != caller {
          return Err(quorum_core::Error::Forbidden(post_id).into());
        }
        conn.execute("DELETE FROM posts WHERE post_id = ?1", params![encode_uuid(post_id)])?;
        Ok(())
      })
      .await?;
    tracing::info!(%post_id, "post deleted");
    Ok(())
  }

  // ── Visibility gate ───────────────────────────────────────────────────────

  async fn can_access(&self, post_id: Uuid, caller: Option<Uuid>) -> Result<Post> {
    self.read(move |conn| visible_post(conn, post_id, caller)).await
  }

  async fn list_feed(&self, caller: Option<Uuid>, query: FeedQuery) -> Result<Vec<Post>> {
    self.read(move |conn| query_posts(conn, caller, None, query)).await
  }

  async fn search(&self, caller: Option<Uuid>, query: &PostQuery) -> Result<Vec<Post>> {
    let pattern = query
      .text
      .as_deref()
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .map(like_pattern);
    let page = query.page;
    self.read(move |conn| query_posts(conn, caller, pattern, page)).await
  }

  async fn list_members(&self, post_id: Uuid, caller: Option<Uuid>) -> Result<Vec<Membership>> {
    let raws: Vec<RawMembership> = self
      .read(move |conn| {
        visible_post(conn, post_id, caller)?;
        let mut stmt = conn.prepare(
          "SELECT post_id, member_id, joined_at FROM memberships
           WHERE post_id = ?1 ORDER BY joined_at, rowid",
        )?;
        let rows = stmt
          .query_map(params![encode_uuid(post_id)], |row| {
            Ok(RawMembership {
              post_id:   row.get(0)?,
              member_id: row.get(1)?,
              joined_at: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawMembership::into_membership).collect()
  }

  // ── Admission ─────────────────────────────────────────────────────────────

  async fn join(&self, post_id: Uuid, member_id: Uuid) -> Result<JoinOutcome> {
    let outcome = self
      .write("join", move |conn| {
        let row: Option<(bool, Option<i64>)> = conn
          .query_row(
            "SELECT closed, target_count FROM posts WHERE post_id = ?1",
            params![encode_uuid(post_id)],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        let (closed, target_count) = row.ok_or_else(|| not_found(post_id))?;

        let snapshot = AdmissionSnapshot {
          closed,
          target_count: target_count.map(decode_count).transpose()?,
          already_member: is_member(conn, post_id, member_id)?,
          member_count: count_members(conn, post_id)?,
        };

        match decide(post_id, &snapshot)? {
          Admission::AlreadyJoined { target } => Ok(JoinOutcome::after(
            JoinStatus::AlreadyJoined,
            target,
            snapshot.member_count,
          )),
          Admission::Admit { target } => {
            insert_membership(conn, post_id, member_id)?;
            let count = count_members(conn, post_id)?;
            if count >= target {
              conn.execute(
                "UPDATE posts SET closed = 1 WHERE post_id = ?1 AND closed = 0",
                params![encode_uuid(post_id)],
              )?;
            }
            Ok(JoinOutcome::after(JoinStatus::Joined, target, count))
          }
        }
      })
      .await?;

    match outcome.outcome {
      JoinStatus::Joined => {
        tracing::info!(%post_id, %member_id, remaining = outcome.remaining, "member admitted");
        if outcome.closed {
          tracing::info!(%post_id, "post closed");
        }
      }
      JoinStatus::AlreadyJoined => {
        tracing::debug!(%post_id, %member_id, "member already admitted");
      }
    }
    Ok(outcome)
  }

  // ── Experiment log ────────────────────────────────────────────────────────

  async fn mutate_document(
    &self,
    post_id: Uuid,
    member_id: Uuid,
    op: ExperimentOp,
  ) -> Result<Experiment> {
    let entry = self
      .write("mutate_document", move |conn| {
        let row: Option<(bool, String)> = conn
          .query_row(
            "SELECT closed, experiments_json FROM posts WHERE post_id = ?1",
            params![encode_uuid(post_id)],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        let (closed, json) = row.ok_or_else(|| not_found(post_id))?;
        if !closed {
          return Err(quorum_core::Error::NotActive(post_id).into());
        }
        if !is_member(conn, post_id, member_id)? {
          return Err(not_found(post_id));
        }

        let mut log = decode_experiments(&json)?;
        let entry = apply_op(&mut log, op, member_id, post_id, Utc::now())?;
        conn.execute(
          "UPDATE posts SET experiments_json = ?2 WHERE post_id = ?1",
          params![encode_uuid(post_id), encode_experiments(&log)?],
        )?;
        Ok(entry)
      })
      .await?;

    tracing::debug!(
      %post_id,
      %member_id,
      experiment_id = %entry.experiment_id,
      status = %entry.status,
      "experiment log updated"
    );
    Ok(entry)
  }

  // ── Comments and votes ────────────────────────────────────────────────────

  async fn add_comment(&self, post_id: Uuid, author_id: Uuid, body: String) -> Result<Comment> {
    let comment = Comment {
      comment_id: Uuid::new_v4(),
      post_id,
      author_id,
      body: comment_body(body)?,
      created_at: Utc::now(),
    };
    let row = comment.clone();

    self
      .write("add_comment", move |conn| {
        visible_post(conn, post_id, Some(author_id))?;
        conn.execute(
          "INSERT INTO comments (comment_id, post_id, author_id, body, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![
            encode_uuid(row.comment_id),
            encode_uuid(row.post_id),
            encode_uuid(row.author_id),
            row.body,
            encode_dt(row.created_at),
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(comment)
  }

  async fn list_comments(&self, post_id: Uuid, caller: Option<Uuid>) -> Result<Vec<Comment>> {
    let raws: Vec<RawComment> = self
      .read(move |conn| {
        visible_post(conn, post_id, caller)?;
        let mut stmt = conn.prepare(
          "SELECT comment_id, post_id, author_id, body, created_at FROM comments
           WHERE post_id = ?1 ORDER BY created_at, rowid",
        )?;
        let rows = stmt
          .query_map(params![encode_uuid(post_id)], |row| {
            Ok(RawComment {
              comment_id: row.get(0)?,
              post_id:    row.get(1)?,
              author_id:  row.get(2)?,
              body:       row.get(3)?,
              created_at: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawComment::into_comment).collect()
  }

  async fn cast_vote(
    &self,
    post_id: Uuid,
    voter_id: Uuid,
    direction: VoteDirection,
  ) -> Result<VoteTally> {
    self
      .write("cast_vote", move |conn| {
        visible_post(conn, post_id, Some(voter_id))?;
        let (post, voter) = (encode_uuid(post_id), encode_uuid(voter_id));
        match direction.value() {
          Some(value) => conn.execute(
            "INSERT INTO votes (post_id, voter_id, value) VALUES (?1, ?2, ?3)
             ON CONFLICT (post_id, voter_id) DO UPDATE SET value = excluded.value",
            params![post, voter, value],
          )?,
          None => conn.execute(
            "DELETE FROM votes WHERE post_id = ?1 AND voter_id = ?2",
            params![post, voter],
          )?,
        };
        vote_tally(conn, post_id)
      })
      .await
  }
}
