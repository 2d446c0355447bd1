//! The `PostStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `quorum-store-sqlite`).
//! Higher layers (`quorum-api`, `quorum-server`) depend on this abstraction,
//! not on any concrete backend.
//!
//! # Concurrency contract
//!
//! `join` and `mutate_document` must each run as one atomic unit under an
//! exclusive lock scoped to the post: the two operations are mutually
//! exclusive on the same post, and the lock is released when the operation
//! ends. A lock-wait timeout or deadlock must surface as an error whose
//! [`Classify::class`](crate::error::Classify::class) is
//! [`ErrorClass::Transient`](crate::ErrorClass::Transient), with no partial
//! effect applied. Reads through the visibility gate take no lock.

use std::future::Future;

use uuid::Uuid;

use crate::{
  error::Classify,
  experiment::{Experiment, ExperimentOp},
  membership::{JoinOutcome, Membership},
  post::{NewPost, Post},
  social::{Comment, VoteDirection, VoteTally},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Default page size for feed and search.
pub const DEFAULT_LIMIT: usize = 50;
/// Largest page a caller may request.
pub const MAX_LIMIT: usize = 200;

/// Pagination for [`PostStore::list_feed`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedQuery {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl FeedQuery {
  pub fn limit(&self) -> usize { self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) }

  pub fn offset(&self) -> usize { self.offset.unwrap_or(0) }
}

/// Parameters for [`PostStore::search`].
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
  /// Case-insensitive substring matched against title and body.
  pub text: Option<String>,
  pub page: FeedQuery,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Quorum post store backend.
///
/// Every read or write that touches a post passes through the visibility gate:
/// an open post is visible to anyone, a closed post only to its members, and a
/// post the caller cannot see is reported exactly like one that does not
/// exist.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait PostStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Create a post. A joinable post records its author as the first member
  /// in the same transaction and closes immediately if the target is 1.
  fn create_post(
    &self,
    input: NewPost,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + '_;

  /// Delete a post and everything hanging off it. Only the author may
  /// delete; invisible posts are not found.
  fn delete_post(
    &self,
    post_id: Uuid,
    caller: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Visibility gate ───────────────────────────────────────────────────

  /// Return the post if `caller` may see it, `NotFound` otherwise.
  /// `None` is an anonymous caller.
  fn can_access(
    &self,
    post_id: Uuid,
    caller: Option<Uuid>,
  ) -> impl Future<Output = Result<Post, Self::Error>> + Send + '_;

  /// Newest-first page of the posts `caller` may see.
  fn list_feed(
    &self,
    caller: Option<Uuid>,
    query: FeedQuery,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + '_;

  /// Like [`list_feed`](Self::list_feed), restricted to posts matching the
  /// query text.
  fn search<'a>(
    &'a self,
    caller: Option<Uuid>,
    query: &'a PostQuery,
  ) -> impl Future<Output = Result<Vec<Post>, Self::Error>> + Send + 'a;

  /// Membership facts for a visible post, oldest first.
  fn list_members(
    &self,
    post_id: Uuid,
    caller: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Membership>, Self::Error>> + Send + '_;

  // ── Admission ─────────────────────────────────────────────────────────

  /// Admit `member_id`, closing the post when the target is reached.
  /// Joining twice returns `already_joined` without changing anything.
  fn join(
    &self,
    post_id: Uuid,
    member_id: Uuid,
  ) -> impl Future<Output = Result<JoinOutcome, Self::Error>> + Send + '_;

  // ── Experiment log ────────────────────────────────────────────────────

  /// Append or update one entry in a closed post's experiment log.
  fn mutate_document(
    &self,
    post_id: Uuid,
    member_id: Uuid,
    op: ExperimentOp,
  ) -> impl Future<Output = Result<Experiment, Self::Error>> + Send + '_;

  // ── Comments and votes ────────────────────────────────────────────────

  fn add_comment(
    &self,
    post_id: Uuid,
    author_id: Uuid,
    body: String,
  ) -> impl Future<Output = Result<Comment, Self::Error>> + Send + '_;

  fn list_comments(
    &self,
    post_id: Uuid,
    caller: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Comment>, Self::Error>> + Send + '_;

  /// Record, change, or withdraw `voter_id`'s vote and return the new tally.
  fn cast_vote(
    &self,
    post_id: Uuid,
    voter_id: Uuid,
    direction: VoteDirection,
  ) -> impl Future<Output = Result<VoteTally, Self::Error>> + Send + '_;
}
