//! Error types for `quorum-core`.

use thiserror::Error;
use uuid::Uuid;

/// Domain failures surfaced verbatim to the caller.
///
/// `NotFound` covers both a missing post and a closed post the caller is not a
/// member of; the two are deliberately indistinguishable.
#[derive(Debug, Error)]
pub enum Error {
  #[error("post not found: {0}")]
  NotFound(Uuid),

  #[error("post {0} is not joinable")]
  NotJoinable(Uuid),

  #[error("post {0} is full")]
  RoomFull(Uuid),

  #[error("post {0} is not an active room yet")]
  NotActive(Uuid),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("not permitted on post {0}")]
  Forbidden(Uuid),
}

impl Error {
  pub fn invalid(msg: impl Into<String>) -> Self { Self::InvalidInput(msg.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Classification ──────────────────────────────────────────────────────────

/// How a backend failure should be reported to callers.
#[derive(Debug)]
pub enum ErrorClass<'a> {
  /// A domain rule rejected the request.
  Domain(&'a Error),
  /// Lock-wait timeout or deadlock; the whole operation may be retried from
  /// scratch.
  Transient,
  /// Anything else: storage faults, corrupt rows.
  Internal,
}

/// Implemented by backend error types so upper layers can map failures
/// without knowing the backend.
pub trait Classify {
  fn class(&self) -> ErrorClass<'_>;

  fn is_transient(&self) -> bool { matches!(self.class(), ErrorClass::Transient) }
}

impl Classify for Error {
  fn class(&self) -> ErrorClass<'_> { ErrorClass::Domain(self) }
}
