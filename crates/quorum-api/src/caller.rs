//! Caller identity extractors.
//!
//! Authentication happens upstream; by the time a request reaches this router
//! the surrounding system has put the caller's member UUID in
//! [`MEMBER_HEADER`]. Requests without it are treated as anonymous.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

pub const MEMBER_HEADER: &str = "x-member-id";

/// The caller, if identified. Used on read paths that anonymous callers may
/// use for open posts.
pub struct Caller(pub Option<Uuid>);

/// An identified caller; required on every write path.
pub struct Member(pub Uuid);

fn member_id(parts: &Parts) -> Result<Option<Uuid>, ApiError> {
  let Some(value) = parts.headers.get(MEMBER_HEADER) else {
    return Ok(None);
  };
  value
    .to_str()
    .ok()
    .and_then(|s| Uuid::parse_str(s.trim()).ok())
    .map(Some)
    .ok_or(ApiError::Unauthorized)
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    Ok(Caller(member_id(parts)?))
  }
}

impl<S: Send + Sync> FromRequestParts<S> for Member {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    member_id(parts)?.map(Member).ok_or(ApiError::Unauthorized)
  }
}
