//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use quorum_core::{ErrorClass, error::Classify};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  Forbidden(String),

  #[error("missing or invalid member identity")]
  Unauthorized,

  /// Lock contention; the client should retry the whole request.
  #[error("temporarily unavailable: {0}")]
  Unavailable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a backend failure onto an HTTP-facing error.
  pub fn store<E>(e: E) -> Self
  where
    E: Classify + std::error::Error + Send + Sync + 'static,
  {
    let mapped = match e.class() {
      ErrorClass::Domain(d) => Some(match d {
        quorum_core::Error::NotFound(_) => Self::NotFound(d.to_string()),
        quorum_core::Error::InvalidInput(m) => Self::BadRequest(m.clone()),
        quorum_core::Error::NotJoinable(_)
        | quorum_core::Error::RoomFull(_)
        | quorum_core::Error::NotActive(_) => Self::Conflict(d.to_string()),
        quorum_core::Error::Forbidden(_) => Self::Forbidden(d.to_string()),
      }),
      ErrorClass::Transient => Some(Self::Unavailable(e.to_string())),
      ErrorClass::Internal => None,
    };
    mapped.unwrap_or_else(|| Self::Store(Box::new(e)))
  }
}

// ─── Extractor rejections ────────────────────────────────────────────────────

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

/// Every path parameter is a post id, so an unparseable one is reported the
/// same way as a post that does not exist.
impl From<PathRejection> for ApiError {
  fn from(_: PathRejection) -> Self { Self::NotFound("post not found".to_owned()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_owned())
      }
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    if status == StatusCode::SERVICE_UNAVAILABLE {
      res
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
    }
    res
  }
}
