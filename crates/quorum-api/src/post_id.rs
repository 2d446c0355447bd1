//! The `{id}` path segment shared by every `/posts/{id}/...` route.

use axum::{
  extract::{FromRequestParts, Path},
  http::request::Parts,
};
use uuid::Uuid;

use crate::error::ApiError;

/// A post id taken from the path. A segment that is not a UUID is answered
/// with the same 404 as an unknown post.
pub struct PostId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for PostId {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
    let Path(id) = Path::<Uuid>::from_request_parts(parts, state).await?;
    Ok(PostId(id))
  }
}
