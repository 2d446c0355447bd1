//! Handlers for comments and votes on a post.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/posts/:id/comments` | Oldest first |
//! | `POST` | `/posts/:id/comments` | Body: `{"body":"..."}`; returns 201 |
//! | `POST` | `/posts/:id/vote` | Body: `{"direction":"up\|down\|clear"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use quorum_core::{
  social::{Comment, VoteDirection, VoteTally},
  store::PostStore,
};
use serde::Deserialize;

use crate::{
  caller::{Caller, Member},
  error::ApiError,
  post_id::PostId,
};

/// `GET /posts/:id/comments`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Caller(caller): Caller,
  PostId(id): PostId,
) -> Result<Json<Vec<Comment>>, ApiError>
where
  S: PostStore,
{
  let comments = store.list_comments(id, caller).await.map_err(ApiError::store)?;
  Ok(Json(comments))
}

#[derive(Debug, Deserialize)]
pub struct CommentBody {
  #[serde(default)]
  pub body: String,
}

/// `POST /posts/:id/comments`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Member(author_id): Member,
  PostId(id): PostId,
  body: Result<Json<CommentBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PostStore,
{
  let Json(body) = body?;
  let comment = store
    .add_comment(id, author_id, body.body)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(Debug, Deserialize)]
pub struct VoteBody {
  pub direction: String,
}

/// `POST /posts/:id/vote`
pub async fn vote<S>(
  State(store): State<Arc<S>>,
  Member(voter_id): Member,
  PostId(id): PostId,
  body: Result<Json<VoteBody>, JsonRejection>,
) -> Result<Json<VoteTally>, ApiError>
where
  S: PostStore,
{
  let Json(body) = body?;
  let direction = VoteDirection::parse(&body.direction).map_err(ApiError::store)?;
  let tally = store
    .cast_vote(id, voter_id, direction)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(tally))
}
