//! Handlers for `/posts` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/posts` | Feed; optional `limit`, `offset` |
//! | `POST`   | `/posts` | Body: [`CreateBody`]; returns 201 + post |
//! | `GET`    | `/posts/:id` | 404 if missing or closed to the caller |
//! | `DELETE` | `/posts/:id` | Author only; returns 204 |
//! | `POST`   | `/posts/:id/join` | Returns a [`JoinOutcome`] |
//! | `GET`    | `/posts/:id/members` | Membership facts, oldest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State, rejection::{JsonRejection, QueryRejection}},
  http::StatusCode,
  response::IntoResponse,
};
use quorum_core::{
  membership::{JoinOutcome, Membership},
  post::{NewPost, Post},
  store::{FeedQuery, PostStore},
};
use serde::Deserialize;

use crate::{
  caller::{Caller, Member},
  error::ApiError,
  post_id::PostId,
};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl From<PageParams> for FeedQuery {
  fn from(p: PageParams) -> Self { FeedQuery { limit: p.limit, offset: p.offset } }
}

/// `GET /posts[?limit=...][&offset=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Caller(caller): Caller,
  params: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<Post>>, ApiError>
where
  S: PostStore,
{
  let Query(params) = params?;
  let posts = store
    .list_feed(caller, params.into())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(posts))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title:        String,
  #[serde(default)]
  pub body:         String,
  /// Supply a positive count to make the post joinable.
  pub target_count: Option<u32>,
}

/// `POST /posts` — the caller becomes the author.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Member(author_id): Member,
  body: Result<Json<CreateBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PostStore,
{
  let Json(body) = body?;
  let input = NewPost {
    author_id,
    title: body.title,
    body: body.body,
    target_count: body.target_count,
  };
  let post = store.create_post(input).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(post)))
}

// ─── Get / delete ─────────────────────────────────────────────────────────────

/// `GET /posts/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Caller(caller): Caller,
  PostId(id): PostId,
) -> Result<Json<Post>, ApiError>
where
  S: PostStore,
{
  let post = store.can_access(id, caller).await.map_err(ApiError::store)?;
  Ok(Json(post))
}

/// `DELETE /posts/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Member(caller): Member,
  PostId(id): PostId,
) -> Result<StatusCode, ApiError>
where
  S: PostStore,
{
  store.delete_post(id, caller).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Membership ───────────────────────────────────────────────────────────────

/// `POST /posts/:id/join`
pub async fn join<S>(
  State(store): State<Arc<S>>,
  Member(member_id): Member,
  PostId(id): PostId,
) -> Result<Json<JoinOutcome>, ApiError>
where
  S: PostStore,
{
  let outcome = store.join(id, member_id).await.map_err(ApiError::store)?;
  Ok(Json(outcome))
}

/// `GET /posts/:id/members`
pub async fn members<S>(
  State(store): State<Arc<S>>,
  Caller(caller): Caller,
  PostId(id): PostId,
) -> Result<Json<Vec<Membership>>, ApiError>
where
  S: PostStore,
{
  let members = store.list_members(id, caller).await.map_err(ApiError::store)?;
  Ok(Json(members))
}
