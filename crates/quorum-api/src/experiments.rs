//! Handler for `POST /posts/:id/experiments`.
//!
//! The body is a tagged [`ExperimentOp`]:
//! `{"op":"append","question":"...","status":"draft"}` or
//! `{"op":"update","experiment_id":"...","status":"done"}`.
//! Appends return 201, updates 200. A body that does not decode as either
//! op is a 400.

use std::sync::Arc;

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use quorum_core::{experiment::ExperimentOp, store::PostStore};

use crate::{caller::Member, error::ApiError, post_id::PostId};

pub async fn mutate<S>(
  State(store): State<Arc<S>>,
  Member(member_id): Member,
  PostId(id): PostId,
  op: Result<Json<ExperimentOp>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PostStore,
{
  let Json(op) = op?;
  let status = match op {
    ExperimentOp::Append(_) => StatusCode::CREATED,
    ExperimentOp::Update(_) => StatusCode::OK,
  };
  let entry = store
    .mutate_document(id, member_id, op)
    .await
    .map_err(ApiError::store)?;
  Ok((status, Json(entry)))
}
