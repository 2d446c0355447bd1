//! Handler for `GET /search`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use quorum_core::{
  post::Post,
  store::{FeedQuery, PostQuery, PostStore},
};
use serde::Deserialize;

use crate::{caller::Caller, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
  /// Substring matched case-insensitively against title and body.
  pub q:      Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /search[?q=...][&limit=...][&offset=...]`
///
/// Closed posts are filtered inside the query, so page sizes never reveal
/// posts the caller cannot see.
pub async fn handler<S>(
  State(store): State<Arc<S>>,
  Caller(caller): Caller,
  params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<Post>>, ApiError>
where
  S: PostStore,
{
  let Query(params) = params?;
  let query = PostQuery {
    text: params.q,
    page: FeedQuery { limit: params.limit, offset: params.offset },
  };
  let posts = store.search(caller, &query).await.map_err(ApiError::store)?;
  Ok(Json(posts))
}
