//! JSON REST API for Quorum.
//!
//! Exposes an axum [`Router`] backed by any [`quorum_core::store::PostStore`].
//! Authentication, TLS, and rate limiting are the caller's responsibility; the
//! router only reads the caller's identity from [`caller::MEMBER_HEADER`].
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", quorum_api::api_router(store.clone()))
//! ```

pub mod caller;
pub mod comments;
pub mod error;
pub mod experiments;
pub mod post_id;
pub mod posts;
pub mod search;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use quorum_core::store::PostStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: PostStore + 'static,
{
  Router::new()
    // Posts
    .route("/posts", get(posts::list::<S>).post(posts::create::<S>))
    .route("/posts/{id}", get(posts::get_one::<S>).delete(posts::delete_one::<S>))
    .route("/posts/{id}/join", post(posts::join::<S>))
    .route("/posts/{id}/members", get(posts::members::<S>))
    // Experiment log
    .route("/posts/{id}/experiments", post(experiments::mutate::<S>))
    // Comments and votes
    .route(
      "/posts/{id}/comments",
      get(comments::list::<S>).post(comments::create::<S>),
    )
    .route("/posts/{id}/vote", post(comments::vote::<S>))
    // Search
    .route("/search", get(search::handler::<S>))
    .with_state(store)
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::IntoResponse,
  };
  use quorum_core::{ErrorClass, error::Classify};
  use quorum_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;
  use uuid::Uuid;

  use super::*;
  use crate::caller::MEMBER_HEADER;

  async fn app() -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store))
  }

  async fn send(
    app:    &Router,
    method: &str,
    uri:    &str,
    member: Option<Uuid>,
    body:   Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(m) = member {
      builder = builder.header(MEMBER_HEADER, m.to_string());
    }
    let req = match body {
      Some(b) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(b.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
  }

  async fn create_room(app: &Router, author: Uuid, target: u32) -> String {
    let (status, post) = send(
      app,
      "POST",
      "/posts",
      Some(author),
      Some(json!({ "title": "Tune the GC?", "target_count": target })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    post["post_id"].as_str().unwrap().to_owned()
  }

  // ── Posts ────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_requires_identity() {
    let app = app().await;
    let (status, _) = send(&app, "POST", "/posts", None, Some(json!({ "title": "x" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn malformed_identity_is_rejected() {
    let app = app().await;
    let req = Request::builder()
      .uri("/posts")
      .header(MEMBER_HEADER, "not-a-uuid")
      .body(Body::empty())
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn zero_target_is_bad_request() {
    let app = app().await;
    let (status, body) = send(
      &app,
      "POST",
      "/posts",
      Some(Uuid::new_v4()),
      Some(json!({ "title": "x", "target_count": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("target_count"));
  }

  #[tokio::test]
  async fn closed_post_looks_missing_to_outsiders() {
    let app = app().await;
    let author = Uuid::new_v4();
    let id = create_room(&app, author, 1).await;

    let (hidden_status, hidden) = send(&app, "GET", &format!("/posts/{id}"), None, None).await;
    assert_eq!(hidden_status, StatusCode::NOT_FOUND);

    let missing = Uuid::new_v4();
    let (missing_status, gone) = send(&app, "GET", &format!("/posts/{missing}"), None, None).await;
    assert_eq!(missing_status, StatusCode::NOT_FOUND);
    assert_eq!(
      hidden["error"].as_str().unwrap().replace(&id, ""),
      gone["error"].as_str().unwrap().replace(&missing.to_string(), "")
    );

    let (status, post) = send(&app, "GET", &format!("/posts/{id}"), Some(author), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["closed"], json!(true));

    let (_, feed) = send(&app, "GET", "/posts", None, None).await;
    assert_eq!(feed, json!([]));
    let (_, hits) = send(&app, "GET", "/search?q=gc", None, None).await;
    assert_eq!(hits, json!([]));
    let (_, hits) = send(&app, "GET", "/search?q=gc", Some(author), None).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn delete_by_non_author_is_forbidden() {
    let app = app().await;
    let author = Uuid::new_v4();
    let id = create_room(&app, author, 5).await;

    let (status, _) = send(&app, "DELETE", &format!("/posts/{id}"), Some(Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "DELETE", &format!("/posts/{id}"), Some(author), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "GET", &format!("/posts/{id}"), Some(author), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Join ─────────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn join_until_full() {
    let app = app().await;
    let author = Uuid::new_v4();
    let id = create_room(&app, author, 2).await;
    let uri = format!("/posts/{id}/join");

    let member = Uuid::new_v4();
    let (status, outcome) = send(&app, "POST", &uri, Some(member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome, json!({ "outcome": "joined", "closed": true, "remaining": 0 }));

    let (status, _) = send(&app, "POST", &uri, Some(Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, members) = send(&app, "GET", &format!("/posts/{id}/members"), Some(member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members.as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn rejoin_reports_already_joined() {
    let app = app().await;
    let id = create_room(&app, Uuid::new_v4(), 3).await;
    let uri = format!("/posts/{id}/join");
    let member = Uuid::new_v4();

    send(&app, "POST", &uri, Some(member), None).await;
    let (status, outcome) = send(&app, "POST", &uri, Some(member), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], json!("already_joined"));
    assert_eq!(outcome["remaining"], json!(1));
  }

  #[tokio::test]
  async fn join_plain_post_conflicts() {
    let app = app().await;
    let (_, post) = send(
      &app,
      "POST",
      "/posts",
      Some(Uuid::new_v4()),
      Some(json!({ "title": "just sharing" })),
    )
    .await;
    let id = post["post_id"].as_str().unwrap();
    let (status, body) = send(&app, "POST", &format!("/posts/{id}/join"), Some(Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("not joinable"));
  }

  // ── Experiments ──────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn experiment_log_lifecycle() {
    let app = app().await;
    let author = Uuid::new_v4();
    let id = create_room(&app, author, 2).await;
    let uri = format!("/posts/{id}/experiments");
    let append = json!({ "op": "append", "question": "Does G1 beat ZGC here?" });

    let (status, _) = send(&app, "POST", &uri, Some(author), Some(append.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(&app, "POST", &format!("/posts/{id}/join"), Some(Uuid::new_v4()), None).await;

    let (status, _) = send(&app, "POST", &uri, Some(Uuid::new_v4()), Some(append.clone())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, entry) = send(&app, "POST", &uri, Some(author), Some(append)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(entry["status"], json!("draft"));

    let update = json!({
      "op": "update",
      "experiment_id": entry["experiment_id"],
      "status": "running",
      "metrics": "pause time p99"
    });
    let (status, updated) = send(&app, "POST", &uri, Some(author), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], json!("running"));
    assert_eq!(updated["question"], entry["question"]);

    let bad = json!({ "op": "update", "experiment_id": entry["experiment_id"], "status": "paused" });
    let (status, _) = send(&app, "POST", &uri, Some(author), Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", &uri, Some(author), Some(json!({ "op": "update" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn undecodable_log_ops_are_bad_requests() {
    let app = app().await;
    let author = Uuid::new_v4();
    let id = create_room(&app, author, 1).await;
    let uri = format!("/posts/{id}/experiments");

    for body in [
      json!({ "op": "update", "experiment_id": "nope" }),
      json!({ "op": "frobnicate" }),
      json!({ "question": "q" }),
      json!({ "op": "append", "question": 7 }),
    ] {
      let (status, err) = send(&app, "POST", &uri, Some(author), Some(body.clone())).await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
      assert!(err["error"].is_string(), "body {body}");
    }

    let (_, post) = send(&app, "GET", &format!("/posts/{id}"), Some(author), None).await;
    assert_eq!(post["experiments"], json!([]));
  }

  #[tokio::test]
  async fn undecodable_bodies_and_queries_are_bad_requests() {
    let app = app().await;
    let member = Uuid::new_v4();
    let id = create_room(&app, member, 5).await;

    let cases = [
      ("POST", "/posts".to_owned(), Some(json!({ "target_count": 3 }))),
      ("POST", "/posts".to_owned(), Some(json!({ "title": "x", "target_count": -1 }))),
      ("POST", format!("/posts/{id}/comments"), Some(json!({ "body": 12 }))),
      ("POST", format!("/posts/{id}/vote"), Some(json!({}))),
      ("GET", "/posts?limit=many".to_owned(), None),
      ("GET", "/search?q=x&offset=-1".to_owned(), None),
    ];
    for (method, uri, body) in cases {
      let (status, err) = send(&app, method, &uri, Some(member), body).await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
      assert!(err["error"].is_string(), "{method} {uri}");
    }
  }

  #[tokio::test]
  async fn unparseable_post_id_looks_missing() {
    let app = app().await;
    let member = Uuid::new_v4();
    for (method, uri) in [
      ("GET", "/posts/not-a-uuid"),
      ("DELETE", "/posts/not-a-uuid"),
      ("POST", "/posts/not-a-uuid/join"),
      ("GET", "/posts/not-a-uuid/members"),
      ("GET", "/posts/not-a-uuid/comments"),
    ] {
      let (status, err) = send(&app, method, uri, Some(member), None).await;
      assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
      assert!(err["error"].as_str().unwrap().contains("not found"));
    }
  }

  // ── Comments and votes ───────────────────────────────────────────────────────

  #[tokio::test]
  async fn comments_and_votes_on_open_post() {
    let app = app().await;
    let id = create_room(&app, Uuid::new_v4(), 10).await;
    let voter = Uuid::new_v4();

    let (status, _) = send(
      &app,
      "POST",
      &format!("/posts/{id}/comments"),
      Some(voter),
      Some(json!({ "body": "interested" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, comments) = send(&app, "GET", &format!("/posts/{id}/comments"), None, None).await;
    assert_eq!(comments.as_array().unwrap().len(), 1);

    let vote_uri = format!("/posts/{id}/vote");
    let (status, tally) = send(&app, "POST", &vote_uri, Some(voter), Some(json!({ "direction": "up" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tally, json!({ "up": 1, "down": 0, "score": 1 }));

    let (status, _) = send(&app, "POST", &vote_uri, Some(voter), Some(json!({ "direction": "sideways" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
  }

  // ── Error mapping ────────────────────────────────────────────────────────────

  #[derive(Debug, thiserror::Error)]
  #[error("database is locked")]
  struct Locked;

  impl Classify for Locked {
    fn class(&self) -> ErrorClass<'_> { ErrorClass::Transient }
  }

  #[test]
  fn transient_failure_asks_for_retry() {
    let resp = ApiError::store(Locked).into_response();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(resp.headers().get(header::RETRY_AFTER).unwrap(), "1");
  }
}
