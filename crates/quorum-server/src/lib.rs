//! Server wiring for Quorum: configuration and the top-level HTTP app.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::Router;
use quorum_core::store::PostStore;
use quorum_store_sqlite::StoreOptions;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `QUORUM_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  pub store_path:      PathBuf,
  /// How long a write waits for the database lock before failing with 503.
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms: u64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_busy_timeout_ms() -> u64 { 5_000 }

impl ServerConfig {
  /// Load from an optional TOML file, then overlay the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("store_path", "quorum.db")?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("QUORUM"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn store_options(&self) -> StoreOptions {
    StoreOptions { busy_timeout: Duration::from_millis(self.busy_timeout_ms) }
  }

  /// `store_path` with a leading `~` expanded to the user's home directory.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// The full application: the JSON API under `/api` with request tracing.
pub fn app<S>(store: Arc<S>) -> Router
where
  S: PostStore + 'static,
{
  Router::new()
    .nest("/api", quorum_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}
