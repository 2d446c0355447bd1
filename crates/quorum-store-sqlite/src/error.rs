//! Error type for `quorum-store-sqlite`.

use quorum_core::{ErrorClass, error::Classify};
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] quorum_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("corrupt row: {0}")]
  Corrupt(String),
}

impl Error {
  fn sqlite_code(&self) -> Option<ErrorCode> {
    match self {
      Self::Database(tokio_rusqlite::Error::Rusqlite(e)) | Self::Sqlite(e) => {
        e.sqlite_error_code()
      }
      _ => None,
    }
  }
}

impl Classify for Error {
  fn class(&self) -> ErrorClass<'_> {
    match self {
      Self::Core(e) => e.class(),
      _ => match self.sqlite_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => ErrorClass::Transient,
        _ => ErrorClass::Internal,
      },
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
