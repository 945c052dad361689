//! Error type for `haven-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] haven_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Attempted to start a session for a user that does not exist.
  #[error("user not found: {0}")]
  UserNotFound(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
