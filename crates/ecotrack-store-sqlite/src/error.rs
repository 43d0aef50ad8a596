//! Error type for `ecotrack-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] ecotrack_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// Attempted to provision a zone whose name is already registered.
  #[error("zone already exists: {0:?}")]
  ZoneExists(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
