//! Error types for `ecotrack-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown indicator kind: {0:?}")]
  UnknownKind(String),

  #[error("unknown pollutant: {0:?}")]
  UnknownPollutant(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
