//! Fatal run errors. Everything recoverable is reported in the
//! [`RunSummary`](crate::summary::RunSummary) instead.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum IngestError {
  #[error("source registry unavailable: {0}")]
  SourceRegistry(#[source] BoxError),

  #[error("zone registry unavailable: {0}")]
  ZoneRegistry(#[source] BoxError),

  /// The batch transaction failed; nothing from the run was persisted.
  #[error("commit failed, batch rolled back: {0}")]
  Commit(#[source] BoxError),
}
