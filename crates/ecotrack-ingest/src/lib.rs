//! Ingestion runs for EcoTrack.
//!
//! [`Orchestrator`] drives any [`ecotrack_core::provider::Provider`] against
//! any [`ecotrack_core::store::IndicatorStore`]; the `ecotrack-ingest` binary
//! wires it to the HTTP adapters and the SQLite store.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod summary;

pub use config::IngestConfig;
pub use error::IngestError;
pub use orchestrator::Orchestrator;
pub use summary::{RunStatus, RunSummary, SkipReason, SkippedZone};
