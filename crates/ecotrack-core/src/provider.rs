//! The `Provider` trait and the provider-agnostic candidate readings it yields.
//!
//! Adapters (e.g. `ecotrack-providers`) implement [`Provider`]. The
//! orchestrator depends on this abstraction, never on a concrete adapter.

use std::future::Future;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
  indicator::{IndicatorKind, Pollutant},
  registry::{NewSource, Zone},
};

// ─── Candidate readings ──────────────────────────────────────────────────────

/// The physical quantity a candidate reading measures.
#[derive(Debug, Clone, PartialEq)]
pub enum Quantity {
  /// Concentration of an air pollutant.
  Pollutant(Pollutant),
  /// Grid carbon intensity over a geographic perimeter.
  CarbonIntensity { perimeter: String },
}

impl Quantity {
  pub fn kind(&self) -> IndicatorKind {
    match self {
      Self::Pollutant(_) => IndicatorKind::Air,
      Self::CarbonIntensity { .. } => IndicatorKind::Co2,
    }
  }
}

/// A provider's value slot, decoded leniently so that one bad sample does not
/// reject the rest of the payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum RawValue {
  /// `null`, or no slot at all.
  #[default]
  Missing,
  Number(f64),
  /// Anything else, kept as JSON text for diagnostics.
  Invalid(String),
}

impl From<Value> for RawValue {
  fn from(value: Value) -> Self {
    match value {
      Value::Null => Self::Missing,
      Value::Number(n) => match n.as_f64() {
        Some(v) => Self::Number(v),
        None => Self::Invalid(n.to_string()),
      },
      other => Self::Invalid(other.to_string()),
    }
  }
}

impl From<Option<f64>> for RawValue {
  fn from(value: Option<f64>) -> Self {
    value.map_or(Self::Missing, Self::Number)
  }
}

/// A provider-specific, not-yet-normalized measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateReading {
  /// The provider's own timestamp string.
  pub timestamp:          String,
  /// Offset applied to `timestamp` when it carries no zone designator.
  pub utc_offset_seconds: i32,
  pub value:              RawValue,
  pub quantity:           Quantity,
  /// Provider-specific labels copied into the indicator metadata.
  pub extra:              Map<String, Value>,
}

impl CandidateReading {
  pub fn new(
    timestamp: impl Into<String>,
    value: impl Into<RawValue>,
    quantity: Quantity,
  ) -> Self {
    Self {
      timestamp: timestamp.into(),
      utc_offset_seconds: 0,
      value: value.into(),
      quantity,
      extra: Map::new(),
    }
  }
}

/// The text of a timestamp slot. Non-string slots keep their JSON text and
/// fail to parse during normalization.
pub fn timestamp_text(slot: &Value) -> String {
  match slot {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

// ─── Fetch parameters ────────────────────────────────────────────────────────

/// Whether a provider's readings are specific to a zone or national.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderScope {
  /// Queried once per zone, by coordinates.
  Local,
  /// Queried once per run; every reading applies to every zone.
  National,
}

/// What a single fetch is for.
#[derive(Debug, Clone, Copy)]
pub enum FetchTarget<'a> {
  Zone(&'a Zone),
  National,
}

/// Bounds the slice of history a provider returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
  /// Upper bound on samples per channel.
  pub max_samples: usize,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// A failed fetch. Always recoverable: the orchestrator skips the affected
/// zone (or provider) and carries on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  #[error("request timed out")]
  Timeout,

  #[error("network error: {0}")]
  Network(String),

  #[error("provider responded with HTTP {0}")]
  Status(u16),

  #[error("malformed payload: {0}")]
  Malformed(String),

  #[error("{0}-scope provider cannot serve this target")]
  UnsupportedTarget(&'static str),
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// An external data source.
pub trait Provider: Send + Sync {
  /// The identity this provider registers under.
  fn descriptor(&self) -> NewSource;

  fn scope(&self) -> ProviderScope;

  /// The window used when the caller does not ask for a specific one.
  fn default_window(&self) -> FetchWindow;

  /// Fetch raw readings for `target` and map them into candidates.
  fn fetch<'a>(
    &'a self,
    target: FetchTarget<'a>,
    window: FetchWindow,
  ) -> impl Future<Output = Result<Vec<CandidateReading>, FetchError>> + Send + 'a;
}
