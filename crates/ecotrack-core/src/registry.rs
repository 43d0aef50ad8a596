//! Zones and sources: the two catalogs every indicator points into.
//!
//! Zones are provisioned ahead of time and are read-only to ingestion.
//! Sources are created lazily, the first time a provider is ingested.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Stable key of a [`Zone`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ZoneId(pub i64);

/// Stable key of a [`Source`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SourceId(pub i64);

impl fmt::Display for ZoneId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl fmt::Display for SourceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Zone ────────────────────────────────────────────────────────────────────

/// A named geographic area, the subject of measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
  pub zone_id:   ZoneId,
  /// Unique, human-readable name (e.g. "Paris").
  pub name:      String,
  pub latitude:  f64,
  pub longitude: f64,
}

/// Input to [`crate::store::IndicatorStore::add_zone`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewZone {
  pub name:      String,
  pub latitude:  f64,
  pub longitude: f64,
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// The registered identity of an external data provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
  pub source_id:   SourceId,
  /// Unique provider name (e.g. "Open-Meteo").
  pub name:        String,
  pub url:         String,
  pub description: String,
}

/// Identity a provider registers under; input to
/// [`crate::store::IndicatorStore::get_or_create_source`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSource {
  pub name:        String,
  pub url:         String,
  pub description: String,
}

impl NewSource {
  pub fn new(
    name: impl Into<String>,
    url: impl Into<String>,
    description: impl Into<String>,
  ) -> Self {
    Self {
      name:        name.into(),
      url:         url.into(),
      description: description.into(),
    }
  }
}
