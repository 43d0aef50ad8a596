//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that equal
//! instants always encode identically and lexical order matches time order.
//! Indicator metadata is stored as compact JSON (inner payload only).

use chrono::{DateTime, SecondsFormat, Utc};
use ecotrack_core::{
  indicator::{Indicator, IndicatorId, IndicatorKind, IndicatorMetadata, NewIndicator},
  registry::{Source, SourceId, Zone, ZoneId},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Indicator rows ──────────────────────────────────────────────────────────

/// A [`NewIndicator`] encoded into column values, ready to be moved onto the
/// connection thread.
#[derive(Debug, Clone)]
pub struct IndicatorRow {
  pub source_id:     i64,
  pub zone_id:       i64,
  pub kind:          &'static str,
  pub value:         f64,
  pub unit:          String,
  pub observed_at:   String,
  pub qualifier:     &'static str,
  pub metadata_json: String,
}

impl IndicatorRow {
  pub fn encode(indicator: &NewIndicator) -> Result<Self> {
    Ok(Self {
      source_id:     indicator.source_id.0,
      zone_id:       indicator.zone_id.0,
      kind:          indicator.kind().as_str(),
      value:         indicator.value,
      unit:          indicator.unit.clone(),
      observed_at:   encode_dt(indicator.timestamp),
      qualifier:     indicator.metadata.qualifier(),
      metadata_json: indicator.metadata.to_json()?.to_string(),
    })
  }
}

/// Raw values read directly from an `indicators` row.
pub struct RawIndicator {
  pub indicator_id:  i64,
  pub source_id:     i64,
  pub zone_id:       i64,
  pub kind:          String,
  pub value:         f64,
  pub unit:          String,
  pub observed_at:   String,
  pub metadata_json: String,
  pub recorded_at:   String,
}

impl RawIndicator {
  pub fn into_indicator(self) -> Result<Indicator> {
    let kind: IndicatorKind = self.kind.parse()?;
    let payload: serde_json::Value = serde_json::from_str(&self.metadata_json)?;

    Ok(Indicator {
      indicator_id: IndicatorId(self.indicator_id),
      source_id:    SourceId(self.source_id),
      zone_id:      ZoneId(self.zone_id),
      value:        self.value,
      unit:         self.unit,
      timestamp:    decode_dt(&self.observed_at)?,
      metadata:     IndicatorMetadata::from_parts(kind, payload)?,
      recorded_at:  decode_dt(&self.recorded_at)?,
    })
  }
}

// ─── Registry rows ───────────────────────────────────────────────────────────

/// Raw values read directly from a `zones` row.
pub struct RawZone {
  pub zone_id:   i64,
  pub name:      String,
  pub latitude:  f64,
  pub longitude: f64,
}

impl RawZone {
  pub fn into_zone(self) -> Zone {
    Zone {
      zone_id:   ZoneId(self.zone_id),
      name:      self.name,
      latitude:  self.latitude,
      longitude: self.longitude,
    }
  }
}

/// Raw values read directly from a `sources` row.
pub struct RawSource {
  pub source_id:   i64,
  pub name:        String,
  pub url:         String,
  pub description: String,
}

impl RawSource {
  pub fn into_source(self) -> Source {
    Source {
      source_id:   SourceId(self.source_id),
      name:        self.name,
      url:         self.url,
      description: self.description,
    }
  }
}
