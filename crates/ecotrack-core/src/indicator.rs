//! Indicator types: the normalized measurement record.
//!
//! An indicator is an immutable, timestamped measurement tied to a zone and a
//! source. Ingestion only ever inserts missing indicators; it never updates or
//! deletes one.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  Error, Result,
  registry::{SourceId, ZoneId},
};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Category tag of an indicator; stored in the `kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
  /// Air pollutant concentration.
  Air,
  /// Carbon intensity of electricity generation.
  Co2,
}

impl IndicatorKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Air => "air",
      Self::Co2 => "co2",
    }
  }

  /// The unit every indicator of this kind is expressed in.
  pub fn unit(self) -> &'static str {
    match self {
      Self::Air => "µg/m³",
      Self::Co2 => "gCO2/kWh",
    }
  }
}

impl FromStr for IndicatorKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "air" => Ok(Self::Air),
      "co2" => Ok(Self::Co2),
      other => Err(Error::UnknownKind(other.to_owned())),
    }
  }
}

impl fmt::Display for IndicatorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Pollutant ───────────────────────────────────────────────────────────────

/// Air pollutants tracked by the air-quality provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pollutant {
  #[serde(rename = "PM10")]
  Pm10,
  #[serde(rename = "PM2.5")]
  Pm2_5,
  #[serde(rename = "NO2")]
  No2,
  #[serde(rename = "O3")]
  O3,
  #[serde(rename = "CO")]
  Co,
}

impl Pollutant {
  pub const ALL: [Pollutant; 5] =
    [Self::Pm10, Self::Pm2_5, Self::No2, Self::O3, Self::Co];

  /// The code stored in indicator metadata (`"PM10"`, `"PM2.5"`, ...).
  pub fn code(self) -> &'static str {
    match self {
      Self::Pm10 => "PM10",
      Self::Pm2_5 => "PM2.5",
      Self::No2 => "NO2",
      Self::O3 => "O3",
      Self::Co => "CO",
    }
  }
}

impl FromStr for Pollutant {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|p| p.code() == s)
      .ok_or_else(|| Error::UnknownPollutant(s.to_owned()))
  }
}

impl fmt::Display for Pollutant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.code())
  }
}

// ─── Metadata ────────────────────────────────────────────────────────────────

/// Qualifiers of an `air` indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityMetadata {
  pub pollutant: Pollutant,
  /// Provider-specific extras carried through untouched.
  #[serde(flatten)]
  pub extra:     Map<String, Value>,
}

/// Qualifiers of a `co2` indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarbonMetadata {
  /// Geographic perimeter the intensity was computed over (e.g. "France").
  #[serde(rename = "perimetre")]
  pub perimeter: String,
  #[serde(flatten)]
  pub extra:     Map<String, Value>,
}

/// The typed metadata of an indicator. The variant name is the indicator's
/// kind; the inner payload is what the `metadata_json` column stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum IndicatorMetadata {
  Air(AirQualityMetadata),
  Co2(CarbonMetadata),
}

impl IndicatorMetadata {
  pub fn kind(&self) -> IndicatorKind {
    match self {
      Self::Air(_) => IndicatorKind::Air,
      Self::Co2(_) => IndicatorKind::Co2,
    }
  }

  /// The discriminating qualifier that takes part in an indicator's logical
  /// identity. Empty for kinds without sub-categories.
  pub fn qualifier(&self) -> &'static str {
    match self {
      Self::Air(m) => m.pollutant.code(),
      Self::Co2(_) => "",
    }
  }

  /// Serialise the inner payload (without the kind tag).
  pub fn to_json(&self) -> Result<Value> {
    // The full serialised form is `{"kind": "...", "data": <payload>}`.
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(Value::Null))
  }

  /// Rebuild from the kind and the payload stored in the database.
  pub fn from_parts(kind: IndicatorKind, data: Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "kind": kind.as_str(), "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Indicator ───────────────────────────────────────────────────────────────

/// Stable key of an [`Indicator`] row.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct IndicatorId(pub i64);

/// A persisted indicator. Once written, no field is ever updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
  pub indicator_id: IndicatorId,
  pub source_id:    SourceId,
  pub zone_id:      ZoneId,
  pub value:        f64,
  pub unit:         String,
  /// The instant the measurement applies to.
  pub timestamp:    DateTime<Utc>,
  pub metadata:     IndicatorMetadata,
  /// When the row was written; not part of the indicator's identity.
  pub recorded_at:  DateTime<Utc>,
}

impl Indicator {
  pub fn kind(&self) -> IndicatorKind { self.metadata.kind() }
}

/// A normalized indicator that has not been written yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIndicator {
  pub source_id: SourceId,
  pub zone_id:   ZoneId,
  pub value:     f64,
  pub unit:      String,
  pub timestamp: DateTime<Utc>,
  pub metadata:  IndicatorMetadata,
}

impl NewIndicator {
  pub fn kind(&self) -> IndicatorKind { self.metadata.kind() }

  /// The logical identity used for deduplication.
  pub fn key(&self) -> IndicatorKey {
    IndicatorKey {
      source_id: self.source_id,
      zone_id:   self.zone_id,
      kind:      self.kind(),
      timestamp: self.timestamp,
      qualifier: self.metadata.qualifier(),
    }
  }
}

/// `(source, zone, kind, timestamp, qualifier)`: no two stored indicators
/// share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndicatorKey {
  pub source_id: SourceId,
  pub zone_id:   ZoneId,
  pub kind:      IndicatorKind,
  pub timestamp: DateTime<Utc>,
  pub qualifier: &'static str,
}
