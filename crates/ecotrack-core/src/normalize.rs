//! Candidate reading → [`NewIndicator`] conversion.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone as _, Utc};
use thiserror::Error;

use crate::{
  indicator::{AirQualityMetadata, CarbonMetadata, IndicatorMetadata, NewIndicator},
  provider::{CandidateReading, Quantity, RawValue},
  registry::{Source, Zone},
};

/// Naive layouts accepted when a provider omits the zone designator.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

/// A candidate that cannot become an indicator. Recovered by dropping the
/// candidate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("unparseable timestamp: {0:?}")]
  Timestamp(String),

  #[error("utc offset out of range: {0}s")]
  Offset(i32),

  #[error("value is not a number: {0}")]
  Value(String),

  #[error("value is not a finite number")]
  NonFiniteValue,
}

/// Normalize `candidate` for `zone`, attributed to `source`.
///
/// Returns `Ok(None)` when the provider reported no value; such candidates are
/// dropped without being treated as errors.
pub fn normalize(
  candidate: &CandidateReading,
  zone: &Zone,
  source: &Source,
) -> Result<Option<NewIndicator>, ParseError> {
  let raw_value = match &candidate.value {
    RawValue::Missing => return Ok(None),
    RawValue::Invalid(raw) => return Err(ParseError::Value(raw.clone())),
    RawValue::Number(v) => *v,
  };
  if !raw_value.is_finite() {
    return Err(ParseError::NonFiniteValue);
  }

  let timestamp =
    parse_timestamp(&candidate.timestamp, candidate.utc_offset_seconds)?;

  let metadata = match &candidate.quantity {
    Quantity::Pollutant(pollutant) => IndicatorMetadata::Air(AirQualityMetadata {
      pollutant: *pollutant,
      extra:     candidate.extra.clone(),
    }),
    Quantity::CarbonIntensity { perimeter } => {
      IndicatorMetadata::Co2(CarbonMetadata {
        perimeter: perimeter.clone(),
        extra:     candidate.extra.clone(),
      })
    }
  };

  Ok(Some(NewIndicator {
    source_id: source.source_id,
    zone_id: zone.zone_id,
    value: round2(raw_value),
    unit: candidate.quantity.kind().unit().to_owned(),
    timestamp,
    metadata,
  }))
}

/// Parse a provider timestamp into a UTC instant.
///
/// RFC 3339 strings carry their own offset; naive strings are read at
/// `utc_offset_seconds`.
pub fn parse_timestamp(
  raw: &str,
  utc_offset_seconds: i32,
) -> Result<DateTime<Utc>, ParseError> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Ok(dt.with_timezone(&Utc));
  }

  let naive = NAIVE_FORMATS
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .ok_or_else(|| ParseError::Timestamp(raw.to_owned()))?;

  let offset = FixedOffset::east_opt(utc_offset_seconds)
    .ok_or(ParseError::Offset(utc_offset_seconds))?;
  offset
    .from_local_datetime(&naive)
    .single()
    .map(|dt| dt.with_timezone(&Utc))
    .ok_or_else(|| ParseError::Timestamp(raw.to_owned()))
}

/// Round half away from zero to two decimal places.
pub fn round2(value: f64) -> f64 { (value * 100.0).round() / 100.0 }
