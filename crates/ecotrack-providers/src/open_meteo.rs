//! Open-Meteo air-quality adapter.
//!
//! Queried once per zone by coordinates. The hourly block holds one time axis
//! and one series per requested channel; each (sample, channel) pair becomes a
//! candidate reading.

use std::collections::HashMap;

use ecotrack_core::{
  indicator::Pollutant,
  provider::{
    CandidateReading, FetchError, FetchTarget, FetchWindow, Provider,
    ProviderScope, Quantity, RawValue, timestamp_text,
  },
  registry::NewSource,
};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::http::get_json;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenMeteoConfig {
  pub base_url:    String,
  /// Timezone the provider expresses its naive timestamps in. The response
  /// carries a single offset for the whole axis, so a zone with daylight
  /// saving shifts samples across a transition; keep the UTC default.
  pub timezone:    String,
  /// Samples kept per channel, counted from the start of the time axis.
  pub max_samples: usize,
}

impl Default for OpenMeteoConfig {
  fn default() -> Self {
    Self {
      base_url:    "https://air-quality-api.open-meteo.com/v1/air-quality".into(),
      timezone:    "GMT".into(),
      max_samples: 24,
    }
  }
}

/// Query-string name of each pollutant's hourly channel.
fn channel(pollutant: Pollutant) -> &'static str {
  match pollutant {
    Pollutant::Pm10 => "pm10",
    Pollutant::Pm2_5 => "pm2_5",
    Pollutant::No2 => "nitrogen_dioxide",
    Pollutant::O3 => "ozone",
    Pollutant::Co => "carbon_monoxide",
  }
}

// ─── Payload ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AirQualityResponse {
  /// Offset of `timezone`; the time axis carries no zone designator.
  #[serde(default)]
  utc_offset_seconds: i32,
  hourly:             Option<HourlyBlock>,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
  time:     Vec<Value>,
  #[serde(flatten)]
  channels: HashMap<String, Vec<RawValue>>,
}

fn into_candidates(
  payload: AirQualityResponse,
  window: FetchWindow,
) -> Result<Vec<CandidateReading>, FetchError> {
  let hourly = payload
    .hourly
    .ok_or_else(|| FetchError::Malformed("missing `hourly` block".into()))?;

  let mut candidates = Vec::new();
  for (i, time) in hourly.time.iter().take(window.max_samples).enumerate() {
    for pollutant in Pollutant::ALL {
      // A channel absent from the payload yields no candidates at all.
      let Some(series) = hourly.channels.get(channel(pollutant)) else {
        continue;
      };
      candidates.push(CandidateReading {
        timestamp:          timestamp_text(time),
        utc_offset_seconds: payload.utc_offset_seconds,
        value:              series.get(i).cloned().unwrap_or_default(),
        quantity:           Quantity::Pollutant(pollutant),
        extra:              Map::new(),
      });
    }
  }
  Ok(candidates)
}

// ─── Provider ────────────────────────────────────────────────────────────────

/// Adapter for the Open-Meteo air-quality API.
#[derive(Clone)]
pub struct OpenMeteoProvider {
  client: Client,
  config: OpenMeteoConfig,
}

impl OpenMeteoProvider {
  pub fn new(client: Client, config: OpenMeteoConfig) -> Self {
    Self { client, config }
  }
}

impl Provider for OpenMeteoProvider {
  fn descriptor(&self) -> NewSource {
    NewSource::new(
      "Open-Meteo",
      "https://open-meteo.com",
      "Real-time weather and air quality data",
    )
  }

  fn scope(&self) -> ProviderScope { ProviderScope::Local }

  fn default_window(&self) -> FetchWindow {
    FetchWindow { max_samples: self.config.max_samples }
  }

  async fn fetch(
    &self,
    target: FetchTarget<'_>,
    window: FetchWindow,
  ) -> Result<Vec<CandidateReading>, FetchError> {
    let FetchTarget::Zone(zone) = target else {
      return Err(FetchError::UnsupportedTarget("local"));
    };

    let hourly = Pollutant::ALL.map(channel).join(",");
    let req = self.client.get(&self.config.base_url).query(&[
      ("latitude", zone.latitude.to_string()),
      ("longitude", zone.longitude.to_string()),
      ("hourly", hourly),
      ("timezone", self.config.timezone.clone()),
    ]);

    let payload: AirQualityResponse = get_json(req).await?;
    let candidates = into_candidates(payload, window)?;
    tracing::debug!(
      zone = %zone.name,
      candidates = candidates.len(),
      "fetched air quality"
    );
    Ok(candidates)
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use ecotrack_core::registry::{Zone, ZoneId};
  use serde_json::json;
  use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
  };

  use super::*;
  use crate::build_client;

  fn paris() -> Zone {
    Zone {
      zone_id:   ZoneId(1),
      name:      "Paris".into(),
      latitude:  48.8566,
      longitude: 2.3522,
    }
  }

  async fn provider_for(server: &MockServer, timeout: Duration) -> OpenMeteoProvider {
    OpenMeteoProvider::new(
      build_client(timeout).unwrap(),
      OpenMeteoConfig {
        base_url: format!("{}/v1/air-quality", server.uri()),
        ..Default::default()
      },
    )
  }

  fn window(max_samples: usize) -> FetchWindow { FetchWindow { max_samples } }

  #[tokio::test]
  async fn maps_channels_and_keeps_nulls_as_missing_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/v1/air-quality"))
      .and(query_param("latitude", "48.8566"))
      .and(query_param("longitude", "2.3522"))
      .and(query_param("hourly", "pm10,pm2_5,nitrogen_dioxide,ozone,carbon_monoxide"))
      .and(query_param("timezone", "GMT"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "utc_offset_seconds": 0,
        "hourly": {
          "time": ["2024-01-01T00:00"],
          "pm10": [10.1],
          "pm2_5": [null]
        }
      })))
      .expect(1)
      .mount(&server)
      .await;

    let provider = provider_for(&server, Duration::from_secs(5)).await;
    let candidates = provider
      .fetch(FetchTarget::Zone(&paris()), window(24))
      .await
      .unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].quantity, Quantity::Pollutant(Pollutant::Pm10));
    assert_eq!(candidates[0].value, RawValue::Number(10.1));
    assert_eq!(candidates[0].utc_offset_seconds, 0);
    assert_eq!(candidates[1].quantity, Quantity::Pollutant(Pollutant::Pm2_5));
    assert_eq!(candidates[1].value, RawValue::Missing);
  }

  #[tokio::test]
  async fn bad_sample_does_not_reject_the_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "utc_offset_seconds": 0,
        "hourly": {
          "time": ["2024-01-01T00:00", 1704070800],
          "pm10": [10.1, 11.0],
          "ozone": ["n/a", 52.0]
        }
      })))
      .mount(&server)
      .await;

    let provider = provider_for(&server, Duration::from_secs(5)).await;
    let candidates = provider
      .fetch(FetchTarget::Zone(&paris()), window(24))
      .await
      .unwrap();

    assert_eq!(candidates.len(), 4);
    assert_eq!(candidates[0].value, RawValue::Number(10.1));
    assert_eq!(candidates[1].value, RawValue::Invalid("\"n/a\"".into()));
    assert_eq!(candidates[2].timestamp, "1704070800");
    assert_eq!(candidates[3].value, RawValue::Number(52.0));
  }

  #[tokio::test]
  async fn window_caps_samples_per_channel() {
    let server = MockServer::start().await;
    let times: Vec<String> =
      (0..48).map(|h| format!("2024-01-{:02}T{:02}:00", 1 + h / 24, h % 24)).collect();
    let values: Vec<f64> = (0..48).map(f64::from).collect();
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({
        "hourly": { "time": times, "ozone": values }
      })))
      .mount(&server)
      .await;

    let provider = provider_for(&server, Duration::from_secs(5)).await;
    let candidates = provider
      .fetch(FetchTarget::Zone(&paris()), provider.default_window())
      .await
      .unwrap();

    assert_eq!(candidates.len(), 24);
    assert_eq!(candidates[23].timestamp, "2024-01-01T23:00");
  }

  #[tokio::test]
  async fn non_success_status_is_a_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(503))
      .mount(&server)
      .await;

    let provider = provider_for(&server, Duration::from_secs(5)).await;
    let err = provider
      .fetch(FetchTarget::Zone(&paris()), window(24))
      .await
      .unwrap_err();
    assert_eq!(err, FetchError::Status(503));
  }

  #[tokio::test]
  async fn missing_hourly_block_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "error": false })))
      .mount(&server)
      .await;

    let provider = provider_for(&server, Duration::from_secs(5)).await;
    let err = provider
      .fetch(FetchTarget::Zone(&paris()), window(24))
      .await
      .unwrap_err();
    assert!(matches!(err, FetchError::Malformed(_)));
  }

  #[tokio::test]
  async fn slow_provider_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(json!({ "hourly": { "time": [] } }))
          .set_delay(Duration::from_secs(2)),
      )
      .mount(&server)
      .await;

    let provider = provider_for(&server, Duration::from_millis(100)).await;
    let err = provider
      .fetch(FetchTarget::Zone(&paris()), window(24))
      .await
      .unwrap_err();
    assert_eq!(err, FetchError::Timeout);
  }

  #[tokio::test]
  async fn national_target_is_rejected() {
    let server = MockServer::start().await;
    let provider = provider_for(&server, Duration::from_secs(5)).await;
    let err = provider
      .fetch(FetchTarget::National, window(24))
      .await
      .unwrap_err();
    assert_eq!(err, FetchError::UnsupportedTarget("local"));
  }
}
