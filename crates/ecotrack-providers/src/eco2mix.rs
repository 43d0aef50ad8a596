//! RTE éCO2mix grid carbon-intensity adapter.
//!
//! The dataset is national: it is queried once per run and every reading
//! applies to every zone.

use ecotrack_core::{
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
pub struct Eco2MixConfig {
  pub base_url:  String,
  /// Most recent records requested per run.
  pub limit:     usize,
  pub order_by:  String,
  /// ODSQL `where` expression applied server side.
  pub filter:    String,
  pub perimeter: String,
}

impl Default for Eco2MixConfig {
  fn default() -> Self {
    Self {
      base_url:  "https://odre.opendatasoft.com/api/explore/v2.1/catalog/datasets/eco2mix-national-tr/records".into(),
      limit:     100,
      order_by:  "date_heure desc".into(),
      filter:    "taux_co2 > 0".into(),
      perimeter: "France".into(),
    }
  }
}

// ─── Payload ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RecordsResponse {
  #[serde(default)]
  results: Vec<Eco2MixRecord>,
}

#[derive(Debug, Deserialize)]
struct Eco2MixRecord {
  #[serde(default)]
  date_heure: Value,
  #[serde(default)]
  taux_co2:   RawValue,
}

fn into_candidates(
  payload: RecordsResponse,
  window: FetchWindow,
  perimeter: &str,
) -> Vec<CandidateReading> {
  let mut extra = Map::new();
  extra.insert("source_originale".into(), Value::from("Eco2Mix"));

  payload
    .results
    .into_iter()
    .take(window.max_samples)
    .map(|record| CandidateReading {
      // A missing timestamp surfaces as a parse error during normalization.
      timestamp:          timestamp_text(&record.date_heure),
      utc_offset_seconds: 0,
      value:              record.taux_co2,
      quantity:           Quantity::CarbonIntensity { perimeter: perimeter.to_owned() },
      extra:              extra.clone(),
    })
    .collect()
}

// ─── Provider ────────────────────────────────────────────────────────────────

/// Adapter for the RTE éCO2mix real-time national dataset.
#[derive(Clone)]
pub struct Eco2MixProvider {
  client: Client,
  config: Eco2MixConfig,
}

impl Eco2MixProvider {
  pub fn new(client: Client, config: Eco2MixConfig) -> Self {
    Self { client, config }
  }
}

impl Provider for Eco2MixProvider {
  fn descriptor(&self) -> NewSource {
    NewSource::new(
      "RTE",
      "https://www.rte-france.com/eco2mix",
      "Carbon intensity (France)",
    )
  }

  fn scope(&self) -> ProviderScope { ProviderScope::National }

  fn default_window(&self) -> FetchWindow {
    FetchWindow { max_samples: self.config.limit }
  }

  async fn fetch(
    &self,
    target: FetchTarget<'_>,
    window: FetchWindow,
  ) -> Result<Vec<CandidateReading>, FetchError> {
    if !matches!(target, FetchTarget::National) {
      return Err(FetchError::UnsupportedTarget("national"));
    }

    let req = self.client.get(&self.config.base_url).query(&[
      ("limit", window.max_samples.to_string()),
      ("order_by", self.config.order_by.clone()),
      ("where", self.config.filter.clone()),
    ]);

    let payload: RecordsResponse = get_json(req).await?;
    let candidates = into_candidates(payload, window, &self.config.perimeter);
    tracing::debug!(candidates = candidates.len(), "fetched grid carbon intensity");
    Ok(candidates)
  }
}
