//! Runtime configuration, layered from an optional TOML file and
//! `ECOTRACK_*` environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use ecotrack_core::registry::NewZone;
use ecotrack_providers::{Eco2MixConfig, OpenMeteoConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
  /// SQLite database file.
  pub store_path:           PathBuf,
  /// Upper bound on every provider request.
  pub request_timeout_secs: u64,
  /// Zone names ingested by zone-scoped providers.
  pub zones:                Vec<String>,
  /// Zones created by `zones provision`.
  pub provision:            Vec<NewZone>,
  pub air_quality:          OpenMeteoConfig,
  pub grid_carbon:          Eco2MixConfig,
}

impl Default for IngestConfig {
  fn default() -> Self {
    Self {
      store_path:           PathBuf::from("ecotrack.db"),
      request_timeout_secs: 10,
      zones:                vec!["Paris".into(), "Lyon".into()],
      provision:            vec![
        NewZone { name: "Paris".into(), latitude: 48.8566, longitude: 2.3522 },
        NewZone { name: "Lyon".into(), latitude: 45.7640, longitude: 4.8357 },
      ],
      air_quality:          OpenMeteoConfig::default(),
      grid_carbon:          Eco2MixConfig::default(),
    }
  }
}

impl IngestConfig {
  /// Read `path` (if it exists), then apply `ECOTRACK_*` overrides.
  ///
  /// Nested keys use `__` (`ECOTRACK_AIR_QUALITY__TIMEZONE`); `ECOTRACK_ZONES`
  /// takes a comma-separated list.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("ECOTRACK")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true)
          .list_separator(",")
          .with_list_parse_key("zones"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn request_timeout(&self) -> Duration {
    Duration::from_secs(self.request_timeout_secs)
  }
}

#[cfg(test)]
mod tests {
  use config::{Config, File, FileFormat};

  use super::*;

  fn from_toml(raw: &str) -> IngestConfig {
    Config::builder()
      .add_source(File::from_str(raw, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_yields_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.zones, ["Paris", "Lyon"]);
    assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
    assert_eq!(cfg.air_quality.max_samples, 24);
    assert_eq!(cfg.air_quality.timezone, "GMT");
    assert_eq!(cfg.grid_carbon.limit, 100);
  }

  #[test]
  fn nested_sections_override_individual_fields() {
    let cfg = from_toml(
      r#"
        store_path = "/var/lib/ecotrack/indicators.db"
        zones = ["Lyon"]

        [air_quality]
        timezone = "Europe/Paris"

        [[provision]]
        name = "Lyon"
        latitude = 45.764
        longitude = 4.8357
      "#,
    );
    assert_eq!(cfg.store_path, PathBuf::from("/var/lib/ecotrack/indicators.db"));
    assert_eq!(cfg.zones, ["Lyon"]);
    assert_eq!(cfg.air_quality.timezone, "Europe/Paris");
    assert_eq!(cfg.air_quality.max_samples, 24);
    assert_eq!(cfg.provision.len(), 1);
  }
}
