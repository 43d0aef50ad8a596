//! HTTP adapters for the external data providers EcoTrack ingests from.
//!
//! Each adapter implements [`ecotrack_core::provider::Provider`]: it fetches a
//! raw JSON payload and maps it into provider-agnostic candidate readings.

mod http;

pub mod eco2mix;
pub mod open_meteo;

pub use eco2mix::{Eco2MixConfig, Eco2MixProvider};
pub use http::build_client;
pub use open_meteo::{OpenMeteoConfig, OpenMeteoProvider};
