//! Core types and trait definitions for the EcoTrack ingestion pipeline.
//!
//! This crate is free of HTTP and database dependencies. Provider adapters,
//! storage backends and the orchestrator all depend on it.

pub mod error;
pub mod indicator;
pub mod normalize;
pub mod provider;
pub mod registry;
pub mod store;

pub use error::{Error, Result};
