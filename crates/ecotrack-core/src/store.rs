//! The `IndicatorStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `ecotrack-store-sqlite`). The orchestrator depends on this abstraction, not
//! on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  indicator::{Indicator, IndicatorId, IndicatorKind, NewIndicator},
  registry::{NewSource, NewZone, Source, SourceId, Zone, ZoneId},
};

// ─── Upsert outcome ──────────────────────────────────────────────────────────

/// What happened to one candidate handed to the upsert engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
  /// No indicator with the same logical identity existed; a row was written.
  Inserted(IndicatorId),
  /// The existence check found a matching indicator; nothing was written.
  SkippedDuplicate,
  /// The existence check passed but the storage uniqueness constraint fired
  /// on insert, i.e. a concurrent writer got there first. Equivalent to
  /// [`UpsertOutcome::SkippedDuplicate`] for callers.
  Conflict,
}

impl UpsertOutcome {
  pub fn is_inserted(&self) -> bool { matches!(self, Self::Inserted(_)) }
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`IndicatorStore::list_indicators`].
#[derive(Debug, Clone, Default)]
pub struct IndicatorQuery {
  pub zone_id:   Option<ZoneId>,
  pub source_id: Option<SourceId>,
  pub kind:      Option<IndicatorKind>,
  /// Inclusive lower bound on the measurement timestamp.
  pub from:      Option<DateTime<Utc>>,
  /// Exclusive upper bound on the measurement timestamp.
  pub until:     Option<DateTime<Utc>>,
  pub limit:     Option<usize>,
  pub offset:    Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an EcoTrack indicator store.
///
/// Indicators are insert-only: the store never updates or deletes one. All
/// methods return `Send` futures so the trait can be driven from spawned
/// tokio tasks.
pub trait IndicatorStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Zones ─────────────────────────────────────────────────────────────

  /// Provision a new zone. Fails if the name is already taken.
  fn add_zone(
    &self,
    zone: NewZone,
  ) -> impl Future<Output = Result<Zone, Self::Error>> + Send + '_;

  /// Look a zone up by its unique name.
  fn find_zone_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Zone>, Self::Error>> + Send + 'a;

  /// List every known zone, ordered by name.
  fn list_zones(
    &self,
  ) -> impl Future<Output = Result<Vec<Zone>, Self::Error>> + Send + '_;

  // ── Sources ───────────────────────────────────────────────────────────

  /// Return the source named `source.name`, creating it if absent.
  ///
  /// Idempotent, and safe under concurrent callers: exactly one row is ever
  /// created per name, and an existing row is returned unchanged.
  fn get_or_create_source(
    &self,
    source: NewSource,
  ) -> impl Future<Output = Result<Source, Self::Error>> + Send + '_;

  fn list_sources(
    &self,
  ) -> impl Future<Output = Result<Vec<Source>, Self::Error>> + Send + '_;

  // ── Indicators ────────────────────────────────────────────────────────

  /// Insert `indicator` unless one with the same logical identity exists.
  fn upsert(
    &self,
    indicator: NewIndicator,
  ) -> impl Future<Output = Result<UpsertOutcome, Self::Error>> + Send + '_;

  /// Upsert every indicator inside a single transaction.
  ///
  /// Outcomes are returned in input order. If any row fails for a reason
  /// other than a duplicate, the whole batch is rolled back and nothing is
  /// visible.
  fn upsert_batch(
    &self,
    indicators: Vec<NewIndicator>,
  ) -> impl Future<Output = Result<Vec<UpsertOutcome>, Self::Error>> + Send + '_;

  /// List committed indicators matching `query`, ordered by timestamp.
  fn list_indicators<'a>(
    &'a self,
    query: &'a IndicatorQuery,
  ) -> impl Future<Output = Result<Vec<Indicator>, Self::Error>> + Send + 'a;
}
