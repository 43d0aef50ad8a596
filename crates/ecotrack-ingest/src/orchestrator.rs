//! The ingestion orchestrator: drives one provider through fetch, normalize
//! and upsert for every zone, and reports a [`RunSummary`].
//!
//! Each zone is an independent unit of work producing a [`ZoneOutcome`]. A
//! failed zone never affects its siblings. Successful zones are staged and
//! committed together in one transaction at the end of the run, so an aborted
//! run leaves nothing behind.

use std::{collections::HashSet, sync::Arc};

use ecotrack_core::{
  indicator::NewIndicator,
  normalize::normalize,
  provider::{CandidateReading, FetchTarget, FetchWindow, Provider, ProviderScope},
  registry::{Source, Zone},
  store::IndicatorStore,
};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  error::IngestError,
  summary::{RunSummary, SkipReason},
};

/// Coarse progress markers, emitted at debug level.
#[derive(Debug, Clone, Copy)]
enum RunPhase {
  ResolvingSource,
  Fetching,
  Committing,
  Done,
}

// ─── Per-zone units of work ──────────────────────────────────────────────────

/// Normalized indicators for one zone, plus what was dropped on the way.
#[derive(Debug, Default)]
struct ZoneBatch {
  indicators:  Vec<NewIndicator>,
  null_values: usize,
  unparseable: usize,
}

#[derive(Debug)]
struct ZoneOutcome {
  zone:   String,
  result: Result<ZoneBatch, SkipReason>,
}

fn normalize_all(
  candidates: &[CandidateReading],
  zone: &Zone,
  source: &Source,
) -> ZoneBatch {
  let mut batch = ZoneBatch::default();
  for candidate in candidates {
    match normalize(candidate, zone, source) {
      Ok(Some(indicator)) => batch.indicators.push(indicator),
      Ok(None) => batch.null_values += 1,
      Err(e) => {
        debug!(zone = %zone.name, timestamp = %candidate.timestamp, "dropping candidate: {e}");
        batch.unparseable += 1;
      }
    }
  }
  batch
}

async fn process_zone<S, P>(
  store: &S,
  provider: &P,
  source: &Source,
  name: &str,
  window: FetchWindow,
) -> Result<ZoneBatch, SkipReason>
where
  S: IndicatorStore,
  P: Provider,
{
  let zone = store
    .find_zone_by_name(name)
    .await
    .map_err(|e| SkipReason::Registry(e.to_string()))?
    .ok_or(SkipReason::MissingZone)?;

  let candidates = provider
    .fetch(FetchTarget::Zone(&zone), window)
    .await
    .map_err(SkipReason::Fetch)?;

  Ok(normalize_all(&candidates, &zone, source))
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

/// Runs providers against a shared store.
///
/// Cheap to clone; concurrent runs (e.g. one per provider) may share one
/// orchestrator.
pub struct Orchestrator<S> {
  store: Arc<S>,
  /// Zone names ingested by [`ProviderScope::Local`] providers.
  zones: Vec<String>,
}

impl<S> Clone for Orchestrator<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), zones: self.zones.clone() }
  }
}

impl<S> Orchestrator<S>
where
  S: IndicatorStore + 'static,
{
  pub fn new(store: Arc<S>, zones: Vec<String>) -> Self { Self { store, zones } }

  /// Execute one ingestion run for `provider` over its default window.
  pub async fn run<P>(&self, provider: Arc<P>) -> Result<RunSummary, IngestError>
  where
    P: Provider + 'static,
  {
    let window = provider.default_window();
    self.run_with_window(provider, window).await
  }

  /// Execute one ingestion run for `provider`.
  ///
  /// Only registry unavailability and commit failure are errors; every other
  /// failure is confined to its zone or candidate and reported in the
  /// summary.
  pub async fn run_with_window<P>(
    &self,
    provider: Arc<P>,
    window: FetchWindow,
  ) -> Result<RunSummary, IngestError>
  where
    P: Provider + 'static,
  {
    let run_id = Uuid::new_v4();

    debug!(%run_id, phase = ?RunPhase::ResolvingSource);
    let source = self
      .store
      .get_or_create_source(provider.descriptor())
      .await
      .map_err(|e| IngestError::SourceRegistry(Box::new(e)))?;

    debug!(%run_id, phase = ?RunPhase::Fetching, source = %source.name);
    let mut outcomes = match provider.scope() {
      ProviderScope::Local => self.collect_local(provider, &source, window).await,
      ProviderScope::National => {
        self.collect_national(provider.as_ref(), &source, window).await?
      }
    };
    outcomes.sort_by(|a, b| a.zone.cmp(&b.zone));

    let mut summary = RunSummary::new(run_id, &source.name);
    let mut staged = Vec::new();
    for outcome in outcomes {
      match outcome.result {
        Ok(batch) => {
          summary.null_values += batch.null_values;
          summary.unparseable += batch.unparseable;
          staged.extend(batch.indicators);
        }
        Err(reason) => {
          warn!(%run_id, zone = %outcome.zone, "skipping zone: {reason}");
          summary.record_skip(outcome.zone, reason);
        }
      }
    }

    debug!(%run_id, phase = ?RunPhase::Committing, staged = staged.len());
    let results = self
      .store
      .upsert_batch(staged)
      .await
      .map_err(|e| IngestError::Commit(Box::new(e)))?;
    summary.record_outcomes(&results);

    debug!(%run_id, phase = ?RunPhase::Done);
    info!(
      %run_id,
      source = %summary.provider,
      inserted = summary.inserted,
      duplicates = summary.duplicates,
      skipped_zones = summary.skipped_zones.len(),
      "ingestion run finished"
    );
    Ok(summary)
  }

  /// One task per configured zone; outcomes are collected as they finish.
  async fn collect_local<P>(
    &self,
    provider: Arc<P>,
    source: &Source,
    window: FetchWindow,
  ) -> Vec<ZoneOutcome>
  where
    P: Provider + 'static,
  {
    let mut tasks = JoinSet::new();
    for name in &self.zones {
      let store = Arc::clone(&self.store);
      let provider = Arc::clone(&provider);
      let source = source.clone();
      let name = name.clone();
      tasks.spawn(async move {
        let result =
          process_zone(store.as_ref(), provider.as_ref(), &source, &name, window).await;
        ZoneOutcome { zone: name, result }
      });
    }

    let mut outcomes = Vec::with_capacity(self.zones.len());
    while let Some(joined) = tasks.join_next().await {
      match joined {
        Ok(outcome) => outcomes.push(outcome),
        Err(e) => warn!("zone task failed: {e}"),
      }
    }

    // A panicked task loses its outcome; account for its zone anyway.
    let reported: HashSet<String> =
      outcomes.iter().map(|o| o.zone.clone()).collect();
    let lost: Vec<ZoneOutcome> = self
      .zones
      .iter()
      .filter(|name| !reported.contains(*name))
      .map(|name| ZoneOutcome { zone: name.clone(), result: Err(SkipReason::Aborted) })
      .collect();
    outcomes.extend(lost);
    outcomes
  }

  /// Fetch once and fan the readings out to every known zone.
  async fn collect_national<P>(
    &self,
    provider: &P,
    source: &Source,
    window: FetchWindow,
  ) -> Result<Vec<ZoneOutcome>, IngestError>
  where
    P: Provider,
  {
    let zones = self
      .store
      .list_zones()
      .await
      .map_err(|e| IngestError::ZoneRegistry(Box::new(e)))?;

    let outcomes = match provider.fetch(FetchTarget::National, window).await {
      Ok(candidates) => zones
        .iter()
        .map(|zone| ZoneOutcome {
          zone:   zone.name.clone(),
          result: Ok(normalize_all(&candidates, zone, source)),
        })
        .collect(),
      Err(e) => zones
        .into_iter()
        .map(|zone| ZoneOutcome {
          zone:   zone.name,
          result: Err(SkipReason::Fetch(e.clone())),
        })
        .collect(),
    };
    Ok(outcomes)
  }
}
