//! Run summary, the operator-facing account of one ingestion run.

use std::fmt;

use ecotrack_core::{provider::FetchError, store::UpsertOutcome};
use thiserror::Error;
use uuid::Uuid;

/// Why a zone contributed nothing to a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
  #[error("zone not found in registry")]
  MissingZone,

  #[error("fetch failed: {0}")]
  Fetch(FetchError),

  #[error("zone lookup failed: {0}")]
  Registry(String),

  #[error("zone task aborted")]
  Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedZone {
  pub zone:   String,
  pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
  /// Every zone was processed.
  Complete,
  /// At least one zone was skipped; the rest were committed.
  Partial,
}

impl fmt::Display for RunStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Complete => "complete",
      Self::Partial => "partial",
    })
  }
}

/// Counts and skips accumulated over one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
  pub run_id:        Uuid,
  /// Name of the source the run ingested from.
  pub provider:      String,
  pub inserted:      usize,
  /// Candidates that already existed, conflicts included.
  pub duplicates:    usize,
  /// Duplicates detected by the storage constraint rather than the check.
  pub conflicts:     usize,
  /// Candidates dropped because the provider reported no value.
  pub null_values:   usize,
  /// Candidates dropped because they could not be normalized.
  pub unparseable:   usize,
  pub skipped_zones: Vec<SkippedZone>,
  /// One human-readable line per skipped zone.
  pub errors:        Vec<String>,
}

impl RunSummary {
  pub fn new(run_id: Uuid, provider: impl Into<String>) -> Self {
    Self {
      run_id,
      provider: provider.into(),
      inserted: 0,
      duplicates: 0,
      conflicts: 0,
      null_values: 0,
      unparseable: 0,
      skipped_zones: Vec::new(),
      errors: Vec::new(),
    }
  }

  pub fn status(&self) -> RunStatus {
    if self.skipped_zones.is_empty() {
      RunStatus::Complete
    } else {
      RunStatus::Partial
    }
  }

  pub fn skipped_zone_names(&self) -> Vec<&str> {
    self.skipped_zones.iter().map(|s| s.zone.as_str()).collect()
  }

  pub(crate) fn record_skip(&mut self, zone: String, reason: SkipReason) {
    self.errors.push(format!("{zone}: {reason}"));
    self.skipped_zones.push(SkippedZone { zone, reason });
  }

  pub(crate) fn record_outcomes(&mut self, outcomes: &[UpsertOutcome]) {
    for outcome in outcomes {
      match outcome {
        UpsertOutcome::Inserted(_) => self.inserted += 1,
        UpsertOutcome::SkippedDuplicate => self.duplicates += 1,
        UpsertOutcome::Conflict => {
          self.duplicates += 1;
          self.conflicts += 1;
        }
      }
    }
  }
}

impl fmt::Display for RunSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{} run {} ({})", self.provider, self.run_id, self.status())?;
    writeln!(f, "  inserted:      {}", self.inserted)?;
    writeln!(
      f,
      "  duplicates:    {} ({} storage conflicts)",
      self.duplicates, self.conflicts
    )?;
    writeln!(f, "  null values:   {}", self.null_values)?;
    writeln!(f, "  unparseable:   {}", self.unparseable)?;
    if self.skipped_zones.is_empty() {
      write!(f, "  skipped zones: none")
    } else {
      write!(f, "  skipped zones:")?;
      for skipped in &self.skipped_zones {
        write!(f, "\n    {}: {}", skipped.zone, skipped.reason)?;
      }
      Ok(())
    }
  }
}

#[cfg(test)]
mod tests {
  use ecotrack_core::indicator::IndicatorId;

  use super::*;

  #[test]
  fn conflicts_count_as_duplicates() {
    let mut summary = RunSummary::new(Uuid::nil(), "RTE");
    summary.record_outcomes(&[
      UpsertOutcome::Inserted(IndicatorId(1)),
      UpsertOutcome::SkippedDuplicate,
      UpsertOutcome::Conflict,
    ]);
    assert_eq!(summary.inserted, 1);
    assert_eq!(summary.duplicates, 2);
    assert_eq!(summary.conflicts, 1);
    assert_eq!(summary.status(), RunStatus::Complete);
  }

  #[test]
  fn display_lists_skipped_zones_with_reasons() {
    let mut summary = RunSummary::new(Uuid::nil(), "Open-Meteo");
    summary.record_skip("Lyon".into(), SkipReason::Fetch(FetchError::Timeout));

    let text = summary.to_string();
    assert!(text.contains("(partial)"), "{text}");
    assert!(text.contains("Lyon: fetch failed: request timed out"), "{text}");
    assert_eq!(summary.errors, ["Lyon: fetch failed: request timed out"]);
  }
}
