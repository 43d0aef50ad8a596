//! [`SqliteStore`], the SQLite implementation of [`IndicatorStore`].

use std::{path::Path, time::Duration};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use ecotrack_core::{
  indicator::{Indicator, IndicatorId, NewIndicator},
  registry::{NewSource, NewZone, Source, Zone, ZoneId},
  store::{IndicatorQuery, IndicatorStore, UpsertOutcome},
};

use crate::{
  Error, Result,
  encode::{IndicatorRow, RawIndicator, RawSource, RawZone, encode_dt},
  schema::SCHEMA,
};

/// How long a writer waits for another process's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ─── Store ───────────────────────────────────────────────────────────────────

/// An EcoTrack indicator store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All clones
/// share one connection thread, which serializes writers within a process;
/// `BEGIN IMMEDIATE` transactions serialize writers across processes.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Row-level helpers ───────────────────────────────────────────────────────

fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _)
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

fn select_source(
  conn: &rusqlite::Connection,
  name: &str,
) -> rusqlite::Result<Option<RawSource>> {
  conn
    .query_row(
      "SELECT source_id, name, url, description FROM sources WHERE name = ?1",
      rusqlite::params![name],
      |row| {
        Ok(RawSource {
          source_id:   row.get(0)?,
          name:        row.get(1)?,
          url:         row.get(2)?,
          description: row.get(3)?,
        })
      },
    )
    .optional()
}

/// Existence check on the logical identity, then insert. Sees rows staged
/// earlier in the same transaction as well as committed ones.
pub(crate) fn stage_indicator(
  conn: &rusqlite::Connection,
  row: &IndicatorRow,
  recorded_at: &str,
) -> rusqlite::Result<UpsertOutcome> {
  let exists = conn
    .query_row(
      "SELECT 1 FROM indicators
       WHERE source_id = ?1 AND zone_id = ?2 AND kind = ?3
         AND observed_at = ?4 AND qualifier = ?5",
      rusqlite::params![
        row.source_id,
        row.zone_id,
        row.kind,
        row.observed_at,
        row.qualifier,
      ],
      |_| Ok(true),
    )
    .optional()?
    .unwrap_or(false);

  if exists {
    return Ok(UpsertOutcome::SkippedDuplicate);
  }
  insert_indicator(conn, row, recorded_at)
}

/// Plain insert. A unique-constraint failure means another writer inserted
/// the same logical indicator after our existence check; it is reported as
/// [`UpsertOutcome::Conflict`] rather than an error.
pub(crate) fn insert_indicator(
  conn: &rusqlite::Connection,
  row: &IndicatorRow,
  recorded_at: &str,
) -> rusqlite::Result<UpsertOutcome> {
  let result = conn.execute(
    "INSERT INTO indicators (
       source_id, zone_id, kind, value, unit,
       observed_at, qualifier, metadata_json, recorded_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    rusqlite::params![
      row.source_id,
      row.zone_id,
      row.kind,
      row.value,
      row.unit,
      row.observed_at,
      row.qualifier,
      row.metadata_json,
      recorded_at,
    ],
  );

  match result {
    Ok(_) => Ok(UpsertOutcome::Inserted(IndicatorId(conn.last_insert_rowid()))),
    Err(e) if is_unique_violation(&e) => Ok(UpsertOutcome::Conflict),
    Err(e) => Err(e),
  }
}

// ─── IndicatorStore impl ─────────────────────────────────────────────────────

impl IndicatorStore for SqliteStore {
  type Error = Error;

  // ── Zones ─────────────────────────────────────────────────────────────────

  async fn add_zone(&self, zone: NewZone) -> Result<Zone> {
    let name = zone.name.clone();
    let (latitude, longitude) = (zone.latitude, zone.longitude);

    let inserted: Option<i64> = self
      .conn
      .call(move |conn| {
        let result = conn.execute(
          "INSERT INTO zones (name, latitude, longitude) VALUES (?1, ?2, ?3)",
          rusqlite::params![zone.name, zone.latitude, zone.longitude],
        );
        match result {
          Ok(_) => Ok(Some(conn.last_insert_rowid())),
          Err(e) if is_unique_violation(&e) => Ok(None),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    let zone_id = inserted.ok_or_else(|| Error::ZoneExists(name.clone()))?;
    Ok(Zone {
      zone_id: ZoneId(zone_id),
      name,
      latitude,
      longitude,
    })
  }

  async fn find_zone_by_name(&self, name: &str) -> Result<Option<Zone>> {
    let name = name.to_owned();

    let raw: Option<RawZone> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT zone_id, name, latitude, longitude FROM zones WHERE name = ?1",
            rusqlite::params![name],
            |row| {
              Ok(RawZone {
                zone_id:   row.get(0)?,
                name:      row.get(1)?,
                latitude:  row.get(2)?,
                longitude: row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    Ok(raw.map(RawZone::into_zone))
  }

  async fn list_zones(&self) -> Result<Vec<Zone>> {
    let raws: Vec<RawZone> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT zone_id, name, latitude, longitude FROM zones ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawZone {
              zone_id:   row.get(0)?,
              name:      row.get(1)?,
              latitude:  row.get(2)?,
              longitude: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawZone::into_zone).collect())
  }

  // ── Sources ───────────────────────────────────────────────────────────────

  async fn get_or_create_source(&self, source: NewSource) -> Result<Source> {
    let raw: RawSource = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let raw = match select_source(&tx, &source.name)? {
          Some(existing) => existing,
          None => {
            let result = tx.execute(
              "INSERT INTO sources (name, url, description) VALUES (?1, ?2, ?3)",
              rusqlite::params![source.name, source.url, source.description],
            );
            match result {
              Ok(_) => RawSource {
                source_id:   tx.last_insert_rowid(),
                name:        source.name,
                url:         source.url,
                description: source.description,
              },
              // Lost the race to another writer: read back its row.
              Err(e) if is_unique_violation(&e) => match select_source(&tx, &source.name)? {
                Some(winner) => winner,
                None => return Err(e.into()),
              },
              Err(e) => return Err(e.into()),
            }
          }
        };

        tx.commit()?;
        Ok(raw)
      })
      .await?;

    Ok(raw.into_source())
  }

  async fn list_sources(&self) -> Result<Vec<Source>> {
    let raws: Vec<RawSource> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT source_id, name, url, description FROM sources ORDER BY name",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawSource {
              source_id:   row.get(0)?,
              name:        row.get(1)?,
              url:         row.get(2)?,
              description: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(RawSource::into_source).collect())
  }

  // ── Indicators ────────────────────────────────────────────────────────────

  async fn upsert(&self, indicator: NewIndicator) -> Result<UpsertOutcome> {
    let mut outcomes = self.upsert_batch(vec![indicator]).await?;
    Ok(outcomes.pop().unwrap_or(UpsertOutcome::SkippedDuplicate))
  }

  async fn upsert_batch(
    &self,
    indicators: Vec<NewIndicator>,
  ) -> Result<Vec<UpsertOutcome>> {
    let rows = indicators
      .iter()
      .map(IndicatorRow::encode)
      .collect::<Result<Vec<_>>>()?;
    let recorded_at = encode_dt(Utc::now());

    let outcomes = self
      .conn
      .call(move |conn| {
        // Dropping `tx` on an early return rolls the whole batch back.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut outcomes = Vec::with_capacity(rows.len());
        for row in &rows {
          outcomes.push(stage_indicator(&tx, row, &recorded_at)?);
        }
        tx.commit()?;
        Ok(outcomes)
      })
      .await?;

    Ok(outcomes)
  }

  async fn list_indicators(&self, query: &IndicatorQuery) -> Result<Vec<Indicator>> {
    let zone_id   = query.zone_id.map(|z| z.0);
    let source_id = query.source_id.map(|s| s.0);
    let kind      = query.kind.map(|k| k.as_str());
    let from      = query.from.map(encode_dt);
    let until     = query.until.map(encode_dt);
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val  = query.limit.map_or(-1, |l| l as i64);
    let offset_val = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawIndicator> = self
      .conn
      .call(move |conn| {
        let mut conds: Vec<&'static str> = vec![];
        if zone_id.is_some() {
          conds.push("zone_id = ?1");
        }
        if source_id.is_some() {
          conds.push("source_id = ?2");
        }
        if kind.is_some() {
          conds.push("kind = ?3");
        }
        if from.is_some() {
          conds.push("observed_at >= ?4");
        }
        if until.is_some() {
          conds.push("observed_at < ?5");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT indicator_id, source_id, zone_id, kind, value, unit,
                  observed_at, metadata_json, recorded_at
           FROM indicators
           {where_clause}
           ORDER BY observed_at, indicator_id
           LIMIT ?6 OFFSET ?7"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![zone_id, source_id, kind, from, until, limit_val, offset_val],
            |row| {
              Ok(RawIndicator {
                indicator_id:  row.get(0)?,
                source_id:     row.get(1)?,
                zone_id:       row.get(2)?,
                kind:          row.get(3)?,
                value:         row.get(4)?,
                unit:          row.get(5)?,
                observed_at:   row.get(6)?,
                metadata_json: row.get(7)?,
                recorded_at:   row.get(8)?,
              })
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIndicator::into_indicator).collect()
  }
}
