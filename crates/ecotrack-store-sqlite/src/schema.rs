//! SQL schema for the EcoTrack SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Provisioned outside ingestion; read-only to it.
CREATE TABLE IF NOT EXISTS zones (
    zone_id     INTEGER PRIMARY KEY,
    name        TEXT    NOT NULL UNIQUE,
    latitude    REAL    NOT NULL,
    longitude   REAL    NOT NULL
);

-- Created on first ingestion from a provider; never updated.
CREATE TABLE IF NOT EXISTS sources (
    source_id   INTEGER PRIMARY KEY,
    name        TEXT    NOT NULL UNIQUE,
    url         TEXT    NOT NULL,
    description TEXT    NOT NULL DEFAULT ''
);

-- Indicators are insert-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS indicators (
    indicator_id  INTEGER PRIMARY KEY,
    source_id     INTEGER NOT NULL REFERENCES sources(source_id),
    zone_id       INTEGER NOT NULL REFERENCES zones(zone_id),
    kind          TEXT    NOT NULL,             -- 'air' | 'co2'
    value         REAL    NOT NULL,
    unit          TEXT    NOT NULL,
    observed_at   TEXT    NOT NULL,             -- RFC 3339 UTC, millisecond precision
    qualifier     TEXT    NOT NULL DEFAULT '',  -- pollutant code for 'air'
    metadata_json TEXT    NOT NULL DEFAULT '{}',
    recorded_at   TEXT    NOT NULL,             -- ingestion time; not part of identity
    UNIQUE (source_id, zone_id, kind, observed_at, qualifier)
);

CREATE INDEX IF NOT EXISTS indicators_zone_time_idx ON indicators(zone_id, observed_at);
CREATE INDEX IF NOT EXISTS indicators_kind_idx      ON indicators(kind);

PRAGMA user_version = 1;
";
