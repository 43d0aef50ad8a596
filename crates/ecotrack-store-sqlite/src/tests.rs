//! Integration tests for `SqliteStore` against an in-memory database.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone as _, Utc};
use ecotrack_core::{
  indicator::{
    AirQualityMetadata, CarbonMetadata, IndicatorKind, IndicatorMetadata,
    NewIndicator, Pollutant,
  },
  registry::{NewSource, NewZone, Source, SourceId, Zone, ZoneId},
  store::{IndicatorQuery, IndicatorStore, UpsertOutcome},
};
use serde_json::Map;

use crate::{
  Error, SqliteStore,
  encode::{IndicatorRow, encode_dt},
  schema::SCHEMA,
  store::{insert_indicator, stage_indicator},
};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_zone(name: &str, latitude: f64, longitude: f64) -> NewZone {
  NewZone { name: name.into(), latitude, longitude }
}

fn open_meteo() -> NewSource {
  NewSource::new(
    "Open-Meteo",
    "https://open-meteo.com",
    "Real-time weather and air quality data",
  )
}

fn hour(h: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
}

fn air(
  source: &Source,
  zone: &Zone,
  pollutant: Pollutant,
  at: DateTime<Utc>,
  value: f64,
) -> NewIndicator {
  NewIndicator {
    source_id: source.source_id,
    zone_id:   zone.zone_id,
    value,
    unit:      IndicatorKind::Air.unit().into(),
    timestamp: at,
    metadata:  IndicatorMetadata::Air(AirQualityMetadata {
      pollutant,
      extra: Map::new(),
    }),
  }
}

fn co2(source: &Source, zone: &Zone, at: DateTime<Utc>, value: f64) -> NewIndicator {
  NewIndicator {
    source_id: source.source_id,
    zone_id:   zone.zone_id,
    value,
    unit:      IndicatorKind::Co2.unit().into(),
    timestamp: at,
    metadata:  IndicatorMetadata::Co2(CarbonMetadata {
      perimeter: "France".into(),
      extra:     Map::new(),
    }),
  }
}

async fn paris_with_source(s: &SqliteStore) -> (Zone, Source) {
  let zone = s.add_zone(new_zone("Paris", 48.8566, 2.3522)).await.unwrap();
  let source = s.get_or_create_source(open_meteo()).await.unwrap();
  (zone, source)
}

// ─── Zones ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_find_zone() {
  let s = store().await;

  let zone = s.add_zone(new_zone("Paris", 48.8566, 2.3522)).await.unwrap();
  assert_eq!(zone.name, "Paris");

  let fetched = s.find_zone_by_name("Paris").await.unwrap();
  assert_eq!(fetched, Some(zone));
}

#[tokio::test]
async fn find_zone_missing_returns_none() {
  let s = store().await;
  assert!(s.find_zone_by_name("Atlantis").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_zone_name_is_rejected() {
  let s = store().await;
  s.add_zone(new_zone("Lyon", 45.764, 4.8357)).await.unwrap();

  let err = s.add_zone(new_zone("Lyon", 0.0, 0.0)).await.unwrap_err();
  assert!(matches!(err, Error::ZoneExists(name) if name == "Lyon"));
  assert_eq!(s.list_zones().await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_zones_is_ordered_by_name() {
  let s = store().await;
  s.add_zone(new_zone("Paris", 48.8566, 2.3522)).await.unwrap();
  s.add_zone(new_zone("Lyon", 45.764, 4.8357)).await.unwrap();

  let names: Vec<String> =
    s.list_zones().await.unwrap().into_iter().map(|z| z.name).collect();
  assert_eq!(names, ["Lyon", "Paris"]);
}

// ─── Sources ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_or_create_source_is_idempotent() {
  let s = store().await;

  let first = s.get_or_create_source(open_meteo()).await.unwrap();
  let again = s
    .get_or_create_source(NewSource::new("Open-Meteo", "https://other", "changed"))
    .await
    .unwrap();

  // The existing row is returned unchanged.
  assert_eq!(again, first);
  assert_eq!(again.url, "https://open-meteo.com");
  assert_eq!(s.list_sources().await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_get_or_create_creates_one_source() {
  let s = store().await;

  let mut handles = Vec::new();
  for _ in 0..8 {
    let s = s.clone();
    handles.push(tokio::spawn(async move {
      s.get_or_create_source(open_meteo()).await.unwrap()
    }));
  }

  let mut ids = HashSet::new();
  for h in handles {
    ids.insert(h.await.unwrap().source_id);
  }
  assert_eq!(ids.len(), 1);
  assert_eq!(s.list_sources().await.unwrap().len(), 1);
}

// ─── Upsert ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_inserts_then_skips_duplicate() {
  let s = store().await;
  let (paris, source) = paris_with_source(&s).await;

  let first = s
    .upsert(air(&source, &paris, Pollutant::Pm10, hour(0), 10.1))
    .await
    .unwrap();
  assert!(first.is_inserted());

  // Same identity, different value: still a duplicate, never an update.
  let second = s
    .upsert(air(&source, &paris, Pollutant::Pm10, hour(0), 99.0))
    .await
    .unwrap();
  assert_eq!(second, UpsertOutcome::SkippedDuplicate);

  let stored = s.list_indicators(&IndicatorQuery::default()).await.unwrap();
  assert_eq!(stored.len(), 1);
  assert_eq!(stored[0].value, 10.1);
}

#[tokio::test]
async fn pollutant_discriminates_identity() {
  let s = store().await;
  let (paris, source) = paris_with_source(&s).await;

  let outcomes = s
    .upsert_batch(vec![
      air(&source, &paris, Pollutant::Pm10, hour(0), 10.0),
      air(&source, &paris, Pollutant::Pm2_5, hour(0), 6.0),
      air(&source, &paris, Pollutant::Pm10, hour(1), 11.0),
    ])
    .await
    .unwrap();

  assert!(outcomes.iter().all(UpsertOutcome::is_inserted));
}

#[tokio::test]
async fn duplicates_within_one_batch_are_skipped() {
  let s = store().await;
  let (paris, source) = paris_with_source(&s).await;

  let outcomes = s
    .upsert_batch(vec![
      co2(&source, &paris, hour(3), 41.0),
      co2(&source, &paris, hour(3), 41.0),
    ])
    .await
    .unwrap();

  assert!(outcomes[0].is_inserted());
  assert_eq!(outcomes[1], UpsertOutcome::SkippedDuplicate);
}

#[tokio::test]
async fn failed_batch_is_rolled_back_entirely() {
  let s = store().await;
  let (paris, source) = paris_with_source(&s).await;
  let nowhere = Zone {
    zone_id:   ZoneId(9_999),
    name:      "Nowhere".into(),
    latitude:  0.0,
    longitude: 0.0,
  };

  // The second row violates the zone foreign key.
  let result = s
    .upsert_batch(vec![
      air(&source, &paris, Pollutant::O3, hour(0), 1.0),
      air(&source, &nowhere, Pollutant::O3, hour(0), 1.0),
    ])
    .await;
  assert!(result.is_err());

  let stored = s.list_indicators(&IndicatorQuery::default()).await.unwrap();
  assert!(stored.is_empty());
}

#[test]
fn unique_constraint_turns_race_into_conflict() {
  let conn = rusqlite::Connection::open_in_memory().unwrap();
  conn.execute_batch(SCHEMA).unwrap();
  conn
    .execute(
      "INSERT INTO zones (zone_id, name, latitude, longitude) VALUES (1, 'Paris', 48.8, 2.3)",
      [],
    )
    .unwrap();
  conn
    .execute(
      "INSERT INTO sources (source_id, name, url) VALUES (1, 'RTE', 'https://rte')",
      [],
    )
    .unwrap();

  let source = Source {
    source_id:   SourceId(1),
    name:        "RTE".into(),
    url:         "https://rte".into(),
    description: String::new(),
  };
  let zone = Zone {
    zone_id:   ZoneId(1),
    name:      "Paris".into(),
    latitude:  48.8,
    longitude: 2.3,
  };
  let row = IndicatorRow::encode(&co2(&source, &zone, hour(5), 30.0)).unwrap();
  let now = encode_dt(Utc::now());

  // Two writers that both passed the existence check.
  assert!(insert_indicator(&conn, &row, &now).unwrap().is_inserted());
  assert_eq!(insert_indicator(&conn, &row, &now).unwrap(), UpsertOutcome::Conflict);

  // The checked path never reaches the constraint.
  assert_eq!(
    stage_indicator(&conn, &row, &now).unwrap(),
    UpsertOutcome::SkippedDuplicate
  );
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stored_indicator_round_trips_through_columns() {
  let s = store().await;
  let (paris, source) = paris_with_source(&s).await;
  s.upsert(co2(&source, &paris, hour(2), 55.5)).await.unwrap();

  let stored = s.list_indicators(&IndicatorQuery::default()).await.unwrap();
  assert_eq!(stored.len(), 1);
  let ind = &stored[0];
  assert_eq!(ind.kind(), IndicatorKind::Co2);
  assert_eq!(ind.unit, "gCO2/kWh");
  assert_eq!(ind.timestamp, hour(2));
  assert_eq!(ind.zone_id, paris.zone_id);
  assert!(matches!(
    &ind.metadata,
    IndicatorMetadata::Co2(m) if m.perimeter == "France"
  ));
}

#[tokio::test]
async fn list_indicators_filters_by_zone_kind_and_window() {
  let s = store().await;
  let (paris, source) = paris_with_source(&s).await;
  let lyon = s.add_zone(new_zone("Lyon", 45.764, 4.8357)).await.unwrap();

  s.upsert_batch(vec![
    air(&source, &paris, Pollutant::Pm10, hour(0), 1.0),
    air(&source, &paris, Pollutant::Pm10, hour(1), 2.0),
    air(&source, &paris, Pollutant::Pm10, hour(2), 3.0),
    co2(&source, &paris, hour(1), 40.0),
    air(&source, &lyon, Pollutant::Pm10, hour(1), 4.0),
  ])
  .await
  .unwrap();

  let query = IndicatorQuery {
    zone_id: Some(paris.zone_id),
    kind: Some(IndicatorKind::Air),
    from: Some(hour(1)),
    until: Some(hour(2)),
    ..Default::default()
  };
  let found = s.list_indicators(&query).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].value, 2.0);

  let page = s
    .list_indicators(&IndicatorQuery {
      limit: Some(2),
      offset: Some(1),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.len(), 2);
}
