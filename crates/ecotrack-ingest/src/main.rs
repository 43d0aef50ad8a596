//! ecotrack-ingest binary.
//!
//! Reads `ecotrack.toml` (or the path given with `--config`), opens the SQLite
//! store and runs one ingestion pass per selected provider.
//!
//! ```
//! ecotrack-ingest zones provision
//! ecotrack-ingest run --provider all
//! ```
//!
//! Exits non-zero only when a run could not complete; per-zone failures are
//! reported in the printed summary.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use ecotrack_core::store::IndicatorStore;
use ecotrack_ingest::{IngestConfig, IngestError, Orchestrator, RunSummary};
use ecotrack_providers::{Eco2MixProvider, OpenMeteoProvider, build_client};
use ecotrack_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "EcoTrack indicator ingestion")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "ecotrack.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Fetch, normalize and store indicators.
  Run {
    #[arg(short, long, value_enum, default_value_t = ProviderChoice::All)]
    provider: ProviderChoice,
  },
  /// Manage the zone registry.
  Zones {
    #[command(subcommand)]
    action: ZonesAction,
  },
}

#[derive(Subcommand)]
enum ZonesAction {
  /// Create the zones listed under `[[provision]]` that do not exist yet.
  Provision,
  /// Print every registered zone.
  List,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderChoice {
  /// Open-Meteo air quality, per zone.
  AirQuality,
  /// RTE éCO2mix carbon intensity, national.
  GridCarbon,
  All,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = IngestConfig::load(&cli.config)
    .with_context(|| format!("failed to load config from {:?}", cli.config))?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  match cli.command {
    Command::Zones { action: ZonesAction::Provision } => {
      provision_zones(&store, &cfg).await?;
      Ok(ExitCode::SUCCESS)
    }
    Command::Zones { action: ZonesAction::List } => {
      for zone in store.list_zones().await.context("failed to list zones")? {
        println!(
          "{:>4}  {:<20} {:>9.4} {:>9.4}",
          zone.zone_id, zone.name, zone.latitude, zone.longitude
        );
      }
      Ok(ExitCode::SUCCESS)
    }
    Command::Run { provider } => {
      tokio::select! {
        code = run(store, &cfg, provider) => code,
        _ = tokio::signal::ctrl_c() => {
          tracing::warn!("interrupted; an in-flight batch commits entirely or not at all");
          Ok(ExitCode::from(130))
        }
      }
    }
  }
}

async fn provision_zones(store: &SqliteStore, cfg: &IngestConfig) -> anyhow::Result<()> {
  for zone in &cfg.provision {
    if store.find_zone_by_name(&zone.name).await?.is_some() {
      tracing::info!(zone = %zone.name, "already provisioned");
      continue;
    }
    let created = store
      .add_zone(zone.clone())
      .await
      .with_context(|| format!("failed to provision zone {:?}", zone.name))?;
    tracing::info!(zone = %created.name, zone_id = %created.zone_id, "provisioned");
  }
  Ok(())
}

async fn run(
  store: SqliteStore,
  cfg: &IngestConfig,
  choice: ProviderChoice,
) -> anyhow::Result<ExitCode> {
  let client = build_client(cfg.request_timeout()).context("failed to build HTTP client")?;
  let orchestrator = Orchestrator::new(Arc::new(store), cfg.zones.clone());

  let air = || Arc::new(OpenMeteoProvider::new(client.clone(), cfg.air_quality.clone()));
  let grid = || Arc::new(Eco2MixProvider::new(client.clone(), cfg.grid_carbon.clone()));

  let results = match choice {
    ProviderChoice::AirQuality => vec![orchestrator.run(air()).await],
    ProviderChoice::GridCarbon => vec![orchestrator.run(grid()).await],
    ProviderChoice::All => {
      let (a, g) = tokio::join!(orchestrator.run(air()), orchestrator.run(grid()));
      vec![a, g]
    }
  };

  Ok(report(results))
}

/// Print each summary; fail if any run could not complete.
fn report(results: Vec<Result<RunSummary, IngestError>>) -> ExitCode {
  let mut code = ExitCode::SUCCESS;
  for result in results {
    match result {
      Ok(summary) => println!("{summary}"),
      Err(e) => {
        tracing::error!("ingestion run failed: {e}");
        code = ExitCode::FAILURE;
      }
    }
  }
  code
}
