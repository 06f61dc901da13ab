use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use pulsewatch_common::types::TrendRecord;
use pulsewatch_common::validation::{validate_batch, Severity};
use pulsewatch_common::{Config, FileConfig, PulseWatchError};
use pulsewatch_connectors::build_connectors;
use pulsewatch_pipeline::Orchestrator;
use pulsewatch_store::{PgTrendStore, PipelineRunRecord, TrendStore};

#[derive(Parser)]
#[command(name = "pulsewatch", about = "African market trend intelligence pipeline")]
struct Args {
    /// Taxonomy and scoring config file (TOML). Defaults to the built-in
    /// taxonomy when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Market codes to collect for, comma separated (e.g. NG,ZA,KE).
    #[arg(long, value_delimiter = ',')]
    markets: Vec<String>,

    /// Keyword override, comma separated.
    #[arg(long, value_delimiter = ',')]
    keywords: Vec<String>,

    /// Run one pipeline cycle and exit.
    #[arg(long)]
    once: bool,

    /// Hours between runs; overrides RUN_INTERVAL_HOURS.
    #[arg(long)]
    interval_hours: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pulsewatch=info".parse()?))
        .init();

    let args = Args::parse();
    info!("PulseWatch starting...");

    let config = Config::from_env()?;
    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::builtin(),
    };

    let store = PgTrendStore::connect(&config.database_url).await?;
    store.migrate().await?;

    if let Some(last_run) = store.get_last_run().await? {
        info!(
            started_at = %last_run.started_at,
            success = last_run.success,
            total_items = last_run.total_items,
            "Previous run loaded"
        );
    }

    let connectors = build_connectors(&config, &file_config)?;
    // NER tagging is an optional capability; no tagger is wired in here.
    let orchestrator = Orchestrator::new(&file_config, connectors, None);

    let interval_hours = args.interval_hours.unwrap_or(config.run_interval_hours);

    loop {
        run_once(&orchestrator, &store, &config, &args).await?;

        if args.once {
            break;
        }
        info!(interval_hours, "Sleeping until next run");
        tokio::time::sleep(Duration::from_secs(interval_hours * 3600)).await;
    }

    Ok(())
}

async fn run_once(
    orchestrator: &Orchestrator,
    store: &PgTrendStore,
    config: &Config,
    args: &Args,
) -> Result<(), PulseWatchError> {
    let outcome = orchestrator
        .run_full_pipeline(&args.markets, &args.keywords)
        .await;

    let records: Vec<TrendRecord> = outcome.summaries.iter().map(TrendRecord::from).collect();

    // QA gate: level/score mismatches are logged, not fatal.
    let validation = validate_batch(&records);
    for result in validation.results.iter().filter(|r| !r.is_valid) {
        match result.severity {
            Severity::Error => warn!(
                trend_id = result.trend_id.as_deref().unwrap_or(""),
                message = %result.message,
                "Validation error"
            ),
            Severity::Warning => info!(
                trend_id = result.trend_id.as_deref().unwrap_or(""),
                message = %result.message,
                "Validation warning"
            ),
            Severity::Info => {}
        }
    }
    info!(
        checks = validation.total_checks,
        errors = validation.errors,
        warnings = validation.warnings,
        "Validation complete"
    );

    let storage_err = |e: pulsewatch_store::StoreError| PulseWatchError::Storage(e.to_string());

    if !records.is_empty() {
        let saved = store.save_trends(&records).await.map_err(storage_err)?;
        info!(saved, "Trends persisted");
    }

    let run = PipelineRunRecord {
        id: Uuid::new_v4(),
        started_at: outcome.metrics.started_at,
        completed_at: outcome.metrics.completed_at,
        success: outcome.success,
        total_items: outcome.items_collected() as i32,
        metrics: serde_json::to_value(&outcome.metrics)
            .map_err(|e| PulseWatchError::Storage(e.to_string()))?,
    };
    store.save_pipeline_run(&run).await.map_err(storage_err)?;

    let removed = store
        .cleanup_old_data(config.data_retention_days)
        .await
        .map_err(storage_err)?;
    if removed > 0 {
        info!(removed, "Expired rows removed");
    }

    if outcome.success {
        info!("{}", outcome.stats);
    } else {
        warn!(message = %outcome.message, "Pipeline run produced no trends");
    }

    Ok(())
}
