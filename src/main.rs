use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use promo_reconcile::config;
use promo_reconcile::export::CsvFileSink;
use promo_reconcile::pipeline;
use promo_reconcile::search::ElasticClient;

/// Used when `RUST_LOG` is unset, so no-hit notices and skipped hits show up.
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reconcile failed promo-code requests against their validations and export a CSV report.",
    long_about = "Reconcile failed promo-code requests against their validations and export a CSV report.\n\n\
                  Progress, empty-result notices and skipped hits are logged at info/warn level, \
                  which is the default. Set RUST_LOG (e.g. RUST_LOG=debug) to change it."
)]
struct Args {
    /// Path to YAML config file (built-in defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output CSV path, overrides `output.path`
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        error!(?err, "reconciliation failed");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut cfg = config::load(args.config.as_deref()).context("failed to load config")?;
    cfg.apply_env();

    let client = ElasticClient::connect(&cfg.elastic).await?;
    info!(?client, "connected to elasticsearch");

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(&cfg.output.path));
    let mut sink = CsvFileSink::new(output);

    let summary = pipeline::run(&client, &cfg.queries, &mut sink).await?;
    info!(
        validations = summary.validations,
        requests = summary.requests,
        correlated = summary.correlated,
        rows = summary.rows,
        round_trips = summary.round_trips,
        path = %sink.path().display(),
        "report complete"
    );
    Ok(())
}
