//! Coin Harvester - pump.fun Migration Dataset Builder
//!
//! Exports one day of pump.fun to Raydium migrations and enriches every token.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;

use coin_harvester::adapters::cli::{CliApp, Command, MissingCmd, RunCmd, WindowCmd};
use coin_harvester::adapters::gecko_terminal::{GeckoCandleSource, GeckoPoolSource};
use coin_harvester::adapters::http::{Connector, HttpClientFactory, ReqwestConnector};
use coin_harvester::adapters::pump_fun::{PumpFunCoinPages, RegexMetadataExtractor};
use coin_harvester::adapters::solscan::{SolscanActivitySource, SolscanHolderStats};
use coin_harvester::application::{
    find_missing_tokens, pipeline_enricher, EnrichmentSources, HarvestPipeline,
};
use coin_harvester::config::{load_config, Config};
use coin_harvester::diagnostics::{init_logging, LogOptions};
use coin_harvester::domain::ActivityWindow;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (proxy lists often live here)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();

    match app.command {
        Command::Run(cmd) => {
            let config = read_config(&cmd.config)?;
            init_logging(&LogOptions {
                verbose: app.verbose,
                debug: app.debug,
                default_level: config.logging.level.clone(),
                log_file: config.logging.get_log_file(),
            })
            .context("Failed to initialise logging")?;
            run_command(cmd, config).await
        }
        Command::Missing(cmd) => {
            init_cli_logging(app.verbose, app.debug)?;
            missing_command(cmd)
        }
        Command::Window(cmd) => {
            init_cli_logging(app.verbose, app.debug)?;
            window_command(cmd)
        }
    }
}

fn init_cli_logging(verbose: bool, debug: bool) -> Result<()> {
    init_logging(&LogOptions {
        verbose,
        debug,
        ..Default::default()
    })
    .context("Failed to initialise logging")
}

/// Load the config file; a missing file means all defaults
fn read_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        eprintln!("Config {} not found, using defaults", path.display());
        return Ok(Config::default());
    }
    load_config(path).with_context(|| format!("Failed to load configuration from {}", path.display()))
}

async fn run_command(cmd: RunCmd, mut config: Config) -> Result<()> {
    let window = ActivityWindow::parse(&cmd.date, Utc::now())?;
    if let Some(workers) = cmd.workers {
        config.pipeline.workers = workers;
    }
    if cmd.no_proxy {
        config.proxy.enabled = false;
    }
    config.validate().context("Invalid configuration")?;

    tracing::info!("Harvesting {}", window);

    // Shared transport
    let connector: Arc<dyn Connector> = Arc::new(ReqwestConnector::new(config.http.connector_config()));
    let pool = config.proxy.build_pool().context("Failed to build proxy pool")?;
    if config.proxy.enabled {
        tracing::info!("Proxy pool: {} endpoint(s)", pool.len());
    }
    let http = HttpClientFactory::new(connector, Arc::new(pool), config.proxy.client_config());

    // Upstream sources
    let upstream = &config.upstream;
    let activity = Arc::new(SolscanActivitySource::new(http.clone(), upstream.solscan_url.as_str()));
    let sources = EnrichmentSources {
        coin_pages: Arc::new(PumpFunCoinPages::new(
            http.clone(),
            upstream.pump_fun_url.as_str(),
            config.http.user_agent.as_str(),
        )),
        extractor: Arc::new(
            RegexMetadataExtractor::new().context("Failed to compile coin metadata marker")?,
        ),
        holders: Arc::new(SolscanHolderStats::new(http.clone(), upstream.solscan_url.as_str())),
        pools: Arc::new(GeckoPoolSource::new(http.clone(), upstream.gecko_terminal_url.as_str())),
        candles: Arc::new(GeckoCandleSource::new(http, upstream.gecko_terminal_url.as_str())),
    };

    let pipeline = HarvestPipeline::new(
        activity,
        pipeline_enricher(sources, config.enrichment.retry_policy()),
        config.pipeline.harvest_settings(),
    );

    let report = pipeline
        .run(window)
        .await
        .with_context(|| format!("Harvest for {} failed", window.label()))?;
    let summary = &report.summary;

    println!("Harvest {} ({})", report.window.label(), report.run_id);
    println!("  Snapshot:   {}", report.snapshot_path.display());
    println!("  Results:    {}", report.results_path.display());
    println!("  Exported:   {}", report.exported_transactions);
    println!("  Unique:     {}", summary.received - summary.skipped_duplicate);
    println!("  Existing:   {}", summary.skipped_existing);
    println!("  Written:    {}", summary.written.len());
    println!("  Failed:     {}", summary.failed.len());
    for failed in &summary.failed {
        println!("    {}: {}", failed.mint, failed.reason);
    }

    Ok(())
}

fn missing_command(cmd: MissingCmd) -> Result<()> {
    let missing = find_missing_tokens(&cmd.activities, &cmd.results)
        .context("Failed to reconcile activity snapshot with results")?;

    for mint in &missing {
        println!("{}", mint);
    }
    eprintln!("{} missing token(s)", missing.len());
    Ok(())
}

fn window_command(cmd: WindowCmd) -> Result<()> {
    let window = ActivityWindow::parse(&cmd.date, Utc::now())?;
    println!("date:  {}", window.label());
    println!("start: {}", window.start);
    println!("end:   {}", window.end);
    Ok(())
}
