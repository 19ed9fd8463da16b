//! Harvest Pipeline
//!
//! One run for one activity window: fetch the export, snapshot it, then let
//! the result store enrich and persist the unseen tokens.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, Instrument};

use super::enricher::{EnrichmentSources, PipelineEnricher, PoolRetryPolicy};
use super::result_store::{ResultStore, RunSummary, StoreError};
use crate::diagnostics::RunContext;
use crate::domain::ActivityWindow;
use crate::ports::{ActivitySource, SourceError, TokenEnricher};

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Activity export failed: {0}")]
    Activity(#[from] SourceError),

    #[error("Failed to write activity snapshot {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Result store error: {0}")]
    Store(#[from] StoreError),
}

/// Builds the run's enricher from its context
pub type EnricherFactory = Arc<dyn Fn(&RunContext) -> Arc<dyn TokenEnricher> + Send + Sync>;

/// Factory producing a `PipelineEnricher` per run
pub fn pipeline_enricher(sources: EnrichmentSources, retry: PoolRetryPolicy) -> EnricherFactory {
    Arc::new(move |ctx: &RunContext| {
        Arc::new(PipelineEnricher::new(sources.clone(), retry, ctx.clone())) as Arc<dyn TokenEnricher>
    })
}

/// File layout and concurrency of a run
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub data_dir: PathBuf,
    pub results_prefix: String,
    pub activities_prefix: String,
    pub workers: usize,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("pumpfun_data"),
            results_prefix: "results".to_string(),
            activities_prefix: "activities".to_string(),
            workers: 3,
        }
    }
}

impl HarvestSettings {
    pub fn results_path(&self, window: &ActivityWindow) -> PathBuf {
        self.data_dir
            .join(format!("{}_{}.csv", self.results_prefix, window.label()))
    }

    pub fn snapshot_path(&self, window: &ActivityWindow) -> PathBuf {
        self.data_dir
            .join(format!("{}_{}.csv", self.activities_prefix, window.label()))
    }
}

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub run_id: String,
    pub window: ActivityWindow,
    pub snapshot_path: PathBuf,
    pub results_path: PathBuf,
    /// Rows in the export, before normalization dropped any
    pub exported_transactions: usize,
    pub summary: RunSummary,
}

pub struct HarvestPipeline {
    activity: Arc<dyn ActivitySource>,
    enricher_factory: EnricherFactory,
    settings: HarvestSettings,
}

impl HarvestPipeline {
    pub fn new(
        activity: Arc<dyn ActivitySource>,
        enricher_factory: EnricherFactory,
        settings: HarvestSettings,
    ) -> Self {
        Self {
            activity,
            enricher_factory,
            settings,
        }
    }

    pub fn settings(&self) -> &HarvestSettings {
        &self.settings
    }

    /// Harvest one window to completion
    pub async fn run(&self, window: ActivityWindow) -> Result<HarvestReport, HarvestError> {
        let ctx = RunContext::new(&window);
        let span = ctx.span().clone();
        self.run_in(window, ctx).instrument(span).await
    }

    async fn run_in(&self, window: ActivityWindow, ctx: RunContext) -> Result<HarvestReport, HarvestError> {
        info!(start = window.start, end = window.end, "Harvest started");

        let export = self.activity.fetch_activity(&window).await?;
        let snapshot_path = self.settings.snapshot_path(&window);
        write_snapshot(&snapshot_path, &export.raw)?;
        info!(
            transactions = export.transactions.len(),
            snapshot = %snapshot_path.display(),
            "Activity snapshot written"
        );

        let results_path = self.settings.results_path(&window);
        let store = ResultStore::open(&results_path, self.settings.workers, ctx.clone())?;
        let enricher = (self.enricher_factory)(&ctx);
        let exported_transactions = export.transactions.len();
        let summary = store.process(export.transactions, enricher).await?;

        info!(
            written = summary.written.len(),
            failed = summary.failed.len(),
            results = %results_path.display(),
            "Harvest finished"
        );

        Ok(HarvestReport {
            run_id: ctx.run_id().to_string(),
            window,
            snapshot_path,
            results_path,
            exported_transactions,
            summary,
        })
    }
}

fn write_snapshot(path: &Path, raw: &str) -> Result<(), HarvestError> {
    let io = |source| HarvestError::Snapshot {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io)?;
    }
    fs::write(path, raw).map_err(io)
}
