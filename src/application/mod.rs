//! Application Layer
//!
//! Per-token enrichment, the bounded worker pool with its result store, and
//! whole-window harvest runs.

pub mod enricher;
pub mod harvest;
pub mod missing;
pub mod result_store;

pub use enricher::{EnrichmentSources, PipelineEnricher, PoolRetryPolicy};
pub use harvest::{
    pipeline_enricher, EnricherFactory, HarvestError, HarvestPipeline, HarvestReport, HarvestSettings,
};
pub use missing::{find_missing_tokens, ACTIVITY_MINT_COLUMN};
pub use result_store::{
    load_seen_mints, FailedToken, ResultStore, ResultWriter, RunSummary, StoreError,
};
