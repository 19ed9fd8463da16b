//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) that adapters must implement.
//! Following hexagonal architecture, these traits abstract:
//! - Upstream data sources (activity export, coin pages, holders, pools, candles)
//! - The per-token enrichment contract used by the result store

pub mod sources;
pub mod enrichment;
#[cfg(any(test, feature = "test-support"))]
pub mod mocks;

pub use sources::{
    ActivityExport, ActivitySource, CandleSource, CoinPageSource, ExtractError, HolderStatsSource,
    MetadataExtractor, PoolSource, SourceError,
};
pub use enrichment::{EnrichError, TokenEnricher};
