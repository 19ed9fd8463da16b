//! Upstream Source Ports
//!
//! One trait per upstream collaborator. Adapters hide wire formats and
//! transport; the enricher only sees typed results or a `SourceError`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ActivityWindow, CandleSeries, CoinMeta, PoolDocument, Transaction};

/// Source error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Empty response: {0}")]
    Empty(String),
}

/// Metadata extraction error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Coin not found (does not exist or is still indexing)")]
    NotFound,

    /// `payload` is the compressed page, for offline inspection
    #[error("Coin data marker not found in payload")]
    MissingMarker { payload: String },

    /// `payload` is the compressed JSON fragment that failed to parse
    #[error("Failed to parse coin data: {reason}")]
    Malformed { reason: String, payload: String },
}

/// Raw export body plus the rows that survived normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityExport {
    pub raw: String,
    pub transactions: Vec<Transaction>,
}

/// Activity export for a time window
#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn fetch_activity(&self, window: &ActivityWindow) -> Result<ActivityExport, SourceError>;
}

/// Raw coin page for a mint (script-like payload with embedded JSON)
#[async_trait]
pub trait CoinPageSource: Send + Sync {
    async fn fetch_coin_page(&self, mint: &str) -> Result<String, SourceError>;
}

/// Pulls `CoinMeta` out of a coin page payload
#[cfg_attr(test, mockall::automock)]
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, raw_payload: &str) -> Result<CoinMeta, ExtractError>;
}

/// Holder count and 24h volume for a mint
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HolderStatsSource: Send + Sync {
    async fn holder_count(&self, mint: &str) -> Result<u64, SourceError>;

    async fn volume_24h(&self, mint: &str) -> Result<f64, SourceError>;
}

/// Pool document for a pool address
#[async_trait]
pub trait PoolSource: Send + Sync {
    async fn fetch_pool(&self, pool_address: &str) -> Result<PoolDocument, SourceError>;
}

/// OHLC history for a pool/pair
#[async_trait]
pub trait CandleSource: Send + Sync {
    async fn fetch_candles(&self, pool_id: &str, pair_id: &str) -> Result<CandleSeries, SourceError>;
}
