use async_trait::async_trait;
use thiserror::Error;

use super::sources::{ExtractError, SourceError};
use crate::domain::{TokenRecord, Transaction};

/// Terminal per-token enrichment failure
///
/// The token is skipped for this run; nothing is written, so a later run
/// picks it up again.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnrichError {
    #[error("Coin page unavailable: {0}")]
    CoinPage(SourceError),

    #[error("Coin metadata extraction failed: {0}")]
    Metadata(#[from] ExtractError),

    #[error("Holder stats unavailable: {0}")]
    HolderStats(SourceError),

    #[error("Pool data unresolved after {attempts} attempts: {reason}")]
    PoolUnresolved { attempts: u32, reason: String },

    #[error("Coin page describes {found}, not {expected}")]
    MintMismatch { expected: String, found: String },

    #[error("Required identifier never resolved: {0}")]
    MissingIdentifier(&'static str),

    #[error("Price history unavailable: {0}")]
    PriceHistory(SourceError),

    #[error("Price history has no usable bars")]
    NoPriceHistory,

    #[error("Enrichment task aborted: {0}")]
    Aborted(String),
}

/// Turns one transaction into a token record or a terminal failure
#[async_trait]
pub trait TokenEnricher: Send + Sync {
    async fn enrich(&self, transaction: &Transaction) -> Result<TokenRecord, EnrichError>;
}
