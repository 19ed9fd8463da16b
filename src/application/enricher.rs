//! Token Enricher
//!
//! Turns one migration transaction into a `TokenRecord`:
//! 1. coin page → metadata (pool address)
//! 2. holder count and 24h volume
//! 3. pool document (pair id, circulating supply), retried with backoff
//! 4. hourly candles → market cap statistics
//!
//! Only the pool step is retried; upstream indexing lags there the most.
//! Every other step is attempted once and any failure is terminal for the
//! token in this run.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn, Instrument};

use crate::diagnostics::RunContext;
use crate::domain::{compute_stats, PoolDocument, TokenRecord, Transaction};
use crate::ports::{
    CandleSource, CoinPageSource, EnrichError, HolderStatsSource, MetadataExtractor, PoolSource,
    TokenEnricher,
};

/// Retry schedule for the pool-data fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolRetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Wait after the first failed attempt; doubles each time
    pub base_delay: Duration,
}

impl Default for PoolRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl PoolRetryPolicy {
    /// Wait after failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Upstream collaborators of the enricher
#[derive(Clone)]
pub struct EnrichmentSources {
    pub coin_pages: Arc<dyn CoinPageSource>,
    pub extractor: Arc<dyn MetadataExtractor>,
    pub holders: Arc<dyn HolderStatsSource>,
    pub pools: Arc<dyn PoolSource>,
    pub candles: Arc<dyn CandleSource>,
}

/// `TokenEnricher` over the upstream ports
pub struct PipelineEnricher {
    sources: EnrichmentSources,
    retry: PoolRetryPolicy,
    ctx: RunContext,
}

impl PipelineEnricher {
    pub fn new(sources: EnrichmentSources, retry: PoolRetryPolicy, ctx: RunContext) -> Self {
        Self { sources, retry, ctx }
    }

    async fn enrich_mint(&self, mint: &str) -> Result<TokenRecord, EnrichError> {
        let page = self
            .sources
            .coin_pages
            .fetch_coin_page(mint)
            .await
            .map_err(EnrichError::CoinPage)?;

        let mut meta = self.sources.extractor.extract(&page)?;
        if meta.mint.is_empty() {
            meta.mint = mint.to_string();
        } else if meta.mint != mint {
            return Err(EnrichError::MintMismatch {
                expected: mint.to_string(),
                found: meta.mint,
            });
        }
        let pool_address = meta
            .pool_address()
            .ok_or(EnrichError::MissingIdentifier("raydium_pool"))?
            .to_string();

        let holder_count = self
            .sources
            .holders
            .holder_count(mint)
            .await
            .map_err(EnrichError::HolderStats)?;
        let volume_24h = self
            .sources
            .holders
            .volume_24h(mint)
            .await
            .map_err(EnrichError::HolderStats)?;

        let pool = self.fetch_pool(&pool_address).await?;
        let pool_id = pool.pool_id().ok_or(EnrichError::MissingIdentifier("pool_id"))?;
        let pair_id = pool.pair_id().ok_or(EnrichError::MissingIdentifier("pair_id"))?;
        let supply = pool
            .circulating_supply(mint)
            .ok_or(EnrichError::MissingIdentifier("circulating_supply"))?;

        let series = self
            .sources
            .candles
            .fetch_candles(pool_id, pair_id)
            .await
            .map_err(EnrichError::PriceHistory)?;
        debug!(bars = series.len(), supply, "Price history fetched");

        let stats = compute_stats(&series, supply).ok_or(EnrichError::NoPriceHistory)?;
        Ok(TokenRecord::assemble(meta, holder_count, volume_24h, &stats))
    }

    /// Fetch the pool document until it is complete or attempts run out
    async fn fetch_pool(&self, pool_address: &str) -> Result<PoolDocument, EnrichError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut reason = String::new();

        for attempt in 1..=attempts {
            match self.sources.pools.fetch_pool(pool_address).await {
                Ok(pool) => match pool.missing_structure() {
                    None => return Ok(pool),
                    Some(missing) => reason = format!("response has no {}", missing),
                },
                Err(e) => reason = e.to_string(),
            }

            if attempt < attempts {
                let delay = self.retry.delay_after(attempt);
                warn!(
                    pool = %pool_address,
                    "Pool data incomplete ({}), retrying in {:?} (attempt {}/{})",
                    reason, delay, attempt, attempts
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(EnrichError::PoolUnresolved { attempts, reason })
    }
}

#[async_trait]
impl TokenEnricher for PipelineEnricher {
    async fn enrich(&self, transaction: &Transaction) -> Result<TokenRecord, EnrichError> {
        let mint = transaction.mint();
        let span = self.ctx.token_span(mint);
        let result = self.enrich_mint(mint).instrument(span.clone()).await;
        span.in_scope(|| match &result {
            Ok(record) => info!(
                symbol = %record.symbol,
                highest = record.highest_market_cap,
                "Token enriched"
            ),
            Err(e) => warn!("Token skipped: {}", e),
        });
        result
    }
}
