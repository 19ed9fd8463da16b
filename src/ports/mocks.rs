use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use super::enrichment::{EnrichError, TokenEnricher};
use super::sources::{
    ActivityExport, ActivitySource, CandleSource, CoinPageSource, HolderStatsSource, PoolSource,
    SourceError,
};
use crate::domain::{
    ActivityWindow, CandlePoint, CandleSeries, Flow, PoolDocument, TokenRecord, Transaction,
};

/// Build a transaction for `mint` with fixture values
pub fn sample_transaction(mint: &str) -> Transaction {
    Transaction {
        signature: format!("sig-{}", mint),
        time: "2025-01-20 12:00:00".to_string(),
        action: "ACTIVITY_SPL_TRANSFER".to_string(),
        sender: "39azUYFWPz3VHgKCf3VChUwbpURdCHRxjWVowf5jUJjg".to_string(),
        receiver: "5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1".to_string(),
        amount: 206_900_000_000_000,
        flow: Flow::Out,
        value: 12_500.0,
        decimals: 6,
        token_address: mint.to_string(),
    }
}

/// Build a valid token record for `mint` with fixture values
pub fn sample_record(mint: &str) -> TokenRecord {
    TokenRecord {
        name: format!("{} Coin", mint),
        symbol: mint.chars().take(4).collect::<String>().to_uppercase(),
        mint: mint.to_string(),
        volume_24h: 42_000.0,
        holder_count: 321,
        image_uri: Some(format!("https://ipfs.io/ipfs/{}", mint)),
        telegram: None,
        twitter: Some(format!("https://x.com/{}", mint)),
        website: None,
        created_timestamp: Some(1_737_374_400_000),
        raydium_pool: format!("pool-{}", mint),
        highest_market_cap: 1_250_000.0,
        highest_market_cap_time: "+1:00:00".to_string(),
        lowest_market_cap: 61_000.0,
        lowest_market_cap_time: "+0:00:00".to_string(),
        current_market_cap: 400_000.0,
        current_market_cap_time: "+5:00:00".to_string(),
    }
}

/// Three hourly bars starting 2025-01-20 12:00 UTC
pub fn sample_series() -> CandleSeries {
    let origin = Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap();
    let hour = chrono::Duration::hours(1);
    CandleSeries::new(
        serde_json::json!({ "base": { "symbol": "MOCK" } }),
        vec![
            CandlePoint::new(origin, 9.0, 10.0, 8.0, 9.5, 100.0),
            CandlePoint::new(origin + hour, 9.5, 50.0, 40.0, 45.0, 300.0),
            CandlePoint::new(origin + hour * 2, 45.0, 30.0, 28.0, 29.0, 50.0),
        ],
    )
}

/// Activity source returning a fixed export and recording windows
#[derive(Debug, Default)]
pub struct StaticActivitySource {
    export: ActivityExport,
    windows: Mutex<Vec<ActivityWindow>>,
}

impl StaticActivitySource {
    pub fn new(export: ActivityExport) -> Self {
        Self {
            export,
            windows: Mutex::new(Vec::new()),
        }
    }

    pub fn windows(&self) -> Vec<ActivityWindow> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivitySource for StaticActivitySource {
    async fn fetch_activity(&self, window: &ActivityWindow) -> Result<ActivityExport, SourceError> {
        self.windows.lock().unwrap().push(*window);
        Ok(self.export.clone())
    }
}

/// Coin pages keyed by mint
#[derive(Debug, Default)]
pub struct StaticCoinPages {
    pages: HashMap<String, String>,
    calls: Mutex<Vec<String>>,
}

impl StaticCoinPages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the page served for a mint
    pub fn with_page(mut self, mint: &str, page: impl Into<String>) -> Self {
        self.pages.insert(mint.to_string(), page.into());
        self
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CoinPageSource for StaticCoinPages {
    async fn fetch_coin_page(&self, mint: &str) -> Result<String, SourceError> {
        self.calls.lock().unwrap().push(mint.to_string());
        self.pages.get(mint).cloned().ok_or_else(|| SourceError::Status {
            status: 404,
            message: "Not Found".to_string(),
        })
    }
}

/// Holder counts and volumes keyed by mint; unknown mints get defaults
#[derive(Debug)]
pub struct StaticHolderStats {
    holders: HashMap<String, u64>,
    volumes: HashMap<String, f64>,
    default_holders: u64,
    default_volume: f64,
}

impl Default for StaticHolderStats {
    fn default() -> Self {
        Self {
            holders: HashMap::new(),
            volumes: HashMap::new(),
            default_holders: 100,
            default_volume: 10_000.0,
        }
    }
}

impl StaticHolderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stats(mut self, mint: &str, holders: u64, volume: f64) -> Self {
        self.holders.insert(mint.to_string(), holders);
        self.volumes.insert(mint.to_string(), volume);
        self
    }
}

#[async_trait]
impl HolderStatsSource for StaticHolderStats {
    async fn holder_count(&self, mint: &str) -> Result<u64, SourceError> {
        Ok(self.holders.get(mint).copied().unwrap_or(self.default_holders))
    }

    async fn volume_24h(&self, mint: &str) -> Result<f64, SourceError> {
        Ok(self.volumes.get(mint).copied().unwrap_or(self.default_volume))
    }
}

type PoolResponse = Result<PoolDocument, SourceError>;

/// Pool source replaying a per-address script of responses
///
/// The last scripted response repeats once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedPoolSource {
    scripts: Mutex<HashMap<String, VecDeque<PoolResponse>>>,
    calls: Mutex<Vec<(String, tokio::time::Instant)>>,
}

impl ScriptedPoolSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to queue responses for a pool address
    pub fn with_script(self, pool_address: &str, responses: Vec<PoolResponse>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(pool_address.to_string(), responses.into_iter().collect());
        self
    }

    /// Number of fetches made for a pool address
    pub fn call_count(&self, pool_address: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(a, _)| a == pool_address).count()
    }

    /// Instants of each fetch for a pool address
    pub fn call_times(&self, pool_address: &str) -> Vec<tokio::time::Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == pool_address)
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl PoolSource for ScriptedPoolSource {
    async fn fetch_pool(&self, pool_address: &str) -> Result<PoolDocument, SourceError> {
        self.calls
            .lock()
            .unwrap()
            .push((pool_address.to_string(), tokio::time::Instant::now()));
        let mut scripts = self.scripts.lock().unwrap();
        let Some(script) = scripts.get_mut(pool_address) else {
            return Ok(PoolDocument::default());
        };
        if script.len() > 1 {
            script.pop_front().unwrap_or_else(|| Ok(PoolDocument::default()))
        } else {
            script.front().cloned().unwrap_or_else(|| Ok(PoolDocument::default()))
        }
    }
}

/// Candle source serving one series for every pool/pair
#[derive(Debug, Default)]
pub struct StaticCandles {
    series: CandleSeries,
    calls: Mutex<Vec<(String, String)>>,
}

impl StaticCandles {
    pub fn new(series: CandleSeries) -> Self {
        Self {
            series,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CandleSource for StaticCandles {
    async fn fetch_candles(&self, pool_id: &str, pair_id: &str) -> Result<CandleSeries, SourceError> {
        self.calls
            .lock()
            .unwrap()
            .push((pool_id.to_string(), pair_id.to_string()));
        Ok(self.series.clone())
    }
}

/// Enricher with canned outcomes per mint
///
/// Mints not registered as failing or panicking succeed with
/// `sample_record`. Tracks how many enrichments run at once.
#[derive(Debug, Default)]
pub struct ScriptedEnricher {
    failures: HashMap<String, EnrichError>,
    panics: HashSet<String>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedEnricher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure(mut self, mint: &str, error: EnrichError) -> Self {
        self.failures.insert(mint.to_string(), error);
        self
    }

    pub fn with_panic(mut self, mint: &str) -> Self {
        self.panics.insert(mint.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of concurrent enrichments observed
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl TokenEnricher for ScriptedEnricher {
    async fn enrich(&self, transaction: &Transaction) -> Result<TokenRecord, EnrichError> {
        let mint = transaction.mint().to_string();
        self.calls.lock().unwrap().push(mint.clone());

        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.panics.contains(&mint) {
            panic!("scripted panic for {}", mint);
        }
        match self.failures.get(&mint) {
            Some(error) => Err(error.clone()),
            None => Ok(sample_record(&mint)),
        }
    }
}
