//! Token Records
//!
//! `CoinMeta` is what the coin page tells us about a mint; `TokenRecord` is the
//! enriched, persisted row. The CSV column order is the field order below.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::market_cap::{MarketCapColumns, MarketCapStats};

/// Column holding the dedup key in the result set
pub const MINT_COLUMN: &str = "mint";

/// Metadata embedded in the venue's coin page
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoinMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub mint: String,
    #[serde(default)]
    pub image_uri: Option<String>,
    #[serde(default)]
    pub telegram: Option<String>,
    #[serde(default)]
    pub twitter: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    /// Creation time in epoch milliseconds
    #[serde(default)]
    pub created_timestamp: Option<i64>,
    /// Raydium pool the token migrated to
    #[serde(default)]
    pub raydium_pool: Option<String>,
}

impl CoinMeta {
    /// Raydium pool address, if the coin has graduated
    pub fn pool_address(&self) -> Option<&str> {
        self.raydium_pool.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("Token record is missing required field: {0}")]
    MissingField(&'static str),
}

/// One persisted row per successfully enriched token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub name: String,
    pub symbol: String,
    pub mint: String,
    /// 24h trading volume in USD
    #[serde(rename = "volume")]
    pub volume_24h: f64,
    pub holder_count: u64,
    pub image_uri: Option<String>,
    pub telegram: Option<String>,
    pub twitter: Option<String>,
    pub website: Option<String>,
    /// Creation time in epoch milliseconds
    pub created_timestamp: Option<i64>,
    pub raydium_pool: String,
    pub highest_market_cap: f64,
    #[serde(rename = "highest_market_cap_timestamp")]
    pub highest_market_cap_time: String,
    pub lowest_market_cap: f64,
    #[serde(rename = "lowest_market_cap_timestamp")]
    pub lowest_market_cap_time: String,
    pub current_market_cap: f64,
    #[serde(rename = "current_market_cap_timestamp")]
    pub current_market_cap_time: String,
}

impl TokenRecord {
    /// Combine coin metadata, holder stats and market cap statistics
    pub fn assemble(
        meta: CoinMeta,
        holder_count: u64,
        volume_24h: f64,
        stats: &MarketCapStats,
    ) -> Self {
        let caps = MarketCapColumns::from(stats);
        let raydium_pool = meta.pool_address().unwrap_or_default().to_string();
        Self {
            name: meta.name,
            symbol: meta.symbol,
            mint: meta.mint,
            volume_24h,
            holder_count,
            image_uri: meta.image_uri,
            telegram: meta.telegram,
            twitter: meta.twitter,
            website: meta.website,
            created_timestamp: meta.created_timestamp,
            raydium_pool,
            highest_market_cap: caps.highest_market_cap,
            highest_market_cap_time: caps.highest_market_cap_time,
            lowest_market_cap: caps.lowest_market_cap,
            lowest_market_cap_time: caps.lowest_market_cap_time,
            current_market_cap: caps.current_market_cap,
            current_market_cap_time: caps.current_market_cap_time,
        }
    }

    /// Check the fields a row cannot be written without
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.mint.trim().is_empty() {
            return Err(RecordError::MissingField("mint"));
        }
        if self.name.trim().is_empty() {
            return Err(RecordError::MissingField("name"));
        }
        if self.raydium_pool.trim().is_empty() {
            return Err(RecordError::MissingField("raydium_pool"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::{CandlePoint, CandleSeries};
    use crate::domain::market_cap::compute_stats;
    use chrono::{TimeZone, Utc};

    fn meta() -> CoinMeta {
        CoinMeta {
            name: "Doge Killer".into(),
            symbol: "DK".into(),
            mint: "DkMint1111pump".into(),
            image_uri: Some("https://ipfs.io/ipfs/abc".into()),
            twitter: Some("https://x.com/dk".into()),
            created_timestamp: Some(1_737_374_400_000),
            raydium_pool: Some(" PoolAddr111 ".into()),
            ..Default::default()
        }
    }

    fn stats() -> MarketCapStats {
        let ts = Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap();
        let series = CandleSeries::new(
            serde_json::Value::Null,
            vec![CandlePoint::new(ts, 1.0, 2.0, 0.5, 1.5, 10.0)],
        );
        compute_stats(&series, 100.0).unwrap()
    }

    #[test]
    fn test_assemble() {
        let record = TokenRecord::assemble(meta(), 420, 15_000.5, &stats());
        assert_eq!(record.mint, "DkMint1111pump");
        assert_eq!(record.raydium_pool, "PoolAddr111");
        assert_eq!(record.holder_count, 420);
        assert_eq!(record.highest_market_cap, 200.0);
        assert_eq!(record.current_market_cap_time, "+0:00:00");
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_mint() {
        let mut record = TokenRecord::assemble(meta(), 1, 0.0, &stats());
        record.mint = String::new();
        assert_eq!(record.validate(), Err(RecordError::MissingField("mint")));
    }

    #[test]
    fn test_pool_address_blank_is_none() {
        let mut m = meta();
        m.raydium_pool = Some("   ".into());
        assert_eq!(m.pool_address(), None);
        m.raydium_pool = None;
        assert_eq!(m.pool_address(), None);
    }
}
