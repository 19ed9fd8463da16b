//! Price History
//!
//! OHLC bars for one pool/pair as returned by the price-history source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bar of price history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandlePoint {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl CandlePoint {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Sequence of bars plus the provider's metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    /// Provider metadata (base/quote token info, etc.), kept opaque
    pub meta: serde_json::Value,
    points: Vec<CandlePoint>,
}

impl CandleSeries {
    /// Build a series from bars exactly as given
    pub fn new(meta: serde_json::Value, points: Vec<CandlePoint>) -> Self {
        Self { meta, points }
    }

    /// Build a series, sorting bars by timestamp (stable for equal times)
    pub fn from_unordered(meta: serde_json::Value, mut points: Vec<CandlePoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        Self { meta, points }
    }

    pub fn points(&self) -> &[CandlePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True when every bar is at or after the previous one
    pub fn is_time_ordered(&self) -> bool {
        self.points.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
    }
}
