//! GeckoTerminal Candlesticks
//!
//! Hourly OHLC bars for a pool/pair from the venue's launch up to now.
//! Body shape: `{"data":[{"dt":..,"o":..,"h":..,"l":..,"c":..,"v":..}],"meta":{..}}`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::warn;

use super::GECKO_TERMINAL_CANDLESTICKS_ENDPOINT;
use crate::adapters::http::{HttpClientFactory, HttpRequest};
use crate::domain::{CandlePoint, CandleSeries};
use crate::ports::{CandleSource, SourceError};

/// pump.fun launch, 2024-01-19 00:00:00 UTC
pub const PUMPFUN_LAUNCH_TIMESTAMP: i64 = 1_705_622_400;

/// Bar width in minutes
const RESOLUTION: u32 = 60;

#[derive(Clone)]
pub struct GeckoCandleSource {
    http: HttpClientFactory,
    base_url: String,
}

impl GeckoCandleSource {
    pub fn new(http: HttpClientFactory, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn candle_request(&self, pool_id: &str, pair_id: &str, now: DateTime<Utc>) -> HttpRequest {
        let to_timestamp = now.timestamp();
        let count_back = (to_timestamp - PUMPFUN_LAUNCH_TIMESTAMP).max(0) / 3600;

        HttpRequest::get(format!(
            "{}{}/{}/{}",
            self.base_url, GECKO_TERMINAL_CANDLESTICKS_ENDPOINT, pool_id, pair_id
        ))
        .query("resolution", RESOLUTION)
        .query("from_timestamp", PUMPFUN_LAUNCH_TIMESTAMP)
        .query("to_timestamp", to_timestamp)
        .query("for_update", "false")
        .query("count_back", count_back)
        .query("currency", "usd")
        .query("is_inverted", "false")
        .header("accept", "application/json")
    }
}

#[async_trait]
impl CandleSource for GeckoCandleSource {
    async fn fetch_candles(&self, pool_id: &str, pair_id: &str) -> Result<CandleSeries, SourceError> {
        let request = self.candle_request(pool_id, pair_id, Utc::now());
        let body = self.http.send(request).await.into_json()?;
        parse_candles(body)
    }
}

/// Build a time-ordered series from a candlestick body
///
/// Bars that cannot be read are skipped with a warning.
pub fn parse_candles(mut body: Value) -> Result<CandleSeries, SourceError> {
    let meta = body.get_mut("meta").map(Value::take).unwrap_or(Value::Null);
    let bars = match body.get("data") {
        Some(Value::Array(bars)) => bars,
        Some(Value::Null) | None => return Ok(CandleSeries::new(meta, Vec::new())),
        Some(other) => {
            return Err(SourceError::Malformed(format!(
                "candlestick data is not an array: {}",
                other
            )))
        }
    };

    let mut points = Vec::with_capacity(bars.len());
    for (index, bar) in bars.iter().enumerate() {
        match parse_bar(bar) {
            Some(point) => points.push(point),
            None => warn!("Candle {} skipped: unreadable bar {}", index, bar),
        }
    }

    Ok(CandleSeries::from_unordered(meta, points))
}

fn parse_bar(bar: &Value) -> Option<CandlePoint> {
    Some(CandlePoint::new(
        parse_timestamp(bar.get("dt")?)?,
        number(bar.get("o")?)?,
        number(bar.get("h")?)?,
        number(bar.get("l")?)?,
        number(bar.get("c")?)?,
        bar.get("v").and_then(number).unwrap_or(0.0),
    ))
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// RFC 3339, a naive ISO timestamp taken as UTC, or epoch seconds
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(seconds) = value.as_i64() {
        return Utc.timestamp_opt(seconds, 0).single();
    }

    let raw = value.as_str()?.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}
