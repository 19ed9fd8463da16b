//! Market Cap Statistics
//!
//! Pure computation of highest / lowest / current market cap over a token's
//! price history, each paired with its offset from the token's first bar.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::candle::{CandlePoint, CandleSeries};

/// Signed elapsed time since the first bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelativeTime(pub Duration);

impl RelativeTime {
    pub fn between(origin: DateTime<Utc>, event: DateTime<Utc>) -> Self {
        Self(event - origin)
    }

    pub fn num_seconds(&self) -> i64 {
        self.0.num_seconds()
    }
}

impl fmt::Display for RelativeTime {
    /// `+H:MM:SS`, with a `N day(s), ` prefix once the offset exceeds a day
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.0.num_seconds();
        let sign = if total < 0 { '-' } else { '+' };
        let total = total.unsigned_abs();
        let days = total / 86_400;
        let rem = total % 86_400;
        let (h, m, s) = (rem / 3600, (rem % 3600) / 60, rem % 60);

        write!(f, "{}", sign)?;
        if days > 0 {
            let unit = if days == 1 { "day" } else { "days" };
            write!(f, "{} {}, ", days, unit)?;
        }
        write!(f, "{}:{:02}:{:02}", h, m, s)
    }
}

/// One market cap observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketCapPoint {
    /// Price x circulating supply, rounded to cents
    pub market_cap: f64,
    /// Offset from the first bar
    pub relative_time: RelativeTime,
    /// Absolute time of the bar
    pub at: DateTime<Utc>,
}

/// Summary statistics over a price history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketCapStats {
    /// Timestamp of the first bar
    pub creation_time: DateTime<Utc>,
    pub highest: MarketCapPoint,
    pub lowest: MarketCapPoint,
    pub current: MarketCapPoint,
}

/// Flattened form written alongside a token record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketCapColumns {
    pub highest_market_cap: f64,
    pub highest_market_cap_time: String,
    pub lowest_market_cap: f64,
    pub lowest_market_cap_time: String,
    pub current_market_cap: f64,
    pub current_market_cap_time: String,
}

impl From<&MarketCapStats> for MarketCapColumns {
    fn from(stats: &MarketCapStats) -> Self {
        Self {
            highest_market_cap: stats.highest.market_cap,
            highest_market_cap_time: stats.highest.relative_time.to_string(),
            lowest_market_cap: stats.lowest.market_cap,
            lowest_market_cap_time: stats.lowest.relative_time.to_string(),
            current_market_cap: stats.current.market_cap,
            current_market_cap_time: stats.current.relative_time.to_string(),
        }
    }
}

/// Round to 2 decimal places
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compute market cap extremes over `series`
///
/// Returns `None` for an empty or out-of-order series. Ties on the extreme
/// price resolve to the earliest bar.
pub fn compute_stats(series: &CandleSeries, circulating_supply: f64) -> Option<MarketCapStats> {
    if series.is_empty() || !series.is_time_ordered() {
        return None;
    }
    let points = series.points();
    let first = points.first()?;
    let last = points.last()?;
    let creation_time = first.timestamp;

    let mut highest = first;
    let mut lowest = first;
    for point in &points[1..] {
        if point.high > highest.high {
            highest = point;
        }
        if point.low < lowest.low {
            lowest = point;
        }
    }

    let observe = |bar: &CandlePoint, price: f64| MarketCapPoint {
        market_cap: round_cents(price * circulating_supply),
        relative_time: RelativeTime::between(creation_time, bar.timestamp),
        at: bar.timestamp,
    };

    Some(MarketCapStats {
        creation_time,
        highest: observe(highest, highest.high),
        lowest: observe(lowest, lowest.low),
        current: observe(last, last.close),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn series(bars: &[(i64, f64, f64, f64)]) -> CandleSeries {
        let origin = Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap();
        let points = bars
            .iter()
            .map(|&(offset_secs, high, low, close)| {
                CandlePoint::new(origin + Duration::seconds(offset_secs), low, high, low, close, 1.0)
            })
            .collect();
        CandleSeries::new(serde_json::Value::Null, points)
    }

    #[test]
    fn test_three_hour_series() {
        let s = series(&[(0, 10.0, 8.0, 9.0), (3600, 50.0, 40.0, 45.0), (7200, 30.0, 28.0, 29.5)]);
        let stats = compute_stats(&s, 1_000_000.0).unwrap();

        assert_relative_eq!(stats.highest.market_cap, 50_000_000.0);
        assert_eq!(stats.highest.relative_time.to_string(), "+1:00:00");
        assert_relative_eq!(stats.lowest.market_cap, 8_000_000.0);
        assert_eq!(stats.lowest.relative_time.to_string(), "+0:00:00");
        assert_relative_eq!(stats.current.market_cap, 29_500_000.0);
        assert_eq!(stats.current.relative_time.to_string(), "+2:00:00");
    }

    #[test]
    fn test_empty_series_is_no_data() {
        let s = CandleSeries::default();
        assert!(compute_stats(&s, 1_000_000.0).is_none());
    }

    #[test]
    fn test_unordered_series_is_no_data() {
        let s = series(&[(3600, 1.0, 1.0, 1.0), (0, 2.0, 2.0, 2.0)]);
        assert!(compute_stats(&s, 10.0).is_none());
    }

    #[test]
    fn test_ties_pick_first_bar() {
        let s = series(&[(0, 5.0, 1.0, 2.0), (60, 7.0, 1.0, 2.0), (120, 7.0, 3.0, 2.0)]);
        let stats = compute_stats(&s, 1.0).unwrap();
        assert_eq!(stats.highest.relative_time.num_seconds(), 60);
        assert_eq!(stats.lowest.relative_time.num_seconds(), 0);
    }

    #[test]
    fn test_zero_prices_are_real_numbers() {
        let s = series(&[(0, 0.0, 0.0, 0.0)]);
        let stats = compute_stats(&s, 1_000.0).unwrap();
        assert_eq!(stats.highest.market_cap, 0.0);
    }

    #[test]
    fn test_idempotent() {
        let s = series(&[(0, 0.00012, 0.00009, 0.0001), (900, 0.00031, 0.0001, 0.0002)]);
        assert_eq!(compute_stats(&s, 999_000_000.0), compute_stats(&s, 999_000_000.0));
    }

    #[test]
    fn test_rounds_to_cents() {
        let s = series(&[(0, 0.000123456, 0.000123456, 0.000123456)]);
        let stats = compute_stats(&s, 1_000_000_000.0).unwrap();
        assert_relative_eq!(stats.highest.market_cap, 123_456.0);
        assert_relative_eq!(round_cents(1.005_1), 1.01);
    }

    #[test]
    fn test_relative_time_format() {
        assert_eq!(RelativeTime(Duration::seconds(3 * 3600 + 15 * 60)).to_string(), "+3:15:00");
        assert_eq!(RelativeTime(Duration::seconds(86_400 + 7200)).to_string(), "+1 day, 2:00:00");
        assert_eq!(RelativeTime(Duration::seconds(2 * 86_400)).to_string(), "+2 days, 0:00:00");
        assert_eq!(RelativeTime(Duration::seconds(-90)).to_string(), "-0:01:30");
    }

    #[test]
    fn test_columns_from_stats() {
        let s = series(&[(0, 10.0, 8.0, 9.0), (3600, 50.0, 40.0, 45.0)]);
        let columns = MarketCapColumns::from(&compute_stats(&s, 2.0).unwrap());
        assert_eq!(columns.highest_market_cap_time, "+1:00:00");
        assert_relative_eq!(columns.current_market_cap, 90.0);
    }
}
