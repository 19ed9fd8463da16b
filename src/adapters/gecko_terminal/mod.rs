//! GeckoTerminal Adapters
//!
//! Pool documents (pair id, circulating supply) and hourly candlesticks.

pub mod candles;
pub mod pools;

pub use candles::{parse_candles, GeckoCandleSource};
pub use pools::GeckoPoolSource;

/// Default API host
pub const GECKO_TERMINAL_BASE_URL: &str = "https://app.geckoterminal.com";
pub const GECKO_TERMINAL_POOLS_ENDPOINT: &str = "/api/p1/solana/pools";
pub const GECKO_TERMINAL_CANDLESTICKS_ENDPOINT: &str = "/api/p1/candlesticks";
