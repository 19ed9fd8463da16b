//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - HTTP: proxy-rotating transport shared by every upstream
//! - Solscan: activity export, holder count and 24h volume
//! - pump.fun: coin pages and metadata extraction
//! - GeckoTerminal: pool documents and candlesticks
//! - CLI: Command-line interface definitions

pub mod cli;
pub mod gecko_terminal;
pub mod http;
pub mod pump_fun;
pub mod solscan;

pub use cli::CliApp;
pub use gecko_terminal::{GeckoCandleSource, GeckoPoolSource};
pub use http::{HttpClientFactory, ProxyPool, ReqwestConnector};
pub use pump_fun::{PumpFunCoinPages, RegexMetadataExtractor};
pub use solscan::{SolscanActivitySource, SolscanHolderStats};
