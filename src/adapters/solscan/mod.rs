//! Solscan Adapters
//!
//! Activity export (the day's migrations) and per-mint holder/volume stats.

pub mod activity;
pub mod holders;

pub use activity::{parse_export, SolscanActivitySource};
pub use holders::SolscanHolderStats;

/// Default API host
pub const SOLSCAN_BASE_URL: &str = "https://api-v2.solscan.io";
/// Account activity CSV export
pub const SOLSCAN_EXPORT_ENDPOINT: &str = "/v2/account/activity/export";
/// Total holder count for a token
pub const SOLSCAN_HOLDER_ENDPOINT: &str = "/v2/token/holder/total";
/// DeFi pool info (24h volume) for a token
pub const SOLSCAN_DEFI_POOL_INFO_ENDPOINT: &str = "/v2/token/defi/pool/info";
/// Origin header the API expects from browser clients
pub const SOLSCAN_ORIGIN: &str = "https://solscan.io";
