//! Domain Layer - Core data and computation for the harvester
//!
//! Pure types and logic with no I/O. All upstream access happens through
//! the ports layer.
//!
//! - `transaction`: normalized migration transfers (the unit of work)
//! - `token_record`: coin metadata and the persisted result row
//! - `candle`: OHLC price history
//! - `pool`: JSON:API pool documents
//! - `market_cap`: market cap extremes over a price history
//! - `activity_window`: one Eastern-time day as epoch bounds

pub mod transaction;
pub mod token_record;
pub mod candle;
pub mod pool;
pub mod market_cap;
pub mod activity_window;

pub use transaction::{Flow, Transaction};
pub use token_record::{CoinMeta, RecordError, TokenRecord, MINT_COLUMN};
pub use candle::{CandlePoint, CandleSeries};
pub use pool::{IncludedResource, PoolDocument, PoolResource};
pub use market_cap::{compute_stats, MarketCapColumns, MarketCapPoint, MarketCapStats, RelativeTime};
pub use activity_window::{ActivityWindow, WindowError};
