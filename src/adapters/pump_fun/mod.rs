//! pump.fun Adapters
//!
//! Coin page retrieval and extraction of the embedded coin metadata.

pub mod coin_page;
pub mod extractor;
pub mod router_state;

pub use coin_page::{PumpFunCoinPages, PUMPFUN_BASE_URL};
pub use extractor::RegexMetadataExtractor;
pub use router_state::encode_router_state_tree;
