//! Migration Transactions
//!
//! One normalized row of the activity export: an SPL transfer into the
//! Raydium authority that marks a token graduating off the bonding curve.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Direction of the transfer relative to the queried account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flow {
    In,
    Out,
}

impl Flow {
    /// Parse the export's flow column ("in" / "out", any case)
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "in" => Some(Flow::In),
            "out" => Some(Flow::Out),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Flow::In => "in",
            Flow::Out => "out",
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A qualifying transaction from the activity export
///
/// Immutable once produced by an `ActivitySource`; the unit of enrichment work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction signature
    pub signature: String,
    /// Block time as exported (kept verbatim)
    pub time: String,
    /// Activity kind, e.g. ACTIVITY_SPL_TRANSFER
    pub action: String,
    /// Source wallet
    pub sender: String,
    /// Destination wallet
    pub receiver: String,
    /// Raw token amount in base units
    pub amount: u128,
    /// Flow direction
    pub flow: Flow,
    /// USD value at transfer time
    pub value: f64,
    /// Token decimals
    pub decimals: u8,
    /// Mint of the transferred token
    pub token_address: String,
}

impl Transaction {
    /// Mint address this transaction is about (dedup key)
    pub fn mint(&self) -> &str {
        &self.token_address
    }

    /// Amount adjusted by the token's decimals
    pub fn ui_amount(&self) -> f64 {
        self.amount as f64 / 10_f64.powi(self.decimals as i32)
    }
}
