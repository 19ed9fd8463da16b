//! Coin Harvester - pump.fun Migration Dataset Library
//!
//! Builds a daily dataset of tokens that migrated from pump.fun to Raydium.
//!
//! # Modules
//!
//! - `domain`: Core records (Transaction, ActivityWindow, CandleSeries, TokenRecord)
//! - `ports`: Trait abstractions (ActivitySource, CoinPageSource, TokenEnricher)
//! - `adapters`: External implementations (HTTP transport, Solscan, pump.fun, GeckoTerminal, CLI)
//! - `application`: Enrichment pipeline, result store and harvest runs
//! - `config`: Configuration loading and validation
//! - `diagnostics`: Logging, per-run context and compressed payloads

pub mod adapters;
pub mod application;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod ports;
