//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    expand_path, load_config, Config, ConfigError, EnrichmentSection, HttpSection, LoggingSection,
    PipelineSection, ProxySection, UpstreamSection, DATA_DIR_ENV, PROXIES_ENV,
};
