//! Configuration Loader
//!
//! Loads and validates configuration from TOML files. Every section has
//! defaults, so an empty file is a valid configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::adapters::gecko_terminal::GECKO_TERMINAL_BASE_URL;
use crate::adapters::http::{ConnectorConfig, HttpClientConfig, ProxyEndpoint, ProxyPool};
use crate::adapters::pump_fun::PUMPFUN_BASE_URL;
use crate::adapters::solscan::SOLSCAN_BASE_URL;
use crate::application::{HarvestSettings, PoolRetryPolicy};

/// Comma-separated proxy URIs replacing the configured list
pub const PROXIES_ENV: &str = "HARVESTER_PROXIES";
/// Data directory override
pub const DATA_DIR_ENV: &str = "HARVESTER_DATA_DIR";

const MAX_WORKERS: usize = 16;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineSection,
    pub proxy: ProxySection,
    pub http: HttpSection,
    pub upstream: UpstreamSection,
    pub enrichment: EnrichmentSection,
    pub logging: LoggingSection,
}

/// Output files and worker pool size
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Directory holding snapshots and result files (`~` is expanded)
    pub data_dir: String,
    /// Concurrent enrichment workers (1-16)
    pub workers: usize,
    pub results_prefix: String,
    pub activities_prefix: String,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            data_dir: "~/pumpfun_data".to_string(),
            workers: 3,
            results_prefix: "results".to_string(),
            activities_prefix: "activities".to_string(),
        }
    }
}

impl PipelineSection {
    /// Data directory with `HARVESTER_DATA_DIR` override and `~` expanded
    pub fn get_data_dir(&self) -> PathBuf {
        let raw = std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| self.data_dir.clone());
        expand_path(&raw)
    }

    pub fn harvest_settings(&self) -> HarvestSettings {
        HarvestSettings {
            data_dir: self.get_data_dir(),
            results_prefix: self.results_prefix.clone(),
            activities_prefix: self.activities_prefix.clone(),
            workers: self.workers,
        }
    }
}

/// Proxy rotation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxySection {
    /// Route requests through proxies at all
    pub enabled: bool,
    /// Inline proxy URIs (http, https, socks4, socks5, socks5h)
    pub urls: Vec<String>,
    /// File with one proxy URI per line; `#` starts a comment
    pub file: Option<String>,
    /// Immediate reconnects on the same proxy before it is declared dead
    pub reconnect_retries: u32,
}

impl Default for ProxySection {
    fn default() -> Self {
        Self {
            enabled: true,
            urls: Vec::new(),
            file: None,
            reconnect_retries: 2,
        }
    }
}

impl ProxySection {
    /// Proxy URIs: `HARVESTER_PROXIES` when set, else `urls` plus `file`
    pub fn get_proxy_uris(&self) -> Result<Vec<String>, ConfigError> {
        match std::env::var(PROXIES_ENV) {
            Ok(list) => Ok(split_list(&list)),
            Err(_) => self.configured_uris(),
        }
    }

    /// Union of the inline list and the proxy file, first occurrence kept
    pub fn configured_uris(&self) -> Result<Vec<String>, ConfigError> {
        let mut uris: Vec<String> = Vec::new();
        let mut push = |uri: &str| {
            let uri = uri.trim();
            if !uri.is_empty() && !uris.iter().any(|known| known == uri) {
                uris.push(uri.to_string());
            }
        };

        self.urls.iter().for_each(|uri| push(uri.as_str()));
        if let Some(ref file) = self.file {
            let content = std::fs::read_to_string(expand_path(file))?;
            content
                .lines()
                .map(|line| line.split('#').next().unwrap_or_default())
                .for_each(|uri| push(uri));
        }

        Ok(uris)
    }

    /// Pool for this run; empty when proxies are disabled
    pub fn build_pool(&self) -> Result<ProxyPool, ConfigError> {
        if !self.enabled {
            return Ok(ProxyPool::empty());
        }
        let uris = self.get_proxy_uris()?;
        ProxyPool::from_uris(&uris).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    pub fn client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            use_proxies: self.enabled,
            reconnect_retries: self.reconnect_retries,
        }
    }
}

/// Transport timeouts and identity
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpSection {
    fn default() -> Self {
        let defaults = ConnectorConfig::default();
        Self {
            connect_timeout_secs: defaults.connect_timeout.as_secs(),
            request_timeout_secs: defaults.request_timeout.as_secs(),
            user_agent: defaults.user_agent,
        }
    }
}

impl HttpSection {
    pub fn connector_config(&self) -> ConnectorConfig {
        ConnectorConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Base URLs of the upstream services
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamSection {
    pub pump_fun_url: String,
    pub solscan_url: String,
    pub gecko_terminal_url: String,
}

impl Default for UpstreamSection {
    fn default() -> Self {
        Self {
            pump_fun_url: PUMPFUN_BASE_URL.to_string(),
            solscan_url: SOLSCAN_BASE_URL.to_string(),
            gecko_terminal_url: GECKO_TERMINAL_BASE_URL.to_string(),
        }
    }
}

/// Pool resolution retry schedule
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentSection {
    /// Total pool fetch attempts per token
    pub pool_max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each further one
    pub pool_backoff_base_ms: u64,
}

impl Default for EnrichmentSection {
    fn default() -> Self {
        Self {
            pool_max_attempts: 3,
            pool_backoff_base_ms: 1000,
        }
    }
}

impl EnrichmentSection {
    pub fn retry_policy(&self) -> PoolRetryPolicy {
        PoolRetryPolicy {
            max_attempts: self.pool_max_attempts,
            base_delay: Duration::from_millis(self.pool_backoff_base_ms),
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log to file (in addition to stdout)
    pub log_to_file: bool,
    /// Log file path
    pub log_file: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            log_to_file: false,
            log_file: "coin-harvester.log".to_string(),
        }
    }
}

impl LoggingSection {
    pub fn get_log_file(&self) -> Option<PathBuf> {
        self.log_to_file.then(|| expand_path(&self.log_file))
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.workers == 0 || self.pipeline.workers > MAX_WORKERS {
            return Err(ConfigError::ValidationError(format!(
                "workers must be 1-{}, got {}",
                MAX_WORKERS, self.pipeline.workers
            )));
        }

        if self.pipeline.data_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "data_dir cannot be empty".to_string(),
            ));
        }

        if self.enrichment.pool_max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "pool_max_attempts must be > 0".to_string(),
            ));
        }

        let upstream = [
            ("pump_fun_url", &self.upstream.pump_fun_url),
            ("solscan_url", &self.upstream.solscan_url),
            ("gecko_terminal_url", &self.upstream.gecko_terminal_url),
        ];
        for (name, url) in upstream {
            if url.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{} cannot be empty",
                    name
                )));
            }
        }

        for (index, uri) in self.proxy.configured_uris()?.iter().enumerate() {
            ProxyEndpoint::parse(index, uri)
                .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        }

        Ok(())
    }
}

/// Expand `~` and environment variables in a configured path
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
