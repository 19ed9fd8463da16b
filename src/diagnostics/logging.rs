//! Logging initialisation
//!
//! Console output always; an optional plain-text file sink mirrors it.
//! `RUST_LOG`, when set, wins over the CLI flags and the configured level.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

/// Resolved logging settings
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub verbose: bool,
    pub debug: bool,
    /// Level used when neither flag is given
    pub default_level: String,
    pub log_file: Option<PathBuf>,
}

impl LogOptions {
    /// Level directive chosen from the flags
    pub fn level(&self) -> &str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else if self.default_level.trim().is_empty() {
            "warn"
        } else {
            self.default_level.trim()
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level()))
    }
}

/// Install the global subscriber
pub fn init_logging(options: &LogOptions) -> Result<(), LoggingError> {
    let file_layer = match &options.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::LogFile {
                    path: path.clone(),
                    source,
                })?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(options.filter())
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_precedence() {
        let mut options = LogOptions {
            default_level: "error".into(),
            ..Default::default()
        };
        assert_eq!(options.level(), "error");

        options.verbose = true;
        assert_eq!(options.level(), "info");

        options.debug = true;
        assert_eq!(options.level(), "debug");
    }

    #[test]
    fn test_blank_default_falls_back_to_warn() {
        assert_eq!(LogOptions::default().level(), "warn");
    }

    #[test]
    fn test_unwritable_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let options = LogOptions {
            log_file: Some(dir.path().join("missing").join("harvester.log")),
            ..Default::default()
        };
        assert!(matches!(init_logging(&options), Err(LoggingError::LogFile { .. })));
    }
}
