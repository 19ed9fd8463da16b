//! Diagnostics - logging setup, per-run context and compressed payloads

pub mod context;
pub mod logging;
pub mod payload;

pub use context::RunContext;
pub use logging::{init_logging, LogOptions, LoggingError};
pub use payload::{compress_payload, decompress_payload, PayloadError};
