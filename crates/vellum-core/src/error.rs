//! Error types for vellum-core.

use std::time::Duration;

use thiserror::Error;

/// Result type for vellum-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in vellum-core.
#[derive(Debug, Error)]
pub enum Error {
    /// File extension has no known document type.
    #[error("unsupported document format: {0:?}")]
    UnsupportedFormat(String),

    /// Engine did not signal readiness within the bootstrap bound.
    #[error("engine initialization timed out after {0:?}")]
    InitializationTimeout(Duration),

    /// Engine launch or startup failed.
    #[error("engine initialization failed: {0}")]
    Initialization(String),

    /// Engine entry point returned a non-zero status.
    #[error("conversion failed with engine status {code}")]
    Conversion { code: i32 },

    /// CSV fallback could not decode, parse, or package the input.
    #[error("csv conversion failed: {0}; convert the file to a spreadsheet manually and try again")]
    CsvTranscode(String),

    /// Virtual filesystem operation rejected by the engine.
    #[error("virtual filesystem error at {path}: {message}")]
    Vfs { path: String, message: String },

    /// Engine process or channel is gone.
    #[error("engine unavailable: {0}")]
    Engine(String),

    /// Malformed or unexpected wire traffic.
    #[error("engine protocol error: {0}")]
    Protocol(String),

    /// Operation queue consumer is gone.
    #[error("operation queue closed")]
    QueueClosed,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
