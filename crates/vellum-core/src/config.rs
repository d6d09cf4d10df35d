//! Configuration for the engine and the conversion pipeline.

use std::path::PathBuf;
use std::time::Duration;

/// Default bound on engine bootstrap (launch through ready signal).
pub const DEFAULT_BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(120);

/// Default bound the queue consumer waits on one operation before
/// starting the next.
pub const DEFAULT_QUEUE_WAIT: Duration = Duration::from_secs(30);

/// Engine process configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Explicit engine binary path. When unset, discovery falls back to
    /// the `VELLUM_ENGINE` environment variable, the directory of the
    /// current executable, then `$PATH`.
    pub binary_path: Option<PathBuf>,

    /// Extra arguments passed to the engine process.
    pub args: Vec<String>,

    /// Bound on one bootstrap attempt. Expiry fails that attempt and
    /// clears the single-flight state so a later call retries.
    pub bootstrap_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            args: Vec::new(),
            bootstrap_timeout: DEFAULT_BOOTSTRAP_TIMEOUT,
        }
    }
}

/// Conversion pipeline configuration.
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Engine process settings.
    pub engine: EngineConfig,

    /// Queue wait bound for serialized conversions.
    pub queue_wait: Duration,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            queue_wait: DEFAULT_QUEUE_WAIT,
        }
    }
}
