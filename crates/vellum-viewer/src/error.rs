//! Error types for vellum-viewer.

use thiserror::Error;

/// Result type for viewer-session operations.
pub type ViewerResult<T> = std::result::Result<T, ViewerError>;

/// Errors that can occur while managing viewer sessions.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// Conversion-side failure surfaced through the viewer.
    #[error(transparent)]
    Core(#[from] vellum_core::Error),

    /// Widget construction or command delivery failed.
    #[error("viewer widget error: {0}")]
    Widget(String),
}
