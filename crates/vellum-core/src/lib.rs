//! Office-document conversion around the vellum native engine.
//!
//! This crate provides:
//! - Lazy single-flight engine bootstrap with crash recovery
//! - A FIFO queue serializing all engine work
//! - The conversion pipeline (detection, CSV fallback, descriptor,
//!   invocation, media extraction)
//! - A virtual-filesystem gateway over the engine's in-memory tree

pub mod config;
pub mod csv;
pub mod descriptor;
pub mod document;
pub mod engine;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod queue;
pub mod vfs;
mod xml;

pub use config::{ConverterConfig, EngineConfig};
pub use document::{ConversionRequest, DocumentType, detect_extension, sanitize_file_name};
pub use error::{Error, Result};
pub use media::{MediaLocator, MediaRegistry};
pub use pipeline::{ConversionResult, Converter};
