//! Viewer-session management for converted documents.
//!
//! This crate provides:
//! - The embedded viewer widget contract ([`WidgetHost`] / [`ViewerWidget`])
//! - [`SessionManager`], which serializes session create/close through a
//!   FIFO queue, applies settling delays between teardown and mount
//!   reuse, and feeds converted documents into the widget

pub mod error;
pub mod session;
pub mod widget;

pub use error::{ViewerError, ViewerResult};
pub use session::{SessionEvent, SessionManager, SessionSettings, SettleDelays};
pub use widget::{Permissions, ViewerCommand, ViewerWidget, WidgetConfig, WidgetEvent, WidgetHost};
