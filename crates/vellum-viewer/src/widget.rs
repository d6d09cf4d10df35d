//! The embedded viewer widget contract.
//!
//! The widget itself is a third-party component owned by the host
//! environment; this module defines the narrow surface the session
//! manager drives it through. Hosts implement [`WidgetHost`] to own
//! mount points and construct widgets, and [`ViewerWidget`] for the
//! live instances they hand back.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use vellum_core::DocumentType;

use crate::error::ViewerResult;

/// One instruction pushed into a live widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerCommand {
    pub command: String,
    pub data: Value,
}

impl ViewerCommand {
    pub fn new(command: impl Into<String>, data: Value) -> Self {
        ViewerCommand {
            command: command.into(),
            data,
        }
    }
}

/// Widget permission flags. Documents are always presented view-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub edit: bool,
    pub comment: bool,
    pub chat: bool,
    pub download: bool,
}

impl Permissions {
    pub fn read_only() -> Self {
        Permissions {
            edit: false,
            comment: false,
            chat: false,
            download: true,
        }
    }
}

/// Configuration handed to the host when constructing a widget.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetConfig {
    /// Name shown in the widget chrome.
    pub file_name: String,
    pub document_type: DocumentType,
    pub permissions: Permissions,
    /// BCP 47 interface language tag.
    pub language: String,
    /// Strip editor chrome that has no use in view-only mode.
    pub compact_header: bool,
}

impl WidgetConfig {
    pub fn new(
        file_name: impl Into<String>,
        document_type: DocumentType,
        language: impl Into<String>,
    ) -> Self {
        WidgetConfig {
            file_name: file_name.into(),
            document_type,
            permissions: Permissions::read_only(),
            language: language.into(),
            compact_header: true,
        }
    }
}

/// Events a live widget reports back to the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetEvent {
    /// The widget's application frame is up and can accept commands.
    AppReady,
    /// The delivered document finished rendering.
    DocumentReady,
}

/// A live embedded viewer widget.
pub trait ViewerWidget: Send + 'static {
    /// Push one command into the widget.
    fn send_command(&mut self, command: ViewerCommand) -> ViewerResult<()>;

    /// Tear the widget down so its mount point can be reused.
    fn destroy(&mut self) -> ViewerResult<()>;
}

/// The environment that owns mount points and constructs widgets.
pub trait WidgetHost: Send + Sync + 'static {
    type Widget: ViewerWidget;

    /// Remove everything from the mount point.
    fn clear_mount(&self, mount_id: &str) -> ViewerResult<()>;

    /// Construct a widget at the mount point, reporting its lifecycle
    /// on `events`.
    fn create_widget(
        &self,
        mount_id: &str,
        config: WidgetConfig,
        events: UnboundedSender<WidgetEvent>,
    ) -> ViewerResult<Self::Widget>;
}
