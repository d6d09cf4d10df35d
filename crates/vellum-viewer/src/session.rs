//! Viewer session lifecycle.
//!
//! At most one viewer session is live at a time. Create and close
//! requests are serialized through an [`OperationQueue`] so teardown
//! and construction never interleave, and settling delays separate a
//! destroyed widget from reuse of its mount point. The widget's own
//! teardown runs past `destroy()` returning, so reusing the mount too
//! early corrupts the next session; presentation documents hold
//! resources the longest and get the longest tier.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use tokio::sync::{Mutex, broadcast, mpsc};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use vellum_core::config::DEFAULT_QUEUE_WAIT;
use vellum_core::queue::OperationQueue;
use vellum_core::{ConversionResult, DocumentType};

use crate::error::ViewerResult;
use crate::widget::{ViewerCommand, ViewerWidget, WidgetConfig, WidgetEvent, WidgetHost};

/// Capacity of the session event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Interface language handed to new widgets unless overridden.
const DEFAULT_LANGUAGE: &str = "en-US";

const MEDIA_COMMAND: &str = "set_media";
const DOCUMENT_COMMAND: &str = "load_document";

/// Settling delays between widget teardown and mount reuse.
#[derive(Debug, Clone, Copy)]
pub struct SettleDelays {
    /// No session was live.
    pub fresh: Duration,
    /// A word or cell session is being replaced.
    pub replace: Duration,
    /// A slide session is being replaced.
    pub presentation: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        SettleDelays {
            fresh: Duration::from_millis(50),
            replace: Duration::from_millis(250),
            presentation: Duration::from_millis(600),
        }
    }
}

impl SettleDelays {
    /// Tier for replacing a session of type `prior` (`None` when no
    /// session was live).
    pub fn for_replacement(&self, prior: Option<DocumentType>) -> Duration {
        match prior {
            None => self.fresh,
            Some(DocumentType::Slide) => self.presentation,
            Some(_) => self.replace,
        }
    }
}

/// Tunables for a [`SessionManager`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Interface language handed to new widgets.
    pub language: String,
    pub delays: SettleDelays,
    /// Grace period the lifecycle queue waits on one operation.
    pub queue_wait: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            language: DEFAULT_LANGUAGE.to_string(),
            delays: SettleDelays::default(),
            queue_wait: DEFAULT_QUEUE_WAIT,
        }
    }
}

/// Notifications emitted by live sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The widget finished rendering the delivered document.
    DocumentReady { file_name: String },
}

struct LiveSession<W> {
    /// Distinguishes this session from later ones sharing the slot, so
    /// a stale widget's buffered events are never served against a
    /// replacement.
    id: u64,
    widget: W,
    document_type: DocumentType,
}

struct ManagerInner<H: WidgetHost> {
    host: H,
    mount_id: String,
    language: String,
    delays: SettleDelays,
    session_seq: AtomicU64,
    session: Mutex<Option<LiveSession<H::Widget>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl<H: WidgetHost> ManagerInner<H> {
    async fn session_is(&self, id: u64) -> bool {
        self.session.lock().await.as_ref().map(|live| live.id) == Some(id)
    }
}

/// Owns the single live viewer session.
///
/// Cloning is cheap; clones share the session slot, the lifecycle
/// queue, and the event channel.
pub struct SessionManager<H: WidgetHost> {
    inner: Arc<ManagerInner<H>>,
    queue: OperationQueue,
}

impl<H: WidgetHost> Clone for SessionManager<H> {
    fn clone(&self) -> Self {
        SessionManager {
            inner: self.inner.clone(),
            queue: self.queue.clone(),
        }
    }
}

impl<H: WidgetHost> SessionManager<H> {
    /// Manager presenting documents at `mount_id` with default settings.
    pub fn new(host: H, mount_id: impl Into<String>) -> Self {
        Self::with_settings(host, mount_id, SessionSettings::default())
    }

    pub fn with_settings(host: H, mount_id: impl Into<String>, settings: SessionSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        SessionManager {
            inner: Arc::new(ManagerInner {
                host,
                mount_id: mount_id.into(),
                language: settings.language,
                delays: settings.delays,
                session_seq: AtomicU64::new(0),
                session: Mutex::new(None),
                events,
            }),
            queue: OperationQueue::new(settings.queue_wait),
        }
    }

    /// Subscribe to session notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Whether a session is currently live.
    pub async fn is_live(&self) -> bool {
        self.inner.session.lock().await.is_some()
    }

    /// Replace the live session with one presenting `result`.
    ///
    /// Serialized through the lifecycle queue. A failed construction
    /// leaves no session behind; a later call retries independently.
    pub async fn create_session(&self, result: ConversionResult) -> ViewerResult<()> {
        let label = format!("create session {}", result.file_name);
        let inner = self.inner.clone();
        self.queue
            .run(&label, async move { create_serialized(inner, result).await })
            .await?
    }

    /// Tear down the live session, if any.
    pub async fn close_session(&self) -> ViewerResult<()> {
        let inner = self.inner.clone();
        self.queue
            .run("close session", async move { close_serialized(inner).await })
            .await?
    }
}

async fn create_serialized<H: WidgetHost>(
    inner: Arc<ManagerInner<H>>,
    result: ConversionResult,
) -> ViewerResult<()> {
    let ConversionResult {
        file_name,
        document_type,
        bytes,
        media,
    } = result;

    // Tear down whatever is live. A failed teardown must not block the
    // new session; the widget gets dropped regardless.
    let prior = {
        let mut session = inner.session.lock().await;
        session.take().map(|mut live| {
            if let Err(error) = live.widget.destroy() {
                warn!(%error, "prior session teardown failed; continuing");
            }
            live.document_type
        })
    };

    let settle = inner.delays.for_replacement(prior);
    if let Some(prior_type) = prior {
        debug!(%prior_type, settle_ms = settle.as_millis() as u64, "replacing live session");
        sleep(settle).await;
    }

    inner.host.clear_mount(&inner.mount_id)?;
    sleep(settle).await;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let config = WidgetConfig::new(&file_name, document_type, &inner.language);
    let widget = inner.host.create_widget(&inner.mount_id, config, events_tx)?;

    let id = inner.session_seq.fetch_add(1, Ordering::Relaxed);
    {
        let mut session = inner.session.lock().await;
        *session = Some(LiveSession {
            id,
            widget,
            document_type,
        });
    }
    info!(%file_name, %document_type, "viewer session created");

    // Locators must reach the widget before the payload that references
    // them.
    let media_command = ViewerCommand::new(MEDIA_COMMAND, json!({ "urls": media }));
    let document_command = ViewerCommand::new(
        DOCUMENT_COMMAND,
        json!({
            "file_name": file_name,
            "document_type": document_type,
            "payload": STANDARD.encode(&bytes),
        }),
    );
    tokio::spawn(dispatch_events(
        inner,
        events_rx,
        id,
        file_name,
        (media_command, document_command),
    ));
    Ok(())
}

async fn close_serialized<H: WidgetHost>(inner: Arc<ManagerInner<H>>) -> ViewerResult<()> {
    let taken = inner.session.lock().await.take();
    let Some(mut live) = taken else {
        debug!("close requested with no live session");
        return Ok(());
    };
    if let Err(error) = live.widget.destroy() {
        warn!(%error, "session teardown failed; session dropped anyway");
    }
    if let Err(error) = inner.host.clear_mount(&inner.mount_id) {
        warn!(%error, "failed to clear mount after close");
    }
    info!("viewer session closed");
    Ok(())
}

/// Serve one session's widget events until the widget goes away or the
/// session is replaced.
async fn dispatch_events<H: WidgetHost>(
    inner: Arc<ManagerInner<H>>,
    mut events: mpsc::UnboundedReceiver<WidgetEvent>,
    id: u64,
    file_name: String,
    delivery: (ViewerCommand, ViewerCommand),
) {
    let mut delivery = Some(delivery);
    while let Some(event) = events.recv().await {
        match event {
            WidgetEvent::AppReady => {
                let Some((media, document)) = delivery.take() else {
                    debug!("ignoring repeated app-ready event");
                    continue;
                };
                let mut session = inner.session.lock().await;
                match session.as_mut() {
                    Some(live) if live.id == id => {
                        if let Err(error) = live.widget.send_command(media) {
                            warn!(%error, "failed to deliver media locators to viewer");
                            continue;
                        }
                        if let Err(error) = live.widget.send_command(document) {
                            warn!(%error, "failed to deliver document to viewer");
                        }
                    }
                    _ => break,
                }
            }
            WidgetEvent::DocumentReady => {
                if !inner.session_is(id).await {
                    break;
                }
                debug!(%file_name, "document ready");
                let _ = inner.events.send(SessionEvent::DocumentReady {
                    file_name: file_name.clone(),
                });
            }
        }
    }
}
