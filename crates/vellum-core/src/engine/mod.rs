//! The native conversion engine and its narrow driving interface.
//!
//! The engine is an opaque external converter owning a private in-memory
//! filesystem and a single conversion entry point. It is driven through
//! [`EngineHandle`], a cloneable sender into the engine's service task;
//! the task serializes commands, so the non-reentrant engine only ever
//! sees one call at a time.

pub mod protocol;

mod invoker;
mod process;

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, Result};

pub use invoker::{EngineLauncher, EngineManager};
pub use process::{ENGINE_BINARY_NAME, ENGINE_PATH_ENV, resolve_engine_binary};
pub use protocol::{EngineCommand, EngineReply};

/// Depth of the command channel into the engine's service task.
const COMMAND_CHANNEL_CAPACITY: usize = 32;

pub(crate) struct EngineRequest {
    pub(crate) command: EngineCommand,
    pub(crate) reply: oneshot::Sender<Result<EngineReply>>,
}

/// Handle to the single live engine instance.
///
/// Cloning is cheap; every clone feeds the same engine. The engine shuts
/// down once the last clone is dropped.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    pub(crate) fn new(tx: mpsc::Sender<EngineRequest>) -> Self {
        Self { tx }
    }

    /// Send one command and wait for its reply.
    pub async fn request(&self, command: EngineCommand) -> Result<EngineReply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest {
                command,
                reply: reply_tx,
            })
            .await
            .map_err(|_| Error::Engine("engine service task stopped".to_string()))?;
        reply_rx
            .await
            .map_err(|_| Error::Engine("engine dropped the request".to_string()))?
    }

    /// Whether the engine's service task has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// An engine linked into this process instead of spawned as a child.
///
/// Implementations serve the same commands the external engine serves.
/// The primary consumer is the test suite; hosts that embed a native
/// converter can adapt it through this trait as well.
pub trait LocalEngine: Send + 'static {
    fn call(&mut self, command: EngineCommand) -> EngineReply;
}

/// Serve a [`LocalEngine`] on its own task and hand back the handle.
pub fn spawn_local<E: LocalEngine>(mut engine: E) -> EngineHandle {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(COMMAND_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        while let Some(request) = rx.recv().await {
            let stopping = matches!(request.command, EngineCommand::Shutdown);
            let reply = engine.call(request.command);
            let _ = request.reply.send(Ok(reply));
            if stopping {
                break;
            }
        }
    });
    EngineHandle::new(tx)
}
