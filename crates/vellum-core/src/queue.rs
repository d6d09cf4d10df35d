//! FIFO queue that serializes work against the engine.
//!
//! The engine is not reentrant, so anything that touches it is pushed
//! through one consumer task. The consumer starts operations strictly
//! in submission order and gives each one a grace period; an operation
//! that overruns it keeps running, but the queue moves on so a wedged
//! document cannot starve everyone behind it.

use std::future::Future;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{Error, Result};

struct QueuedOperation {
    label: String,
    run: BoxFuture<'static, ()>,
}

/// Handle to an operation's eventual output.
pub struct PendingOperation<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> PendingOperation<T> {
    /// Wait for the operation to finish.
    ///
    /// Fails with [`Error::QueueClosed`] if the operation was dropped
    /// before it could report a result.
    pub async fn wait(self) -> Result<T> {
        self.rx.await.map_err(|_| Error::QueueClosed)
    }
}

/// Submission side of the serializing queue.
///
/// Clones share the same consumer; dropping the last clone drains the
/// backlog and stops the consumer.
#[derive(Clone)]
pub struct OperationQueue {
    tx: mpsc::UnboundedSender<QueuedOperation>,
}

impl OperationQueue {
    /// Start a queue whose consumer waits up to `wait` for each
    /// operation before moving on.
    pub fn new(wait: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(consume(rx, wait));
        OperationQueue { tx }
    }

    /// Enqueue an operation and return a handle to its output.
    ///
    /// The operation runs even if the handle is dropped.
    pub fn submit<T, F>(&self, label: &str, operation: F) -> PendingOperation<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let run = async move {
            let output = operation.await;
            let _ = result_tx.send(output);
        }
        .boxed();
        let queued = QueuedOperation {
            label: label.to_string(),
            run,
        };
        // A send failure drops the operation, which surfaces to the
        // caller as QueueClosed on wait().
        let _ = self.tx.send(queued);
        PendingOperation { rx: result_rx }
    }

    /// Enqueue an operation and wait for it in one step.
    pub async fn run<T, F>(&self, label: &str, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        self.submit(label, operation).wait().await
    }
}

async fn consume(mut rx: mpsc::UnboundedReceiver<QueuedOperation>, wait: Duration) {
    while let Some(operation) = rx.recv().await {
        let label = operation.label;
        debug!(%label, "starting queued operation");
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            operation.run.await;
            let _ = done_tx.send(());
        });
        match timeout(wait, done_rx).await {
            Ok(_) => debug!(%label, "queued operation finished"),
            Err(_) => warn!(
                %label,
                wait_secs = wait.as_secs_f64(),
                "operation exceeded queue wait; starting next operation anyway"
            ),
        }
    }
}
