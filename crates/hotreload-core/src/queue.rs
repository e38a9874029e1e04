//! Serialized operation queue
//!
//! Every reindex, scan and reload runs through one FIFO drained by a single
//! worker task, so at most one operation is in flight at any time. Failures
//! are caught at the dequeue boundary and never stall the queue.

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error};

use crate::error::{ReloadError, ReloadResult};
use crate::events::ReloadEvent;

/// Queued operation
#[derive(Debug)]
pub enum Operation {
    /// Rebuild the plugin registry
    Reindex,
    /// Diff tracked files against the stat cache
    Scan,
    /// Disable and re-enable one plugin
    Reload(String),
    /// Register a raw watch for a vault-relative directory
    WatchDirectory(String),
    /// Resolves once every operation admitted before it has finished
    Barrier(oneshot::Sender<()>),
    /// Ends the worker loop
    Stop,
}

impl Operation {
    /// Short label used in logs and failure events
    pub fn label(&self) -> String {
        match self {
            Operation::Reindex => "reindex".to_string(),
            Operation::Scan => "scan".to_string(),
            Operation::Reload(plugin_id) => format!("reload({})", plugin_id),
            Operation::WatchDirectory(path) => format!("watch({})", path),
            Operation::Barrier(_) => "barrier".to_string(),
            Operation::Stop => "stop".to_string(),
        }
    }
}

/// Sending half of the queue
#[derive(Debug, Clone)]
pub struct OperationQueue {
    tx: mpsc::UnboundedSender<Operation>,
}

impl OperationQueue {
    /// Create the queue and the receiver its worker drains
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Operation>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Append an operation
    pub fn push(&self, operation: Operation) -> ReloadResult<()> {
        self.tx
            .send(operation)
            .map_err(|_| ReloadError::QueueClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Executes dequeued operations
#[async_trait]
pub trait OperationHandler: Send {
    async fn handle(&mut self, operation: Operation) -> ReloadResult<()>;
}

/// Drain `rx` one operation at a time until it closes or a
/// [`Operation::Stop`] is dequeued.
pub async fn run_queue<H: OperationHandler>(
    mut rx: mpsc::UnboundedReceiver<Operation>,
    mut handler: H,
    events: broadcast::Sender<ReloadEvent>,
) {
    while let Some(operation) = rx.recv().await {
        if matches!(operation, Operation::Stop) {
            debug!("Operation queue stopping");
            break;
        }

        let label = operation.label();
        debug!("Running queued operation: {}", label);

        if let Err(e) = handler.handle(operation).await {
            error!("Queued operation {} failed: {}", label, e);
            let _ = events.send(ReloadEvent::OperationFailed {
                operation: label,
                error: e.to_string(),
            });
        }
    }

    debug!("Operation queue drained");
}
