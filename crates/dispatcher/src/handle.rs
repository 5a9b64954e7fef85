//! DispatcherHandle - non-blocking facade over a dispatcher worker task
//!
//! `Dispatcher::submit` deliberately blocks its caller for the whole retry
//! loop. Callers that cannot afford that hand the dispatcher to a dedicated
//! task and enqueue tasks through this handle instead; the single owning
//! task keeps lazy connect serialized.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use contracts::{Task, WorkerConnector};

use crate::dispatcher::Dispatcher;
use crate::metrics::DispatchMetrics;
use std::sync::Arc;

/// Handle to a running dispatch worker
pub struct DispatcherHandle {
    /// Worker address (for logging)
    addr: String,
    /// Channel to enqueue tasks for the worker
    tx: mpsc::Sender<Task>,
    /// Shared metrics
    metrics: Arc<DispatchMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Move the dispatcher onto a dedicated task and return the handle
    pub fn spawn<C>(dispatcher: Dispatcher<C>, queue_capacity: usize) -> Self
    where
        C: WorkerConnector + Send + 'static,
        C::Channel: Send + 'static,
    {
        let addr = dispatcher.address().to_string();
        let metrics = Arc::clone(dispatcher.metrics());
        let (tx, rx) = mpsc::channel(queue_capacity);

        let worker_handle = tokio::spawn(async move {
            dispatch_worker(dispatcher, rx).await;
        });

        Self {
            addr,
            tx,
            metrics,
            worker_handle,
        }
    }

    /// Worker address the underlying dispatcher targets
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Enqueue a task without blocking
    ///
    /// Returns true if queued, false if the queue was full (task dropped)
    pub fn try_submit(&self, task: Task) -> bool {
        match self.tx.try_send(task) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(task)) => {
                self.metrics.inc_queue_dropped();
                warn!(
                    addr = %self.addr,
                    task_id = %task.id,
                    "dispatch queue full, task dropped"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(addr = %self.addr, "dispatch worker closed unexpectedly");
                false
            }
        }
    }

    /// Shutdown the dispatch worker gracefully
    ///
    /// Queued tasks are still delivered before the worker stops.
    #[instrument(name = "dispatcher_handle_shutdown", skip(self))]
    pub async fn shutdown(self) {
        // Drop sender to signal worker to stop
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(addr = %self.addr, error = ?e, "dispatch worker task panicked");
        }
        debug!(addr = %self.addr, "dispatcher handle shutdown complete");
    }
}

/// Worker task that drains the queue into the dispatcher, one task at a time
#[instrument(name = "dispatch_worker_loop", skip(dispatcher, rx), fields(addr = %dispatcher.address()))]
async fn dispatch_worker<C>(mut dispatcher: Dispatcher<C>, mut rx: mpsc::Receiver<Task>)
where
    C: WorkerConnector + Send + 'static,
    C::Channel: Send + 'static,
{
    debug!("dispatch worker started");

    while let Some(task) = rx.recv().await {
        dispatcher.metrics().set_queue_depth(rx.len());
        observability::record_queue_depth(rx.len());

        dispatcher.submit(&task).await;
    }

    debug!("dispatch worker stopped");
}
