//! LoopbackConnector - accepts every task locally, logs via tracing
//!
//! Lets the dispatch loop run with no worker at all; useful for smoke runs.

use contracts::{ContractError, DeliveryReply, Task, WorkerChannel, WorkerConnector};
use tracing::{info, instrument};

/// Connector whose channels never leave the process
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackConnector;

impl LoopbackConnector {
    /// Create a loopback connector
    pub fn new() -> Self {
        Self
    }
}

impl WorkerConnector for LoopbackConnector {
    type Channel = LoopbackChannel;

    #[instrument(name = "loopback_dial", skip(self), fields(addr = %addr))]
    async fn dial(&self, addr: &str) -> Result<LoopbackChannel, ContractError> {
        Ok(LoopbackChannel {
            peer: format!("loopback:{addr}"),
        })
    }
}

/// Channel that acknowledges every delivery
pub struct LoopbackChannel {
    peer: String,
}

impl WorkerChannel for LoopbackChannel {
    fn peer(&self) -> &str {
        &self.peer
    }

    #[instrument(
        name = "loopback_deliver",
        skip(self, task),
        fields(peer = %self.peer, task_id = %task.id)
    )]
    async fn deliver(&mut self, task: &Task) -> Result<DeliveryReply, ContractError> {
        info!(
            task_id = %task.id,
            task_name = %task.name,
            payload_bytes = task.payload_len(),
            "task accepted on loopback"
        );
        Ok(DeliveryReply::accept())
    }
}
