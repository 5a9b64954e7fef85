//! Transport trait seams - Dispatcher's outbound interface
//!
//! Defines the "open a channel / deliver a task" capabilities. Concrete
//! transports (TCP, mock, loopback) live in the dispatcher crate.

use crate::{ContractError, DeliveryReply, Task};

/// One established request/response channel to the worker
///
/// Deadline enforcement is the caller's responsibility; `deliver` itself may
/// block indefinitely on an unresponsive peer.
#[trait_variant::make(WorkerChannel: Send)]
pub trait LocalWorkerChannel {
    /// Peer description (used for logging/metrics)
    fn peer(&self) -> &str;

    /// One request/response exchange
    ///
    /// # Errors
    /// Returns a transport-level failure; an application-level rejection is
    /// NOT an error, it arrives as `DeliveryReply { accepted: false, .. }`.
    async fn deliver(&mut self, task: &Task) -> Result<DeliveryReply, ContractError>;
}

/// Channel factory: "open unauthenticated channel to address"
#[trait_variant::make(WorkerConnector: Send)]
pub trait LocalWorkerConnector {
    /// Channel type produced by a successful dial
    type Channel: WorkerChannel;

    /// Establish a channel to a `host:port` address
    async fn dial(&self, addr: &str) -> Result<Self::Channel, ContractError>;
}
