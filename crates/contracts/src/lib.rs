//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Delivery Model
//! - A `Task` is an opaque, caller-constructed record; the dispatcher never
//!   inspects or mutates its payload
//! - The worker answers every delivery with a `DeliveryReply` carrying an
//!   explicit `accepted` flag; nothing else decides success

mod blueprint;
mod error;
mod reply;
mod retry;
mod task;
mod transport;

pub use blueprint::*;
pub use error::*;
pub use reply::DeliveryReply;
pub use retry::{BackoffPolicy, RetryPolicy};
pub use task::Task;
pub use transport::{WorkerChannel, WorkerConnector};
