//! Transport implementations
//!
//! Contains TcpConnector, MockConnector, and LoopbackConnector.

pub mod loopback;
pub mod mock;
pub mod tcp;

pub use self::loopback::{LoopbackChannel, LoopbackConnector};
pub use self::mock::{MockChannel, MockConnector, MockProbe, MockWorkerConfig, ScriptedOutcome};
pub use self::tcp::{TaskEnvelope, TcpChannel, TcpConnector};
