//! # Dispatcher
//!
//! 任务投递模块。
//!
//! 负责：
//! - 惰性建立到单个 worker 的通道
//! - 有界重试投递 `Task`
//! - 尽力而为语义：调用方拿不到结果，结局只进日志和指标

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod transport;

pub use contracts::{RetryPolicy, Task, WorkerChannel, WorkerConnector};
pub use dispatcher::{create_dispatcher, Dispatcher};
pub use error::DispatcherError;
pub use handle::DispatcherHandle;
pub use metrics::{DispatchMetrics, DispatchSnapshot};
pub use transport::{LoopbackConnector, MockConnector, TcpConnector};
