//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Channel to the worker could not be established
    #[error("failed to dial worker at '{addr}': {message}")]
    Dial { addr: String, message: String },

    /// Queue full - task dropped before reaching the dispatch worker
    #[error("dispatch queue full, task '{task_id}' dropped")]
    QueueFull { task_id: String },

    /// Transport error (from contract)
    #[error("transport error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a dial error
    pub fn dial(addr: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dial {
            addr: addr.into(),
            message: message.into(),
        }
    }
}
