//! Task - Dispatcher input
//!
//! Opaque work descriptor handed to the remote worker.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Work descriptor for the remote worker
///
/// The dispatcher treats the payload as opaque bytes; only the worker
/// interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier (used for logging and tracing)
    pub id: String,

    /// Human-readable task kind (e.g., "reindex", "snapshot")
    pub name: String,

    /// Opaque payload (zero-copy)
    #[serde(default)]
    pub payload: Bytes,
}

impl Task {
    /// Create a task with an empty payload
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            payload: Bytes::new(),
        }
    }

    /// Create a task carrying a payload
    pub fn with_payload(
        id: impl Into<String>,
        name: impl Into<String>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            payload: payload.into(),
        }
    }

    /// Payload size in bytes
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_roundtrip_json() {
        let task = Task::with_payload("t-1", "reindex", &b"shard=7"[..]);
        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_task_default_payload_empty() {
        let task: Task = serde_json::from_str(r#"{"id":"t-2","name":"noop"}"#).unwrap();
        assert_eq!(task.payload_len(), 0);
    }
}
