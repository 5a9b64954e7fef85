//! DeliveryReply - worker response
//!
//! The application-level answer to one delivery attempt. The `accepted` flag
//! is the only success signal the dispatcher trusts.

use serde::{Deserialize, Serialize};

/// Worker response to a delivered task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReply {
    /// Explicit success flag
    pub accepted: bool,

    /// Optional rejection reason or acknowledgement note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeliveryReply {
    /// A positive acknowledgement
    pub fn accept() -> Self {
        Self {
            accepted: true,
            message: None,
        }
    }

    /// An explicit application-level rejection
    pub fn reject(message: impl Into<String>) -> Self {
        Self {
            accepted: false,
            message: Some(message.into()),
        }
    }
}
