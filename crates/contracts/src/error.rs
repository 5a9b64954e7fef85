//! Layered error definitions
//!
//! Categorized by source: config / dial / delivery / codec

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Channel Errors =====
    /// Channel to the worker could not be established
    #[error("dial error for '{addr}': {message}")]
    Dial { addr: String, message: String },

    /// A delivery exchange failed at the transport level
    #[error("delivery error on channel to '{peer}': {message}")]
    Delivery { peer: String, message: String },

    // ===== Codec Errors =====
    /// Wire encode/decode error
    #[error("codec error ({format}): {message}")]
    Codec { format: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create dial error
    pub fn dial(addr: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Dial {
            addr: addr.into(),
            message: message.into(),
        }
    }

    /// Create delivery error
    pub fn delivery(peer: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            peer: peer.into(),
            message: message.into(),
        }
    }

    /// Create codec error
    pub fn codec(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Codec {
            format: format.into(),
            message: message.into(),
        }
    }
}
