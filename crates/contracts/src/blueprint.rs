//! DispatchBlueprint - Config Loader output
//!
//! Describes a complete dispatch setup: worker endpoint, retry policy,
//! queueing options, and the tasks to hand over.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use crate::{BackoffPolicy, RetryPolicy, Task};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete dispatch configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatchBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Worker endpoint settings
    #[validate(nested)]
    pub worker: WorkerEndpoint,

    /// Retry policy settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// Queueing options for handle-based dispatch
    #[serde(default)]
    pub dispatch: DispatchOptions,

    /// Tasks to deliver, in order
    #[serde(default)]
    #[validate(nested)]
    pub tasks: Vec<TaskConfig>,
}

/// Worker endpoint: one fixed remote address per dispatcher instance
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WorkerEndpoint {
    /// `host:port` address, set once, never updated
    #[validate(length(min = 1, message = "worker addr cannot be empty"))]
    pub addr: String,

    /// Wire payload encoding
    #[serde(default)]
    pub wire_format: WireFormat,
}

/// Serialization format for the wire payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

impl WireFormat {
    /// Short name used in logs and codec errors
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Bincode => "bincode",
        }
    }
}

/// Retry settings as they appear in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per submit call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-attempt deadline (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Delay between failed attempts (seconds)
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Delay schedule shape
    #[serde(default)]
    pub backoff: BackoffKind,

    /// Upper bound for exponential delays (seconds)
    #[serde(default)]
    pub max_delay_secs: Option<u64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            request_timeout_secs: default_request_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            backoff: BackoffKind::default(),
            max_delay_secs: None,
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_max_delay_secs() -> u64 {
    60
}

/// Delay schedule shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    /// Constant delay
    #[default]
    Fixed,
    /// Doubling delay bounded by `max_delay_secs`
    Exponential,
}

/// Queueing options for `DispatcherHandle`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DispatchOptions {
    /// Bounded queue capacity between producers and the dispatch worker
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_queue_capacity() -> usize {
    100
}

/// One task entry from the config file
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TaskConfig {
    /// Unique identifier
    #[validate(length(min = 1, message = "task id cannot be empty"))]
    pub id: String,

    /// Task kind handed to the worker
    #[validate(length(min = 1, message = "task name cannot be empty"))]
    pub name: String,

    /// Opaque payload, stored verbatim
    #[serde(default)]
    pub payload: String,
}

impl TaskConfig {
    /// Materialize the runtime task record
    pub fn to_task(&self) -> Task {
        Task::with_payload(
            self.id.clone(),
            self.name.clone(),
            self.payload.clone().into_bytes(),
        )
    }
}

impl DispatchBlueprint {
    /// Build the runtime retry policy from the config-file settings
    pub fn to_retry_policy(&self) -> RetryPolicy {
        let retry = &self.retry;
        let delay = Duration::from_secs(retry.retry_delay_secs);

        let backoff = match retry.backoff {
            BackoffKind::Fixed => BackoffPolicy::Fixed { delay },
            BackoffKind::Exponential => BackoffPolicy::Exponential {
                initial: delay,
                cap: Duration::from_secs(retry.max_delay_secs.unwrap_or_else(default_max_delay_secs)),
            },
        };

        RetryPolicy {
            max_attempts: retry.max_attempts,
            request_timeout: Duration::from_secs(retry.request_timeout_secs),
            backoff,
        }
    }

    /// Materialize all configured tasks, in file order
    pub fn to_tasks(&self) -> Vec<Task> {
        self.tasks.iter().map(TaskConfig::to_task).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blueprint() -> DispatchBlueprint {
        DispatchBlueprint {
            version: ConfigVersion::V1,
            worker: WorkerEndpoint {
                addr: "127.0.0.1:7070".into(),
                wire_format: WireFormat::Json,
            },
            retry: RetryConfig::default(),
            dispatch: DispatchOptions::default(),
            tasks: vec![TaskConfig {
                id: "t-1".into(),
                name: "reindex".into(),
                payload: "shard=7".into(),
            }],
        }
    }

    #[test]
    fn retry_policy_defaults() {
        let blueprint = sample_blueprint();
        let policy = blueprint.to_retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.request_timeout, Duration::from_secs(10));
        assert_eq!(
            policy.backoff,
            BackoffPolicy::Fixed {
                delay: Duration::from_secs(2)
            }
        );
    }

    #[test]
    fn retry_policy_exponential_override() {
        let mut blueprint = sample_blueprint();
        blueprint.retry.backoff = BackoffKind::Exponential;
        blueprint.retry.retry_delay_secs = 1;
        blueprint.retry.max_delay_secs = Some(8);

        let policy = blueprint.to_retry_policy();
        assert_eq!(
            policy.backoff,
            BackoffPolicy::Exponential {
                initial: Duration::from_secs(1),
                cap: Duration::from_secs(8),
            }
        );
        assert_eq!(policy.backoff.delay_after(5), Duration::from_secs(8));
    }

    #[test]
    fn tasks_materialize_in_order() {
        let mut blueprint = sample_blueprint();
        blueprint.tasks.push(TaskConfig {
            id: "t-2".into(),
            name: "snapshot".into(),
            payload: String::new(),
        });

        let tasks = blueprint.to_tasks();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "t-1");
        assert_eq!(tasks[0].payload.as_ref(), b"shard=7");
        assert_eq!(tasks[1].id, "t-2");
        assert!(tasks[1].payload.is_empty());
    }

    #[test]
    fn empty_addr_fails_field_validation() {
        let mut blueprint = sample_blueprint();
        blueprint.worker.addr = String::new();
        assert!(validator::Validate::validate(&blueprint).is_err());
    }
}
