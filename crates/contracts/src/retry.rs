//! Retry policy for the dispatch loop
//!
//! The backoff schedule is isolated from the submit state machine so it can
//! be swapped without touching the attempt loop.

use std::time::Duration;

/// Bounded-retry parameters for one dispatcher instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per submit call, including the first
    pub max_attempts: u32,

    /// Per-attempt deadline; exceeding it fails only that attempt
    pub request_timeout: Duration,

    /// Delay schedule between failed attempts
    pub backoff: BackoffPolicy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            request_timeout: Duration::from_secs(10),
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Inter-attempt delay schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffPolicy {
    /// Constant delay after every failed attempt
    Fixed { delay: Duration },

    /// Doubling delay, bounded by `cap`
    Exponential { initial: Duration, cap: Duration },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Fixed {
            delay: Duration::from_secs(2),
        }
    }
}

impl BackoffPolicy {
    /// Delay to wait after the given 1-based failed attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => *delay,
            Self::Exponential { initial, cap } => {
                let doublings = attempt.saturating_sub(1).min(31);
                let delay = initial.saturating_mul(1u32 << doublings);
                delay.min(*cap)
            }
        }
    }
}
