//! Dispatch metrics for observability
//!
//! The Dispatcher holds these counters as its metrics sink; tests and the CLI
//! read outcomes from here because `submit` itself reports nothing.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for a single dispatcher instance
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    /// Submit calls aborted because the dial failed
    dial_failures: AtomicU64,
    /// Delivery attempts started (across all submit calls)
    attempts: AtomicU64,
    /// Attempts answered with accepted=true
    accepted: AtomicU64,
    /// Attempts answered with accepted=false
    rejected: AtomicU64,
    /// Attempts that failed at the transport level
    transport_failures: AtomicU64,
    /// Attempts that exceeded the per-attempt deadline
    timeouts: AtomicU64,
    /// Submit calls that exhausted every attempt
    exhausted: AtomicU64,
    /// Tasks dropped because the dispatch queue was full
    queue_dropped: AtomicU64,
    /// Current dispatch queue depth
    queue_depth: AtomicUsize,
}

impl DispatchMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dial_failures(&self) -> u64 {
        self.dial_failures.load(Ordering::Relaxed)
    }

    pub fn inc_dial_failures(&self) {
        self.dial_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn inc_attempts(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn inc_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn inc_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transport_failures(&self) -> u64 {
        self.transport_failures.load(Ordering::Relaxed)
    }

    pub fn inc_transport_failures(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn inc_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn exhausted(&self) -> u64 {
        self.exhausted.load(Ordering::Relaxed)
    }

    pub fn inc_exhausted(&self) {
        self.exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queue_dropped(&self) -> u64 {
        self.queue_dropped.load(Ordering::Relaxed)
    }

    pub fn inc_queue_dropped(&self) {
        self.queue_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::Relaxed)
    }

    pub fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    /// Get snapshot of all counters (for reporting)
    pub fn snapshot(&self) -> DispatchSnapshot {
        DispatchSnapshot {
            dial_failures: self.dial_failures(),
            attempts: self.attempts(),
            accepted: self.accepted(),
            rejected: self.rejected(),
            transport_failures: self.transport_failures(),
            timeouts: self.timeouts(),
            exhausted: self.exhausted(),
            queue_dropped: self.queue_dropped(),
            queue_depth: self.queue_depth(),
        }
    }
}

/// Snapshot of dispatch metrics (for reporting)
#[derive(Debug, Clone, Copy)]
pub struct DispatchSnapshot {
    pub dial_failures: u64,
    pub attempts: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub transport_failures: u64,
    pub timeouts: u64,
    pub exhausted: u64,
    pub queue_dropped: u64,
    pub queue_depth: usize,
}

impl DispatchSnapshot {
    /// Attempts that did not end in acceptance
    pub fn failed_attempts(&self) -> u64 {
        self.rejected + self.transport_failures + self.timeouts
    }
}
