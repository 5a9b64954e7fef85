//! Dispatcher - lazy-dial, bounded-retry delivery to one worker

use std::sync::Arc;

use tokio::time::{sleep, timeout};
use tracing::{error, info, instrument};

use contracts::{DispatchBlueprint, RetryPolicy, Task, WorkerChannel, WorkerConnector};
use observability::metrics::AttemptOutcome;

use crate::error::DispatcherError;
use crate::metrics::DispatchMetrics;
use crate::transport::TcpConnector;

/// Best-effort task courier for a single fixed worker address.
///
/// The channel handle starts absent and is established on the first submit
/// call; once present it is reused by every later call and is never
/// proactively revalidated. A send failure does not discard it - only a
/// failed dial leaves it absent, and only the next submit call dials again.
///
/// `submit` takes `&mut self`, so one caller at a time touches the handle;
/// callers needing non-blocking dispatch wrap the dispatcher in a
/// [`DispatcherHandle`](crate::handle::DispatcherHandle).
pub struct Dispatcher<C: WorkerConnector> {
    /// Worker address, set at construction, never updated
    addr: String,
    connector: C,
    policy: RetryPolicy,
    channel: Option<C::Channel>,
    metrics: Arc<DispatchMetrics>,
}

impl<C: WorkerConnector> Dispatcher<C> {
    /// Create a dispatcher; never dials
    pub fn new(addr: impl Into<String>, connector: C, policy: RetryPolicy) -> Self {
        Self {
            addr: addr.into(),
            connector,
            policy,
            channel: None,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Worker address this dispatcher targets
    pub fn address(&self) -> &str {
        &self.addr
    }

    /// Retry policy in effect
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Metrics sink held by this dispatcher
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Whether a channel handle is currently cached
    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Deliver a task, best effort.
    ///
    /// Fire-and-forget: nothing is returned in any outcome. Success, explicit
    /// rejection, transport failure and exhaustion are all observable only
    /// through logs and the metrics sink. Blocks the caller for up to
    /// `max_attempts * (request_timeout + delay)` in the worst case.
    #[instrument(
        name = "dispatcher_submit",
        skip(self, task),
        fields(addr = %self.addr, task_id = %task.id)
    )]
    pub async fn submit(&mut self, task: &Task) {
        observability::record_task_submitted(task);

        if self.channel.is_none() {
            info!("no channel to worker yet, dialing");
            if let Err(e) = self.connect().await {
                // Dial failure short-circuits: the task is dropped with zero
                // delivery attempts, and the handle stays absent so the next
                // submit call dials again.
                error!(error = %e, "could not dial worker, dropping task");
                self.metrics.inc_dial_failures();
                observability::record_dial_failure(&self.addr);
                return;
            }
        }

        let policy = self.policy;
        let metrics = Arc::clone(&self.metrics);
        let Some(channel) = self.channel.as_mut() else {
            return;
        };

        info!(
            task_name = %task.name,
            payload_bytes = task.payload_len(),
            "delivering task to worker"
        );
        deliver_with_retry(channel, task, policy, &metrics).await;
    }

    /// Dial the worker and cache the channel handle.
    ///
    /// A failed dial is not retried here; the retry loop covers delivery
    /// attempts only, and only once a dial has succeeded.
    #[instrument(name = "dispatcher_connect", skip(self), fields(addr = %self.addr))]
    async fn connect(&mut self) -> Result<(), DispatcherError> {
        let channel = self
            .connector
            .dial(&self.addr)
            .await
            .map_err(|e| DispatcherError::dial(&self.addr, e.to_string()))?;

        info!(peer = %channel.peer(), "channel to worker established");
        self.channel = Some(channel);
        Ok(())
    }
}

/// Bounded attempt loop over an established channel.
///
/// Each attempt runs under its own deadline; timeout and transport error are
/// both attempt failures and never inspect a reply. The inter-attempt delay
/// runs only when another attempt follows.
async fn deliver_with_retry<Ch: WorkerChannel>(
    channel: &mut Ch,
    task: &Task,
    policy: RetryPolicy,
    metrics: &DispatchMetrics,
) {
    for attempt in 1..=policy.max_attempts {
        metrics.inc_attempts();

        let outcome = match timeout(policy.request_timeout, channel.deliver(task)).await {
            Ok(Ok(reply)) if reply.accepted => {
                info!(task_id = %task.id, attempt, "task accepted by worker");
                metrics.inc_accepted();
                observability::record_delivery_attempt(AttemptOutcome::Accepted);
                observability::record_task_accepted(attempt);
                return;
            }
            Ok(Ok(reply)) => {
                info!(
                    task_id = %task.id,
                    attempt,
                    reason = reply.message.as_deref().unwrap_or("unspecified"),
                    "task rejected by worker"
                );
                metrics.inc_rejected();
                AttemptOutcome::Rejected
            }
            Ok(Err(e)) => {
                info!(task_id = %task.id, attempt, error = %e, "delivery attempt failed");
                metrics.inc_transport_failures();
                AttemptOutcome::TransportError
            }
            Err(_) => {
                info!(
                    task_id = %task.id,
                    attempt,
                    deadline_ms = policy.request_timeout.as_millis() as u64,
                    "delivery attempt timed out"
                );
                metrics.inc_timeouts();
                AttemptOutcome::Timeout
            }
        };
        observability::record_delivery_attempt(outcome);

        if attempt < policy.max_attempts {
            let delay = policy.backoff.delay_after(attempt);
            info!(
                task_id = %task.id,
                delay_ms = delay.as_millis() as u64,
                "retrying after delay"
            );
            sleep(delay).await;
        }
    }

    error!(
        task_id = %task.id,
        attempts = policy.max_attempts,
        "could not deliver task to worker, giving up"
    );
    metrics.inc_exhausted();
    observability::record_task_exhausted(policy.max_attempts);
}

/// Convenience function to create a TCP-backed dispatcher from a blueprint
pub fn create_dispatcher(blueprint: &DispatchBlueprint) -> Dispatcher<TcpConnector> {
    Dispatcher::new(
        blueprint.worker.addr.clone(),
        TcpConnector::new(blueprint.worker.wire_format),
        blueprint.to_retry_policy(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockConnector, MockWorkerConfig, ScriptedOutcome};
    use std::time::Duration;
    use tokio::time::Instant;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            ..RetryPolicy::default()
        }
    }

    fn dispatcher_with_script(outcomes: &[ScriptedOutcome]) -> Dispatcher<MockConnector> {
        let connector = MockConnector::with_config(MockWorkerConfig {
            outcomes: outcomes.to_vec(),
            ..MockWorkerConfig::default()
        });
        Dispatcher::new("worker:7070", connector, RetryPolicy::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_attempt_no_sleep() {
        let mut dispatcher = dispatcher_with_script(&[ScriptedOutcome::Accept]);
        let task = Task::new("t-1", "reindex");

        let started = Instant::now();
        dispatcher.submit(&task).await;

        assert_eq!(started.elapsed(), Duration::ZERO, "no delay on success");
        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.attempts, 1);
        assert_eq!(snapshot.accepted, 1);
        assert_eq!(snapshot.failed_attempts(), 0);
        assert_eq!(snapshot.exhausted, 0);
        assert!(dispatcher.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejections_then_accept_on_third() {
        let mut dispatcher = dispatcher_with_script(&[
            ScriptedOutcome::Reject,
            ScriptedOutcome::Reject,
            ScriptedOutcome::Accept,
        ]);
        let task = Task::new("t-1", "reindex");

        let started = Instant::now();
        dispatcher.submit(&task).await;

        // Two failed attempts, two 2s delays, then acceptance with no
        // trailing sleep.
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.attempts, 3);
        assert_eq!(snapshot.rejected, 2);
        assert_eq!(snapshot.accepted, 1);
        assert_eq!(snapshot.exhausted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_five_attempts_four_delays() {
        let mut dispatcher = dispatcher_with_script(&[ScriptedOutcome::Reject; 5]);
        let task = Task::new("t-1", "reindex");

        let started = Instant::now();
        dispatcher.submit(&task).await;

        assert_eq!(started.elapsed(), Duration::from_secs(8));
        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.attempts, 5);
        assert_eq!(snapshot.rejected, 5);
        assert_eq!(snapshot.accepted, 0);
        assert_eq!(snapshot.exhausted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_retries_without_redial() {
        let connector = MockConnector::with_config(MockWorkerConfig {
            outcomes: vec![
                ScriptedOutcome::Disconnect,
                ScriptedOutcome::Disconnect,
                ScriptedOutcome::Accept,
            ],
            ..MockWorkerConfig::default()
        });
        let probe = connector.probe();
        let mut dispatcher = Dispatcher::new("worker:7070", connector, RetryPolicy::default());
        let task = Task::new("t-1", "reindex");

        dispatcher.submit(&task).await;

        assert_eq!(probe.dial_count(), 1, "send failures never re-dial");
        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.attempts, 3);
        assert_eq!(snapshot.transport_failures, 2);
        assert_eq!(snapshot.accepted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_worker_times_out_every_attempt() {
        let mut dispatcher = dispatcher_with_script(&[ScriptedOutcome::Stall; 5]);
        let task = Task::new("t-1", "reindex");

        let started = Instant::now();
        dispatcher.submit(&task).await;

        // 5 attempts hitting the 10s deadline plus 4 inter-attempt delays.
        assert_eq!(started.elapsed(), Duration::from_secs(58));
        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.attempts, 5);
        assert_eq!(snapshot.timeouts, 5);
        assert_eq!(snapshot.exhausted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dial_failure_performs_zero_attempts() {
        let connector = MockConnector::with_config(MockWorkerConfig {
            refuse_dial: true,
            ..MockWorkerConfig::default()
        });
        let probe = connector.probe();
        let mut dispatcher = Dispatcher::new("worker:7070", connector, RetryPolicy::default());
        let task = Task::new("t-1", "reindex");

        let started = Instant::now();
        dispatcher.submit(&task).await;

        assert_eq!(started.elapsed(), Duration::ZERO, "dial failure returns immediately");
        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.dial_failures, 1);
        assert_eq!(snapshot.attempts, 0);
        assert_eq!(probe.deliver_count(), 0);
        assert!(!dispatcher.is_connected());

        // The handle stayed absent, so the next submit dials again.
        probe.set_refuse_dial(false);
        dispatcher.submit(&task).await;
        assert_eq!(probe.dial_count(), 2);
        assert_eq!(dispatcher.metrics().accepted(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_cached_across_submits() {
        let connector = MockConnector::new();
        let probe = connector.probe();
        let mut dispatcher = Dispatcher::new("worker:7070", connector, RetryPolicy::default());

        let started = Instant::now();
        dispatcher.submit(&Task::new("t-1", "reindex")).await;
        dispatcher.submit(&Task::new("t-2", "snapshot")).await;

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(probe.dial_count(), 1, "second submit reuses the handle");
        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.attempts, 2);
        assert_eq!(snapshot.accepted, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_call_does_not_invalidate_handle() {
        let connector = MockConnector::with_config(MockWorkerConfig {
            outcomes: vec![ScriptedOutcome::Reject; 5],
            ..MockWorkerConfig::default()
        });
        let probe = connector.probe();
        let mut dispatcher = Dispatcher::new("worker:7070", connector, RetryPolicy::default());

        dispatcher.submit(&Task::new("t-1", "reindex")).await;
        assert_eq!(dispatcher.metrics().exhausted(), 1);

        // Prior failures do not trigger a re-dial; the cached handle serves
        // the next call, whose script is now exhausted and accepts.
        dispatcher.submit(&Task::new("t-2", "snapshot")).await;
        assert_eq!(probe.dial_count(), 1);
        assert_eq!(dispatcher.metrics().accepted(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_attempt_bound() {
        let connector = MockConnector::with_config(MockWorkerConfig {
            outcomes: vec![ScriptedOutcome::Reject; 3],
            ..MockWorkerConfig::default()
        });
        let mut dispatcher = Dispatcher::new("worker:7070", connector, fast_policy(3));

        let started = Instant::now();
        dispatcher.submit(&Task::new("t-1", "reindex")).await;

        assert_eq!(started.elapsed(), Duration::from_secs(4));
        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.attempts, 3);
        assert_eq!(snapshot.exhausted, 1);
    }
}
