//! `run` command implementation.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use contracts::{DispatchBlueprint, Task, WorkerConnector};
use dispatcher::{create_dispatcher, Dispatcher, DispatcherHandle, LoopbackConnector};
use observability::{DispatchOutcome, DispatchStatsAggregator};

use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_dispatch(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref addr) = args.addr {
        info!(addr = %addr, "Overriding worker address from CLI");
        blueprint.worker.addr = addr.clone();
    }
    if let Some(attempts) = args.attempts {
        if attempts == 0 {
            anyhow::bail!("--attempts must be >= 1");
        }
        info!(attempts, "Overriding retry attempt bound from CLI");
        blueprint.retry.max_attempts = attempts;
    }

    info!(
        worker = %blueprint.worker.addr,
        wire_format = blueprint.worker.wire_format.as_str(),
        tasks = blueprint.tasks.len(),
        max_attempts = blueprint.retry.max_attempts,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Expose Prometheus metrics (tracing is already initialized in main)
    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let tasks = blueprint.to_tasks();
    if tasks.is_empty() {
        warn!("No tasks configured, nothing to deliver");
        return Ok(());
    }

    // Setup graceful shutdown handler
    let shutdown_signal = setup_shutdown_signal();

    info!("Starting dispatch...");

    if args.loopback {
        let courier = Dispatcher::new(
            blueprint.worker.addr.clone(),
            LoopbackConnector::new(),
            blueprint.to_retry_policy(),
        );
        run_courier(courier, &blueprint, &tasks, args.queued, shutdown_signal).await;
    } else {
        let courier = create_dispatcher(&blueprint);
        run_courier(courier, &blueprint, &tasks, args.queued, shutdown_signal).await;
    }

    info!("Task Courier finished");
    Ok(())
}

/// Drive the dispatcher to completion (or until a shutdown signal) and print
/// the final delivery statistics.
async fn run_courier<C>(
    courier: Dispatcher<C>,
    blueprint: &DispatchBlueprint,
    tasks: &[Task],
    queued: bool,
    shutdown_signal: impl Future<Output = ()>,
) where
    C: WorkerConnector + Send + 'static,
    C::Channel: Send + 'static,
{
    if queued {
        // Non-blocking mode: a dedicated dispatch worker drains a bounded
        // queue, one submit at a time.
        let handle = DispatcherHandle::spawn(courier, blueprint.dispatch.queue_capacity);
        let metrics = Arc::clone(handle.metrics());

        for task in tasks {
            handle.try_submit(task.clone());
        }

        tokio::select! {
            _ = handle.shutdown() => {}
            _ = shutdown_signal => {
                warn!("Received shutdown signal, stopping dispatch...");
            }
        }

        print_snapshot_summary(&metrics.snapshot());
    } else {
        let mut courier = courier;
        let mut aggregator = DispatchStatsAggregator::new();

        tokio::select! {
            _ = deliver_all(&mut courier, tasks, &mut aggregator) => {}
            _ = shutdown_signal => {
                warn!("Received shutdown signal, stopping dispatch...");
            }
        }

        println!("\n{}", aggregator.summary());
    }
}

/// Print delivery statistics for queued mode, where per-task outcomes are
/// only available as aggregate counters.
fn print_snapshot_summary(snapshot: &dispatcher::DispatchSnapshot) {
    println!("\n=== Dispatch Summary ===");
    println!("Accepted: {}", snapshot.accepted);
    println!("Exhausted: {}", snapshot.exhausted);
    println!("Dropped on dial failure: {}", snapshot.dial_failures);
    println!("Dropped on full queue: {}", snapshot.queue_dropped);
    println!(
        "Attempts: {} ({} failed)",
        snapshot.attempts,
        snapshot.failed_attempts()
    );
}

/// Deliver every task in order, one at a time.
///
/// `submit` surfaces nothing, so per-task outcomes are reconstructed from the
/// metrics side channel by diffing snapshots around each call.
async fn deliver_all<C: WorkerConnector>(
    courier: &mut Dispatcher<C>,
    tasks: &[Task],
    aggregator: &mut DispatchStatsAggregator,
) {
    for task in tasks {
        let before = courier.metrics().snapshot();
        courier.submit(task).await;
        let after = courier.metrics().snapshot();

        let outcome = if after.accepted > before.accepted {
            DispatchOutcome::Accepted
        } else if after.dial_failures > before.dial_failures {
            DispatchOutcome::DialFailed
        } else {
            DispatchOutcome::Exhausted
        };
        aggregator.record_task(outcome, after.attempts - before.attempts);
    }

    info!(tasks = tasks.len(), "All configured tasks processed");
}

/// Setup Ctrl+C and SIGTERM signal handlers
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &DispatchBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Worker:");
    println!("  Address: {}", blueprint.worker.addr);
    println!("  Wire format: {}", blueprint.worker.wire_format.as_str());

    println!("\nRetry:");
    println!("  Max attempts: {}", blueprint.retry.max_attempts);
    println!(
        "  Request timeout: {}s",
        blueprint.retry.request_timeout_secs
    );
    println!("  Retry delay: {}s", blueprint.retry.retry_delay_secs);

    println!("\nTasks ({}):", blueprint.tasks.len());
    for task in &blueprint.tasks {
        println!(
            "  - {} ({}) - {} payload bytes",
            task.id,
            task.name,
            task.payload.len()
        );
    }

    println!();
}
