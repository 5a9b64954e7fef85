//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::DispatchBlueprint;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    worker: WorkerInfo,
    retry: RetryInfo,
    dispatch: DispatchInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tasks: Vec<TaskInfo>,
}

#[derive(Serialize)]
struct WorkerInfo {
    addr: String,
    wire_format: String,
}

#[derive(Serialize)]
struct RetryInfo {
    max_attempts: u32,
    request_timeout_secs: u64,
    retry_delay_secs: u64,
    backoff: String,
}

#[derive(Serialize)]
struct DispatchInfo {
    queue_capacity: usize,
}

#[derive(Serialize)]
struct TaskInfo {
    id: String,
    name: String,
    payload_bytes: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &DispatchBlueprint, args: &InfoArgs) -> ConfigInfo {
    let tasks = if args.tasks {
        blueprint
            .tasks
            .iter()
            .map(|t| TaskInfo {
                id: t.id.clone(),
                name: t.name.clone(),
                payload_bytes: t.payload.len(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        worker: WorkerInfo {
            addr: blueprint.worker.addr.clone(),
            wire_format: blueprint.worker.wire_format.as_str().to_string(),
        },
        retry: RetryInfo {
            max_attempts: blueprint.retry.max_attempts,
            request_timeout_secs: blueprint.retry.request_timeout_secs,
            retry_delay_secs: blueprint.retry.retry_delay_secs,
            backoff: format!("{:?}", blueprint.retry.backoff),
        },
        dispatch: DispatchInfo {
            queue_capacity: blueprint.dispatch.queue_capacity,
        },
        tasks,
    }
}

fn print_config_info(blueprint: &DispatchBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Task Courier Configuration                     ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Worker endpoint
    println!("📍 Worker");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Address: {}", blueprint.worker.addr);
    println!(
        "   └─ Wire format: {}",
        blueprint.worker.wire_format.as_str()
    );

    // Retry settings
    let retry = &blueprint.retry;
    println!("\n🔁 Retry");
    println!("   ├─ Max attempts: {}", retry.max_attempts);
    println!("   ├─ Request timeout: {}s", retry.request_timeout_secs);
    println!("   ├─ Retry delay: {}s", retry.retry_delay_secs);
    match retry.max_delay_secs {
        Some(cap) => {
            println!("   └─ Backoff: {:?} (cap {}s)", retry.backoff, cap);
        }
        None => {
            println!("   └─ Backoff: {:?}", retry.backoff);
        }
    }

    // Dispatch options
    println!("\n⚙️  Dispatch");
    println!(
        "   └─ Queue capacity: {}",
        blueprint.dispatch.queue_capacity
    );

    // Tasks
    println!("\n📦 Tasks ({})", blueprint.tasks.len());
    if args.tasks && !blueprint.tasks.is_empty() {
        for (i, task) in blueprint.tasks.iter().enumerate() {
            let is_last = i == blueprint.tasks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} ({}, {} payload bytes)",
                prefix,
                task.id,
                task.name,
                task.payload.len()
            );
        }
    } else if !blueprint.tasks.is_empty() {
        println!("   └─ (pass --tasks for per-task details)");
    }

    println!();
}
