//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Task Courier - best-effort task dispatch to a single remote worker
#[derive(Parser, Debug)]
#[command(
    name = "task-courier",
    author,
    version,
    about = "Single-worker task dispatch client",
    long_about = "A best-effort task dispatch client for one fixed remote worker.\n\n\
                  Loads tasks from configuration, lazily dials the worker on the \n\
                  first delivery, and retries failed deliveries a bounded number \n\
                  of times. Outcomes are reported through logs and metrics only."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TASK_COURIER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TASK_COURIER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deliver the configured tasks to the worker
    Run(RunArgs),

    /// Validate configuration file without dispatching
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "courier.toml",
        env = "TASK_COURIER_CONFIG"
    )]
    pub config: PathBuf,

    /// Override worker address from configuration
    #[arg(long, env = "TASK_COURIER_WORKER_ADDR")]
    pub addr: Option<String>,

    /// Override retry attempt bound from configuration
    #[arg(long, env = "TASK_COURIER_MAX_ATTEMPTS")]
    pub attempts: Option<u32>,

    /// Validate configuration and exit without dispatching
    #[arg(long)]
    pub dry_run: bool,

    /// Deliver to an in-process loopback instead of the worker
    #[arg(long)]
    pub loopback: bool,

    /// Enqueue tasks through a dedicated dispatch worker instead of
    /// submitting inline
    #[arg(long)]
    pub queued: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "TASK_COURIER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "courier.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "courier.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show per-task details
    #[arg(long)]
    pub tasks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
