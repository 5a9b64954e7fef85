//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::DispatchBlueprint;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    worker_addr: String,
    wire_format: String,
    task_count: usize,
    max_attempts: u32,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    worker_addr: blueprint.worker.addr.clone(),
                    wire_format: blueprint.worker.wire_format.as_str().to_string(),
                    task_count: blueprint.tasks.len(),
                    max_attempts: blueprint.retry.max_attempts,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &DispatchBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    // Check for an empty task list
    if blueprint.tasks.is_empty() {
        warnings.push("No tasks configured - a run will deliver nothing".to_string());
    }

    // Check retry settings
    if blueprint.retry.max_attempts == 1 {
        warnings
            .push("retry.max_attempts = 1 - failed deliveries will not be retried".to_string());
    }

    // Check queue sizing against the configured burst
    if blueprint.dispatch.queue_capacity < blueprint.tasks.len() {
        warnings.push(format!(
            "dispatch.queue_capacity ({}) is below the task count ({}) - queued bursts may drop",
            blueprint.dispatch.queue_capacity,
            blueprint.tasks.len()
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Worker: {}", summary.worker_addr);
            println!("  Wire format: {}", summary.wire_format);
            println!("  Tasks: {}", summary.task_count);
            println!("  Max attempts: {}", summary.max_attempts);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ValidateArgs;
    use std::io::Write;

    fn args_for(path: &std::path::Path) -> ValidateArgs {
        ValidateArgs {
            config: path.to_path_buf(),
            json: false,
        }
    }

    #[test]
    fn test_validate_missing_file() {
        let args = args_for(std::path::Path::new("/nonexistent/courier.toml"));
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_validate_good_config_with_warning() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        write!(
            file,
            r#"
[worker]
addr = "127.0.0.1:7070"

[retry]
max_attempts = 1
"#
        )
        .unwrap();

        let result = validate_config(&args_for(file.path()));
        assert!(result.valid, "error: {:?}", result.error);

        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("No tasks configured")));
        assert!(warnings.iter().any(|w| w.contains("max_attempts = 1")));
    }

    #[test]
    fn test_validate_rejects_bad_addr() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        write!(
            file,
            r#"
[worker]
addr = "not-an-endpoint"
"#
        )
        .unwrap();

        let result = validate_config(&args_for(file.path()));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("host:port"));
    }
}
