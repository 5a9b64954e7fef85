//! 配置校验模块
//!
//! 校验规则：
//! - worker.addr 形如 host:port 且端口合法
//! - retry 参数有界 (max_attempts >= 1, 超时/延迟 > 0)
//! - task id 唯一且非空
//! - 队列容量 >= 1

use std::collections::HashSet;

use contracts::{BackoffKind, ContractError, DispatchBlueprint};
use validator::Validate;

/// 校验 DispatchBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_worker_addr(blueprint)?;
    validate_retry(blueprint)?;
    validate_dispatch_options(blueprint)?;
    validate_task_ids(blueprint)?;
    Ok(())
}

/// 字段级校验 (validator derive)
fn validate_fields(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    blueprint.validate().map_err(|errors| {
        ContractError::config_validation("blueprint", errors.to_string().replace('\n', "; "))
    })
}

/// 校验 worker 地址形状
fn validate_worker_addr(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    let addr = &blueprint.worker.addr;

    let (host, port) = addr.rsplit_once(':').ok_or_else(|| {
        ContractError::config_validation(
            "worker.addr",
            format!("expected host:port, got '{addr}'"),
        )
    })?;

    if host.is_empty() {
        return Err(ContractError::config_validation(
            "worker.addr",
            "host part cannot be empty",
        ));
    }

    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(ContractError::config_validation(
            "worker.addr",
            format!("invalid port '{port}'"),
        )),
        Ok(_) => Ok(()),
    }
}

/// 校验重试参数
fn validate_retry(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    let retry = &blueprint.retry;

    if retry.max_attempts == 0 {
        return Err(ContractError::config_validation(
            "retry.max_attempts",
            "must be >= 1",
        ));
    }

    if retry.request_timeout_secs == 0 {
        return Err(ContractError::config_validation(
            "retry.request_timeout_secs",
            "must be > 0",
        ));
    }

    if retry.retry_delay_secs == 0 {
        return Err(ContractError::config_validation(
            "retry.retry_delay_secs",
            "must be > 0",
        ));
    }

    if retry.backoff == BackoffKind::Exponential {
        if let Some(cap) = retry.max_delay_secs {
            if cap < retry.retry_delay_secs {
                return Err(ContractError::config_validation(
                    "retry.max_delay_secs",
                    format!(
                        "cap ({cap}) must be >= retry_delay_secs ({})",
                        retry.retry_delay_secs
                    ),
                ));
            }
        }
    }

    Ok(())
}

/// 校验队列容量
fn validate_dispatch_options(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    if blueprint.dispatch.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "dispatch.queue_capacity",
            "must be >= 1",
        ));
    }
    Ok(())
}

/// 校验 task id 唯一性
fn validate_task_ids(blueprint: &DispatchBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for task in &blueprint.tasks {
        if !seen.insert(&task.id) {
            return Err(ContractError::config_validation(
                format!("tasks[id={}]", task.id),
                "duplicate task id",
            ));
        }
    }
    Ok(())
}
