//! 投递指标收集模块
//!
//! 记录任务投递过程中的关键事件，并在内存中聚合出运行摘要。

use contracts::Task;
use metrics::{counter, gauge, histogram};

/// 单次投递尝试的结果分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// worker 显式接受
    Accepted,
    /// worker 显式拒绝 (accepted=false)
    Rejected,
    /// 传输层错误 (发送/接收失败)
    TransportError,
    /// 超过单次尝试截止时间
    Timeout,
}

impl AttemptOutcome {
    /// 指标标签值
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::TransportError => "transport_error",
            Self::Timeout => "timeout",
        }
    }
}

/// 记录一次任务提交
pub fn record_task_submitted(task: &Task) {
    counter!(
        "task_courier_tasks_submitted_total",
        "task_name" => task.name.clone()
    )
    .increment(1);
}

/// 记录拨号失败 (本次 submit 调用被放弃)
pub fn record_dial_failure(addr: &str) {
    counter!(
        "task_courier_dial_failures_total",
        "addr" => addr.to_string()
    )
    .increment(1);
}

/// 记录一次投递尝试及其结果
pub fn record_delivery_attempt(outcome: AttemptOutcome) {
    counter!(
        "task_courier_delivery_attempts_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

/// 记录任务被接受 (含消耗的尝试次数)
pub fn record_task_accepted(attempts: u32) {
    counter!("task_courier_tasks_accepted_total").increment(1);
    histogram!("task_courier_attempts_per_accepted_task").record(attempts as f64);
}

/// 记录重试耗尽 (含消耗的尝试次数)
pub fn record_task_exhausted(attempts: u32) {
    counter!("task_courier_tasks_exhausted_total").increment(1);
    histogram!("task_courier_attempts_per_exhausted_task").record(attempts as f64);
}

/// 记录待投递队列深度
pub fn record_queue_depth(depth: usize) {
    gauge!("task_courier_queue_depth").set(depth as f64);
}

/// 整个 submit 调用的终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 某次尝试被接受
    Accepted,
    /// 全部尝试失败
    Exhausted,
    /// 拨号失败，零次尝试
    DialFailed,
}

/// 投递统计聚合器
///
/// 在内存中聚合终态计数与每任务尝试次数，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// 提交总数
    pub total_tasks: u64,

    /// 被接受的任务数
    pub accepted: u64,

    /// 重试耗尽的任务数
    pub exhausted: u64,

    /// 因拨号失败被丢弃的任务数
    pub dial_failed: u64,

    /// 每任务尝试次数统计
    pub attempt_stats: RunningStats,
}

impl DispatchStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一个任务的终态
    pub fn record_task(&mut self, outcome: DispatchOutcome, attempts: u64) {
        self.total_tasks += 1;
        match outcome {
            DispatchOutcome::Accepted => self.accepted += 1,
            DispatchOutcome::Exhausted => self.exhausted += 1,
            DispatchOutcome::DialFailed => self.dial_failed += 1,
        }
        if attempts > 0 {
            self.attempt_stats.push(attempts as f64);
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> DispatchSummary {
        let rate = |n: u64| {
            if self.total_tasks > 0 {
                n as f64 / self.total_tasks as f64 * 100.0
            } else {
                0.0
            }
        };

        DispatchSummary {
            total_tasks: self.total_tasks,
            accepted: self.accepted,
            exhausted: self.exhausted,
            dial_failed: self.dial_failed,
            acceptance_rate: rate(self.accepted),
            exhaustion_rate: rate(self.exhausted),
            attempts: StatsSummary::from(&self.attempt_stats),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 投递摘要
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub total_tasks: u64,
    pub accepted: u64,
    pub exhausted: u64,
    pub dial_failed: u64,
    pub acceptance_rate: f64,
    pub exhaustion_rate: f64,
    pub attempts: StatsSummary,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Tasks submitted: {}", self.total_tasks)?;
        writeln!(
            f,
            "Accepted: {} ({:.2}%)",
            self.accepted, self.acceptance_rate
        )?;
        writeln!(
            f,
            "Exhausted: {} ({:.2}%)",
            self.exhausted, self.exhaustion_rate
        )?;
        writeln!(f, "Dropped on dial failure: {}", self.dial_failed)?;
        writeln!(f, "Attempts per task: {}", self.attempts)?;
        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 标准差 (样本)
    pub fn std_dev(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).sqrt()
        }
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.min
        }
    }

    /// 最大值
    pub fn max(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.max
        }
    }
}
