//! 分发指标收集模块
//!
//! 记录分发调用与命令下发结果的 Prometheus 指标，并在内存中聚合统计。

use std::collections::BTreeMap;

use contracts::AffectedItems;
use metrics::{counter, gauge, histogram};

/// 记录一次分发调用
///
/// `status` 为 `ok` 或错误类别 (如 `timeout`, `permission_denied`)。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_distribute;
///
/// let started = Instant::now();
/// let result = dispatcher.distribute(&request).await;
/// record_distribute("distributed_master", "ok", started.elapsed().as_secs_f64() * 1000.0);
/// ```
pub fn record_distribute(mode: &str, status: &str, elapsed_ms: f64) {
    counter!(
        "ar_dispatch_requests_total",
        "mode" => mode.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!("ar_dispatch_request_duration_ms", "mode" => mode.to_string()).record(elapsed_ms);
}

/// 记录一次命令下发的结果
pub fn record_fanout(operation: &str, result: &AffectedItems) {
    let succeeded = result.total_affected_items();
    let failed = result.total_failed_items();

    counter!(
        "ar_dispatch_targets_affected_total",
        "operation" => operation.to_string()
    )
    .increment(succeeded as u64);

    if failed > 0 {
        counter!(
            "ar_dispatch_targets_failed_total",
            "operation" => operation.to_string()
        )
        .increment(failed as u64);
        for descriptor in result.failed_items().values() {
            record_target_failure(descriptor.kind.as_str());
        }
    }

    gauge!("ar_dispatch_last_failed_targets").set(failed as f64);
}

/// 记录单个目标失败
pub fn record_target_failure(kind: &str) {
    counter!("ar_dispatch_target_failures_total", "kind" => kind.to_string()).increment(1);
}

/// 分发指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchStatsAggregator {
    /// 总调用数
    pub total_calls: u64,

    /// 成功返回结果的调用数
    pub completed_calls: u64,

    /// 调用级错误，按类别计数
    pub errors: BTreeMap<String, u64>,

    /// 成功目标总数
    pub total_affected: u64,

    /// 失败目标总数
    pub total_failed: u64,

    /// 失败目标，按错误类别计数
    pub target_failures: BTreeMap<String, u64>,

    /// 调用耗时统计 (毫秒)
    pub latency_stats: RunningStats,
}

impl DispatchStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次完成的调用
    pub fn record_completed(&mut self, result: &AffectedItems, elapsed_ms: f64) {
        self.total_calls += 1;
        self.completed_calls += 1;
        self.total_affected += result.total_affected_items() as u64;
        self.total_failed += result.total_failed_items() as u64;
        for descriptor in result.failed_items().values() {
            *self
                .target_failures
                .entry(descriptor.kind.as_str().to_string())
                .or_insert(0) += 1;
        }
        self.latency_stats.push(elapsed_ms);
    }

    /// 记录一次调用级错误
    pub fn record_error(&mut self, kind: &str, elapsed_ms: f64) {
        self.total_calls += 1;
        *self.errors.entry(kind.to_string()).or_insert(0) += 1;
        self.latency_stats.push(elapsed_ms);
    }

    /// 生成摘要报告
    pub fn summary(&self) -> DispatchSummary {
        let targets = self.total_affected + self.total_failed;
        DispatchSummary {
            total_calls: self.total_calls,
            completed_calls: self.completed_calls,
            failed_calls: self.total_calls - self.completed_calls,
            total_affected: self.total_affected,
            total_failed: self.total_failed,
            target_failure_rate: if targets > 0 {
                self.total_failed as f64 / targets as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            errors: self.errors.clone(),
            target_failures: self.target_failures.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    pub total_calls: u64,
    pub completed_calls: u64,
    pub failed_calls: u64,
    pub total_affected: u64,
    pub total_failed: u64,
    pub target_failure_rate: f64,
    pub latency_ms: StatsSummary,
    pub errors: BTreeMap<String, u64>,
    pub target_failures: BTreeMap<String, u64>,
}

impl std::fmt::Display for DispatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(
            f,
            "Calls: {} ({} completed, {} failed)",
            self.total_calls, self.completed_calls, self.failed_calls
        )?;
        writeln!(
            f,
            "Targets: {} affected, {} failed ({:.2}%)",
            self.total_affected, self.total_failed, self.target_failure_rate
        )?;
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;

        if !self.errors.is_empty() {
            writeln!(f, "Call errors:")?;
            for (kind, count) in &self.errors {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

        if !self.target_failures.is_empty() {
            writeln!(f, "Target failures:")?;
            for (kind, count) in &self.target_failures {
                writeln!(f, "  {}: {}", kind, count)?;
            }
        }

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
            count: stats.count,
            min: stats.min,
            max: stats.max,
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
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
