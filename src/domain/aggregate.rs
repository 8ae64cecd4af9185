// ==========================================
// 平台运营分析引擎 - 聚合结果领域模型
// ==========================================
// 红线: 同一维度划分内 Σ percentage = 100 (±0.01)，total = 0 时全部为 0
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// BreakdownEntry - 单个类别的分解统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub category: String,
    pub count: usize,
    pub percentage: f64,           // count / total × 100
    pub measure_sum: f64,          // 度量合计（无度量选择器时为 0）
    pub growth: f64,               // 相对前一等长时间窗的增长率 (%)
}

// ==========================================
// TimeSeriesPoint - 时间序列点
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: DateTime<Utc>,  // 桶起点
    pub metric: String,
    pub value: f64,
}

// ==========================================
// AggregatedResult - 聚合结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub totals: BTreeMap<String, f64>,
    /// 维度名 -> 分解结果
    pub breakdowns: BTreeMap<String, Vec<BreakdownEntry>>,
    pub time_series: Vec<TimeSeriesPoint>,
    pub metrics: BTreeMap<String, f64>,
}

impl AggregatedResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_total(mut self, name: &str, value: f64) -> Self {
        self.totals.insert(name.to_string(), value);
        self
    }

    pub fn with_breakdown(mut self, dimension: &str, entries: Vec<BreakdownEntry>) -> Self {
        self.breakdowns.insert(dimension.to_string(), entries);
        self
    }

    pub fn with_series(mut self, points: Vec<TimeSeriesPoint>) -> Self {
        self.time_series.extend(points);
        self
    }

    pub fn with_metrics(mut self, metrics: BTreeMap<String, f64>) -> Self {
        self.metrics.extend(metrics);
        self
    }

    /// 取出某个指标的时间序列值（按时间升序）
    pub fn series_values(&self, metric: &str) -> Vec<f64> {
        let mut points: Vec<&TimeSeriesPoint> = self
            .time_series
            .iter()
            .filter(|p| p.metric == metric)
            .collect();
        points.sort_by_key(|p| p.timestamp);
        points.into_iter().map(|p| p.value).collect()
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}
