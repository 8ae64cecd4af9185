// ==========================================
// 平台运营分析引擎 - 报告领域模型
// ==========================================
// 职责: 定义报告文档结构（章节/预测/预测性评分/洞察/对标）
// 红线: 报告按请求创建，追加写入，永不覆盖
// ==========================================

use crate::domain::aggregate::AggregatedResult;
use crate::domain::benchmark::BenchmarkComparison;
use crate::domain::forecast::{Forecast, TrendAnalysis};
use crate::domain::insight::{Insight, Recommendation};
use crate::domain::prediction::Prediction;
use crate::domain::types::{RecordDomain, ReportStatus, ReportType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 报告文档结构版本（结构变化时递增）
pub const REPORT_SCHEMA_VERSION: u32 = 1;

// ==========================================
// ReportPeriod - 报告周期
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub label: String,             // 展示用标签，如 "2024-Q1"
}

// ==========================================
// ReportOptions - 报告生成选项
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportOptions {
    #[serde(default)]
    pub include_forecasting: bool,
    #[serde(default)]
    pub include_benchmarks: bool,
    /// 额外输出的指标名（必须是已知指标）
    #[serde(default)]
    pub custom_metrics: Vec<String>,
}

// ==========================================
// ReportSection - 单数据域章节
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSection {
    pub domain: RecordDomain,
    pub record_count: usize,
    pub aggregated: AggregatedResult,
    /// 指标名 -> 趋势
    #[serde(default)]
    pub trends: BTreeMap<String, TrendAnalysis>,
}

// ==========================================
// ReportSummary - 报告摘要元数据
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub record_counts: BTreeMap<String, usize>,
    pub sections: Vec<String>,
    pub forecast_count: usize,
    pub prediction_count: usize,
    pub insight_count: usize,
    pub recommendation_count: usize,
    pub benchmark_count: usize,
    /// 自定义指标取值
    #[serde(default)]
    pub custom_metrics: BTreeMap<String, f64>,
}

// ==========================================
// Report - 报告文档
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub report_type: ReportType,
    pub title: String,
    pub period: ReportPeriod,
    pub schema_version: u32,
    pub status: ReportStatus,

    // ===== 内容 =====
    pub sections: Vec<ReportSection>,
    #[serde(default)]
    pub forecasts: Vec<Forecast>,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
    #[serde(default)]
    pub insights: Vec<Insight>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub benchmarks: Vec<BenchmarkComparison>,
    pub summary: ReportSummary,

    pub generated_at: DateTime<Utc>,
}

impl Report {
    pub fn section(&self, domain: RecordDomain) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.domain == domain)
    }

    /// 在所有章节中查找指标值
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.sections
            .iter()
            .find_map(|s| s.aggregated.metric(name))
    }
}

// ==========================================
// ReportReceipt - 生成报告的返回值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportReceipt {
    pub report_id: String,
    pub title: String,
    pub status: ReportStatus,
    pub summary: ReportSummary,
}

impl From<&Report> for ReportReceipt {
    fn from(report: &Report) -> Self {
        Self {
            report_id: report.id.clone(),
            title: report.title.clone(),
            status: report.status,
            summary: report.summary.clone(),
        }
    }
}
