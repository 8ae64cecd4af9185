// ==========================================
// 平台运营分析引擎 - 分析参数配置
// ==========================================
// 职责: 趋势/预测/评分/对标/快照/取数等全部可调常量
// 存储: config_kv（scope_id='global'，key='analytics/config'，JSON）
// 红线: 所有阈值必须是具名常量，不允许在引擎内硬编码
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::domain::types::Granularity;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 概率/权重之和的容差
const SUM_TOLERANCE: f64 = 1e-6;

// ==========================================
// AnalyticsConfig - 顶层配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub trend: TrendConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub prediction: PredictionConfig,
    #[serde(default)]
    pub quality_weights: QualityWeights,
    #[serde(default)]
    pub benchmarks: BenchmarkConfig,
    #[serde(default)]
    pub insight: InsightConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub grouping: GroupingConfig,
}

impl AnalyticsConfig {
    /// 校验全部配置段
    pub fn validate(&self) -> ConfigResult<()> {
        self.trend.validate()?;
        self.forecast.validate()?;
        self.prediction.validate()?;
        self.quality_weights.validate()?;
        self.benchmarks.validate()?;
        self.snapshot.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

// ==========================================
// TrendConfig - 趋势分类
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// |delta%| 不超过该值视为平稳
    pub stable_band_pct: f64,
    /// 变异系数超过该值视为波动
    pub volatility_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            stable_band_pct: 5.0,
            volatility_threshold: 0.5,
        }
    }
}

impl TrendConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.stable_band_pct < 0.0 {
            return Err(ConfigError::invalid("trend.stable_band_pct", "不能为负数"));
        }
        if self.volatility_threshold <= 0.0 {
            return Err(ConfigError::invalid("trend.volatility_threshold", "必须大于 0"));
        }
        Ok(())
    }
}

// ==========================================
// ForecastConfig - 多期限预测
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonConfidence {
    pub next_period: f64,
    pub next_quarter: f64,
    pub next_year: f64,
}

impl Default for HorizonConfidence {
    fn default() -> Self {
        Self {
            next_period: 0.9,
            next_quarter: 0.8,
            next_year: 0.65,
        }
    }
}

/// 情景模板: 名称 + 概率 + 相对期望值的乘数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTemplate {
    pub name: String,
    pub probability: f64,
    pub multiplier: f64,
}

impl ScenarioTemplate {
    fn new(name: &str, probability: f64, multiplier: f64) -> Self {
        Self {
            name: name.to_string(),
            probability,
            multiplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// 计算平均增长率所需的最少有效相邻点对数
    pub min_history_points: usize,
    /// 历史不足时采用的单桶增长率（小数）
    pub fallback_growth_rate: f64,
    /// 复利系数上限
    pub max_compound_factor: f64,
    pub confidence: HorizonConfidence,
    pub scenarios: Vec<ScenarioTemplate>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_history_points: 2,
            fallback_growth_rate: 0.0,
            max_compound_factor: 10.0,
            confidence: HorizonConfidence::default(),
            scenarios: vec![
                ScenarioTemplate::new("conservative", 0.3, 0.8),
                ScenarioTemplate::new("expected", 0.5, 1.0),
                ScenarioTemplate::new("optimistic", 0.2, 1.25),
            ],
        }
    }
}

impl ForecastConfig {
    fn validate(&self) -> ConfigResult<()> {
        let c = &self.confidence;
        for (field, v) in [
            ("forecast.confidence.next_period", c.next_period),
            ("forecast.confidence.next_quarter", c.next_quarter),
            ("forecast.confidence.next_year", c.next_year),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::invalid(field, "必须在 [0, 1] 区间"));
            }
        }
        if !(c.next_period > c.next_quarter && c.next_quarter > c.next_year) {
            return Err(ConfigError::invalid(
                "forecast.confidence",
                "置信度必须随预测期限严格递减",
            ));
        }

        if self.scenarios.len() < 3 {
            return Err(ConfigError::invalid("forecast.scenarios", "至少需要 3 个情景"));
        }
        if self.scenarios.iter().any(|s| s.probability < 0.0 || s.multiplier < 0.0) {
            return Err(ConfigError::invalid("forecast.scenarios", "概率与乘数不能为负数"));
        }
        let sum: f64 = self.scenarios.iter().map(|s| s.probability).sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(ConfigError::invalid(
                "forecast.scenarios",
                &format!("情景概率之和必须为 1，实际为 {:.4}", sum),
            ));
        }

        if self.max_compound_factor <= 0.0 {
            return Err(ConfigError::invalid("forecast.max_compound_factor", "必须大于 0"));
        }
        if self.min_history_points == 0 {
            return Err(ConfigError::invalid("forecast.min_history_points", "至少为 1"));
        }
        Ok(())
    }
}

// ==========================================
// PredictionConfig - 实体预测启发式常量
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    // ===== 完工概率（百分比） =====
    pub completion_base: f64,
    pub progress_weight: f64,
    pub recent_update_days: i64,
    pub recent_update_bonus: f64,
    pub milestone_weight: f64,
    pub completion_min: f64,
    pub completion_max: f64,

    // ===== 预计完工日期 =====
    pub fallback_completion_days: i64,

    // ===== 风险规则 =====
    pub timeline_delay_probability: f64,
    pub communication_gap_days: i64,
    pub communication_gap_probability: f64,
    pub funding_risk_threshold: f64,
    pub funding_risk_probability: f64,

    // ===== 流失概率（小数） =====
    pub churn_base: f64,
    pub inactive_days: i64,
    pub inactive_penalty: f64,
    pub dormant_days: i64,
    pub dormant_penalty: f64,
    pub loyal_purchase_threshold: u32,
    pub loyal_projects_threshold: u32,
    pub loyalty_discount: f64,
    pub no_engagement_penalty: f64,
    pub recent_activity_days: i64,
    pub recent_activity_discount: f64,
    pub churn_min: f64,
    pub churn_max: f64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            completion_base: 50.0,
            progress_weight: 0.5,
            recent_update_days: 30,
            recent_update_bonus: 20.0,
            milestone_weight: 30.0,
            completion_min: 5.0,
            completion_max: 95.0,
            fallback_completion_days: 180,
            timeline_delay_probability: 0.8,
            communication_gap_days: 60,
            communication_gap_probability: 0.6,
            funding_risk_threshold: 1_000_000.0,
            funding_risk_probability: 0.3,
            churn_base: 0.2,
            inactive_days: 30,
            inactive_penalty: 0.3,
            dormant_days: 90,
            dormant_penalty: 0.3,
            loyal_purchase_threshold: 5,
            loyal_projects_threshold: 2,
            loyalty_discount: 0.2,
            no_engagement_penalty: 0.4,
            recent_activity_days: 30,
            recent_activity_discount: 0.2,
            churn_min: 0.05,
            churn_max: 0.95,
        }
    }
}

impl PredictionConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.completion_min > self.completion_max {
            return Err(ConfigError::invalid(
                "prediction.completion_min",
                "不能大于 completion_max",
            ));
        }
        if self.churn_min > self.churn_max || self.churn_min < 0.0 || self.churn_max > 1.0 {
            return Err(ConfigError::invalid(
                "prediction.churn_min",
                "流失概率区间必须落在 [0, 1] 且 min <= max",
            ));
        }
        if self.dormant_days < self.inactive_days {
            return Err(ConfigError::invalid(
                "prediction.dormant_days",
                "不能小于 inactive_days",
            ));
        }
        if self.fallback_completion_days <= 0 {
            return Err(ConfigError::invalid(
                "prediction.fallback_completion_days",
                "必须大于 0",
            ));
        }
        Ok(())
    }
}

// ==========================================
// QualityWeights - 项目质量综合分权重
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityWeights {
    pub progress: f64,
    pub milestone: f64,
    pub reporting: f64,
    pub verification: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            progress: 0.35,
            milestone: 0.30,
            reporting: 0.20,
            verification: 0.15,
        }
    }
}

impl QualityWeights {
    pub fn sum(&self) -> f64 {
        self.progress + self.milestone + self.reporting + self.verification
    }

    fn validate(&self) -> ConfigResult<()> {
        if [self.progress, self.milestone, self.reporting, self.verification]
            .iter()
            .any(|w| *w < 0.0)
        {
            return Err(ConfigError::invalid("quality_weights", "权重不能为负数"));
        }
        if (self.sum() - 1.0).abs() > SUM_TOLERANCE {
            return Err(ConfigError::invalid(
                "quality_weights",
                &format!("权重之和必须为 1，实际为 {:.4}", self.sum()),
            ));
        }
        Ok(())
    }
}

// ==========================================
// BenchmarkConfig - 行业对标参考值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReference {
    pub average: f64,
    pub top_performer: f64,
}

/// 指标名 -> 参考值
pub type BenchmarkTable = BTreeMap<String, BenchmarkReference>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkConfig {
    /// our >= top × leading_ratio 视为领先
    pub leading_ratio: f64,
    pub table: BenchmarkTable,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        let table = [
            ("completion_rate", 60.0, 85.0),
            ("success_rate", 70.0, 90.0),
            ("approval_rate", 65.0, 85.0),
            ("funding_ratio", 55.0, 90.0),
            ("quality_score", 60.0, 85.0),
            ("retention_rate", 40.0, 70.0),
            ("average_purchases", 2.0, 6.0),
            ("transaction_success_rate", 90.0, 98.0),
            ("average_transaction_value", 250.0, 600.0),
            ("verification_rate", 75.0, 95.0),
        ]
        .into_iter()
        .map(|(name, average, top_performer)| {
            (
                name.to_string(),
                BenchmarkReference {
                    average,
                    top_performer,
                },
            )
        })
        .collect();

        Self {
            leading_ratio: 0.95,
            table,
        }
    }
}

impl BenchmarkConfig {
    fn validate(&self) -> ConfigResult<()> {
        if !(0.0..=1.0).contains(&self.leading_ratio) {
            return Err(ConfigError::invalid("benchmarks.leading_ratio", "必须在 [0, 1] 区间"));
        }
        for (metric, reference) in &self.table {
            if reference.top_performer < reference.average {
                return Err(ConfigError::invalid(
                    "benchmarks.table",
                    &format!("指标 {} 的头部水平低于平均水平", metric),
                ));
            }
        }
        Ok(())
    }
}

// ==========================================
// InsightConfig - 洞察生成阈值
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightConfig {
    /// 趋势变化超过该百分比才生成趋势洞察
    pub significant_change_pct: f64,
    /// 比率指标低于该值时生成风险洞察
    pub low_rate_threshold: f64,
    /// 比率指标高于该值时生成机会洞察
    pub high_rate_threshold: f64,
    /// 流失概率高于该值的用户计为高风险
    pub churn_risk_threshold: f64,
    /// 完工概率低于该值的项目计为高风险
    pub completion_risk_threshold: f64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            significant_change_pct: 10.0,
            low_rate_threshold: 50.0,
            high_rate_threshold: 80.0,
            churn_risk_threshold: 0.7,
            completion_risk_threshold: 40.0,
        }
    }
}

// ==========================================
// SnapshotConfig - 快照调度
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    pub granularity: Granularity,
    pub retention_days: i64,
    pub interval_secs: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            granularity: Granularity::Daily,
            retention_days: 365,
            interval_secs: 3600,
        }
    }
}

impl SnapshotConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.retention_days <= 0 {
            return Err(ConfigError::invalid("snapshot.retention_days", "必须大于 0"));
        }
        if self.interval_secs == 0 {
            return Err(ConfigError::invalid("snapshot.interval_secs", "必须大于 0"));
        }
        Ok(())
    }
}

// ==========================================
// StoreConfig - 取数与持久化
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub fetch_chunk_size: usize,
    pub fetch_timeout_ms: u64,
    pub persist_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            fetch_chunk_size: 500,
            fetch_timeout_ms: 10_000,
            persist_timeout_ms: 5_000,
        }
    }
}

impl StoreConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.fetch_chunk_size == 0 {
            return Err(ConfigError::invalid("store.fetch_chunk_size", "必须大于 0"));
        }
        if self.fetch_timeout_ms == 0 || self.persist_timeout_ms == 0 {
            return Err(ConfigError::invalid("store", "超时时间必须大于 0"));
        }
        Ok(())
    }
}

// ==========================================
// GroupingConfig - 分桶规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    pub week_start: Weekday,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            week_start: Weekday::Mon,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalyticsConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.quality_weights.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_non_decreasing_confidence() {
        let mut config = AnalyticsConfig::default();
        config.forecast.confidence.next_year = 0.85;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_rejects_scenario_probabilities_not_summing_to_one() {
        let mut config = AnalyticsConfig::default();
        config.forecast.scenarios[0].probability = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: AnalyticsConfig =
            serde_json::from_str(r#"{"trend":{"volatility_threshold":0.8}}"#).unwrap();
        assert_eq!(config.trend.volatility_threshold, 0.8);
        assert_eq!(config.trend.stable_band_pct, 5.0);
        assert_eq!(config.store.fetch_chunk_size, 500);
    }
}
