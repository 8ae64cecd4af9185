// ==========================================
// 平台运营分析引擎 - 洞察生成引擎
// ==========================================
// 职责: 从聚合指标、趋势、实体预测、行业对标中提炼洞察与改进建议
// 输入: InsightInputs（均为已计算结果，引擎不取数）
// 输出: (Vec<Insight>, Vec<Recommendation>)
// ==========================================
// 红线: 阈值全部来自 InsightConfig
// 红线: 建议按优先级降序输出
// ==========================================

use crate::config::InsightConfig;
use crate::domain::benchmark::BenchmarkComparison;
use crate::domain::forecast::TrendAnalysis;
use crate::domain::insight::{Insight, Recommendation};
use crate::domain::prediction::Prediction;
use crate::domain::types::{AnalysisType, BenchmarkStatus, InsightCategory, Severity, TrendDirection};
use crate::engine::metrics::metric_names::{rate_base, LOWER_IS_BETTER};
use crate::i18n;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

// 各类洞察的置信度
const TREND_CONFIDENCE: f64 = 0.8;
const RATE_CONFIDENCE: f64 = 0.9;
const PREDICTION_CONFIDENCE: f64 = 0.75;
const BENCHMARK_CONFIDENCE: f64 = 0.85;

/// 洞察引擎输入
#[derive(Debug, Clone, Copy)]
pub struct InsightInputs<'a> {
    pub analysis_type: AnalysisType,
    pub metrics: &'a BTreeMap<String, f64>,
    pub trends: &'a BTreeMap<String, TrendAnalysis>,
    pub project_predictions: &'a [Prediction],
    pub user_predictions: &'a [Prediction],
    pub benchmarks: &'a [BenchmarkComparison],
}

pub struct InsightEngine {
    config: InsightConfig,
    locale: String,
}

/// 单次生成过程的累积器
struct Collector<'e> {
    engine: &'e InsightEngine,
    analysis_type: AnalysisType,
    now: DateTime<Utc>,
    insights: Vec<Insight>,
    recommendations: Vec<Recommendation>,
}

impl<'e> Collector<'e> {
    #[allow(clippy::too_many_arguments)]
    fn insight(
        &mut self,
        key: &str,
        category: InsightCategory,
        metric: &str,
        value: f64,
        impact: Severity,
        confidence: f64,
        args: &[(&str, &str)],
    ) {
        let locale = &self.engine.locale;
        self.insights.push(Insight {
            id: Uuid::new_v4().to_string(),
            analysis_type: self.analysis_type,
            category,
            title: i18n::t_in(locale, &format!("insight.{}.title", key), args),
            description: i18n::t_in(locale, &format!("insight.{}.description", key), args),
            metric: metric.to_string(),
            value,
            impact,
            confidence,
            generated_at: self.now,
        });
    }

    fn recommend(&mut self, key: &str, priority: Severity, metric: Option<&str>, args: &[(&str, &str)]) {
        let locale = &self.engine.locale;
        self.recommendations.push(Recommendation {
            title: i18n::t_in(locale, &format!("recommendation.{}.title", key), args),
            description: i18n::t_in(locale, &format!("recommendation.{}.description", key), args),
            priority,
            related_metric: metric.map(str::to_string),
        });
    }
}

impl InsightEngine {
    pub fn new(config: InsightConfig, locale: &str) -> Self {
        Self {
            config,
            locale: locale.to_string(),
        }
    }

    /// 生成洞察与建议
    pub fn generate(
        &self,
        inputs: InsightInputs<'_>,
        now: DateTime<Utc>,
    ) -> (Vec<Insight>, Vec<Recommendation>) {
        let mut c = Collector {
            engine: self,
            analysis_type: inputs.analysis_type,
            now,
            insights: Vec::new(),
            recommendations: Vec::new(),
        };

        self.trend_insights(&mut c, inputs.trends);
        self.rate_insights(&mut c, inputs.metrics);
        self.project_risk_insights(&mut c, inputs.project_predictions);
        self.churn_insights(&mut c, inputs.user_predictions);
        self.benchmark_insights(&mut c, inputs.benchmarks);

        c.recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));

        tracing::debug!(
            analysis_type = %inputs.analysis_type,
            insights = c.insights.len(),
            recommendations = c.recommendations.len(),
            "洞察生成完成"
        );
        (c.insights, c.recommendations)
    }

    // ==========================================
    // 趋势
    // ==========================================
    fn trend_insights(&self, c: &mut Collector<'_>, trends: &BTreeMap<String, TrendAnalysis>) {
        let threshold = self.config.significant_change_pct;

        for (metric, trend) in trends {
            let metric = metric.as_str();
            let delta = format!("{:.1}", trend.delta_pct);
            match trend.direction {
                TrendDirection::Volatile => {
                    let cv = format!("{:.2}", trend.coefficient_of_variation);
                    c.insight(
                        "volatile",
                        InsightCategory::Anomaly,
                        metric,
                        trend.coefficient_of_variation,
                        Severity::Medium,
                        TREND_CONFIDENCE,
                        &[("metric", metric), ("cv", &cv)],
                    );
                }
                TrendDirection::Increasing | TrendDirection::Decreasing
                    if trend.delta_pct.abs() >= threshold =>
                {
                    let rising = trend.direction == TrendDirection::Increasing;
                    let adverse = rising == LOWER_IS_BETTER.contains(&metric);
                    let impact = if !adverse {
                        Severity::Low
                    } else if trend.delta_pct.abs() >= threshold * 2.0 {
                        Severity::High
                    } else {
                        Severity::Medium
                    };
                    let key = if rising { "trend_up" } else { "trend_down" };
                    let category = if adverse {
                        InsightCategory::Trend
                    } else {
                        InsightCategory::Opportunity
                    };

                    c.insight(
                        key,
                        category,
                        metric,
                        trend.delta_pct,
                        impact,
                        TREND_CONFIDENCE,
                        &[("metric", metric), ("delta", &delta)],
                    );
                    if adverse {
                        c.recommend(key, impact, Some(metric), &[("metric", metric)]);
                    }
                }
                _ => {}
            }
        }
    }

    // ==========================================
    // 比率指标
    // ==========================================
    fn rate_insights(&self, c: &mut Collector<'_>, metrics: &BTreeMap<String, f64>) {
        let low = self.config.low_rate_threshold;
        let high = self.config.high_rate_threshold;

        // 分母为 0 的比率没有样本，不参与阈值判断
        let has_samples = |name: &str| {
            rate_base(name)
                .and_then(|base| metrics.get(base))
                .map_or(true, |count| *count > 0.0)
        };
        let rates = metrics.iter().filter(|(name, _)| {
            name.ends_with("_rate")
                && !LOWER_IS_BETTER.contains(&name.as_str())
                && has_samples(name)
        });

        for (metric, value) in rates {
            let shown = format!("{:.1}", value);
            if *value < low {
                let threshold = format!("{:.0}", low);
                let args: [(&str, &str); 3] =
                    [("metric", metric.as_str()), ("value", &shown), ("threshold", &threshold)];
                c.insight(
                    "low_rate",
                    InsightCategory::Risk,
                    metric,
                    *value,
                    Severity::Medium,
                    RATE_CONFIDENCE,
                    &args,
                );
                c.recommend("low_rate", Severity::Medium, Some(metric), &args);
            } else if *value > high {
                let threshold = format!("{:.0}", high);
                let args: [(&str, &str); 3] =
                    [("metric", metric.as_str()), ("value", &shown), ("threshold", &threshold)];
                c.insight(
                    "high_rate",
                    InsightCategory::Opportunity,
                    metric,
                    *value,
                    Severity::Low,
                    RATE_CONFIDENCE,
                    &args,
                );
            }
        }
    }

    // ==========================================
    // 实体预测
    // ==========================================
    fn project_risk_insights(&self, c: &mut Collector<'_>, predictions: &[Prediction]) {
        let threshold = self.config.completion_risk_threshold;
        let at_risk = predictions
            .iter()
            .filter(|p| p.probability < threshold || p.is_at_risk())
            .count();
        if at_risk == 0 {
            return;
        }

        let count = at_risk.to_string();
        let threshold_text = format!("{:.0}", threshold);
        let args: [(&str, &str); 2] = [("count", &count), ("threshold", &threshold_text)];
        let impact = if at_risk * 2 >= predictions.len() {
            Severity::High
        } else {
            Severity::Medium
        };
        c.insight(
            "at_risk_projects",
            InsightCategory::Risk,
            "completion_probability",
            at_risk as f64,
            impact,
            PREDICTION_CONFIDENCE,
            &args,
        );
        c.recommend("at_risk_projects", impact, None, &args);
    }

    fn churn_insights(&self, c: &mut Collector<'_>, predictions: &[Prediction]) {
        let threshold = self.config.churn_risk_threshold;
        let at_risk = predictions.iter().filter(|p| p.probability > threshold).count();
        if at_risk == 0 {
            return;
        }

        let count = at_risk.to_string();
        let threshold_text = format!("{:.2}", threshold);
        let args: [(&str, &str); 2] = [("count", &count), ("threshold", &threshold_text)];
        let impact = if at_risk * 2 >= predictions.len() {
            Severity::High
        } else {
            Severity::Medium
        };
        c.insight(
            "churn_risk_users",
            InsightCategory::Risk,
            "churn_probability",
            at_risk as f64,
            impact,
            PREDICTION_CONFIDENCE,
            &args,
        );
        c.recommend("churn_risk_users", impact, None, &args);
    }

    // ==========================================
    // 行业对标
    // ==========================================
    fn benchmark_insights(&self, c: &mut Collector<'_>, benchmarks: &[BenchmarkComparison]) {
        for b in benchmarks.iter().filter(|b| b.status == BenchmarkStatus::Lagging) {
            let value = format!("{:.2}", b.our_value);
            let average = format!("{:.2}", b.reference_average);
            let top = format!("{:.2}", b.top_performer);
            let args: [(&str, &str); 4] = [
                ("metric", &b.metric),
                ("value", &value),
                ("average", &average),
                ("top", &top),
            ];
            c.insight(
                "benchmark_lagging",
                InsightCategory::Risk,
                &b.metric,
                b.our_value,
                Severity::Medium,
                BENCHMARK_CONFIDENCE,
                &args,
            );
            c.recommend("benchmark_lagging", Severity::Medium, Some(&b.metric), &args);
        }
    }
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new(InsightConfig::default(), "en")
    }
}
