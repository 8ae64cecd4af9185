// ==========================================
// 平台运营分析引擎 - 行业对标引擎
// ==========================================
// 职责: 按可注入的参考值表对指标做 领先/持平/落后 分级，并生成差距说明
// 红线: classify 对 our_value 单调（our 增大时等级不降）
// 红线: 参考值表中不存在的指标不产生对标结果
// ==========================================

use crate::config::BenchmarkConfig;
use crate::domain::benchmark::BenchmarkComparison;
use crate::domain::types::BenchmarkStatus;
use crate::i18n;
use std::collections::BTreeMap;

pub struct BenchmarkEngine {
    config: BenchmarkConfig,
    locale: String,
}

impl BenchmarkEngine {
    pub fn new(config: BenchmarkConfig, locale: &str) -> Self {
        Self {
            config,
            locale: locale.to_string(),
        }
    }

    /// 分级
    ///
    /// - our >= top × leading_ratio → leading
    /// - our >= avg → competitive
    /// - 否则 lagging
    pub fn classify(&self, our: f64, average: f64, top: f64) -> BenchmarkStatus {
        if our >= top * self.config.leading_ratio {
            BenchmarkStatus::Leading
        } else if our >= average {
            BenchmarkStatus::Competitive
        } else {
            BenchmarkStatus::Lagging
        }
    }

    /// 单指标对标；未配置参考值时返回 None
    pub fn compare(&self, metric: &str, our: f64) -> Option<BenchmarkComparison> {
        let reference = self.config.table.get(metric)?;
        let status = self.classify(our, reference.average, reference.top_performer);

        let delta_avg = our - reference.average;
        let delta_top = our - reference.top_performer;
        let note = i18n::t_in(
            &self.locale,
            &format!("benchmark.note.{}", status.as_str()),
            &[
                ("metric", metric),
                ("delta_avg", &format!("{:.2}", delta_avg.abs())),
                ("delta_top", &format!("{:.2}", delta_top.abs())),
            ],
        );

        Some(BenchmarkComparison {
            metric: metric.to_string(),
            our_value: our,
            reference_average: reference.average,
            top_performer: reference.top_performer,
            status,
            note,
        })
    }

    /// 对一组指标批量对标（按指标名排序，跳过未配置的指标）
    pub fn compare_all(&self, metrics: &BTreeMap<String, f64>) -> Vec<BenchmarkComparison> {
        metrics
            .iter()
            .filter_map(|(name, value)| self.compare(name, *value))
            .collect()
    }
}

impl Default for BenchmarkEngine {
    fn default() -> Self {
        Self::new(BenchmarkConfig::default(), "en")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_thresholds() {
        let engine = BenchmarkEngine::default();
        assert_eq!(engine.classify(81.0, 60.0, 85.0), BenchmarkStatus::Leading);
        assert_eq!(engine.classify(70.0, 60.0, 85.0), BenchmarkStatus::Competitive);
        assert_eq!(engine.classify(60.0, 60.0, 85.0), BenchmarkStatus::Competitive);
        assert_eq!(engine.classify(59.9, 60.0, 85.0), BenchmarkStatus::Lagging);
    }

    #[test]
    fn test_classify_is_monotonic() {
        let engine = BenchmarkEngine::default();
        let mut last = BenchmarkStatus::Lagging;
        for step in 0..=200 {
            let status = engine.classify(step as f64 * 0.5, 60.0, 85.0);
            assert!(status >= last);
            last = status;
        }
    }

    #[test]
    fn test_compare_uses_table_and_note() {
        let engine = BenchmarkEngine::default();
        let c = engine.compare("completion_rate", 50.0).unwrap();
        assert_eq!(c.status, BenchmarkStatus::Lagging);
        assert_eq!(c.delta_to_average(), -10.0);
        assert!(c.note.contains("completion_rate"));
        assert!(c.note.contains("10.00"));

        assert!(engine.compare("unknown_metric", 1.0).is_none());
    }

    #[test]
    fn test_compare_all_skips_unconfigured() {
        let engine = BenchmarkEngine::default();
        let mut metrics = BTreeMap::new();
        metrics.insert("retention_rate".to_string(), 75.0);
        metrics.insert("total_users".to_string(), 1000.0);
        let out = engine.compare_all(&metrics);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, BenchmarkStatus::Leading);
    }
}
