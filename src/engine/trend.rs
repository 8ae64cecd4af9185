// ==========================================
// 平台运营分析引擎 - 趋势分析引擎
// ==========================================
// 职责: 时间序列的方向 / 变化幅度 / 波动性 / 平均增长率
// 红线: 首值为 0 或不足两个点时 delta = 0；均值为 0 时变异系数 = 0
// ==========================================

use crate::config::TrendConfig;
use crate::domain::forecast::TrendAnalysis;
use crate::domain::types::TrendDirection;

pub struct TrendEstimator {
    config: TrendConfig,
}

impl TrendEstimator {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    /// 分析序列趋势
    ///
    /// 方向判定:
    /// - delta > +stable_band → increasing
    /// - delta < -stable_band → decreasing
    /// - 否则 stable
    /// - 变异系数超过阈值时覆盖为 volatile
    pub fn analyze(&self, values: &[f64]) -> TrendAnalysis {
        let delta_pct = delta_pct(values);
        let cv = coefficient_of_variation(values);

        let direction = if cv > self.config.volatility_threshold {
            TrendDirection::Volatile
        } else if delta_pct > self.config.stable_band_pct {
            TrendDirection::Increasing
        } else if delta_pct < -self.config.stable_band_pct {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Stable
        };

        let (avg_growth, _) = average_growth_rate(values);

        TrendAnalysis {
            direction,
            delta_pct,
            coefficient_of_variation: cv,
            average_growth_pct: avg_growth * 100.0,
        }
    }
}

impl Default for TrendEstimator {
    fn default() -> Self {
        Self::new(TrendConfig::default())
    }
}

/// (last - first) / first × 100
pub fn delta_pct(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(first), Some(last)) if values.len() >= 2 && *first != 0.0 => {
            (last - first) / first * 100.0
        }
        _ => 0.0,
    }
}

/// 总体标准差 / 均值
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean.abs()
}

/// 平均单桶增长率（小数）
///
/// # 返回
/// (平均增长率, 可用相邻点对数量)；前值为 0 的点对被跳过
pub fn average_growth_rate(values: &[f64]) -> (f64, usize) {
    let rates: Vec<f64> = values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();

    if rates.is_empty() {
        (0.0, 0)
    } else {
        (rates.iter().sum::<f64>() / rates.len() as f64, rates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_bands() {
        let estimator = TrendEstimator::default();
        assert_eq!(
            estimator.analyze(&[100.0, 104.0, 110.0]).direction,
            TrendDirection::Increasing
        );
        assert_eq!(
            estimator.analyze(&[100.0, 98.0, 90.0]).direction,
            TrendDirection::Decreasing
        );
        assert_eq!(
            estimator.analyze(&[100.0, 101.0, 103.0]).direction,
            TrendDirection::Stable
        );
    }

    #[test]
    fn test_volatility_overrides_direction() {
        let estimator = TrendEstimator::default();
        let analysis = estimator.analyze(&[1.0, 100.0, 1.0, 120.0]);
        assert_eq!(analysis.direction, TrendDirection::Volatile);
        assert!(analysis.coefficient_of_variation > 0.5);
    }

    #[test]
    fn test_degenerate_series() {
        assert_eq!(delta_pct(&[]), 0.0);
        assert_eq!(delta_pct(&[5.0]), 0.0);
        assert_eq!(delta_pct(&[0.0, 10.0]), 0.0);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);

        let analysis = TrendEstimator::default().analyze(&[]);
        assert_eq!(analysis.direction, TrendDirection::Stable);
    }

    #[test]
    fn test_average_growth_skips_zero_base() {
        let (rate, pairs) = average_growth_rate(&[0.0, 100.0, 110.0, 121.0]);
        assert_eq!(pairs, 2);
        assert!((rate - 0.1).abs() < 1e-9);
    }
}
