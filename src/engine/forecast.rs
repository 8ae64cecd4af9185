// ==========================================
// 平台运营分析引擎 - 多期限预测引擎
// ==========================================
// 职责: 基于历史序列的平均增长率，生成下一周期/下一季度/下一年预测
// 输入: 指标序列（按桶时间升序）+ 序列粒度
// 输出: Forecast（每个期限 >= 3 个带概率的情景）
// ==========================================
// 红线: 历史不足时才使用配置兜底增长率，并在结果中标记 history_based = false
// 红线: 复利系数截断到 [0, max_compound_factor]
// 红线: 每个期限的情景概率之和 = 1
// ==========================================

use crate::config::ForecastConfig;
use crate::domain::forecast::{Forecast, ForecastHorizon, HorizonForecast, Scenario};
use crate::domain::types::Granularity;
use crate::engine::trend::average_growth_rate;
use crate::i18n;

pub struct ForecastEngine {
    config: ForecastConfig,
    locale: String,
}

impl ForecastEngine {
    /// 构造函数
    ///
    /// # 参数
    /// - `config`: 预测配置
    /// - `locale`: 情景假设说明使用的语言
    pub fn new(config: ForecastConfig, locale: &str) -> Self {
        Self {
            config,
            locale: locale.to_string(),
        }
    }

    /// 生成多期限预测
    ///
    /// # 返回
    /// 空序列返回 None
    pub fn forecast(
        &self,
        metric: &str,
        values: &[f64],
        granularity: Granularity,
    ) -> Option<Forecast> {
        let base_value = *values.last()?;

        let (history_rate, pairs) = average_growth_rate(values);
        let history_based = pairs >= self.config.min_history_points;
        let growth_rate = if history_based {
            history_rate
        } else {
            self.config.fallback_growth_rate
        };

        tracing::debug!(
            metric = metric,
            points = values.len(),
            pairs = pairs,
            growth_rate = growth_rate,
            history_based = history_based,
            "生成预测"
        );

        let growth_note = if history_based {
            i18n::t_in(
                &self.locale,
                "forecast.assumption.expected",
                &[("rate", &format!("{:.2}", growth_rate * 100.0))],
            )
        } else {
            i18n::t_in(
                &self.locale,
                "forecast.assumption.fallback",
                &[("rate", &format!("{:.2}", growth_rate * 100.0))],
            )
        };

        let conf = &self.config.confidence;
        let horizon = |h: ForecastHorizon, periods: f64, confidence: f64| {
            let value = base_value * self.compound_factor(growth_rate, periods);
            HorizonForecast {
                horizon: h,
                value,
                confidence,
                scenarios: self.scenarios(value, &growth_note),
            }
        };

        Some(Forecast {
            metric: metric.to_string(),
            base_value,
            growth_rate,
            history_based,
            next_period: horizon(ForecastHorizon::NextPeriod, 1.0, conf.next_period),
            next_quarter: horizon(
                ForecastHorizon::NextQuarter,
                granularity.buckets_per_quarter(),
                conf.next_quarter,
            ),
            next_year: horizon(
                ForecastHorizon::NextYear,
                granularity.buckets_per_year(),
                conf.next_year,
            ),
        })
    }

    /// (1 + rate)^periods，截断到 [0, max_compound_factor]
    pub fn compound_factor(&self, rate: f64, periods: f64) -> f64 {
        let factor = (1.0 + rate).max(0.0).powf(periods);
        if factor.is_finite() {
            factor.clamp(0.0, self.config.max_compound_factor)
        } else {
            self.config.max_compound_factor
        }
    }

    /// 按情景模板展开（概率归一化）
    fn scenarios(&self, expected: f64, growth_note: &str) -> Vec<Scenario> {
        let templates = &self.config.scenarios;
        let total: f64 = templates.iter().map(|s| s.probability).sum();
        let uniform = 1.0 / templates.len().max(1) as f64;

        templates
            .iter()
            .map(|tpl| {
                let probability = if total > 0.0 {
                    tpl.probability / total
                } else {
                    uniform
                };

                let mut assumptions = Vec::with_capacity(2);
                if tpl.name != "expected" {
                    let key = match tpl.name.as_str() {
                        "conservative" => "forecast.assumption.conservative",
                        "optimistic" => "forecast.assumption.optimistic",
                        _ => "forecast.assumption.scenario",
                    };
                    assumptions.push(i18n::t_in(
                        &self.locale,
                        key,
                        &[
                            ("name", tpl.name.as_str()),
                            ("multiplier", &format!("{:.2}", tpl.multiplier)),
                        ],
                    ));
                }
                assumptions.push(growth_note.to_string());

                Scenario {
                    name: tpl.name.clone(),
                    probability,
                    value: expected * tpl.multiplier,
                    assumptions,
                }
            })
            .collect()
    }
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new(ForecastConfig::default(), "en")
    }
}
