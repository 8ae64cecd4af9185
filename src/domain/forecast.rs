// ==========================================
// 平台运营分析引擎 - 趋势与预测领域模型
// ==========================================
// 红线: 每个预测期限内 Σ scenario.probability = 1.0 (±0.001)
// 红线: 置信度随预测期限变长严格递减
// ==========================================

use crate::domain::types::TrendDirection;
use serde::{Deserialize, Serialize};

// ==========================================
// TrendAnalysis - 趋势分类结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    pub delta_pct: f64,                    // (last - first) / first × 100
    pub coefficient_of_variation: f64,     // 变异系数
    pub average_growth_pct: f64,           // 平均单桶增长率 (%)
}

// ==========================================
// 预测期限
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastHorizon {
    NextPeriod,
    NextQuarter,
    NextYear,
}

impl ForecastHorizon {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastHorizon::NextPeriod => "next_period",
            ForecastHorizon::NextQuarter => "next_quarter",
            ForecastHorizon::NextYear => "next_year",
        }
    }
}

// ==========================================
// Scenario - 预测情景
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,              // conservative / expected / optimistic
    pub probability: f64,
    pub value: f64,
    pub assumptions: Vec<String>,
}

// ==========================================
// HorizonForecast - 单个期限的预测
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HorizonForecast {
    pub horizon: ForecastHorizon,
    pub value: f64,
    pub confidence: f64,
    pub scenarios: Vec<Scenario>,
}

impl HorizonForecast {
    /// 情景概率之和
    pub fn probability_sum(&self) -> f64 {
        self.scenarios.iter().map(|s| s.probability).sum()
    }
}

// ==========================================
// Forecast - 多期限预测
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub metric: String,
    pub base_value: f64,           // 序列最后一个值
    pub growth_rate: f64,          // 采用的单桶增长率（小数）
    pub history_based: bool,       // 增长率是否来自历史数据（否则为配置兜底值）
    pub next_period: HorizonForecast,
    pub next_quarter: HorizonForecast,
    pub next_year: HorizonForecast,
}

impl Forecast {
    pub fn horizons(&self) -> [&HorizonForecast; 3] {
        [&self.next_period, &self.next_quarter, &self.next_year]
    }
}
