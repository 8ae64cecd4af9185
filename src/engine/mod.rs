// ==========================================
// 平台运营分析引擎 - 引擎层
// ==========================================
// 职责: 分桶、分解、指标、趋势、预测、对标、洞察、健康评估
// 红线: Engine 不拼 SQL、不取数、不读系统时钟（now 由调用方传入）
// ==========================================

pub mod aggregation;
pub mod benchmark;
pub mod forecast;
pub mod grouping;
pub mod health;
pub mod insight;
pub mod metrics;
pub mod prediction;
pub mod trend;

// 重导出核心引擎
pub use aggregation::{growth_pct, percentage, DimensionalAggregator, MeasureFn};
pub use benchmark::BenchmarkEngine;
pub use forecast::ForecastEngine;
pub use grouping::TimeGrouper;
pub use health::HealthEngine;
pub use insight::{InsightEngine, InsightInputs};
pub use metrics::{metric_names, MetricsCalculator};
pub use prediction::{
    default_risk_rules, CommunicationGapRule, FundingRiskRule, PredictionEngine, RiskRule,
    TimelineDelayRule,
};
pub use trend::TrendEstimator;
