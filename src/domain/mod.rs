// ==========================================
// 平台运营分析引擎 - 领域模型层
// ==========================================
// 职责: 定义记录、聚合结果、预测、报告等领域实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod aggregate;
pub mod benchmark;
pub mod forecast;
pub mod insight;
pub mod monitoring;
pub mod prediction;
pub mod record;
pub mod report;
pub mod snapshot;
pub mod time_frame;
pub mod types;

// 重导出核心类型
pub use aggregate::{AggregatedResult, BreakdownEntry, TimeSeriesPoint};
pub use benchmark::BenchmarkComparison;
pub use forecast::{Forecast, ForecastHorizon, HorizonForecast, Scenario, TrendAnalysis};
pub use insight::{Insight, Recommendation};
pub use monitoring::{ComponentHealth, LiveCounters, SystemHealth};
pub use prediction::{Prediction, PredictionKind, RiskFactor, RiskType};
pub use record::{
    Alert, DomainRecords, Milestone, ProgressUpdate, Project, Timestamped, Transaction, User,
};
pub use report::{
    Report, ReportOptions, ReportPeriod, ReportReceipt, ReportSection, ReportSummary,
    REPORT_SCHEMA_VERSION,
};
pub use snapshot::{snapshot_key, AnalyticsSnapshot};
pub use time_frame::{DataFilters, Filterable, TimeFrame};
pub use types::{
    AlertStatus, AnalysisType, BenchmarkStatus, Granularity, HealthStatus, InsightCategory,
    MilestoneStatus, ProjectStatus, RecordDomain, ReportStatus, ReportType, Role, Severity,
    TransactionKind, TransactionStatus, TrendDirection, UpdateStatus, UserStatus,
};
