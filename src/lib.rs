// ==========================================
// 平台运营分析引擎 - 核心库
// ==========================================
// 技术栈: Rust + SQLite + tokio
// 系统定位: 运营记录 → 分桶聚合 / 指标 / 趋势预测 / 实体预测 → 报告与快照
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 记录、聚合结果、预测、报告
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 纯计算
pub mod engine;

// 服务层 - 流水线、快照调度、报告组装
pub mod services;

// 导入层 - CSV 记录导入
pub mod importer;

// 配置层 - 分析参数
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 分析/监控接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AnalysisType, Granularity, HealthStatus, RecordDomain, ReportStatus, ReportType, Severity,
    TrendDirection,
};

// 领域实体
pub use domain::{
    AggregatedResult, AnalyticsSnapshot, DataFilters, Forecast, Insight, Prediction, Report,
    ReportOptions, ReportPeriod, SystemHealth, TimeFrame,
};

// 引擎
pub use engine::{
    BenchmarkEngine, DimensionalAggregator, ForecastEngine, InsightEngine, MetricsCalculator,
    PredictionEngine, TimeGrouper, TrendEstimator,
};

// 服务
pub use services::{AnalyticsPipeline, ReportAssembler, SnapshotScheduler};

// API
pub use api::{AnalyticsApi, ApiError, ApiResult, MonitoringApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "平台运营分析引擎";
