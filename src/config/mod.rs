// ==========================================
// 平台运营分析引擎 - 配置层
// ==========================================
// 职责: 分析参数配置管理,支持默认值 + 持久化覆写
// 存储: config_kv 表
// ==========================================

pub mod analytics_config;
pub mod config_manager;
pub mod config_reader_trait;
pub mod error;

// 重导出核心配置类型
pub use analytics_config::{
    AnalyticsConfig, BenchmarkConfig, BenchmarkReference, BenchmarkTable, ForecastConfig,
    GroupingConfig, HorizonConfidence, InsightConfig, PredictionConfig, QualityWeights,
    ScenarioTemplate, SnapshotConfig, StoreConfig, TrendConfig,
};
pub use config_manager::{config_keys, ConfigManager};
pub use config_reader_trait::AnalyticsConfigReader;
pub use error::{ConfigError, ConfigResult};
