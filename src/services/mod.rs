// ==========================================
// 平台运营分析引擎 - 服务层
// ==========================================
// 职责: 编排取数、引擎计算与持久化
// 红线: 服务层不拼 SQL；所有协作方调用都有超时
// ==========================================

pub mod analytics_pipeline;
pub mod error;
pub mod insight_service;
pub mod report_assembler;
pub mod snapshot_scheduler;
pub mod timeout;

pub use analytics_pipeline::{series_metrics, AnalyticsPipeline, DomainAnalysis};
pub use error::{AnalyticsError, AnalyticsResult};
pub use insight_service::InsightService;
pub use report_assembler::{analysis_type_for, granularity_for_period, ReportAssembler};
pub use snapshot_scheduler::{SchedulerReport, SnapshotScheduler};
pub use timeout::with_timeout;
