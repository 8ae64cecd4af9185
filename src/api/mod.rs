// ==========================================
// 平台运营分析引擎 - API 层
// ==========================================
// 职责: 对外的异步分析/监控接口，统一访问控制与错误分类
// ==========================================

pub mod access;
pub mod analytics_api;
pub mod error;
pub mod monitoring_api;

// 重导出核心类型
pub use access::{AccessGuard, Caller, ANALYST_ROLES};
pub use analytics_api::{AnalyticsApi, PerformanceTrends};
pub use error::{ApiError, ApiResult};
pub use monitoring_api::MonitoringApi;
