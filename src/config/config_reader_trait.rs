// ==========================================
// 平台运营分析引擎 - 分析配置读取 Trait
// ==========================================
// 职责: 定义服务层所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::analytics_config::AnalyticsConfig;
use crate::config::error::ConfigResult;
use async_trait::async_trait;

// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait AnalyticsConfigReader: Send + Sync {
    /// 获取分析参数配置
    ///
    /// 存储的配置缺失或无效时返回默认配置；仅存储层故障返回错误
    async fn get_analytics_config(&self) -> ConfigResult<AnalyticsConfig>;
}
