// ==========================================
// 平台运营分析引擎 - 服务层错误类型
// ==========================================
// 职责: 流水线/调度器/报告组装的统一错误
// 分类: 取数失败（可恢复） / 计算输入非法 / 持久化失败 / 配置失败
// ==========================================

use crate::config::ConfigError;
use crate::domain::types::RecordDomain;
use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// 数据域取数失败（含超时），调度任务记录后顺延到下一周期
    #[error("数据域 {domain} 取数失败: {source}")]
    DataFetch {
        domain: RecordDomain,
        #[source]
        source: RepositoryError,
    },

    /// 输入非法（时间窗颠倒、未知指标等），在取数前拒绝
    #[error("计算输入非法: {0}")]
    Computation(String),

    #[error("持久化失败: {0}")]
    Persistence(#[source] RepositoryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AnalyticsError {
    pub fn fetch(domain: RecordDomain, source: RepositoryError) -> Self {
        AnalyticsError::DataFetch { domain, source }
    }

    /// 是否可在下一周期重试
    pub fn is_recoverable(&self) -> bool {
        match self {
            AnalyticsError::DataFetch { .. } => true,
            AnalyticsError::Persistence(e) => e.is_recoverable(),
            _ => false,
        }
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_errors_are_recoverable() {
        let err = AnalyticsError::fetch(
            RecordDomain::Users,
            RepositoryError::Timeout {
                operation: "fetch_users".to_string(),
                timeout_ms: 10,
            },
        );
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("users"));
        assert!(!AnalyticsError::Computation("start > end".to_string()).is_recoverable());
    }
}
