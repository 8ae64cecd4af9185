// ==========================================
// 平台运营分析引擎 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，将服务层/仓储层错误转换为调用方可处理的分类
// 分类: 未认证 / 无权限（不重试） / 不存在 / 取数失败（可恢复） / 计算输入非法
// ==========================================

use crate::config::ConfigError;
use crate::importer::ImportError;
use crate::repository::error::RepositoryError;
use crate::services::error::AnalyticsError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 访问控制错误
    // ==========================================
    #[error("未认证: 令牌无效或已过期")]
    Unauthenticated,

    #[error("无权限: {0}")]
    NotAuthorized(String),

    // ==========================================
    // 业务错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    /// 取数失败（含超时），可在稍后重试
    #[error("取数失败: {0}")]
    DataFetchError(String),

    /// 输入非法，在任何取数之前拒绝
    #[error("计算输入非法: {0}")]
    ComputationError(String),

    // ==========================================
    // 基础设施错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("持久化失败: {0}")]
    PersistenceError(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("文件导入失败: {0}")]
    ImportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 是否值得调用方重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::DataFetchError(_) | ApiError::DatabaseConnectionError(_)
        )
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::Timeout { .. } | RepositoryError::TaskJoinError(_) => {
                ApiError::DataFetchError(err.to_string())
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg)
            | RepositoryError::DatabaseTransactionError(msg)
            | RepositoryError::UniqueConstraintViolation(msg) => ApiError::DatabaseError(msg),
            RepositoryError::FieldValueError { field, message } => {
                ApiError::DatabaseError(format!("字段值错误 (field={}): {}", field, message))
            }
            RepositoryError::SerializationError(msg) => ApiError::PersistenceError(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(e) => ApiError::Other(e),
        }
    }
}

// ==========================================
// 从 AnalyticsError 转换
// ==========================================
impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        match err {
            AnalyticsError::DataFetch { domain, source } => {
                ApiError::DataFetchError(format!("数据域 {}: {}", domain, source))
            }
            AnalyticsError::Computation(msg) => ApiError::ComputationError(msg),
            AnalyticsError::Persistence(e) => match ApiError::from(e) {
                ApiError::DatabaseError(msg) => ApiError::PersistenceError(msg),
                other => other,
            },
            AnalyticsError::Config(e) => ApiError::from(e),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        ApiError::ImportError(err.to_string())
    }
}

/// API结果类型别名
pub type ApiResult<T> = Result<T, ApiError>;
