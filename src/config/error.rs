// ==========================================
// 平台运营分析引擎 - 配置层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置值非法 (field={field}): {message}")]
    InvalidValue { field: String, message: String },

    #[error("配置解析失败 (key={key}): {message}")]
    ParseError { key: String, message: String },

    #[error("配置存储失败: {0}")]
    StorageError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConfigError {
    pub fn invalid(field: &str, message: &str) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl From<rusqlite::Error> for ConfigError {
    fn from(err: rusqlite::Error) -> Self {
        ConfigError::StorageError(err.to_string())
    }
}

/// Result 类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
