// ==========================================
// 平台运营分析引擎 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 数据映射错误 =====
    #[error("行解析失败 ({file} 行 {row}): {message}")]
    RowParseError {
        file: String,
        row: usize,
        message: String,
    },

    // ===== 数据质量错误 =====
    #[error("主键缺失 ({file} 行 {row}): id 为空")]
    PrimaryKeyMissing { file: String, row: usize },

    #[error("数值范围错误 ({file} 行 {row}, 字段 {field}): 值 {value} 超出范围 [{min}, {max}]")]
    ValueRangeError {
        file: String,
        row: usize,
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("里程碑引用了不存在的项目 ({file} 行 {row}): {project_id}")]
    UnknownProject {
        file: String,
        row: usize,
        project_id: String,
    },

    // ===== 写入错误 =====
    #[error("记录写入失败: {0}")]
    Repository(#[from] RepositoryError),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
