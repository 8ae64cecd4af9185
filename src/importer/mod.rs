// ==========================================
// 平台运营分析引擎 - 导入层
// ==========================================
// 职责: 外部 CSV 记录导入（初始化数据、演示、测试）
// ==========================================

pub mod error;
pub mod record_importer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use record_importer::{ImportSummary, RecordFile, RecordImporter};
