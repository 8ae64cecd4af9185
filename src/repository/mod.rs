// ==========================================
// 平台运营分析引擎 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod access_repo;
pub mod document_repo;
pub mod error;
pub mod insight_repo;
pub mod record_store;
pub mod report_repo;
pub mod row_utils;
pub mod snapshot_repo;
pub mod sqlite_record_store;

// 重导出核心仓储
pub use access_repo::{Identity, IdentityProvider, RoleLookup, SqliteAccessRepository};
pub use document_repo::{
    collections, DocumentQuery, DocumentStore, InsertOutcome, NewDocument, SqliteDocumentStore,
    StoredDocument,
};
pub use error::{RepositoryError, RepositoryResult};
pub use insight_repo::InsightRepository;
pub use record_store::RecordStore;
pub use report_repo::ReportRepository;
pub use snapshot_repo::SnapshotRepository;
pub use sqlite_record_store::{SqliteRecordStore, DEFAULT_FETCH_CHUNK_SIZE};
