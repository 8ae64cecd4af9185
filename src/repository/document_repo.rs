// ==========================================
// 平台运营分析引擎 - 分析文档持久化
// ==========================================
// 职责: 快照/报告/洞察三类只追加文档的存储接口与 SQLite 实现
// 红线: 文档只插入不更新；(collection, natural_key) 唯一
// 红线: 单次写入是一条原子语句（INSERT ... ON CONFLICT DO NOTHING）
// ==========================================

use crate::db::{format_ts, open_sqlite_connection};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::{json_col, opt_ts_col, ts_col};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// 集合名常量
pub mod collections {
    pub const SNAPSHOTS: &str = "snapshots";
    pub const REPORTS: &str = "reports";
    pub const INSIGHTS: &str = "insights";
}

// ==========================================
// 文档结构
// ==========================================

/// 待写入文档
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub natural_key: String,
    pub body: Value,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 已存储文档
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub doc_id: String,
    pub collection: String,
    pub natural_key: String,
    pub body: Value,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// 插入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// 新插入，携带文档 ID
    Inserted(String),
    /// 唯一键已存在，未做任何修改
    AlreadyExists,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// 文档查询谓词
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// natural_key 前缀
    pub key_prefix: Option<String>,
    /// created_at >= created_from
    pub created_from: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl DocumentQuery {
    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.key_prefix = Some(prefix.to_string());
        self
    }
}

// ==========================================
// DocumentStore Trait
// ==========================================
// 实现者: SqliteDocumentStore
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 插入单个文档（已存在则不修改）
    async fn insert(&self, collection: &str, doc: NewDocument) -> RepositoryResult<InsertOutcome>;

    /// 在一个事务中插入多个文档，返回新插入数量
    async fn insert_many(&self, collection: &str, docs: Vec<NewDocument>) -> RepositoryResult<usize>;

    /// 按唯一键读取
    async fn get(&self, collection: &str, natural_key: &str)
        -> RepositoryResult<Option<StoredDocument>>;

    /// 按谓词查询（按 natural_key 排序）
    async fn query(&self, collection: &str, query: DocumentQuery)
        -> RepositoryResult<Vec<StoredDocument>>;

    /// 清理已过期文档，返回删除数量
    async fn purge_expired(&self, collection: &str, now: DateTime<Utc>) -> RepositoryResult<usize>;
}

// ==========================================
// SqliteDocumentStore
// ==========================================
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    async fn run_blocking<T, F>(&self, op: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> RepositoryResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            op(&guard)
        })
        .await?
    }
}

/// 单条原子插入；affected = 0 表示唯一键冲突
fn insert_one(
    conn: &Connection,
    collection: &str,
    doc: &NewDocument,
    now: DateTime<Utc>,
) -> RepositoryResult<InsertOutcome> {
    let doc_id = Uuid::new_v4().to_string();
    let body = serde_json::to_string(&doc.body)?;
    let affected = conn.execute(
        r#"
        INSERT INTO analytics_document (doc_id, collection, natural_key, body, created_at, expires_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(collection, natural_key) DO NOTHING
        "#,
        params![
            doc_id,
            collection,
            doc.natural_key,
            body,
            format_ts(now),
            doc.expires_at.map(format_ts),
        ],
    )?;

    if affected == 0 {
        Ok(InsertOutcome::AlreadyExists)
    } else {
        Ok(InsertOutcome::Inserted(doc_id))
    }
}

fn map_document(row: &Row) -> rusqlite::Result<StoredDocument> {
    Ok(StoredDocument {
        doc_id: row.get(0)?,
        collection: row.get(1)?,
        natural_key: row.get(2)?,
        body: json_col(row, 3)?,
        created_at: ts_col(row, 4)?,
        expires_at: opt_ts_col(row, 5)?,
    })
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn insert(&self, collection: &str, doc: NewDocument) -> RepositoryResult<InsertOutcome> {
        let collection = collection.to_string();
        self.run_blocking(move |conn| insert_one(conn, &collection, &doc, Utc::now()))
            .await
    }

    async fn insert_many(&self, collection: &str, docs: Vec<NewDocument>) -> RepositoryResult<usize> {
        let collection = collection.to_string();
        self.run_blocking(move |conn| {
            let tx = conn.unchecked_transaction()?;
            let now = Utc::now();
            let mut inserted = 0;
            for doc in &docs {
                if insert_one(&tx, &collection, doc, now)?.is_inserted() {
                    inserted += 1;
                }
            }
            tx.commit()?;
            Ok(inserted)
        })
        .await
    }

    async fn get(
        &self,
        collection: &str,
        natural_key: &str,
    ) -> RepositoryResult<Option<StoredDocument>> {
        let collection = collection.to_string();
        let natural_key = natural_key.to_string();
        self.run_blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT doc_id, collection, natural_key, body, created_at, expires_at \
                 FROM analytics_document WHERE collection = ?1 AND natural_key = ?2",
            )?;
            let mut rows = stmt.query_map(params![collection, natural_key], map_document)?;
            let first = rows.next().transpose()?;
            Ok(first)
        })
        .await
    }

    async fn query(
        &self,
        collection: &str,
        query: DocumentQuery,
    ) -> RepositoryResult<Vec<StoredDocument>> {
        let collection = collection.to_string();
        self.run_blocking(move |conn| {
            let prefix_pattern = query
                .key_prefix
                .as_ref()
                .map(|p| format!("{}%", p.replace('%', "\\%").replace('_', "\\_")));
            let created_from = query.created_from.map(format_ts);
            let limit = query.limit.map(|l| l as i64).unwrap_or(-1);

            let mut stmt = conn.prepare(
                "SELECT doc_id, collection, natural_key, body, created_at, expires_at \
                 FROM analytics_document \
                 WHERE collection = ?1 \
                   AND (?2 IS NULL OR natural_key LIKE ?2 ESCAPE '\\') \
                   AND (?3 IS NULL OR created_at >= ?3) \
                 ORDER BY natural_key LIMIT ?4",
            )?;
            let docs = stmt
                .query_map(params![collection, prefix_pattern, created_from, limit], map_document)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(docs)
        })
        .await
    }

    async fn purge_expired(&self, collection: &str, now: DateTime<Utc>) -> RepositoryResult<usize> {
        let collection = collection.to_string();
        self.run_blocking(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM analytics_document \
                 WHERE collection = ?1 AND expires_at IS NOT NULL AND expires_at <= ?2",
                params![collection, format_ts(now)],
            )?;
            Ok(deleted)
        })
        .await
    }
}
