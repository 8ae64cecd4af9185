// ==========================================
// 平台运营分析引擎 - 记录仓储 SQLite 实现
// ==========================================
// 职责: 实现 RecordStore（分页读取）+ 记录批量写入（供导入器使用）
// 红线: Repository 不含业务规则，只做数据读写
// 约束: 所有查询使用参数化；读取按 fetch_chunk_size 分页
// ==========================================

use crate::db::{format_ts, open_sqlite_connection};
use crate::domain::record::{Alert, ProgressUpdate, Project, Transaction, User};
use crate::domain::time_frame::{DataFilters, Filterable, TimeFrame};
use crate::domain::types::{AlertStatus, Severity};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::RecordStore;
use crate::repository::row_utils::{enum_col, json_col, opt_ts_col, ts_col};
use async_trait::async_trait;
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

/// 默认分页大小
pub const DEFAULT_FETCH_CHUNK_SIZE: usize = 500;

const PROJECT_COLUMNS: &str = "project_id, name, owner_id, project_type, region, status, \
     progress_pct, funding_goal, funding_raised, credits_issued, estimated_completion, \
     milestones_json, created_at, last_update_at";

const USER_COLUMNS: &str = "user_id, role, status, region, created_at, last_active_at, \
     purchase_count, projects_created";

const TRANSACTION_COLUMNS: &str = "txn_id, user_id, project_id, kind, status, payment_method, \
     amount, credits, created_at";

const UPDATE_COLUMNS: &str =
    "update_id, project_id, update_type, status, progress_pct, carbon_impact, created_at";

// ==========================================
// SqliteRecordStore
// ==========================================
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
    chunk_size: usize,
}

impl SqliteRecordStore {
    /// 创建新的 SqliteRecordStore 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            chunk_size: DEFAULT_FETCH_CHUNK_SIZE,
        }
    }

    /// 指定分页大小（0 视为 1）
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 在阻塞线程池中执行数据库操作
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

    /// 按时间窗分页读取一张记录表，并逐页应用 DataFilters
    async fn fetch_window<T, M>(
        &self,
        table: &'static str,
        columns: &'static str,
        frame: &TimeFrame,
        filters: &DataFilters,
        map_row: M,
    ) -> RepositoryResult<Vec<T>>
    where
        T: Filterable + Send + 'static,
        M: Fn(&Row) -> rusqlite::Result<T> + Send + 'static,
    {
        let start = format_ts(frame.start);
        let end = format_ts(frame.end);
        let filters = filters.clone();
        let chunk_size = self.chunk_size;

        let records = self
            .run_blocking(move |conn| {
                let sql = format!(
                    "SELECT {} FROM {} WHERE created_at >= ?1 AND created_at < ?2 \
                     ORDER BY created_at, rowid LIMIT ?3 OFFSET ?4",
                    columns, table
                );
                let mut stmt = conn.prepare(&sql)?;
                let mut out = Vec::new();
                let mut offset = 0usize;
                loop {
                    let page = stmt
                        .query_map(
                            params![start, end, chunk_size as i64, offset as i64],
                            |row| map_row(row),
                        )?
                        .collect::<rusqlite::Result<Vec<T>>>()?;
                    let page_len = page.len();
                    out.extend(page.into_iter().filter(|r| filters.matches(r)));
                    if page_len < chunk_size {
                        break;
                    }
                    offset += chunk_size;
                }
                Ok(out)
            })
            .await?;

        tracing::debug!(table, count = records.len(), "记录读取完成");
        Ok(records)
    }

    // ==========================================
    // 批量写入（INSERT OR REPLACE，事务化）
    // ==========================================

    pub fn insert_projects(&self, projects: &[Project]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO project ({}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                PROJECT_COLUMNS
            ))?;
            for p in projects {
                stmt.execute(params![
                    p.id,
                    p.name,
                    p.owner_id,
                    p.project_type,
                    p.region,
                    p.status.as_str(),
                    p.progress_pct,
                    p.funding_goal,
                    p.funding_raised,
                    p.credits_issued,
                    p.estimated_completion.map(format_ts),
                    serde_json::to_string(&p.milestones)?,
                    format_ts(p.created_at),
                    p.last_update_at.map(format_ts),
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn insert_users(&self, users: &[User]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO app_user ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                USER_COLUMNS
            ))?;
            for u in users {
                stmt.execute(params![
                    u.id,
                    u.role.as_str(),
                    u.status.as_str(),
                    u.region,
                    format_ts(u.created_at),
                    u.last_active_at.map(format_ts),
                    u.purchase_count,
                    u.projects_created,
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn insert_transactions(&self, transactions: &[Transaction]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO transaction_record ({}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                TRANSACTION_COLUMNS
            ))?;
            for t in transactions {
                stmt.execute(params![
                    t.id,
                    t.user_id,
                    t.project_id,
                    t.kind.as_str(),
                    t.status.as_str(),
                    t.payment_method,
                    t.amount,
                    t.credits,
                    format_ts(t.created_at),
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn insert_progress_updates(&self, updates: &[ProgressUpdate]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO progress_update ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                UPDATE_COLUMNS
            ))?;
            for u in updates {
                stmt.execute(params![
                    u.id,
                    u.project_id,
                    u.update_type,
                    u.status.as_str(),
                    u.progress_pct,
                    u.carbon_impact,
                    format_ts(u.created_at),
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    pub fn insert_alerts(&self, alerts: &[Alert]) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO system_alert \
                 (alert_id, component, severity, status, message, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for a in alerts {
                stmt.execute(params![
                    a.id,
                    a.component,
                    a.severity.as_str(),
                    a.status.as_str(),
                    a.message,
                    format_ts(a.created_at),
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }
}

// ==========================================
// 行映射
// ==========================================

fn map_project(row: &Row) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        project_type: row.get(3)?,
        region: row.get(4)?,
        status: enum_col(row, 5)?,
        progress_pct: row.get(6)?,
        funding_goal: row.get(7)?,
        funding_raised: row.get(8)?,
        credits_issued: row.get(9)?,
        estimated_completion: opt_ts_col(row, 10)?,
        milestones: json_col(row, 11)?,
        created_at: ts_col(row, 12)?,
        last_update_at: opt_ts_col(row, 13)?,
    })
}

fn map_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        role: enum_col(row, 1)?,
        status: enum_col(row, 2)?,
        region: row.get(3)?,
        created_at: ts_col(row, 4)?,
        last_active_at: opt_ts_col(row, 5)?,
        purchase_count: row.get(6)?,
        projects_created: row.get(7)?,
    })
}

fn map_transaction(row: &Row) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        project_id: row.get(2)?,
        kind: enum_col(row, 3)?,
        status: enum_col(row, 4)?,
        payment_method: row.get(5)?,
        amount: row.get(6)?,
        credits: row.get(7)?,
        created_at: ts_col(row, 8)?,
    })
}

fn map_update(row: &Row) -> rusqlite::Result<ProgressUpdate> {
    Ok(ProgressUpdate {
        id: row.get(0)?,
        project_id: row.get(1)?,
        update_type: row.get(2)?,
        status: enum_col(row, 3)?,
        progress_pct: row.get(4)?,
        carbon_impact: row.get(5)?,
        created_at: ts_col(row, 6)?,
    })
}

fn map_alert(row: &Row) -> rusqlite::Result<Alert> {
    Ok(Alert {
        id: row.get(0)?,
        component: row.get(1)?,
        severity: enum_col(row, 2)?,
        status: enum_col(row, 3)?,
        message: row.get(4)?,
        created_at: ts_col(row, 5)?,
    })
}

// ==========================================
// RecordStore Trait 实现
// ==========================================
#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn fetch_projects(
        &self,
        frame: &TimeFrame,
        filters: &DataFilters,
    ) -> RepositoryResult<Vec<Project>> {
        self.fetch_window("project", PROJECT_COLUMNS, frame, filters, map_project)
            .await
    }

    async fn fetch_users(
        &self,
        frame: &TimeFrame,
        filters: &DataFilters,
    ) -> RepositoryResult<Vec<User>> {
        self.fetch_window("app_user", USER_COLUMNS, frame, filters, map_user)
            .await
    }

    async fn fetch_transactions(
        &self,
        frame: &TimeFrame,
        filters: &DataFilters,
    ) -> RepositoryResult<Vec<Transaction>> {
        self.fetch_window(
            "transaction_record",
            TRANSACTION_COLUMNS,
            frame,
            filters,
            map_transaction,
        )
        .await
    }

    async fn fetch_progress_updates(
        &self,
        frame: &TimeFrame,
        filters: &DataFilters,
    ) -> RepositoryResult<Vec<ProgressUpdate>> {
        self.fetch_window("progress_update", UPDATE_COLUMNS, frame, filters, map_update)
            .await
    }

    async fn fetch_alerts(
        &self,
        status: Option<AlertStatus>,
        severity: Option<Severity>,
    ) -> RepositoryResult<Vec<Alert>> {
        let status = status.map(|s| s.as_str().to_string());
        let severity = severity.map(|s| s.as_str().to_string());

        self.run_blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT alert_id, component, severity, status, message, created_at \
                 FROM system_alert \
                 WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR severity = ?2) \
                 ORDER BY created_at DESC, alert_id",
            )?;
            let alerts = stmt
                .query_map(params![status, severity], map_alert)?
                .collect::<rusqlite::Result<Vec<Alert>>>()?;
            Ok(alerts)
        })
        .await
    }
}
