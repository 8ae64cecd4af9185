// ==========================================
// 平台运营分析引擎 - SQLite 连接初始化与建库
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少调度器与请求并发写入时的偶发 busy 错误
// - 统一建库脚本（记录表 / 配置表 / 会话表 / 文档表）
// ==========================================

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 创建全部表结构（幂等）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    match read_schema_version(conn)? {
        Some(v) if v > CURRENT_SCHEMA_VERSION => {
            tracing::warn!(
                db_version = v,
                expected = CURRENT_SCHEMA_VERSION,
                "数据库 schema_version 高于当前程序版本"
            );
        }
        _ => {}
    }
    Ok(())
}

// ==========================================
// 时间戳存储格式
// ==========================================
// 统一为定宽 RFC3339（毫秒 + Z），保证 TEXT 列按字典序即按时间序

/// 时间戳 -> 存储文本
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 存储文本 -> 时间戳
pub fn parse_ts(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_scope (
    scope_id TEXT PRIMARY KEY,
    scope_type TEXT NOT NULL,
    scope_key TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(scope_type, scope_key)
);

INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
VALUES ('global', 'GLOBAL', 'global');

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS project (
    project_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    owner_id TEXT NOT NULL,
    project_type TEXT NOT NULL,
    region TEXT NOT NULL,
    status TEXT NOT NULL,
    progress_pct REAL NOT NULL DEFAULT 0,
    funding_goal REAL NOT NULL DEFAULT 0,
    funding_raised REAL NOT NULL DEFAULT 0,
    credits_issued REAL NOT NULL DEFAULT 0,
    estimated_completion TEXT,
    milestones_json TEXT NOT NULL DEFAULT '[]',
    created_at TEXT NOT NULL,
    last_update_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_project_created_at ON project(created_at);

CREATE TABLE IF NOT EXISTS app_user (
    user_id TEXT PRIMARY KEY,
    role TEXT NOT NULL,
    status TEXT NOT NULL,
    region TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_active_at TEXT,
    purchase_count INTEGER NOT NULL DEFAULT 0,
    projects_created INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_app_user_created_at ON app_user(created_at);

CREATE TABLE IF NOT EXISTS transaction_record (
    txn_id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    project_id TEXT,
    kind TEXT NOT NULL,
    status TEXT NOT NULL,
    payment_method TEXT NOT NULL DEFAULT '',
    amount REAL NOT NULL DEFAULT 0,
    credits REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_transaction_created_at ON transaction_record(created_at);

CREATE TABLE IF NOT EXISTS progress_update (
    update_id TEXT PRIMARY KEY,
    project_id TEXT NOT NULL,
    update_type TEXT NOT NULL,
    status TEXT NOT NULL,
    progress_pct REAL NOT NULL DEFAULT 0,
    carbon_impact REAL NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_progress_update_created_at ON progress_update(created_at);
CREATE INDEX IF NOT EXISTS idx_progress_update_project ON progress_update(project_id);

CREATE TABLE IF NOT EXISTS system_alert (
    alert_id TEXT PRIMARY KEY,
    component TEXT NOT NULL,
    severity TEXT NOT NULL,
    status TEXT NOT NULL,
    message TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_session (
    token TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS analytics_document (
    doc_id TEXT PRIMARY KEY,
    collection TEXT NOT NULL,
    natural_key TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL,
    expires_at TEXT,
    UNIQUE(collection, natural_key)
);
CREATE INDEX IF NOT EXISTS idx_analytics_document_expires ON analytics_document(collection, expires_at);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_timestamp_text_sorts_chronologically() {
        let a = Utc.with_ymd_and_hms(2024, 1, 9, 23, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2024, 1, 10, 1, 0, 0).unwrap();
        assert!(format_ts(a) < format_ts(b));
        assert_eq!(parse_ts(&format_ts(a)).unwrap(), a);
    }
}
