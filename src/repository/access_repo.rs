// ==========================================
// 平台运营分析引擎 - 身份识别与角色查询
// ==========================================
// 职责: 会话令牌 -> 用户身份；用户 -> 角色（唯一角色查询入口）
// 存储: user_session / app_user 表
// ==========================================

use crate::db::{format_ts, open_sqlite_connection};
use crate::domain::types::Role;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_utils::enum_col;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

/// 已认证身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

// ==========================================
// 协作方接口
// ==========================================

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// 识别令牌；None 表示未认证（令牌不存在或已过期）
    async fn identify(&self, token: &str) -> RepositoryResult<Option<Identity>>;
}

#[async_trait]
pub trait RoleLookup: Send + Sync {
    /// 查询用户角色；None 表示用户不存在
    async fn role_of(&self, user_id: &str) -> RepositoryResult<Option<Role>>;
}

// ==========================================
// SqliteAccessRepository
// ==========================================
pub struct SqliteAccessRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteAccessRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 创建会话（覆盖同令牌旧会话）
    pub fn create_session(
        &self,
        token: &str,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO user_session (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
            params![token, user_id, format_ts(expires_at)],
        )?;
        Ok(())
    }

    fn identify_at(&self, token: &str, now: DateTime<Utc>) -> RepositoryResult<Option<Identity>> {
        let conn = self.get_conn()?;
        let user_id = conn
            .query_row(
                "SELECT user_id FROM user_session WHERE token = ?1 AND expires_at > ?2",
                params![token, format_ts(now)],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(user_id.map(|user_id| Identity { user_id }))
    }
}

#[async_trait]
impl IdentityProvider for SqliteAccessRepository {
    async fn identify(&self, token: &str) -> RepositoryResult<Option<Identity>> {
        if token.trim().is_empty() {
            return Ok(None);
        }
        self.identify_at(token, Utc::now())
    }
}

#[async_trait]
impl RoleLookup for SqliteAccessRepository {
    async fn role_of(&self, user_id: &str) -> RepositoryResult<Option<Role>> {
        let conn = self.get_conn()?;
        let role = conn
            .query_row(
                "SELECT role FROM app_user WHERE user_id = ?1",
                params![user_id],
                |row| enum_col::<Role>(row, 0),
            )
            .optional()?;
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create_test_repo() -> SqliteAccessRepository {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO app_user (user_id, role, status, region, created_at) \
             VALUES ('U1', 'verifier', 'active', 'eu', '2024-01-01T00:00:00.000Z')",
            [],
        )
        .unwrap();
        SqliteAccessRepository::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_identify_rejects_expired_sessions() {
        let repo = create_test_repo();
        let now = Utc::now();
        repo.create_session("live", "U1", now + Duration::hours(1)).unwrap();
        repo.create_session("stale", "U1", now - Duration::hours(1)).unwrap();

        assert_eq!(
            repo.identify("live").await.unwrap(),
            Some(Identity { user_id: "U1".to_string() })
        );
        assert_eq!(repo.identify("stale").await.unwrap(), None);
        assert_eq!(repo.identify("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_role_of() {
        let repo = create_test_repo();
        assert_eq!(repo.role_of("U1").await.unwrap(), Some(Role::Verifier));
        assert_eq!(repo.role_of("missing").await.unwrap(), None);
    }
}
