// ==========================================
// 平台运营分析引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::analytics_config::AnalyticsConfig;
use crate::config::config_reader_trait::AnalyticsConfigReader;
use crate::config::error::{ConfigError, ConfigResult};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ConfigError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> ConfigResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    // ===== 分析参数配置 =====

    /// 读取分析参数配置（严格模式）
    ///
    /// 配置不存在时返回默认值；格式错误或校验失败时返回错误
    pub fn load_analytics_config(&self) -> ConfigResult<AnalyticsConfig> {
        let raw = match self.get_global_config_value(config_keys::ANALYTICS_CONFIG)? {
            Some(v) => v,
            None => return Ok(AnalyticsConfig::default()),
        };

        let config: AnalyticsConfig =
            serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError {
                key: config_keys::ANALYTICS_CONFIG.to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// 校验后保存分析参数配置
    pub fn save_analytics_config(&self, config: &AnalyticsConfig) -> ConfigResult<()> {
        config.validate()?;
        let raw = serde_json::to_string(config).map_err(|e| ConfigError::ParseError {
            key: config_keys::ANALYTICS_CONFIG.to_string(),
            message: e.to_string(),
        })?;
        self.set_global_config_value(config_keys::ANALYTICS_CONFIG, &raw)?;

        tracing::info!(key = config_keys::ANALYTICS_CONFIG, "分析参数配置已保存");
        Ok(())
    }
}

// ==========================================
// AnalyticsConfigReader Trait 实现
// ==========================================
#[async_trait]
impl AnalyticsConfigReader for ConfigManager {
    async fn get_analytics_config(&self) -> ConfigResult<AnalyticsConfig> {
        match self.load_analytics_config() {
            Ok(config) => Ok(config),
            Err(ConfigError::LockError(msg)) => Err(ConfigError::LockError(msg)),
            Err(ConfigError::StorageError(msg)) => Err(ConfigError::StorageError(msg)),
            Err(e) => {
                tracing::warn!(
                    config_key = config_keys::ANALYTICS_CONFIG,
                    error = %e,
                    "分析参数配置无效，使用默认配置"
                );
                Ok(AnalyticsConfig::default())
            }
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 分析参数（整份 JSON）
    pub const ANALYTICS_CONFIG: &str = "analytics/config";

    // 报告语言（en / zh-CN）
    pub const REPORT_LOCALE: &str = "analytics/report_locale";
}
