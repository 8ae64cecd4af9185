// ==========================================
// 平台运营分析引擎 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// 红线: 全部协作方共享同一个 SQLite 连接，连接在此处统一配置与建表
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{AccessGuard, AnalyticsApi, MonitoringApi};
use crate::config::{AnalyticsConfig, AnalyticsConfigReader, ConfigManager};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::importer::RecordImporter;
use crate::repository::{
    InsightRepository, ReportRepository, SnapshotRepository, SqliteAccessRepository,
    SqliteDocumentStore, SqliteRecordStore,
};
use crate::services::{AnalyticsPipeline, InsightService, ReportAssembler, SnapshotScheduler};

/// 报告文本默认语言
pub const DEFAULT_LOCALE: &str = "en";

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 报告文本语言
    pub locale: String,

    /// 启动时加载的分析配置
    pub config: AnalyticsConfig,

    /// 分析API
    pub analytics_api: Arc<AnalyticsApi>,

    /// 运行监控API
    pub monitoring_api: Arc<MonitoringApi>,

    /// 快照调度器（供调度循环直接使用）
    pub scheduler: Arc<SnapshotScheduler>,

    /// CSV 记录导入器
    pub importer: Arc<RecordImporter>,

    /// 记录存储
    pub record_store: Arc<SqliteRecordStore>,

    /// 身份与会话
    pub access_repo: Arc<SqliteAccessRepository>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径（":memory:" 表示内存库）
    pub async fn new(db_path: String) -> Result<Self, String> {
        Self::with_locale(db_path, DEFAULT_LOCALE).await
    }

    /// 指定报告语言创建
    pub async fn with_locale(db_path: String, locale: &str) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, locale = locale, "初始化AppState");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("无法初始化数据库结构: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ===== 配置 =====
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config = config_manager
            .get_analytics_config()
            .await
            .map_err(|e| format!("无法加载分析配置: {}", e))?;

        // ===== 仓储 =====
        let record_store = Arc::new(
            SqliteRecordStore::from_connection(conn.clone())
                .with_chunk_size(config.store.fetch_chunk_size),
        );
        let documents = Arc::new(SqliteDocumentStore::from_connection(conn.clone()));
        let access_repo = Arc::new(SqliteAccessRepository::from_connection(conn));
        let snapshots = Arc::new(SnapshotRepository::new(documents.clone()));
        let reports = Arc::new(ReportRepository::new(documents.clone()));
        let insights = Arc::new(InsightRepository::new(documents));

        // ===== 服务 =====
        let pipeline = Arc::new(AnalyticsPipeline::new(
            record_store.clone(),
            config.clone(),
            locale,
        ));
        let scheduler = Arc::new(SnapshotScheduler::new(pipeline.clone(), snapshots));
        let assembler = Arc::new(ReportAssembler::new(pipeline.clone(), reports, locale));
        let insight_service = Arc::new(InsightService::new(pipeline.clone(), insights));

        // ===== API =====
        let access = Arc::new(AccessGuard::new(access_repo.clone(), access_repo.clone()));
        let analytics_api = Arc::new(AnalyticsApi::new(
            access,
            pipeline,
            assembler,
            insight_service,
            scheduler.clone(),
        ));
        let monitoring_api = Arc::new(MonitoringApi::new(
            record_store.clone(),
            locale,
            config.store.fetch_timeout_ms,
        ));
        let importer = Arc::new(RecordImporter::new(record_store.clone(), locale));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            locale: locale.to_string(),
            config,
            analytics_api,
            monitoring_api,
            scheduler,
            importer,
            record_store,
            access_repo,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先使用环境变量 IMPACT_ANALYTICS_DB_PATH，其次使用用户数据目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("IMPACT_ANALYTICS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./impact_analytics.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("impact-analytics-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("impact-analytics");
        }

        std::fs::create_dir_all(&path).ok();
        path = path.join("impact_analytics.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_app_state_initializes_schema_and_config() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();

        let state = AppState::new(db_path.clone()).await.unwrap();
        assert_eq!(state.db_path, db_path);
        assert_eq!(state.config, AnalyticsConfig::default());

        let health = state.monitoring_api.get_system_health().await.unwrap();
        assert!(!health.components.is_empty());
    }

    #[tokio::test]
    async fn test_stored_config_override_is_loaded() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("state.db").to_string_lossy().to_string();

        let mut custom = AnalyticsConfig::default();
        custom.snapshot.retention_days = 30;
        {
            let state = AppState::new(db_path.clone()).await.unwrap();
            state.config_manager.save_analytics_config(&custom).unwrap();
        }

        let state = AppState::new(db_path).await.unwrap();
        assert_eq!(state.config.snapshot.retention_days, 30);
    }
}
