// ==========================================
// 平台运营分析引擎 - 快照调度器
// ==========================================
// 职责: 每个周期为上一个完整周期的每个数据域写入一份不可变快照
// 流程: 计算上一周期 → 已存在则跳过 → 流水线 → 单次原子写入 → 清理过期快照
// ==========================================
// 红线: 快照先完整计算，再单次 INSERT ... ON CONFLICT DO NOTHING
// 红线: 取数失败只记录日志并顺延到下一周期，不在本周期内重试
// 红线: 重复执行同一周期是 no-op，永不产生重复行
// ==========================================

use crate::domain::snapshot::AnalyticsSnapshot;
use crate::domain::time_frame::{utc_offset, DataFilters, TimeFrame};
use crate::domain::types::RecordDomain;
use crate::engine::TimeGrouper;
use crate::repository::document_repo::InsertOutcome;
use crate::repository::SnapshotRepository;
use crate::services::analytics_pipeline::AnalyticsPipeline;
use crate::services::error::{AnalyticsError, AnalyticsResult};
use crate::services::timeout::with_timeout;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// 单次调度的执行结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerReport {
    pub snapshot_date: Option<NaiveDate>,
    pub written: Vec<RecordDomain>,
    /// 同键快照已存在
    pub skipped: Vec<RecordDomain>,
    /// 取数或写入失败，顺延到下一周期
    pub deferred: Vec<RecordDomain>,
    pub purged: usize,
}

// ==========================================
// SnapshotScheduler
// ==========================================
pub struct SnapshotScheduler {
    pipeline: Arc<AnalyticsPipeline>,
    snapshots: Arc<SnapshotRepository>,
    grouper: TimeGrouper,
}

impl SnapshotScheduler {
    pub fn new(pipeline: Arc<AnalyticsPipeline>, snapshots: Arc<SnapshotRepository>) -> Self {
        let grouper = TimeGrouper::new(pipeline.config().grouping.week_start);
        Self {
            pipeline,
            snapshots,
            grouper,
        }
    }

    /// 上一个完整周期（UTC 分桶）
    pub fn previous_period(&self, now: DateTime<Utc>) -> TimeFrame {
        let granularity = self.pipeline.config().snapshot.granularity;
        let offset = utc_offset();
        let current_start = self.grouper.bucket_start(now, granularity, offset);
        let previous_start =
            self.grouper
                .bucket_start(current_start - Duration::seconds(1), granularity, offset);
        TimeFrame {
            start: previous_start,
            end: current_start,
            granularity,
            tz_offset_minutes: None,
        }
    }

    /// 执行一次调度
    pub async fn process_scheduled(&self, now: DateTime<Utc>) -> AnalyticsResult<SchedulerReport> {
        let period = self.previous_period(now);
        let snapshot_date = period.start.date_naive();
        let mut report = SchedulerReport {
            snapshot_date: Some(snapshot_date),
            ..SchedulerReport::default()
        };

        tracing::info!(
            snapshot_date = %snapshot_date,
            granularity = %period.granularity,
            "开始快照调度"
        );

        for domain in RecordDomain::all() {
            match self.snapshot_domain(*domain, &period, now).await {
                Ok(true) => report.written.push(*domain),
                Ok(false) => report.skipped.push(*domain),
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(domain = %domain, error = %e, "数据域快照顺延到下一周期");
                    report.deferred.push(*domain);
                }
                Err(AnalyticsError::Persistence(e)) => {
                    tracing::error!(domain = %domain, error = %e, "快照写入失败");
                    report.deferred.push(*domain);
                }
                Err(e) => return Err(e),
            }
        }

        report.purged = self.purge_expired(now).await;

        tracing::info!(
            snapshot_date = %snapshot_date,
            written = report.written.len(),
            skipped = report.skipped.len(),
            deferred = report.deferred.len(),
            purged = report.purged,
            "快照调度完成"
        );
        Ok(report)
    }

    /// 周期性执行，直到收到关闭信号
    pub async fn run_loop(&self, interval: std::time::Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.process_scheduled(Utc::now()).await {
                        tracing::error!(error = %e, "快照调度失败");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("快照调度循环退出");
                        break;
                    }
                }
            }
        }
    }

    /// 单个数据域: 返回 true 表示新写入，false 表示已存在
    async fn snapshot_domain(
        &self,
        domain: RecordDomain,
        period: &TimeFrame,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<bool> {
        let config = self.pipeline.config();
        let snapshot_date = period.start.date_naive();

        let existing = with_timeout(
            "find_snapshot",
            config.store.fetch_timeout_ms,
            self.snapshots.find(period.start, period.granularity, domain),
        )
        .await
        .map_err(|e| AnalyticsError::fetch(domain, e))?;
        if existing.is_some() {
            tracing::debug!(domain = %domain, snapshot_date = %snapshot_date, "快照已存在，跳过");
            return Ok(false);
        }

        let analysis = self
            .pipeline
            .analyze_domain(domain, period, &DataFilters::default(), now)
            .await?;

        let snapshot = AnalyticsSnapshot {
            snapshot_id: uuid::Uuid::new_v4().to_string(),
            snapshot_date,
            domain,
            granularity: period.granularity,
            period_start: period.start,
            period_end: period.end,
            record_count: analysis.records.len(),
            aggregated: analysis.aggregated,
            created_at: now,
            expires_at: now + Duration::days(config.snapshot.retention_days),
        };

        let outcome = with_timeout(
            "insert_snapshot",
            config.store.persist_timeout_ms,
            self.snapshots.insert_once(&snapshot),
        )
        .await
        .map_err(AnalyticsError::Persistence)?;

        Ok(matches!(outcome, InsertOutcome::Inserted(_)))
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let timeout_ms = self.pipeline.config().store.persist_timeout_ms;
        match with_timeout("purge_snapshots", timeout_ms, self.snapshots.purge_expired(now)).await {
            Ok(purged) => purged,
            Err(e) => {
                tracing::warn!(error = %e, "过期快照清理失败");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::domain::record::{Alert, ProgressUpdate, Project, Transaction, User};
    use crate::domain::types::{AlertStatus, Granularity, Role, Severity, UserStatus};
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use crate::repository::{RecordStore, SqliteDocumentStore, SqliteRecordStore};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn ts(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, h, 0, 0).unwrap()
    }

    fn create_test_conn() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn create_scheduler(
        store: Arc<dyn RecordStore>,
        conn: Arc<Mutex<Connection>>,
        config: AnalyticsConfig,
    ) -> (SnapshotScheduler, Arc<SnapshotRepository>) {
        let pipeline = Arc::new(AnalyticsPipeline::new(store, config, "en"));
        let snapshots = Arc::new(SnapshotRepository::new(Arc::new(
            SqliteDocumentStore::from_connection(conn),
        )));
        (SnapshotScheduler::new(pipeline, snapshots.clone()), snapshots)
    }

    fn create_test_user(id: &str, created_at: DateTime<Utc>) -> User {
        User {
            id: id.to_string(),
            role: Role::Buyer,
            status: UserStatus::Active,
            region: "eu".to_string(),
            created_at,
            last_active_at: None,
            purchase_count: 0,
            projects_created: 0,
        }
    }

    #[test]
    fn test_previous_period_is_prior_day() {
        let conn = create_test_conn();
        let store = Arc::new(SqliteRecordStore::from_connection(conn.clone()));
        let (scheduler, _) = create_scheduler(store, conn, AnalyticsConfig::default());

        let period = scheduler.previous_period(ts(10, 15));
        assert_eq!(period.start, ts(9, 0));
        assert_eq!(period.end, ts(10, 0));
        assert_eq!(period.granularity, Granularity::Daily);
    }

    #[tokio::test]
    async fn test_second_run_is_noop() {
        let conn = create_test_conn();
        let store = Arc::new(SqliteRecordStore::from_connection(conn.clone()));
        store
            .insert_users(&[create_test_user("U1", ts(9, 8)), create_test_user("U2", ts(10, 1))])
            .unwrap();
        let (scheduler, snapshots) = create_scheduler(store, conn, AnalyticsConfig::default());

        let first = scheduler.process_scheduled(ts(10, 2)).await.unwrap();
        assert_eq!(first.written.len(), RecordDomain::all().len());
        assert!(first.deferred.is_empty());

        let second = scheduler.process_scheduled(ts(10, 6)).await.unwrap();
        assert!(second.written.is_empty());
        assert_eq!(second.skipped.len(), RecordDomain::all().len());

        let all = snapshots.list_all().await.unwrap();
        assert_eq!(all.len(), RecordDomain::all().len());

        let users = snapshots
            .find(ts(9, 0), Granularity::Daily, RecordDomain::Users)
            .await
            .unwrap()
            .unwrap();
        // U2 属于当前周期
        assert_eq!(users.record_count, 1);
        assert_eq!(users.period_end, ts(10, 0));
    }

    #[tokio::test]
    async fn test_expired_snapshots_are_purged() {
        let conn = create_test_conn();
        let store = Arc::new(SqliteRecordStore::from_connection(conn.clone()));
        let mut config = AnalyticsConfig::default();
        config.snapshot.retention_days = 1;
        let (scheduler, snapshots) = create_scheduler(store, conn, config);

        scheduler.process_scheduled(ts(10, 2)).await.unwrap();
        let later = scheduler.process_scheduled(ts(13, 2)).await.unwrap();

        assert_eq!(later.purged, RecordDomain::all().len());
        let remaining = snapshots.list_all().await.unwrap();
        assert!(remaining.iter().all(|s| s.snapshot_date == ts(12, 0).date_naive()));
    }

    #[tokio::test]
    async fn test_hourly_snapshots_within_one_day_are_all_written() {
        let conn = create_test_conn();
        let store = Arc::new(SqliteRecordStore::from_connection(conn.clone()));
        store
            .insert_users(&[create_test_user("U1", ts(10, 1)), create_test_user("U2", ts(10, 2))])
            .unwrap();
        let mut config = AnalyticsConfig::default();
        config.snapshot.granularity = Granularity::Hourly;
        assert!(config.validate().is_ok());
        let (scheduler, snapshots) = create_scheduler(store, conn, config);

        let first = scheduler.process_scheduled(ts(10, 2) + Duration::minutes(5)).await.unwrap();
        let second = scheduler.process_scheduled(ts(10, 3) + Duration::minutes(5)).await.unwrap();
        assert_eq!(first.written.len(), RecordDomain::all().len());
        assert_eq!(second.written.len(), RecordDomain::all().len());
        assert!(second.skipped.is_empty());

        let day = snapshots.list_by_date(ts(10, 0).date_naive()).await.unwrap();
        assert_eq!(day.len(), 2 * RecordDomain::all().len());

        let users = snapshots
            .find(ts(10, 2), Granularity::Hourly, RecordDomain::Users)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(users.period_end, ts(10, 3));
        assert_eq!(users.record_count, 1);
    }

    // 用户数据域取数失败的存储
    struct FailingUsersStore {
        inner: SqliteRecordStore,
    }

    #[async_trait]
    impl RecordStore for FailingUsersStore {
        async fn fetch_projects(&self, f: &TimeFrame, d: &DataFilters) -> RepositoryResult<Vec<Project>> {
            self.inner.fetch_projects(f, d).await
        }
        async fn fetch_users(&self, _: &TimeFrame, _: &DataFilters) -> RepositoryResult<Vec<User>> {
            Err(RepositoryError::DatabaseConnectionError("offline".to_string()))
        }
        async fn fetch_transactions(
            &self,
            f: &TimeFrame,
            d: &DataFilters,
        ) -> RepositoryResult<Vec<Transaction>> {
            self.inner.fetch_transactions(f, d).await
        }
        async fn fetch_progress_updates(
            &self,
            f: &TimeFrame,
            d: &DataFilters,
        ) -> RepositoryResult<Vec<ProgressUpdate>> {
            self.inner.fetch_progress_updates(f, d).await
        }
        async fn fetch_alerts(
            &self,
            s: Option<AlertStatus>,
            v: Option<Severity>,
        ) -> RepositoryResult<Vec<Alert>> {
            self.inner.fetch_alerts(s, v).await
        }
    }

    #[tokio::test]
    async fn test_failed_domain_is_deferred() {
        let conn = create_test_conn();
        let store = Arc::new(FailingUsersStore {
            inner: SqliteRecordStore::from_connection(conn.clone()),
        });
        let (scheduler, snapshots) = create_scheduler(store, conn, AnalyticsConfig::default());

        let report = scheduler.process_scheduled(ts(10, 2)).await.unwrap();
        assert_eq!(report.deferred, vec![RecordDomain::Users]);
        assert_eq!(report.written.len(), RecordDomain::all().len() - 1);

        let missing = snapshots
            .find(ts(9, 0), Granularity::Daily, RecordDomain::Users)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_run_loop_stops_on_shutdown() {
        let conn = create_test_conn();
        let store = Arc::new(SqliteRecordStore::from_connection(conn.clone()));
        let (scheduler, _) = create_scheduler(store, conn, AnalyticsConfig::default());

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(async move {
            scheduler
                .run_loop(std::time::Duration::from_secs(3600), rx)
                .await;
        });
        tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
