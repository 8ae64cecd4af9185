// ==========================================
// 平台运营分析引擎 - 运行监控 API
// ==========================================
// 职责: 实时计数、活跃告警、系统健康
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::monitoring::{LiveCounters, SystemHealth};
use crate::domain::record::Alert;
use crate::domain::time_frame::{DataFilters, TimeFrame};
use crate::domain::types::{AlertStatus, Granularity, Severity};
use crate::engine::HealthEngine;
use crate::repository::RecordStore;
use crate::services::with_timeout;
use chrono::{DateTime, Utc};
use futures::future::try_join4;
use std::cmp::Reverse;
use std::sync::Arc;

pub struct MonitoringApi {
    store: Arc<dyn RecordStore>,
    health: HealthEngine,
    fetch_timeout_ms: u64,
}

impl MonitoringApi {
    pub fn new(store: Arc<dyn RecordStore>, locale: &str, fetch_timeout_ms: u64) -> Self {
        Self {
            store,
            health: HealthEngine::new(locale),
            fetch_timeout_ms,
        }
    }

    /// 实时计数（当日 UTC）
    pub async fn get_current_metrics(&self) -> ApiResult<LiveCounters> {
        self.current_metrics_at(Utc::now()).await
    }

    pub async fn current_metrics_at(&self, now: DateTime<Utc>) -> ApiResult<LiveCounters> {
        let midnight = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc())
            .unwrap_or(now);
        // 含 now 本身
        let today = TimeFrame {
            start: midnight,
            end: now + chrono::Duration::seconds(1),
            granularity: Granularity::Hourly,
            tz_offset_minutes: None,
        };
        let all_time = TimeFrame::up_to(today.end, Granularity::Yearly);
        let filters = DataFilters::default();
        let t = self.fetch_timeout_ms;

        let (transactions, users, projects, alerts) = try_join4(
            with_timeout("fetch_transactions_today", t, self.store.fetch_transactions(&today, &filters)),
            with_timeout("fetch_users_today", t, self.store.fetch_users(&today, &filters)),
            with_timeout("fetch_projects", t, self.store.fetch_projects(&all_time, &filters)),
            with_timeout("fetch_alerts", t, self.store.fetch_alerts(None, None)),
        )
        .await?;

        Ok(self
            .health
            .live_counters(&transactions, &users, &projects, &alerts, now))
    }

    /// 未解决告警（按严重度降序，其次按时间倒序）
    pub async fn get_active_alerts(&self, severity: Option<Severity>) -> ApiResult<Vec<Alert>> {
        let mut alerts = with_timeout(
            "fetch_alerts",
            self.fetch_timeout_ms,
            self.store.fetch_alerts(None, severity),
        )
        .await?;
        alerts.retain(|a| a.status != AlertStatus::Resolved);
        alerts.sort_by_key(|a| (Reverse(a.severity), Reverse(a.created_at)));
        Ok(alerts)
    }

    /// 系统健康
    pub async fn get_system_health(&self) -> ApiResult<SystemHealth> {
        let alerts = self.get_active_alerts(None).await?;
        let health = self.health.assess(&alerts, Utc::now());
        tracing::debug!(overall = %health.overall, alerts = alerts.len(), "系统健康评估完成");
        Ok(health)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::HealthStatus;
    use crate::repository::SqliteRecordStore;
    use chrono::{Duration, TimeZone};
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn create_test_alert(id: &str, severity: Severity, status: AlertStatus, at: DateTime<Utc>) -> Alert {
        Alert {
            id: id.to_string(),
            component: "payments".to_string(),
            severity,
            status,
            message: "test".to_string(),
            created_at: at,
        }
    }

    fn create_test_api() -> (MonitoringApi, Arc<SqliteRecordStore>) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        let store = Arc::new(SqliteRecordStore::from_connection(Arc::new(Mutex::new(conn))));
        (MonitoringApi::new(store.clone(), "en", 10_000), store)
    }

    #[tokio::test]
    async fn test_active_alerts_sorted_and_resolved_hidden() {
        let (api, store) = create_test_api();
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        store
            .insert_alerts(&[
                create_test_alert("A1", Severity::Low, AlertStatus::Active, t0),
                create_test_alert("A2", Severity::Critical, AlertStatus::Acknowledged, t0),
                create_test_alert("A3", Severity::Critical, AlertStatus::Resolved, t0),
                create_test_alert("A4", Severity::Critical, AlertStatus::Active, t0 + Duration::hours(1)),
            ])
            .unwrap();

        let alerts = api.get_active_alerts(None).await.unwrap();
        let ids: Vec<&str> = alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["A4", "A2", "A1"]);

        let critical = api.get_active_alerts(Some(Severity::Critical)).await.unwrap();
        assert_eq!(critical.len(), 2);

        let health = api.get_system_health().await.unwrap();
        assert_eq!(health.overall, HealthStatus::Critical);
    }

    #[tokio::test]
    async fn test_current_metrics_on_empty_store() {
        let (api, _) = create_test_api();
        let counters = api.get_current_metrics().await.unwrap();
        assert_eq!(counters.transactions_today, 0);
        assert_eq!(counters.revenue_today, 0.0);
        assert!(counters.captured_at.is_some());
    }
}
