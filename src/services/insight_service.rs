// ==========================================
// 平台运营分析引擎 - 洞察生成服务
// ==========================================
// 职责: 按分析类型运行流水线，生成洞察并持久化
// 红线: 洞察一次事务写入，生成失败时不写入任何洞察
// ==========================================

use crate::domain::insight::Insight;
use crate::domain::time_frame::{DataFilters, TimeFrame};
use crate::domain::types::AnalysisType;
use crate::repository::InsightRepository;
use crate::services::analytics_pipeline::AnalyticsPipeline;
use crate::services::error::{AnalyticsError, AnalyticsResult};
use crate::services::timeout::with_timeout;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub struct InsightService {
    pipeline: Arc<AnalyticsPipeline>,
    insights: Arc<InsightRepository>,
}

impl InsightService {
    pub fn new(pipeline: Arc<AnalyticsPipeline>, insights: Arc<InsightRepository>) -> Self {
        Self { pipeline, insights }
    }

    /// 生成并持久化洞察
    pub async fn generate(
        &self,
        analysis_type: AnalysisType,
        frame: &TimeFrame,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<Insight>> {
        let analyses = self
            .pipeline
            .run(analysis_type.domains(), frame, &DataFilters::default(), now)
            .await?;

        let predictions = self.pipeline.predictions(&analyses, now);
        let benchmarks = self
            .pipeline
            .benchmarks(&self.pipeline.merged_metrics(&analyses));
        let (insights, _) =
            self.pipeline
                .insights(analysis_type, &analyses, &predictions, &benchmarks, now);

        let timeout_ms = self.pipeline.config().store.persist_timeout_ms;
        let written = with_timeout("insert_insights", timeout_ms, self.insights.insert_batch(&insights))
            .await
            .map_err(|e| {
                tracing::error!(analysis_type = %analysis_type, error = %e, "洞察写入失败");
                AnalyticsError::Persistence(e)
            })?;

        tracing::info!(analysis_type = %analysis_type, insights = written, "洞察已生成");
        Ok(insights)
    }

    /// 已持久化的洞察
    pub async fn list(&self, analysis_type: AnalysisType) -> AnalyticsResult<Vec<Insight>> {
        let timeout_ms = self.pipeline.config().store.fetch_timeout_ms;
        with_timeout("list_insights", timeout_ms, self.insights.list_by_type(analysis_type))
            .await
            .map_err(AnalyticsError::Persistence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::domain::record::Transaction;
    use crate::domain::types::{Granularity, InsightCategory, TransactionKind, TransactionStatus};
    use crate::repository::{SqliteDocumentStore, SqliteRecordStore};
    use chrono::TimeZone;
    use rusqlite::Connection;
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_generated_insights_are_persisted() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));

        let store = Arc::new(SqliteRecordStore::from_connection(conn.clone()));
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 8, 0, 0, 0).unwrap();
        let txns: Vec<Transaction> = [
            TransactionStatus::Completed,
            TransactionStatus::Failed,
            TransactionStatus::Failed,
        ]
        .iter()
        .enumerate()
        .map(|(i, status)| Transaction {
            id: format!("T{}", i),
            user_id: "U1".to_string(),
            project_id: None,
            kind: TransactionKind::Purchase,
            status: *status,
            payment_method: "card".to_string(),
            amount: 100.0,
            credits: 1.0,
            created_at: start + chrono::Duration::hours(i as i64 + 1),
        })
        .collect();
        store.insert_transactions(&txns).unwrap();

        let pipeline = Arc::new(AnalyticsPipeline::new(
            store,
            AnalyticsConfig::default(),
            "en",
        ));
        let repo = Arc::new(InsightRepository::new(Arc::new(
            SqliteDocumentStore::from_connection(conn),
        )));
        let service = InsightService::new(pipeline, repo);

        let frame = TimeFrame::new(start, end, Granularity::Daily).unwrap();

        // 3 笔交易仅 1 笔成功: 成功率 33%，低于阈值
        let insights = service
            .generate(AnalysisType::Financial, &frame, end)
            .await
            .unwrap();
        assert!(insights
            .iter()
            .any(|i| i.category == InsightCategory::Risk && i.metric == "transaction_success_rate"));

        let stored = service.list(AnalysisType::Financial).await.unwrap();
        assert_eq!(stored.len(), insights.len());
        assert!(service.list(AnalysisType::Impact).await.unwrap().is_empty());
    }
}
