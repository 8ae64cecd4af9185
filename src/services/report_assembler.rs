// ==========================================
// 平台运营分析引擎 - 报告组装服务
// ==========================================
// 职责: 流水线结果 + 预测 + 对标 + 洞察 → 一份带版本的报告文档
// 状态: draft → final（组装完成后）
// ==========================================
// 红线: 非法输入（时间窗颠倒、未知自定义指标）在取数前拒绝
// 红线: 报告只在组装完成后单次写入，追加式持久化，永不覆写
// ==========================================

use crate::domain::report::{
    Report, ReportOptions, ReportPeriod, ReportSection, ReportSummary, REPORT_SCHEMA_VERSION,
};
use crate::domain::time_frame::{DataFilters, TimeFrame};
use crate::domain::types::{AnalysisType, Granularity, RecordDomain, ReportStatus, ReportType};
use crate::engine::metrics::domain_of_metric;
use crate::i18n;
use crate::repository::ReportRepository;
use crate::services::analytics_pipeline::{AnalyticsPipeline, DomainAnalysis};
use crate::services::error::{AnalyticsError, AnalyticsResult};
use crate::services::timeout::with_timeout;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// 按报告周期长度选择分桶粒度
pub fn granularity_for_period(start: DateTime<Utc>, end: DateTime<Utc>) -> Granularity {
    let length = end - start;
    if length <= Duration::days(2) {
        Granularity::Hourly
    } else if length <= Duration::days(31) {
        Granularity::Daily
    } else if length <= Duration::days(183) {
        Granularity::Weekly
    } else if length <= Duration::days(731) {
        Granularity::Monthly
    } else {
        Granularity::Quarterly
    }
}

/// 报告类型对应的洞察分析类型
pub fn analysis_type_for(report_type: ReportType) -> AnalysisType {
    match report_type {
        ReportType::ProjectPerformance => AnalysisType::Performance,
        ReportType::UserEngagement => AnalysisType::Engagement,
        ReportType::FinancialSummary => AnalysisType::Financial,
        ReportType::ImpactAssessment => AnalysisType::Impact,
        ReportType::PlatformOverview => AnalysisType::Performance,
    }
}

// ==========================================
// ReportAssembler
// ==========================================
pub struct ReportAssembler {
    pipeline: Arc<AnalyticsPipeline>,
    reports: Arc<ReportRepository>,
    locale: String,
}

impl ReportAssembler {
    pub fn new(pipeline: Arc<AnalyticsPipeline>, reports: Arc<ReportRepository>, locale: &str) -> Self {
        Self {
            pipeline,
            reports,
            locale: locale.to_string(),
        }
    }

    /// 生成并持久化报告
    pub async fn generate(
        &self,
        report_type: ReportType,
        period: &ReportPeriod,
        options: &ReportOptions,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<Report> {
        let report = self.assemble(report_type, period, options, now).await?;

        let timeout_ms = self.pipeline.config().store.persist_timeout_ms;
        with_timeout("insert_report", timeout_ms, self.reports.insert(&report))
            .await
            .map_err(|e| {
                tracing::error!(report_id = %report.id, error = %e, "报告写入失败");
                AnalyticsError::Persistence(e)
            })?;

        tracing::info!(
            report_id = %report.id,
            report_type = %report_type,
            sections = report.sections.len(),
            "报告已生成"
        );
        Ok(report)
    }

    /// 按 ID 读取报告
    pub async fn find(&self, report_id: &str) -> AnalyticsResult<Option<Report>> {
        let timeout_ms = self.pipeline.config().store.fetch_timeout_ms;
        with_timeout("find_report", timeout_ms, self.reports.find_by_id(report_id))
            .await
            .map_err(AnalyticsError::Persistence)
    }

    /// 组装报告（不持久化）
    pub async fn assemble(
        &self,
        report_type: ReportType,
        period: &ReportPeriod,
        options: &ReportOptions,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<Report> {
        let frame = TimeFrame::new(
            period.start,
            period.end,
            granularity_for_period(period.start, period.end),
        )
        .map_err(AnalyticsError::Computation)?;

        let mut domains: BTreeSet<RecordDomain> = report_type.domains().iter().copied().collect();
        for metric in &options.custom_metrics {
            let domain = domain_of_metric(metric).ok_or_else(|| {
                AnalyticsError::Computation(format!("未知自定义指标: {}", metric))
            })?;
            domains.insert(domain);
        }
        let domains: Vec<RecordDomain> = domains.into_iter().collect();

        let mut report = Report {
            id: uuid::Uuid::new_v4().to_string(),
            report_type,
            title: self.title(report_type, &period.label),
            period: period.clone(),
            schema_version: REPORT_SCHEMA_VERSION,
            status: ReportStatus::Draft,
            sections: Vec::new(),
            forecasts: Vec::new(),
            predictions: Vec::new(),
            insights: Vec::new(),
            recommendations: Vec::new(),
            benchmarks: Vec::new(),
            summary: ReportSummary::default(),
            generated_at: now,
        };

        let analyses = self
            .pipeline
            .run(&domains, &frame, &DataFilters::default(), now)
            .await?;

        let metrics = self.pipeline.merged_metrics(&analyses);
        if options.include_forecasting {
            report.forecasts = self.pipeline.forecasts(&analyses);
        }
        if options.include_benchmarks {
            report.benchmarks = self.pipeline.benchmarks(&metrics);
        }
        report.predictions = self.pipeline.predictions(&analyses, now);
        let (insights, recommendations) = self.pipeline.insights(
            analysis_type_for(report_type),
            &analyses,
            &report.predictions,
            &report.benchmarks,
            now,
        );
        report.insights = insights;
        report.recommendations = recommendations;

        let custom_metrics: BTreeMap<String, f64> = options
            .custom_metrics
            .iter()
            .map(|m| (m.clone(), metrics.get(m).copied().unwrap_or(0.0)))
            .collect();
        report.sections = analyses.into_iter().map(section_of).collect();
        report.summary = summarize(&report, custom_metrics);
        report.status = ReportStatus::Final;

        tracing::debug!(
            report_id = %report.id,
            granularity = %frame.granularity,
            forecasts = report.forecasts.len(),
            predictions = report.predictions.len(),
            "报告组装完成"
        );
        Ok(report)
    }

    fn title(&self, report_type: ReportType, label: &str) -> String {
        let type_name = i18n::t_in(
            &self.locale,
            &format!("report.type.{}", report_type.as_str()),
            &[],
        );
        i18n::t_in(
            &self.locale,
            "report.title",
            &[("type", &type_name), ("period", label)],
        )
    }
}

fn section_of(analysis: DomainAnalysis) -> ReportSection {
    ReportSection {
        domain: analysis.domain,
        record_count: analysis.records.len(),
        aggregated: analysis.aggregated,
        trends: analysis.trends,
    }
}

fn summarize(report: &Report, custom_metrics: BTreeMap<String, f64>) -> ReportSummary {
    ReportSummary {
        record_counts: report
            .sections
            .iter()
            .map(|s| (s.domain.to_string(), s.record_count))
            .collect(),
        sections: report.sections.iter().map(|s| s.domain.to_string()).collect(),
        forecast_count: report.forecasts.len(),
        prediction_count: report.predictions.len(),
        insight_count: report.insights.len(),
        recommendation_count: report.recommendations.len(),
        benchmark_count: report.benchmarks.len(),
        custom_metrics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::domain::record::Transaction;
    use crate::domain::types::{TransactionKind, TransactionStatus};
    use crate::repository::{SqliteDocumentStore, SqliteRecordStore};
    use chrono::TimeZone;
    use rusqlite::Connection;
    use std::sync::Mutex;

    fn ts(m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, m, d, 0, 0, 0).unwrap()
    }

    fn create_test_assembler() -> (ReportAssembler, Arc<SqliteRecordStore>) {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::ensure_schema(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));

        let store = Arc::new(SqliteRecordStore::from_connection(conn.clone()));
        let pipeline = Arc::new(AnalyticsPipeline::new(
            store.clone(),
            AnalyticsConfig::default(),
            "en",
        ));
        let reports = Arc::new(ReportRepository::new(Arc::new(
            SqliteDocumentStore::from_connection(conn),
        )));
        (ReportAssembler::new(pipeline, reports, "en"), store)
    }

    fn period(start: DateTime<Utc>, end: DateTime<Utc>) -> ReportPeriod {
        ReportPeriod {
            start,
            end,
            label: "2024-Q1".to_string(),
        }
    }

    #[test]
    fn test_granularity_follows_period_length() {
        assert_eq!(granularity_for_period(ts(1, 1), ts(1, 2)), Granularity::Hourly);
        assert_eq!(granularity_for_period(ts(1, 1), ts(1, 20)), Granularity::Daily);
        assert_eq!(granularity_for_period(ts(1, 1), ts(4, 1)), Granularity::Weekly);
        assert_eq!(granularity_for_period(ts(1, 1), ts(12, 1)), Granularity::Monthly);
        assert_eq!(
            granularity_for_period(ts(1, 1), Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()),
            Granularity::Quarterly
        );
    }

    #[tokio::test]
    async fn test_financial_report_over_empty_period() {
        let (assembler, _) = create_test_assembler();
        let report = assembler
            .generate(
                ReportType::FinancialSummary,
                &period(ts(1, 1), ts(4, 1)),
                &ReportOptions::default(),
                ts(4, 2),
            )
            .await
            .unwrap();

        assert_eq!(report.status, ReportStatus::Final);
        assert_eq!(report.title, "Financial Summary Report - 2024-Q1");
        assert_eq!(report.metric("average_transaction_value"), Some(0.0));
        assert_eq!(report.metric("total_revenue"), Some(0.0));
        assert!(report.forecasts.is_empty());
        assert!(report.benchmarks.is_empty());

        let stored = assembler.find(&report.id).await.unwrap().unwrap();
        assert_eq!(stored.id, report.id);
        assert_eq!(stored.status, ReportStatus::Final);
        assert_eq!(stored.summary, report.summary);
    }

    #[tokio::test]
    async fn test_options_add_forecasts_benchmarks_and_custom_metrics() {
        let (assembler, store) = create_test_assembler();
        store
            .insert_transactions(&[Transaction {
                id: "T1".to_string(),
                user_id: "U1".to_string(),
                project_id: None,
                kind: TransactionKind::Purchase,
                status: TransactionStatus::Completed,
                payment_method: "card".to_string(),
                amount: 250.0,
                credits: 5.0,
                created_at: ts(1, 10),
            }])
            .unwrap();

        let options = ReportOptions {
            include_forecasting: true,
            include_benchmarks: true,
            custom_metrics: vec!["total_users".to_string()],
        };
        let report = assembler
            .assemble(ReportType::FinancialSummary, &period(ts(1, 1), ts(2, 1)), &options, ts(2, 1))
            .await
            .unwrap();

        assert!(!report.forecasts.is_empty());
        // 自定义指标引入用户数据域
        assert!(report.section(RecordDomain::Users).is_some());
        assert_eq!(report.summary.custom_metrics["total_users"], 0.0);
        assert_eq!(report.summary.record_counts["transactions"], 1);
        assert_eq!(report.summary.benchmark_count, report.benchmarks.len());
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected() {
        let (assembler, _) = create_test_assembler();

        let inverted = assembler
            .generate(
                ReportType::UserEngagement,
                &period(ts(4, 1), ts(1, 1)),
                &ReportOptions::default(),
                ts(4, 2),
            )
            .await;
        assert!(matches!(inverted, Err(AnalyticsError::Computation(_))));

        let options = ReportOptions {
            custom_metrics: vec!["bogus".to_string()],
            ..ReportOptions::default()
        };
        let unknown = assembler
            .generate(ReportType::UserEngagement, &period(ts(1, 1), ts(2, 1)), &options, ts(2, 1))
            .await;
        assert!(matches!(unknown, Err(AnalyticsError::Computation(_))));
    }

    #[tokio::test]
    async fn test_missing_report_is_none() {
        let (assembler, _) = create_test_assembler();
        assert!(assembler.find("missing").await.unwrap().is_none());
    }
}
