// ==========================================
// 平台运营分析引擎 - 分析 API
// ==========================================
// 职责: 报告生成/读取、平台指标、指标趋势、洞察生成、定时快照入口
// 架构: API 层 → 访问控制 → 服务层（流水线 / 报告组装 / 洞察 / 快照调度）
// ==========================================
// 红线: 授权在任何取数之前完成
// 红线: 非法输入（时间窗颠倒、未知指标）在任何取数之前拒绝
// ==========================================

use crate::api::access::{AccessGuard, ANALYST_ROLES};
use crate::api::error::{ApiError, ApiResult};
use crate::domain::aggregate::TimeSeriesPoint;
use crate::domain::forecast::TrendAnalysis;
use crate::domain::insight::Insight;
use crate::domain::report::{Report, ReportOptions, ReportPeriod, ReportReceipt};
use crate::domain::time_frame::{DataFilters, TimeFrame};
use crate::domain::types::{AnalysisType, Granularity, RecordDomain, ReportType};
use crate::engine::metrics::domain_of_metric;
use crate::services::{
    AnalyticsPipeline, InsightService, ReportAssembler, SchedulerReport, SnapshotScheduler,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// 指标趋势查询结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTrends {
    pub metric: String,
    pub data: Vec<TimeSeriesPoint>,
    pub trend: TrendAnalysis,
    pub average_growth: f64,
}

// ==========================================
// AnalyticsApi
// ==========================================
pub struct AnalyticsApi {
    access: Arc<AccessGuard>,
    pipeline: Arc<AnalyticsPipeline>,
    reports: Arc<ReportAssembler>,
    insights: Arc<InsightService>,
    scheduler: Arc<SnapshotScheduler>,
}

impl AnalyticsApi {
    pub fn new(
        access: Arc<AccessGuard>,
        pipeline: Arc<AnalyticsPipeline>,
        reports: Arc<ReportAssembler>,
        insights: Arc<InsightService>,
        scheduler: Arc<SnapshotScheduler>,
    ) -> Self {
        Self {
            access,
            pipeline,
            reports,
            insights,
            scheduler,
        }
    }

    // ==========================================
    // 报告
    // ==========================================

    /// 生成报告（admin / verifier）
    ///
    /// # 返回
    /// 报告回执: report_id / title / status / summary
    pub async fn generate_report(
        &self,
        token: &str,
        report_type: ReportType,
        period: ReportPeriod,
        options: ReportOptions,
    ) -> ApiResult<ReportReceipt> {
        let caller = self.access.authorize(token, ANALYST_ROLES).await?;
        let report = self
            .reports
            .generate(report_type, &period, &options, Utc::now())
            .await?;

        tracing::info!(
            user_id = %caller.identity.user_id,
            report_id = %report.id,
            report_type = %report_type,
            "报告生成请求完成"
        );
        Ok(ReportReceipt::from(&report))
    }

    /// 读取报告（admin / verifier）；不存在时返回 None
    pub async fn get_report(&self, token: &str, report_id: &str) -> ApiResult<Option<Report>> {
        self.access.authorize(token, ANALYST_ROLES).await?;
        if report_id.trim().is_empty() {
            return Ok(None);
        }
        Ok(self.reports.find(report_id).await?)
    }

    // ==========================================
    // 指标
    // ==========================================

    /// 平台指标（admin / verifier）
    ///
    /// # 参数
    /// - `metric_names`: 指标名列表；空列表表示全部指标
    pub async fn get_platform_metrics(
        &self,
        token: &str,
        timeframe: TimeFrame,
        metric_names: &[String],
    ) -> ApiResult<BTreeMap<String, f64>> {
        self.access.authorize(token, ANALYST_ROLES).await?;
        timeframe.validate().map_err(ApiError::ComputationError)?;

        let domains: Vec<RecordDomain> = if metric_names.is_empty() {
            RecordDomain::all().to_vec()
        } else {
            metric_names
                .iter()
                .map(|name| {
                    domain_of_metric(name)
                        .ok_or_else(|| ApiError::ComputationError(format!("未知指标: {}", name)))
                })
                .collect::<ApiResult<BTreeSet<_>>>()?
                .into_iter()
                .collect()
        };

        let analyses = self
            .pipeline
            .run(&domains, &timeframe, &DataFilters::default(), Utc::now())
            .await?;
        let mut metrics = self.pipeline.merged_metrics(&analyses);
        if !metric_names.is_empty() {
            metrics.retain(|name, _| metric_names.contains(name));
        }
        Ok(metrics)
    }

    /// 指标趋势（admin / verifier，按指定粒度分桶后逐桶计算）
    pub async fn get_performance_trends(
        &self,
        token: &str,
        metric: &str,
        timeframe: TimeFrame,
        granularity: Granularity,
    ) -> ApiResult<PerformanceTrends> {
        self.access.authorize(token, ANALYST_ROLES).await?;
        let frame = TimeFrame {
            granularity,
            ..timeframe
        };
        let data = self
            .pipeline
            .metric_series(metric, &frame, &DataFilters::default(), Utc::now())
            .await?;

        let values: Vec<f64> = data.iter().map(|p| p.value).collect();
        let trend = self.pipeline.trend_of(&values);
        Ok(PerformanceTrends {
            metric: metric.to_string(),
            average_growth: trend.average_growth_pct,
            data,
            trend,
        })
    }

    // ==========================================
    // 洞察
    // ==========================================

    /// 生成并持久化洞察（admin / verifier）
    pub async fn generate_insights(
        &self,
        token: &str,
        analysis_type: AnalysisType,
        timeframe: TimeFrame,
    ) -> ApiResult<Vec<Insight>> {
        self.access.authorize(token, ANALYST_ROLES).await?;
        Ok(self
            .insights
            .generate(analysis_type, &timeframe, Utc::now())
            .await?)
    }

    // ==========================================
    // 定时任务入口
    // ==========================================

    /// 定时快照（批处理入口，无调用方令牌）
    pub async fn process_scheduled_analytics(&self) -> ApiResult<SchedulerReport> {
        self.process_scheduled_analytics_at(Utc::now()).await
    }

    /// 以指定时间执行定时快照（补跑历史周期）
    pub async fn process_scheduled_analytics_at(
        &self,
        now: DateTime<Utc>,
    ) -> ApiResult<SchedulerReport> {
        Ok(self.scheduler.process_scheduled(now).await?)
    }
}
