// ==========================================
// 平台运营分析引擎 - 分析流水线
// ==========================================
// 职责: 取数 → 分桶 → 分解 → 指标 → 趋势（每个数据域一次）
//       并在流水线结果之上派生预测、对标、洞察
// 输入: 数据域列表 + 时间窗 + 过滤条件 + now
// 输出: DomainAnalysis 列表
// ==========================================
// 红线: 一次请求内各数据域并发取数（join_all），每次取数都有超时
// 红线: 每个数据域的结果只基于一次取得的不可变记录集
// 红线: 流水线本身不写任何数据
// ==========================================

use crate::config::AnalyticsConfig;
use crate::domain::aggregate::{AggregatedResult, BreakdownEntry, TimeSeriesPoint};
use crate::domain::benchmark::BenchmarkComparison;
use crate::domain::forecast::{Forecast, TrendAnalysis};
use crate::domain::insight::{Insight, Recommendation};
use crate::domain::prediction::{Prediction, PredictionKind};
use crate::domain::record::{DomainRecords, ProgressUpdate, Project, Transaction, User};
use crate::domain::time_frame::{DataFilters, TimeFrame};
use crate::domain::types::{AnalysisType, RecordDomain, TransactionStatus, UpdateStatus};
use crate::engine::metrics::{domain_of_metric, group_updates, metric_names};
use crate::engine::{
    BenchmarkEngine, DimensionalAggregator, ForecastEngine, InsightEngine, InsightInputs,
    MeasureFn, MetricsCalculator, PredictionEngine, TimeGrouper, TrendEstimator,
};
use crate::repository::error::RepositoryResult;
use crate::repository::record_store::RecordStore;
use crate::services::error::{AnalyticsError, AnalyticsResult};
use crate::services::timeout::with_timeout;
use chrono::{DateTime, Utc};
use futures::future::{join_all, try_join};
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

/// 数据域的时间序列指标（趋势与预测的输入）
pub fn series_metrics(domain: RecordDomain) -> &'static [&'static str] {
    use metric_names::*;
    match domain {
        RecordDomain::Projects => &[TOTAL_PROJECTS, TOTAL_FUNDING_RAISED],
        RecordDomain::Users => &[NEW_USERS],
        RecordDomain::Transactions => &[TOTAL_REVENUE, TRANSACTION_COUNT],
        RecordDomain::Impact => &[TOTAL_CARBON_IMPACT, UPDATE_COUNT],
    }
}

// ==========================================
// DomainAnalysis - 单个数据域的流水线结果
// ==========================================
#[derive(Debug, Clone)]
pub struct DomainAnalysis {
    pub domain: RecordDomain,
    pub frame: TimeFrame,
    pub records: DomainRecords,
    pub previous_count: usize,
    /// 项目域: 这些项目的全部进度报告（质量分与预测使用）
    pub related_updates: Vec<ProgressUpdate>,
    pub aggregated: AggregatedResult,
    pub trends: BTreeMap<String, TrendAnalysis>,
}

// ==========================================
// AnalyticsPipeline
// ==========================================
pub struct AnalyticsPipeline {
    store: Arc<dyn RecordStore>,
    config: AnalyticsConfig,

    grouper: TimeGrouper,
    aggregator: DimensionalAggregator,
    metrics: MetricsCalculator,
    trend: TrendEstimator,
    forecast: ForecastEngine,
    prediction: PredictionEngine,
    benchmark: BenchmarkEngine,
    insight: InsightEngine,
}

impl AnalyticsPipeline {
    /// 构造函数
    ///
    /// # 参数
    /// - `store`: 记录读取协作方
    /// - `config`: 分析配置（构造时固化）
    /// - `locale`: 报告文本语言
    pub fn new(store: Arc<dyn RecordStore>, config: AnalyticsConfig, locale: &str) -> Self {
        Self {
            grouper: TimeGrouper::new(config.grouping.week_start),
            aggregator: DimensionalAggregator::new(),
            metrics: MetricsCalculator::new(config.quality_weights.clone()),
            trend: TrendEstimator::new(config.trend.clone()),
            forecast: ForecastEngine::new(config.forecast.clone(), locale),
            prediction: PredictionEngine::new(config.prediction.clone(), locale),
            benchmark: BenchmarkEngine::new(config.benchmarks.clone(), locale),
            insight: InsightEngine::new(config.insight.clone(), locale),
            store,
            config,
        }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    // ==========================================
    // 流水线入口
    // ==========================================

    /// 对多个数据域运行流水线（并发取数）
    ///
    /// 任一数据域失败时整体失败；调度器按数据域单独调用以便逐域顺延
    pub async fn run(
        &self,
        domains: &[RecordDomain],
        frame: &TimeFrame,
        filters: &DataFilters,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<DomainAnalysis>> {
        frame.validate().map_err(AnalyticsError::Computation)?;

        let unique: BTreeSet<RecordDomain> = domains.iter().copied().collect();
        let results = join_all(
            unique
                .iter()
                .map(|domain| self.analyze_domain(*domain, frame, filters, now)),
        )
        .await;
        let analyses = results.into_iter().collect::<AnalyticsResult<Vec<_>>>()?;

        tracing::info!(
            domains = analyses.len(),
            records = analyses.iter().map(|a| a.records.len()).sum::<usize>(),
            granularity = %frame.granularity,
            "分析流水线完成"
        );
        Ok(analyses)
    }

    /// 单个数据域的流水线
    pub async fn analyze_domain(
        &self,
        domain: RecordDomain,
        frame: &TimeFrame,
        filters: &DataFilters,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<DomainAnalysis> {
        frame.validate().map_err(AnalyticsError::Computation)?;

        let previous_frame = frame.previous_window();
        let (records, previous) = try_join(
            self.fetch_domain(domain, frame, filters),
            self.fetch_domain(domain, &previous_frame, filters),
        )
        .await?;

        let related_updates = self.fetch_updates_for(records.as_projects(), frame, now).await?;
        let related_projects = self.fetch_projects_for(records.as_updates(), frame, now).await?;

        let metrics =
            self.compute_metrics(&records, &related_updates, &related_projects, frame, now);

        let mut aggregated = AggregatedResult::new()
            .with_total("records", records.len() as f64)
            .with_total("previous_records", previous.len() as f64)
            .with_metrics(metrics)
            .with_series(self.series(&records, frame));
        for (dimension, entries) in self.breakdowns(&records, &previous) {
            aggregated = aggregated.with_breakdown(dimension, entries);
        }

        let trends = series_metrics(domain)
            .iter()
            .map(|metric| {
                (
                    metric.to_string(),
                    self.trend.analyze(&aggregated.series_values(metric)),
                )
            })
            .collect();

        tracing::debug!(
            domain = %domain,
            records = records.len(),
            previous = previous.len(),
            "数据域分析完成"
        );

        Ok(DomainAnalysis {
            domain,
            frame: frame.clone(),
            previous_count: previous.len(),
            records,
            related_updates,
            aggregated,
            trends,
        })
    }

    /// 任意指标的分桶序列（每个桶独立计算该指标）
    pub async fn metric_series(
        &self,
        metric: &str,
        frame: &TimeFrame,
        filters: &DataFilters,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<TimeSeriesPoint>> {
        frame.validate().map_err(AnalyticsError::Computation)?;
        let domain = domain_of_metric(metric)
            .ok_or_else(|| AnalyticsError::Computation(format!("未知指标: {}", metric)))?;

        let records = self.fetch_domain(domain, frame, filters).await?;
        let related_updates = self.fetch_updates_for(records.as_projects(), frame, now).await?;
        let related_projects = self.fetch_projects_for(records.as_updates(), frame, now).await?;

        let offset = frame.offset();
        let mut parts = self.partition(&records, frame);
        let points = self
            .grouper
            .buckets_in(frame)
            .into_iter()
            .map(|start| {
                let end = self
                    .grouper
                    .next_bucket_start(start, frame.granularity, offset)
                    .min(frame.end);
                let bucket = TimeFrame {
                    start: start.max(frame.start),
                    end,
                    granularity: frame.granularity,
                    tz_offset_minutes: frame.tz_offset_minutes,
                };
                let subset = parts
                    .remove(&start)
                    .unwrap_or_else(|| DomainRecords::empty(domain));
                let value = self
                    .compute_metrics(
                        &subset,
                        &related_updates,
                        &related_projects,
                        &bucket,
                        end.min(now),
                    )
                    .get(metric)
                    .copied()
                    .unwrap_or(0.0);
                TimeSeriesPoint {
                    timestamp: start,
                    metric: metric.to_string(),
                    value,
                }
            })
            .collect();
        Ok(points)
    }

    // ==========================================
    // 派生结果
    // ==========================================

    /// 所有数据域指标合并
    pub fn merged_metrics(&self, analyses: &[DomainAnalysis]) -> BTreeMap<String, f64> {
        analyses
            .iter()
            .flat_map(|a| a.aggregated.metrics.iter().map(|(k, v)| (k.clone(), *v)))
            .collect()
    }

    pub fn merged_trends(&self, analyses: &[DomainAnalysis]) -> BTreeMap<String, TrendAnalysis> {
        analyses
            .iter()
            .flat_map(|a| a.trends.iter().map(|(k, v)| (k.clone(), v.clone())))
            .collect()
    }

    /// 时间序列指标的多期限预测
    pub fn forecasts(&self, analyses: &[DomainAnalysis]) -> Vec<Forecast> {
        analyses
            .iter()
            .flat_map(|a| {
                series_metrics(a.domain).iter().filter_map(move |metric| {
                    self.forecast.forecast(
                        metric,
                        &a.aggregated.series_values(metric),
                        a.frame.granularity,
                    )
                })
            })
            .collect()
    }

    /// 项目完工预测（跳过已终结项目）+ 用户流失预测
    pub fn predictions(&self, analyses: &[DomainAnalysis], now: DateTime<Utc>) -> Vec<Prediction> {
        let mut out = Vec::new();
        for analysis in analyses {
            match &analysis.records {
                DomainRecords::Projects(projects) => {
                    let by_project = group_updates(&analysis.related_updates);
                    for project in projects.iter().filter(|p| !p.status.is_terminal()) {
                        let own = by_project
                            .get(project.id.as_str())
                            .map(Vec::as_slice)
                            .unwrap_or(&[]);
                        out.push(self.prediction.predict_project(project, own, now));
                    }
                }
                DomainRecords::Users(users) => {
                    out.extend(users.iter().map(|u| self.prediction.predict_user(u, now)));
                }
                _ => {}
            }
        }
        out
    }

    /// 任意序列的趋势（按配置的阈值）
    pub fn trend_of(&self, values: &[f64]) -> TrendAnalysis {
        self.trend.analyze(values)
    }

    pub fn benchmarks(&self, metrics: &BTreeMap<String, f64>) -> Vec<BenchmarkComparison> {
        self.benchmark.compare_all(metrics)
    }

    /// 洞察与建议
    pub fn insights(
        &self,
        analysis_type: AnalysisType,
        analyses: &[DomainAnalysis],
        predictions: &[Prediction],
        benchmarks: &[BenchmarkComparison],
        now: DateTime<Utc>,
    ) -> (Vec<Insight>, Vec<Recommendation>) {
        let metrics = self.merged_metrics(analyses);
        let trends = self.merged_trends(analyses);
        let (projects, users): (Vec<Prediction>, Vec<Prediction>) = predictions
            .iter()
            .cloned()
            .partition(|p| p.kind == PredictionKind::ProjectCompletion);

        self.insight.generate(
            InsightInputs {
                analysis_type,
                metrics: &metrics,
                trends: &trends,
                project_predictions: &projects,
                user_predictions: &users,
                benchmarks,
            },
            now,
        )
    }

    // ==========================================
    // 取数
    // ==========================================

    async fn timed<T>(
        &self,
        domain: RecordDomain,
        operation: &str,
        fut: impl Future<Output = RepositoryResult<T>>,
    ) -> AnalyticsResult<T> {
        with_timeout(operation, self.config.store.fetch_timeout_ms, fut)
            .await
            .map_err(|e| AnalyticsError::fetch(domain, e))
    }

    async fn fetch_domain(
        &self,
        domain: RecordDomain,
        frame: &TimeFrame,
        filters: &DataFilters,
    ) -> AnalyticsResult<DomainRecords> {
        let operation = format!("fetch_{}", domain);
        self.timed(domain, &operation, self.store.fetch(domain, frame, filters))
            .await
    }

    /// 项目的全部进度报告（截至 max(时间窗结束, now)）
    async fn fetch_updates_for(
        &self,
        projects: &[Project],
        frame: &TimeFrame,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<ProgressUpdate>> {
        if projects.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<&str> = projects.iter().map(|p| p.id.as_str()).collect();
        let window = TimeFrame::up_to(frame.end.max(now), frame.granularity);
        let filters = DataFilters::default().with_project_ids(&ids);
        self.timed(
            RecordDomain::Impact,
            "fetch_related_updates",
            self.store.fetch_progress_updates(&window, &filters),
        )
        .await
    }

    /// 进度报告所属项目（统计已签发碳信用）
    async fn fetch_projects_for(
        &self,
        updates: &[ProgressUpdate],
        frame: &TimeFrame,
        now: DateTime<Utc>,
    ) -> AnalyticsResult<Vec<Project>> {
        if updates.is_empty() {
            return Ok(Vec::new());
        }
        let ids: BTreeSet<&str> = updates.iter().map(|u| u.project_id.as_str()).collect();
        let ids: Vec<&str> = ids.into_iter().collect();
        let window = TimeFrame::up_to(frame.end.max(now), frame.granularity);
        let filters = DataFilters::default().with_project_ids(&ids);
        self.timed(
            RecordDomain::Projects,
            "fetch_related_projects",
            self.store.fetch_projects(&window, &filters),
        )
        .await
    }

    // ==========================================
    // 计算
    // ==========================================

    fn compute_metrics(
        &self,
        records: &DomainRecords,
        related_updates: &[ProgressUpdate],
        related_projects: &[Project],
        frame: &TimeFrame,
        now: DateTime<Utc>,
    ) -> BTreeMap<String, f64> {
        match records {
            DomainRecords::Projects(p) => self.metrics.project_metrics(p, related_updates, now),
            DomainRecords::Users(u) => self.metrics.user_metrics(u, frame, now),
            DomainRecords::Transactions(t) => self.metrics.financial_metrics(t),
            DomainRecords::Impact(u) => self.metrics.impact_metrics(u, related_projects),
        }
    }

    fn breakdowns(
        &self,
        current: &DomainRecords,
        previous: &DomainRecords,
    ) -> Vec<(&'static str, Vec<BreakdownEntry>)> {
        let agg = &self.aggregator;
        match current {
            DomainRecords::Projects(cur) => {
                let prev = previous.as_projects();
                let funding: MeasureFn<Project> = &|p: &Project| p.funding_raised;
                vec![
                    (
                        "status",
                        agg.breakdown_by(
                            cur,
                            prev,
                            |p: &Project| p.status.to_string(),
                            Some(funding),
                        ),
                    ),
                    (
                        "project_type",
                        agg.breakdown_by(
                            cur,
                            prev,
                            |p: &Project| p.project_type.clone(),
                            Some(funding),
                        ),
                    ),
                    (
                        "region",
                        agg.breakdown_by(
                            cur,
                            prev,
                            |p: &Project| p.region.clone(),
                            Some(funding),
                        ),
                    ),
                ]
            }
            DomainRecords::Users(cur) => {
                let prev = previous.as_users();
                vec![
                    (
                        "role",
                        agg.breakdown_by(
                            cur,
                            prev,
                            |u: &User| u.role.to_string(),
                            None,
                        ),
                    ),
                    (
                        "status",
                        agg.breakdown_by(
                            cur,
                            prev,
                            |u: &User| u.status.to_string(),
                            None,
                        ),
                    ),
                    (
                        "region",
                        agg.breakdown_by(
                            cur,
                            prev,
                            |u: &User| u.region.clone(),
                            None,
                        ),
                    ),
                ]
            }
            DomainRecords::Transactions(cur) => {
                let prev = previous.as_transactions();
                let amount: MeasureFn<Transaction> = &|t: &Transaction| t.amount;
                vec![
                    (
                        "kind",
                        agg.breakdown_by(
                            cur,
                            prev,
                            |t: &Transaction| t.kind.to_string(),
                            Some(amount),
                        ),
                    ),
                    (
                        "status",
                        agg.breakdown_by(
                            cur,
                            prev,
                            |t: &Transaction| t.status.to_string(),
                            Some(amount),
                        ),
                    ),
                    (
                        "payment_method",
                        agg.breakdown_by(
                            cur,
                            prev,
                            |t: &Transaction| t.payment_method.clone(),
                            Some(amount),
                        ),
                    ),
                ]
            }
            DomainRecords::Impact(cur) => {
                let prev = previous.as_updates();
                let carbon: MeasureFn<ProgressUpdate> = &|u: &ProgressUpdate| u.carbon_impact;
                vec![
                    (
                        "status",
                        agg.breakdown_by(
                            cur,
                            prev,
                            |u: &ProgressUpdate| u.status.to_string(),
                            Some(carbon),
                        ),
                    ),
                    (
                        "update_type",
                        agg.breakdown_by(
                            cur,
                            prev,
                            |u: &ProgressUpdate| u.update_type.clone(),
                            Some(carbon),
                        ),
                    ),
                ]
            }
        }
    }

    fn series(&self, records: &DomainRecords, frame: &TimeFrame) -> Vec<TimeSeriesPoint> {
        use metric_names::*;
        let g = &self.grouper;
        match records {
            DomainRecords::Projects(p) => {
                let mut s = g.time_series(p, frame, TOTAL_PROJECTS, |_| 1.0);
                s.extend(g.time_series(p, frame, TOTAL_FUNDING_RAISED, |p: &Project| p.funding_raised));
                s
            }
            DomainRecords::Users(u) => g.time_series(u, frame, NEW_USERS, |_| 1.0),
            DomainRecords::Transactions(t) => {
                let mut s = g.time_series(t, frame, TOTAL_REVENUE, |t: &Transaction| {
                    if t.status == TransactionStatus::Completed && t.kind.is_revenue() {
                        t.amount
                    } else {
                        0.0
                    }
                });
                s.extend(g.time_series(t, frame, TRANSACTION_COUNT, |_| 1.0));
                s
            }
            DomainRecords::Impact(u) => {
                let mut s = g.time_series(u, frame, TOTAL_CARBON_IMPACT, |u: &ProgressUpdate| {
                    if u.status == UpdateStatus::Rejected {
                        0.0
                    } else {
                        u.carbon_impact
                    }
                });
                s.extend(g.time_series(u, frame, UPDATE_COUNT, |_| 1.0));
                s
            }
        }
    }

    /// 按桶拆分记录集
    fn partition(
        &self,
        records: &DomainRecords,
        frame: &TimeFrame,
    ) -> BTreeMap<DateTime<Utc>, DomainRecords> {
        let (g, gran, offset) = (&self.grouper, frame.granularity, frame.offset());
        match records {
            DomainRecords::Projects(v) => g
                .group_by_period(v, gran, offset)
                .into_iter()
                .map(|(k, rs)| (k, DomainRecords::Projects(rs.into_iter().cloned().collect())))
                .collect(),
            DomainRecords::Users(v) => g
                .group_by_period(v, gran, offset)
                .into_iter()
                .map(|(k, rs)| (k, DomainRecords::Users(rs.into_iter().cloned().collect())))
                .collect(),
            DomainRecords::Transactions(v) => g
                .group_by_period(v, gran, offset)
                .into_iter()
                .map(|(k, rs)| (k, DomainRecords::Transactions(rs.into_iter().cloned().collect())))
                .collect(),
            DomainRecords::Impact(v) => g
                .group_by_period(v, gran, offset)
                .into_iter()
                .map(|(k, rs)| (k, DomainRecords::Impact(rs.into_iter().cloned().collect())))
                .collect(),
        }
    }
}
