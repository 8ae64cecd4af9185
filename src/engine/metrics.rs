// ==========================================
// 平台运营分析引擎 - 指标计算引擎
// ==========================================
// 职责: 四个数据域的比率/综合指标
// 红线: 分母为 0 时比率为 0，永不产生 NaN/∞
// 红线: 综合质量分 = 具名常量权重的加权和（权重和为 1）
// ==========================================

use crate::config::QualityWeights;
use crate::domain::record::{ProgressUpdate, Project, Transaction, User};
use crate::domain::time_frame::TimeFrame;
use crate::domain::types::{ProjectStatus, RecordDomain, TransactionKind, TransactionStatus, UpdateStatus};
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// 活跃用户判定窗口（天）
pub const ACTIVE_USER_WINDOW_DAYS: i64 = 30;

/// 报告规律性评估窗口（天）与期望报告数
pub const REPORTING_WINDOW_DAYS: i64 = 90;
pub const EXPECTED_REPORTS_PER_WINDOW: f64 = 3.0;

// ==========================================
// 指标名常量
// ==========================================
pub mod metric_names {
    // ===== 项目 =====
    pub const TOTAL_PROJECTS: &str = "total_projects";
    pub const ACTIVE_PROJECTS: &str = "active_projects";
    pub const COMPLETED_PROJECTS: &str = "completed_projects";
    pub const COMPLETION_RATE: &str = "completion_rate";
    pub const SUCCESS_RATE: &str = "success_rate";
    pub const APPROVAL_RATE: &str = "approval_rate";
    pub const AVERAGE_PROGRESS: &str = "average_progress";
    pub const TOTAL_FUNDING_RAISED: &str = "total_funding_raised";
    pub const FUNDING_RATIO: &str = "funding_ratio";
    pub const QUALITY_SCORE: &str = "quality_score";

    // ===== 用户 =====
    pub const TOTAL_USERS: &str = "total_users";
    pub const NEW_USERS: &str = "new_users";
    pub const ACTIVE_USERS: &str = "active_users";
    pub const RETENTION_RATE: &str = "retention_rate";
    pub const AVERAGE_PURCHASES: &str = "average_purchases";

    // ===== 财务 =====
    pub const TOTAL_REVENUE: &str = "total_revenue";
    pub const TOTAL_REFUNDS: &str = "total_refunds";
    pub const NET_REVENUE: &str = "net_revenue";
    pub const TRANSACTION_COUNT: &str = "transaction_count";
    pub const COMPLETED_COUNT: &str = "completed_count";
    pub const AVERAGE_TRANSACTION_VALUE: &str = "average_transaction_value";
    pub const TRANSACTION_SUCCESS_RATE: &str = "transaction_success_rate";
    pub const REFUND_RATE: &str = "refund_rate";
    pub const CREDITS_SOLD: &str = "credits_sold";

    // ===== 影响力 =====
    pub const TOTAL_CARBON_IMPACT: &str = "total_carbon_impact";
    pub const UPDATE_COUNT: &str = "update_count";
    pub const VERIFIED_COUNT: &str = "verified_count";
    pub const VERIFICATION_RATE: &str = "verification_rate";
    pub const AVERAGE_IMPACT_PER_PROJECT: &str = "average_impact_per_project";
    pub const CREDITS_ISSUED: &str = "credits_issued";

    pub const PROJECT_METRICS: &[&str] = &[
        TOTAL_PROJECTS,
        ACTIVE_PROJECTS,
        COMPLETED_PROJECTS,
        COMPLETION_RATE,
        SUCCESS_RATE,
        APPROVAL_RATE,
        AVERAGE_PROGRESS,
        TOTAL_FUNDING_RAISED,
        FUNDING_RATIO,
        QUALITY_SCORE,
    ];

    pub const USER_METRICS: &[&str] =
        &[TOTAL_USERS, NEW_USERS, ACTIVE_USERS, RETENTION_RATE, AVERAGE_PURCHASES];

    pub const FINANCIAL_METRICS: &[&str] = &[
        TOTAL_REVENUE,
        TOTAL_REFUNDS,
        NET_REVENUE,
        TRANSACTION_COUNT,
        COMPLETED_COUNT,
        AVERAGE_TRANSACTION_VALUE,
        TRANSACTION_SUCCESS_RATE,
        REFUND_RATE,
        CREDITS_SOLD,
    ];

    pub const IMPACT_METRICS: &[&str] = &[
        TOTAL_CARBON_IMPACT,
        UPDATE_COUNT,
        VERIFIED_COUNT,
        VERIFICATION_RATE,
        AVERAGE_IMPACT_PER_PROJECT,
        CREDITS_ISSUED,
    ];

    /// 值越低越好的比率指标
    pub const LOWER_IS_BETTER: &[&str] = &[REFUND_RATE];

    /// 比率指标的分母计数
    pub fn rate_base(rate: &str) -> Option<&'static str> {
        match rate {
            COMPLETION_RATE | SUCCESS_RATE | APPROVAL_RATE => Some(TOTAL_PROJECTS),
            RETENTION_RATE => Some(TOTAL_USERS),
            TRANSACTION_SUCCESS_RATE | REFUND_RATE => Some(TRANSACTION_COUNT),
            VERIFICATION_RATE => Some(UPDATE_COUNT),
            _ => None,
        }
    }
}

/// 数据域对应的指标名
pub fn metrics_for_domain(domain: RecordDomain) -> &'static [&'static str] {
    match domain {
        RecordDomain::Projects => metric_names::PROJECT_METRICS,
        RecordDomain::Users => metric_names::USER_METRICS,
        RecordDomain::Transactions => metric_names::FINANCIAL_METRICS,
        RecordDomain::Impact => metric_names::IMPACT_METRICS,
    }
}

/// 指标名所属数据域（未知指标返回 None）
pub fn domain_of_metric(name: &str) -> Option<RecordDomain> {
    RecordDomain::all()
        .iter()
        .copied()
        .find(|d| metrics_for_domain(*d).contains(&name))
}

/// numerator / denominator × 100，分母为 0 时为 0
pub fn rate(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator * 100.0
    }
}

/// numerator / denominator，分母为 0 时为 0
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

// ==========================================
// MetricsCalculator - 指标计算引擎
// ==========================================
pub struct MetricsCalculator {
    weights: QualityWeights,
}

impl MetricsCalculator {
    pub fn new(weights: QualityWeights) -> Self {
        Self { weights }
    }

    // ==========================================
    // 项目指标
    // ==========================================

    /// 项目指标集
    ///
    /// # 参数
    /// - `projects`: 时间窗内项目
    /// - `updates`: 这些项目的进度报告（质量分使用）
    pub fn project_metrics(
        &self,
        projects: &[Project],
        updates: &[ProgressUpdate],
        now: DateTime<Utc>,
    ) -> BTreeMap<String, f64> {
        use metric_names::*;

        let total = projects.len() as f64;
        let count = |s: ProjectStatus| projects.iter().filter(|p| p.status == s).count() as f64;
        let active = count(ProjectStatus::Active);
        let completed = count(ProjectStatus::Completed);
        let failed = count(ProjectStatus::Cancelled) + count(ProjectStatus::Rejected);
        let approved = projects.iter().filter(|p| p.status.is_approved()).count() as f64;
        let reviewed = projects.iter().filter(|p| p.status.is_reviewed()).count() as f64;

        let funding_raised: f64 = projects.iter().map(|p| p.funding_raised).sum();
        let funding_goal: f64 = projects.iter().map(|p| p.funding_goal).sum();
        let progress_sum: f64 = projects.iter().map(|p| p.progress_pct).sum();

        let updates_by_project = group_updates(updates);
        let quality_sum: f64 = projects
            .iter()
            .map(|p| {
                let own = updates_by_project
                    .get(p.id.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                self.quality_score(p, own, now)
            })
            .sum();

        let mut m = BTreeMap::new();
        m.insert(TOTAL_PROJECTS.to_string(), total);
        m.insert(ACTIVE_PROJECTS.to_string(), active);
        m.insert(COMPLETED_PROJECTS.to_string(), completed);
        m.insert(COMPLETION_RATE.to_string(), rate(completed, total));
        m.insert(SUCCESS_RATE.to_string(), rate(completed, completed + failed));
        m.insert(APPROVAL_RATE.to_string(), rate(approved, reviewed));
        m.insert(AVERAGE_PROGRESS.to_string(), safe_div(progress_sum, total));
        m.insert(TOTAL_FUNDING_RAISED.to_string(), funding_raised);
        m.insert(FUNDING_RATIO.to_string(), rate(funding_raised, funding_goal));
        m.insert(QUALITY_SCORE.to_string(), safe_div(quality_sum, total));
        m
    }

    /// 单项目综合质量分 (0-100)
    ///
    /// 子分项（均为 0-100）:
    /// - 进度: progress_pct
    /// - 里程碑: 已完成里程碑占比
    /// - 报告规律性: 近 90 天报告数 / 3，封顶 1
    /// - 核验: 已核验报告占比
    pub fn quality_score(
        &self,
        project: &Project,
        updates: &[&ProgressUpdate],
        now: DateTime<Utc>,
    ) -> f64 {
        let progress = project.progress_pct.clamp(0.0, 100.0);
        let milestone = project.milestone_completion_ratio() * 100.0;

        let window_start = now - Duration::days(REPORTING_WINDOW_DAYS);
        let recent = updates
            .iter()
            .filter(|u| u.created_at >= window_start && u.created_at <= now)
            .count() as f64;
        let reporting = (recent / EXPECTED_REPORTS_PER_WINDOW).min(1.0) * 100.0;

        let verified = updates
            .iter()
            .filter(|u| u.status == UpdateStatus::Verified)
            .count() as f64;
        let verification = rate(verified, updates.len() as f64);

        let w = &self.weights;
        progress * w.progress
            + milestone * w.milestone
            + reporting * w.reporting
            + verification * w.verification
    }

    // ==========================================
    // 用户指标
    // ==========================================

    pub fn user_metrics(
        &self,
        users: &[User],
        frame: &TimeFrame,
        now: DateTime<Utc>,
    ) -> BTreeMap<String, f64> {
        use metric_names::*;

        let total = users.len() as f64;
        let new_users = users.iter().filter(|u| frame.contains(u.created_at)).count() as f64;
        let active_since = now - Duration::days(ACTIVE_USER_WINDOW_DAYS);
        let active = users
            .iter()
            .filter(|u| u.last_active_at.map(|t| t >= active_since).unwrap_or(false))
            .count() as f64;
        let purchases: f64 = users.iter().map(|u| u.purchase_count as f64).sum();

        let mut m = BTreeMap::new();
        m.insert(TOTAL_USERS.to_string(), total);
        m.insert(NEW_USERS.to_string(), new_users);
        m.insert(ACTIVE_USERS.to_string(), active);
        m.insert(RETENTION_RATE.to_string(), rate(active, total));
        m.insert(AVERAGE_PURCHASES.to_string(), safe_div(purchases, total));
        m
    }

    // ==========================================
    // 财务指标
    // ==========================================

    /// 财务指标集
    ///
    /// 营收 = 已完成的购买/注销交易金额；退款单独统计，净营收不低于 0
    pub fn financial_metrics(&self, transactions: &[Transaction]) -> BTreeMap<String, f64> {
        use metric_names::*;

        let total = transactions.len() as f64;
        let completed: Vec<&Transaction> = transactions
            .iter()
            .filter(|t| t.status == TransactionStatus::Completed)
            .collect();
        let revenue_txns: Vec<&&Transaction> =
            completed.iter().filter(|t| t.kind.is_revenue()).collect();

        let revenue: f64 = revenue_txns.iter().map(|t| t.amount).sum();
        let credits_sold: f64 = revenue_txns.iter().map(|t| t.credits).sum();
        let refunded: Vec<&Transaction> = transactions
            .iter()
            .filter(|t| {
                t.status == TransactionStatus::Refunded
                    || (t.kind == TransactionKind::Refund && t.status == TransactionStatus::Completed)
            })
            .collect();
        let refunds: f64 = refunded.iter().map(|t| t.amount.abs()).sum();

        let mut m = BTreeMap::new();
        m.insert(TOTAL_REVENUE.to_string(), revenue);
        m.insert(TOTAL_REFUNDS.to_string(), refunds);
        m.insert(NET_REVENUE.to_string(), (revenue - refunds).max(0.0));
        m.insert(TRANSACTION_COUNT.to_string(), total);
        m.insert(COMPLETED_COUNT.to_string(), completed.len() as f64);
        m.insert(
            AVERAGE_TRANSACTION_VALUE.to_string(),
            safe_div(revenue, revenue_txns.len() as f64),
        );
        m.insert(
            TRANSACTION_SUCCESS_RATE.to_string(),
            rate(completed.len() as f64, total),
        );
        m.insert(REFUND_RATE.to_string(), rate(refunded.len() as f64, total));
        m.insert(CREDITS_SOLD.to_string(), credits_sold);
        m
    }

    // ==========================================
    // 影响力指标
    // ==========================================

    /// 影响力指标集
    ///
    /// # 参数
    /// - `updates`: 时间窗内进度报告（驳回的报告不计入减排量）
    /// - `projects`: 签发碳信用统计所用项目
    pub fn impact_metrics(
        &self,
        updates: &[ProgressUpdate],
        projects: &[Project],
    ) -> BTreeMap<String, f64> {
        use metric_names::*;

        let accepted: Vec<&ProgressUpdate> = updates
            .iter()
            .filter(|u| u.status != UpdateStatus::Rejected)
            .collect();
        let carbon: f64 = accepted.iter().map(|u| u.carbon_impact).sum();
        let verified = updates
            .iter()
            .filter(|u| u.status == UpdateStatus::Verified)
            .count() as f64;
        let reporting_projects: BTreeSet<&str> =
            accepted.iter().map(|u| u.project_id.as_str()).collect();
        let credits_issued: f64 = projects.iter().map(|p| p.credits_issued).sum();

        let mut m = BTreeMap::new();
        m.insert(TOTAL_CARBON_IMPACT.to_string(), carbon);
        m.insert(UPDATE_COUNT.to_string(), updates.len() as f64);
        m.insert(VERIFIED_COUNT.to_string(), verified);
        m.insert(VERIFICATION_RATE.to_string(), rate(verified, updates.len() as f64));
        m.insert(
            AVERAGE_IMPACT_PER_PROJECT.to_string(),
            safe_div(carbon, reporting_projects.len() as f64),
        );
        m.insert(CREDITS_ISSUED.to_string(), credits_issued);
        m
    }
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self::new(QualityWeights::default())
    }
}

/// 按项目归集进度报告
pub fn group_updates(updates: &[ProgressUpdate]) -> HashMap<&str, Vec<&ProgressUpdate>> {
    let mut map: HashMap<&str, Vec<&ProgressUpdate>> = HashMap::new();
    for u in updates {
        map.entry(u.project_id.as_str()).or_default().push(u);
    }
    map
}
