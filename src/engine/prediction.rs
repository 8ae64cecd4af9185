// ==========================================
// 平台运营分析引擎 - 实体预测引擎
// ==========================================
// 职责: 项目完工概率 / 预计完工日期 / 风险因子；用户流失概率
// 输入: 单个实体 + 其进度报告 + 当前时间（显式传入）
// 输出: Prediction
// ==========================================
// 红线: 纯函数、确定性，不读取系统时钟
// 红线: 完工概率 ∈ [completion_min, completion_max]（百分比）
// 红线: 流失概率 ∈ [churn_min, churn_max]（小数）
// 红线: 风险规则相互独立，可同时触发
// ==========================================

use crate::config::PredictionConfig;
use crate::domain::prediction::{Prediction, PredictionKind, RiskFactor, RiskType};
use crate::domain::record::{ProgressUpdate, Project, User};
use crate::domain::types::Severity;
use crate::i18n;
use chrono::{DateTime, Duration, Utc};

// ==========================================
// RiskRule - 风险规则（策略）
// ==========================================
pub trait RiskRule: Send + Sync {
    /// 规则名（日志使用）
    fn name(&self) -> &'static str;

    /// 评估单个项目；不触发时返回 None
    fn evaluate(
        &self,
        project: &Project,
        updates: &[&ProgressUpdate],
        now: DateTime<Utc>,
        config: &PredictionConfig,
    ) -> Option<(RiskType, f64, Severity)>;
}

/// 存在已逾期未完成的里程碑
pub struct TimelineDelayRule;

impl RiskRule for TimelineDelayRule {
    fn name(&self) -> &'static str {
        "timeline_delay"
    }

    fn evaluate(
        &self,
        project: &Project,
        _updates: &[&ProgressUpdate],
        now: DateTime<Utc>,
        config: &PredictionConfig,
    ) -> Option<(RiskType, f64, Severity)> {
        project
            .milestones
            .iter()
            .any(|m| m.is_overdue(now))
            .then_some((
                RiskType::TimelineDelay,
                config.timeline_delay_probability,
                Severity::High,
            ))
    }
}

/// 长时间没有进度报告
pub struct CommunicationGapRule;

impl RiskRule for CommunicationGapRule {
    fn name(&self) -> &'static str {
        "communication_gap"
    }

    fn evaluate(
        &self,
        project: &Project,
        updates: &[&ProgressUpdate],
        now: DateTime<Utc>,
        config: &PredictionConfig,
    ) -> Option<(RiskType, f64, Severity)> {
        let last_contact = updates
            .iter()
            .map(|u| u.created_at)
            .chain(project.last_update_at)
            .max()
            .unwrap_or(project.created_at);

        (now - last_contact > Duration::days(config.communication_gap_days)).then_some((
            RiskType::CommunicationGap,
            config.communication_gap_probability,
            Severity::Medium,
        ))
    }
}

/// 融资目标过高
pub struct FundingRiskRule;

impl RiskRule for FundingRiskRule {
    fn name(&self) -> &'static str {
        "funding_risk"
    }

    fn evaluate(
        &self,
        project: &Project,
        _updates: &[&ProgressUpdate],
        _now: DateTime<Utc>,
        config: &PredictionConfig,
    ) -> Option<(RiskType, f64, Severity)> {
        (project.funding_goal > config.funding_risk_threshold).then_some((
            RiskType::FundingRisk,
            config.funding_risk_probability,
            Severity::High,
        ))
    }
}

/// 默认规则集
pub fn default_risk_rules() -> Vec<Box<dyn RiskRule>> {
    vec![
        Box::new(TimelineDelayRule),
        Box::new(CommunicationGapRule),
        Box::new(FundingRiskRule),
    ]
}

/// 时间点加若干天；超出可表示范围时返回 None
fn add_days(base: DateTime<Utc>, days: f64) -> Option<DateTime<Utc>> {
    if !days.is_finite() || days.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_days(days as i64).and_then(|d| base.checked_add_signed(d))
}

// ==========================================
// PredictionEngine - 实体预测引擎
// ==========================================
pub struct PredictionEngine {
    config: PredictionConfig,
    rules: Vec<Box<dyn RiskRule>>,
    locale: String,
}

impl PredictionEngine {
    pub fn new(config: PredictionConfig, locale: &str) -> Self {
        Self::with_rules(config, default_risk_rules(), locale)
    }

    /// 使用自定义规则集构造
    pub fn with_rules(config: PredictionConfig, rules: Vec<Box<dyn RiskRule>>, locale: &str) -> Self {
        Self {
            config,
            rules,
            locale: locale.to_string(),
        }
    }

    // ==========================================
    // 项目
    // ==========================================

    /// 完工概率（百分比）
    ///
    /// base + progress × weight + 近期报告加分 + 里程碑完成率 × weight，截断到 [min, max]
    pub fn completion_probability(
        &self,
        project: &Project,
        updates: &[&ProgressUpdate],
        now: DateTime<Utc>,
    ) -> f64 {
        let c = &self.config;
        let mut score = c.completion_base + project.progress_pct * c.progress_weight;

        let recent_since = now - Duration::days(c.recent_update_days);
        if updates.iter().any(|u| u.created_at >= recent_since) {
            score += c.recent_update_bonus;
        }

        score += project.milestone_completion_ratio() * c.milestone_weight;

        if !score.is_finite() {
            return c.completion_min;
        }
        score.clamp(c.completion_min, c.completion_max)
    }

    /// 预计完工日期
    ///
    /// 取最近两次报告做线性外推；速率 <= 0 或样本不足时，
    /// 以申报完工日期（无则 now）+ fallback_completion_days 兜底
    pub fn expected_completion_date(
        &self,
        project: &Project,
        updates: &[&ProgressUpdate],
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let fallback = add_days(
            project.estimated_completion.unwrap_or(now),
            self.config.fallback_completion_days as f64,
        )
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut samples: Vec<&&ProgressUpdate> = updates.iter().collect();
        samples.sort_by_key(|u| u.created_at);
        let (prev, last) = match samples.as_slice() {
            [.., prev, last] => (prev, last),
            _ => return fallback,
        };

        let days = (last.created_at - prev.created_at).num_seconds() as f64 / 86_400.0;
        if days <= 0.0 {
            return fallback;
        }
        let rate = (last.progress_pct - prev.progress_pct) / days;
        if rate <= 0.0 {
            return fallback;
        }

        let remaining_days = ((100.0 - last.progress_pct).max(0.0) / rate).ceil();
        // 速率极慢时外推日期超出可表示范围
        add_days(now, remaining_days).unwrap_or(fallback)
    }

    /// 风险因子（所有触发的规则）
    pub fn risk_factors(
        &self,
        project: &Project,
        updates: &[&ProgressUpdate],
        now: DateTime<Utc>,
    ) -> Vec<RiskFactor> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let fired = rule.evaluate(project, updates, now, &self.config)?;
                tracing::debug!(project_id = %project.id, rule = rule.name(), "风险规则触发");
                Some(fired)
            })
            .map(|(risk_type, probability, severity)| RiskFactor {
                mitigation: i18n::t_in(
                    &self.locale,
                    &format!("risk.mitigation.{}", risk_type.as_str()),
                    &[],
                ),
                risk_type,
                probability,
                severity,
            })
            .collect()
    }

    /// 项目完整预测
    pub fn predict_project(
        &self,
        project: &Project,
        updates: &[&ProgressUpdate],
        now: DateTime<Utc>,
    ) -> Prediction {
        Prediction {
            entity_id: project.id.clone(),
            kind: PredictionKind::ProjectCompletion,
            probability: self.completion_probability(project, updates, now),
            risk_factors: self.risk_factors(project, updates, now),
            expected_date: Some(self.expected_completion_date(project, updates, now)),
        }
    }

    // ==========================================
    // 用户
    // ==========================================

    /// 流失概率（小数）
    pub fn churn_probability(&self, user: &User, now: DateTime<Utc>) -> f64 {
        let c = &self.config;
        let mut p = c.churn_base;

        let idle = now - user.last_seen();
        if idle > Duration::days(c.inactive_days) {
            p += c.inactive_penalty;
        }
        if idle > Duration::days(c.dormant_days) {
            p += c.dormant_penalty;
        }

        if user.purchase_count > c.loyal_purchase_threshold
            || user.projects_created > c.loyal_projects_threshold
        {
            p -= c.loyalty_discount;
        }
        if user.purchase_count == 0 && user.projects_created == 0 {
            p += c.no_engagement_penalty;
        }

        let recent_since = now - Duration::days(c.recent_activity_days);
        if user.last_active_at.map(|t| t >= recent_since).unwrap_or(false) {
            p -= c.recent_activity_discount;
        }

        p.clamp(c.churn_min, c.churn_max)
    }

    pub fn predict_user(&self, user: &User, now: DateTime<Utc>) -> Prediction {
        Prediction {
            entity_id: user.id.clone(),
            kind: PredictionKind::UserChurn,
            probability: self.churn_probability(user, now),
            risk_factors: Vec::new(),
            expected_date: None,
        }
    }
}

impl Default for PredictionEngine {
    fn default() -> Self {
        Self::new(PredictionConfig::default(), "en")
    }
}
