// ==========================================
// 平台运营分析引擎 - 运营记录领域模型
// ==========================================
// 职责: 项目/用户/交易/进度报告/告警五类只读记录
// 红线: 记录由外部协作方拥有和修改，引擎只读取不可变副本
// ==========================================

use crate::domain::time_frame::Filterable;
use crate::domain::types::{
    AlertStatus, MilestoneStatus, ProjectStatus, RecordDomain, Role, Severity, TransactionKind,
    TransactionStatus, UpdateStatus, UserStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Timestamped - 带创建时间的记录
// ==========================================
/// 分桶器与时间序列使用的最小接口
pub trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
}

// ==========================================
// Project - 项目
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub name: String,
    pub planned_date: DateTime<Utc>,
    pub status: MilestoneStatus,
}

impl Milestone {
    /// 计划日期已过且未完成
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.planned_date < now && self.status != MilestoneStatus::Completed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub project_type: String,      // 项目类型（如 reforestation / solar）
    pub region: String,
    pub status: ProjectStatus,

    // ===== 度量 =====
    pub progress_pct: f64,         // 当前进度 (0-100)
    pub funding_goal: f64,         // 融资目标
    pub funding_raised: f64,       // 已融资
    pub credits_issued: f64,       // 已签发碳信用

    // ===== 计划 =====
    pub estimated_completion: Option<DateTime<Utc>>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,

    // ===== 元数据 =====
    pub created_at: DateTime<Utc>,
    pub last_update_at: Option<DateTime<Utc>>,
}

impl Project {
    /// 已完成里程碑占比 (0.0-1.0)，无里程碑时为 0
    pub fn milestone_completion_ratio(&self) -> f64 {
        if self.milestones.is_empty() {
            return 0.0;
        }
        let completed = self
            .milestones
            .iter()
            .filter(|m| m.status == MilestoneStatus::Completed)
            .count();
        completed as f64 / self.milestones.len() as f64
    }
}

impl Timestamped for Project {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Filterable for Project {
    fn filter_status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
    fn filter_category(&self) -> Option<&str> {
        Some(&self.project_type)
    }
    fn filter_region(&self) -> Option<&str> {
        Some(&self.region)
    }
    fn filter_project_id(&self) -> Option<&str> {
        Some(&self.id)
    }
    fn filter_user_id(&self) -> Option<&str> {
        Some(&self.owner_id)
    }
    fn filter_amount(&self) -> Option<f64> {
        Some(self.funding_goal)
    }
}

// ==========================================
// User - 用户
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub role: Role,
    pub status: UserStatus,
    pub region: String,
    pub created_at: DateTime<Utc>,
    pub last_active_at: Option<DateTime<Utc>>,
    pub purchase_count: u32,
    pub projects_created: u32,
}

impl User {
    /// 最近一次活跃时间（从未活跃时以注册时间计）
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_active_at.unwrap_or(self.created_at)
    }
}

impl Timestamped for User {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Filterable for User {
    fn filter_status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
    fn filter_category(&self) -> Option<&str> {
        Some(self.role.as_str())
    }
    fn filter_region(&self) -> Option<&str> {
        Some(&self.region)
    }
    fn filter_user_id(&self) -> Option<&str> {
        Some(&self.id)
    }
}

// ==========================================
// Transaction - 交易
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    pub project_id: Option<String>,
    pub kind: TransactionKind,
    pub status: TransactionStatus,
    pub payment_method: String,
    pub amount: f64,               // 金额
    pub credits: f64,              // 碳信用数量
    pub created_at: DateTime<Utc>,
}

impl Timestamped for Transaction {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Filterable for Transaction {
    fn filter_status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
    fn filter_category(&self) -> Option<&str> {
        Some(self.kind.as_str())
    }
    fn filter_project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }
    fn filter_user_id(&self) -> Option<&str> {
        Some(&self.user_id)
    }
    fn filter_amount(&self) -> Option<f64> {
        Some(self.amount)
    }
}

// ==========================================
// ProgressUpdate - 进度报告（影响力数据域）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub id: String,
    pub project_id: String,
    pub update_type: String,
    pub status: UpdateStatus,
    pub progress_pct: f64,
    pub carbon_impact: f64,        // 碳减排量 (tCO2e)
    pub created_at: DateTime<Utc>,
}

impl Timestamped for ProgressUpdate {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Filterable for ProgressUpdate {
    fn filter_status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
    fn filter_category(&self) -> Option<&str> {
        Some(&self.update_type)
    }
    fn filter_project_id(&self) -> Option<&str> {
        Some(&self.project_id)
    }
    fn filter_amount(&self) -> Option<f64> {
        Some(self.carbon_impact)
    }
}

// ==========================================
// Alert - 告警
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub component: String,
    pub severity: Severity,
    pub status: AlertStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Timestamped for Alert {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Filterable for Alert {
    fn filter_status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }
    fn filter_category(&self) -> Option<&str> {
        Some(&self.component)
    }
}

// ==========================================
// DomainRecords - 单个数据域的记录集合
// ==========================================
/// 一次流水线运行取得的不可变记录集
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", content = "records", rename_all = "snake_case")]
pub enum DomainRecords {
    Projects(Vec<Project>),
    Users(Vec<User>),
    Transactions(Vec<Transaction>),
    Impact(Vec<ProgressUpdate>),
}

impl DomainRecords {
    /// 指定数据域的空记录集
    pub fn empty(domain: RecordDomain) -> Self {
        match domain {
            RecordDomain::Projects => DomainRecords::Projects(Vec::new()),
            RecordDomain::Users => DomainRecords::Users(Vec::new()),
            RecordDomain::Transactions => DomainRecords::Transactions(Vec::new()),
            RecordDomain::Impact => DomainRecords::Impact(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DomainRecords::Projects(v) => v.len(),
            DomainRecords::Users(v) => v.len(),
            DomainRecords::Transactions(v) => v.len(),
            DomainRecords::Impact(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn domain(&self) -> RecordDomain {
        match self {
            DomainRecords::Projects(_) => RecordDomain::Projects,
            DomainRecords::Users(_) => RecordDomain::Users,
            DomainRecords::Transactions(_) => RecordDomain::Transactions,
            DomainRecords::Impact(_) => RecordDomain::Impact,
        }
    }

    // 其它数据域返回空切片
    pub fn as_projects(&self) -> &[Project] {
        match self {
            DomainRecords::Projects(v) => v,
            _ => &[],
        }
    }

    pub fn as_users(&self) -> &[User] {
        match self {
            DomainRecords::Users(v) => v,
            _ => &[],
        }
    }

    pub fn as_transactions(&self) -> &[Transaction] {
        match self {
            DomainRecords::Transactions(v) => v,
            _ => &[],
        }
    }

    pub fn as_updates(&self) -> &[ProgressUpdate] {
        match self {
            DomainRecords::Impact(v) => v,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_milestone_overdue() {
        let m = Milestone {
            name: "baseline".to_string(),
            planned_date: ts(1),
            status: MilestoneStatus::InProgress,
        };
        assert!(m.is_overdue(ts(2)));
        assert!(!m.is_overdue(ts(1)));

        let done = Milestone { status: MilestoneStatus::Completed, ..m };
        assert!(!done.is_overdue(ts(2)));
    }

    #[test]
    fn test_user_last_seen_falls_back_to_created_at() {
        let user = User {
            id: "U1".to_string(),
            role: Role::Buyer,
            status: UserStatus::Active,
            region: "eu".to_string(),
            created_at: ts(1),
            last_active_at: None,
            purchase_count: 0,
            projects_created: 0,
        };
        assert_eq!(user.last_seen(), ts(1));
    }
}
