// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

use chrono::{DateTime, Utc};
use impact_analytics::domain::types::{
    AlertStatus, MilestoneStatus, ProjectStatus, Role, Severity, TransactionKind,
    TransactionStatus, UpdateStatus, UserStatus,
};
use impact_analytics::domain::{Alert, Milestone, ProgressUpdate, Project, Transaction, User};

// ==========================================
// Project 构建器
// ==========================================

pub struct ProjectBuilder {
    project: Project,
}

impl ProjectBuilder {
    pub fn new(id: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            project: Project {
                id: id.to_string(),
                name: format!("Project {}", id),
                owner_id: "OWNER".to_string(),
                project_type: "reforestation".to_string(),
                region: "eu".to_string(),
                status: ProjectStatus::Active,
                progress_pct: 0.0,
                funding_goal: 10_000.0,
                funding_raised: 0.0,
                credits_issued: 0.0,
                estimated_completion: None,
                milestones: Vec::new(),
                created_at,
                last_update_at: None,
            },
        }
    }

    pub fn status(mut self, status: ProjectStatus) -> Self {
        self.project.status = status;
        self
    }

    pub fn project_type(mut self, project_type: &str) -> Self {
        self.project.project_type = project_type.to_string();
        self
    }

    pub fn region(mut self, region: &str) -> Self {
        self.project.region = region.to_string();
        self
    }

    pub fn progress(mut self, pct: f64) -> Self {
        self.project.progress_pct = pct;
        self
    }

    pub fn funding(mut self, goal: f64, raised: f64) -> Self {
        self.project.funding_goal = goal;
        self.project.funding_raised = raised;
        self
    }

    pub fn estimated_completion(mut self, at: DateTime<Utc>) -> Self {
        self.project.estimated_completion = Some(at);
        self
    }

    pub fn milestone(mut self, name: &str, planned: DateTime<Utc>, status: MilestoneStatus) -> Self {
        self.project.milestones.push(Milestone {
            name: name.to_string(),
            planned_date: planned,
            status,
        });
        self
    }

    pub fn last_update(mut self, at: DateTime<Utc>) -> Self {
        self.project.last_update_at = Some(at);
        self
    }

    pub fn build(self) -> Project {
        self.project
    }
}

// ==========================================
// User 构建器
// ==========================================

pub struct UserBuilder {
    user: User,
}

impl UserBuilder {
    pub fn new(id: &str, created_at: DateTime<Utc>) -> Self {
        Self {
            user: User {
                id: id.to_string(),
                role: Role::Buyer,
                status: UserStatus::Active,
                region: "eu".to_string(),
                created_at,
                last_active_at: None,
                purchase_count: 0,
                projects_created: 0,
            },
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.user.role = role;
        self
    }

    pub fn active_at(mut self, at: DateTime<Utc>) -> Self {
        self.user.last_active_at = Some(at);
        self
    }

    pub fn purchases(mut self, count: u32) -> Self {
        self.user.purchase_count = count;
        self
    }

    pub fn projects_created(mut self, count: u32) -> Self {
        self.user.projects_created = count;
        self
    }

    pub fn build(self) -> User {
        self.user
    }
}

// ==========================================
// Transaction 构建器
// ==========================================

pub struct TransactionBuilder {
    txn: Transaction,
}

impl TransactionBuilder {
    pub fn purchase(id: &str, amount: f64, created_at: DateTime<Utc>) -> Self {
        Self {
            txn: Transaction {
                id: id.to_string(),
                user_id: "BUYER".to_string(),
                project_id: None,
                kind: TransactionKind::Purchase,
                status: TransactionStatus::Completed,
                payment_method: "card".to_string(),
                amount,
                credits: 0.0,
                created_at,
            },
        }
    }

    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.txn.kind = kind;
        self
    }

    pub fn status(mut self, status: TransactionStatus) -> Self {
        self.txn.status = status;
        self
    }

    pub fn project(mut self, project_id: &str) -> Self {
        self.txn.project_id = Some(project_id.to_string());
        self
    }

    pub fn credits(mut self, credits: f64) -> Self {
        self.txn.credits = credits;
        self
    }

    pub fn build(self) -> Transaction {
        self.txn
    }
}

// ==========================================
// ProgressUpdate 构建器
// ==========================================

pub fn progress_update(
    id: &str,
    project_id: &str,
    progress_pct: f64,
    carbon_impact: f64,
    created_at: DateTime<Utc>,
) -> ProgressUpdate {
    ProgressUpdate {
        id: id.to_string(),
        project_id: project_id.to_string(),
        update_type: "monthly".to_string(),
        status: UpdateStatus::Verified,
        progress_pct,
        carbon_impact,
        created_at,
    }
}

// ==========================================
// Alert 构建器
// ==========================================

pub fn alert(
    id: &str,
    component: &str,
    severity: Severity,
    status: AlertStatus,
    created_at: DateTime<Utc>,
) -> Alert {
    Alert {
        id: id.to_string(),
        component: component.to_string(),
        severity,
        status,
        message: format!("{} alert", component),
        created_at,
    }
}
