// ==========================================
// 平台运营分析引擎 - 领域类型定义
// ==========================================
// 职责: 分析引擎共用的枚举类型
// 序列化格式: snake_case (与数据库/报告文档一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 为 "as_str + Display + FromStr" 三件套生成样板实现
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            /// 全部取值（按声明顺序）
            pub fn all() -> &'static [$name] {
                &[$($name::$variant,)+]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().replace('-', "_").as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("未知{}取值: {}", stringify!($name), other)),
                }
            }
        }
    };
}

// ==========================================
// 时间粒度 (Granularity)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

string_enum!(Granularity {
    Hourly => "hourly",
    Daily => "daily",
    Weekly => "weekly",
    Monthly => "monthly",
    Quarterly => "quarterly",
    Yearly => "yearly",
});

impl Granularity {
    /// 一个季度包含的桶数量（用于季度预测复利）
    pub fn buckets_per_quarter(&self) -> f64 {
        match self {
            Granularity::Hourly => 24.0 * 365.0 / 4.0,
            Granularity::Daily => 365.0 / 4.0,
            Granularity::Weekly => 13.0,
            Granularity::Monthly => 3.0,
            Granularity::Quarterly => 1.0,
            Granularity::Yearly => 0.25,
        }
    }

    /// 一年包含的桶数量（用于年度预测复利）
    pub fn buckets_per_year(&self) -> f64 {
        match self {
            Granularity::Hourly => 24.0 * 365.0,
            Granularity::Daily => 365.0,
            Granularity::Weekly => 52.0,
            Granularity::Monthly => 12.0,
            Granularity::Quarterly => 4.0,
            Granularity::Yearly => 1.0,
        }
    }
}

// ==========================================
// 数据域 (Record Domain)
// ==========================================
// 四个分析数据域，告警不参与快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordDomain {
    Projects,
    Users,
    Transactions,
    Impact,
}

string_enum!(RecordDomain {
    Projects => "projects",
    Users => "users",
    Transactions => "transactions",
    Impact => "impact",
});

// ==========================================
// 项目状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    PendingReview,
    Approved,
    Active,
    Completed,
    Rejected,
    Cancelled,
}

string_enum!(ProjectStatus {
    Draft => "draft",
    PendingReview => "pending_review",
    Approved => "approved",
    Active => "active",
    Completed => "completed",
    Rejected => "rejected",
    Cancelled => "cancelled",
});

impl ProjectStatus {
    /// 是否已通过审核（审核通过后的所有状态）
    pub fn is_approved(&self) -> bool {
        matches!(
            self,
            ProjectStatus::Approved | ProjectStatus::Active | ProjectStatus::Completed
        )
    }

    /// 是否已完成审核流程（通过或驳回）
    pub fn is_reviewed(&self) -> bool {
        self.is_approved() || *self == ProjectStatus::Rejected
    }

    /// 是否处于终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProjectStatus::Completed | ProjectStatus::Rejected | ProjectStatus::Cancelled
        )
    }
}

// ==========================================
// 里程碑状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    Pending,
    InProgress,
    Completed,
}

string_enum!(MilestoneStatus {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
});

// ==========================================
// 用户角色
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Verifier,
    ProjectOwner,
    Buyer,
    Viewer,
}

string_enum!(Role {
    Admin => "admin",
    Verifier => "verifier",
    ProjectOwner => "project_owner",
    Buyer => "buyer",
    Viewer => "viewer",
});

// ==========================================
// 用户状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Suspended,
    Deactivated,
}

string_enum!(UserStatus {
    Active => "active",
    Suspended => "suspended",
    Deactivated => "deactivated",
});

// ==========================================
// 交易类型 / 交易状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Retirement,
    Transfer,
    Refund,
}

string_enum!(TransactionKind {
    Purchase => "purchase",
    Retirement => "retirement",
    Transfer => "transfer",
    Refund => "refund",
});

impl TransactionKind {
    /// 是否计入营收
    pub fn is_revenue(&self) -> bool {
        matches!(self, TransactionKind::Purchase | TransactionKind::Retirement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
    Refunded,
}

string_enum!(TransactionStatus {
    Completed => "completed",
    Pending => "pending",
    Failed => "failed",
    Refunded => "refunded",
});

// ==========================================
// 进度报告状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    Submitted,
    Verified,
    Rejected,
}

string_enum!(UpdateStatus {
    Submitted => "submitted",
    Verified => "verified",
    Rejected => "rejected",
});

// ==========================================
// 严重程度 (告警/风险因子/洞察影响)
// ==========================================
// 顺序: Low < Medium < High < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

string_enum!(Severity {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

// ==========================================
// 告警状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
}

string_enum!(AlertStatus {
    Active => "active",
    Acknowledged => "acknowledged",
    Resolved => "resolved",
});

// ==========================================
// 趋势方向
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    Volatile,
}

string_enum!(TrendDirection {
    Increasing => "increasing",
    Decreasing => "decreasing",
    Stable => "stable",
    Volatile => "volatile",
});

// ==========================================
// 对标状态
// ==========================================
// 顺序: Lagging < Competitive < Leading（单调性测试依赖此顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkStatus {
    Lagging,
    Competitive,
    Leading,
}

string_enum!(BenchmarkStatus {
    Lagging => "lagging",
    Competitive => "competitive",
    Leading => "leading",
});

// ==========================================
// 报告类型 / 报告状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    ProjectPerformance,
    UserEngagement,
    FinancialSummary,
    ImpactAssessment,
    PlatformOverview,
}

string_enum!(ReportType {
    ProjectPerformance => "project_performance",
    UserEngagement => "user_engagement",
    FinancialSummary => "financial_summary",
    ImpactAssessment => "impact_assessment",
    PlatformOverview => "platform_overview",
});

impl ReportType {
    /// 报告需要的数据域
    pub fn domains(&self) -> &'static [RecordDomain] {
        match self {
            ReportType::ProjectPerformance => &[RecordDomain::Projects, RecordDomain::Impact],
            ReportType::UserEngagement => &[RecordDomain::Users, RecordDomain::Transactions],
            ReportType::FinancialSummary => &[RecordDomain::Transactions],
            ReportType::ImpactAssessment => &[RecordDomain::Impact, RecordDomain::Projects],
            ReportType::PlatformOverview => RecordDomain::all(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Final,
    Published,
    Archived,
}

string_enum!(ReportStatus {
    Draft => "draft",
    Final => "final",
    Published => "published",
    Archived => "archived",
});

// ==========================================
// 洞察分析类型 / 洞察类别
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Performance,
    Engagement,
    Financial,
    Impact,
    Risk,
}

string_enum!(AnalysisType {
    Performance => "performance",
    Engagement => "engagement",
    Financial => "financial",
    Impact => "impact",
    Risk => "risk",
});

impl AnalysisType {
    pub fn domains(&self) -> &'static [RecordDomain] {
        match self {
            AnalysisType::Performance => &[RecordDomain::Projects, RecordDomain::Impact],
            AnalysisType::Engagement => &[RecordDomain::Users],
            AnalysisType::Financial => &[RecordDomain::Transactions],
            AnalysisType::Impact => &[RecordDomain::Impact],
            AnalysisType::Risk => &[RecordDomain::Projects, RecordDomain::Users],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Trend,
    Anomaly,
    Risk,
    Opportunity,
}

string_enum!(InsightCategory {
    Trend => "trend",
    Anomaly => "anomaly",
    Risk => "risk",
    Opportunity => "opportunity",
});

// ==========================================
// 健康状态
// ==========================================
// 顺序: Healthy < Degraded < Critical（整体状态取最差）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
}

string_enum!(HealthStatus {
    Healthy => "healthy",
    Degraded => "degraded",
    Critical => "critical",
});
