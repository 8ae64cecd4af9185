// ==========================================
// 平台运营分析引擎 - 实体预测领域模型
// ==========================================
// 职责: 完工概率 / 流失概率 / 风险因子
// ==========================================

use crate::domain::types::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// 风险因子类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskType {
    TimelineDelay,
    CommunicationGap,
    FundingRisk,
}

impl RiskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskType::TimelineDelay => "timeline_delay",
            RiskType::CommunicationGap => "communication_gap",
            RiskType::FundingRisk => "funding_risk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub risk_type: RiskType,
    pub probability: f64,
    pub severity: Severity,
    pub mitigation: String,
}

// ==========================================
// 预测类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionKind {
    ProjectCompletion,             // probability 单位: 百分比 [5, 95]
    UserChurn,                     // probability 单位: 小数 [0.05, 0.95]
}

// ==========================================
// Prediction - 单实体预测
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub entity_id: String,
    pub kind: PredictionKind,
    pub probability: f64,
    pub risk_factors: Vec<RiskFactor>,
    pub expected_date: Option<DateTime<Utc>>,
}

impl Prediction {
    pub fn has_risk(&self, risk_type: RiskType) -> bool {
        self.risk_factors.iter().any(|r| r.risk_type == risk_type)
    }

    /// 是否存在高严重度风险
    pub fn is_at_risk(&self) -> bool {
        self.risk_factors.iter().any(|r| r.severity >= Severity::High)
    }
}
