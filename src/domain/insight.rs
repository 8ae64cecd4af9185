// ==========================================
// 平台运营分析引擎 - 洞察与建议领域模型
// ==========================================

use crate::domain::types::{AnalysisType, InsightCategory, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 洞察（持久化）
///
/// impact 只使用 Low / Medium / High 三档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    pub analysis_type: AnalysisType,
    pub category: InsightCategory,
    pub title: String,
    pub description: String,
    pub metric: String,
    pub value: f64,
    pub impact: Severity,
    pub confidence: f64,
    pub generated_at: DateTime<Utc>,
}

/// 行动建议
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub priority: Severity,
    pub related_metric: Option<String>,
}
