// ==========================================
// 平台运营分析引擎 - 运行监控领域模型
// ==========================================
// 职责: 实时计数 / 组件健康 / 系统健康
// ==========================================

use crate::domain::types::HealthStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// LiveCounters - 实时计数快照
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveCounters {
    pub transactions_today: usize,
    pub revenue_today: f64,
    pub new_users_today: usize,
    pub active_projects: usize,
    pub active_alerts: usize,
    pub critical_alerts: usize,
    pub captured_at: Option<DateTime<Utc>>,
}

// ==========================================
// ComponentHealth - 单组件健康
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub component: String,
    pub status: HealthStatus,
    pub active_alerts: usize,
    pub message: String,
}

// ==========================================
// SystemHealth - 系统整体健康
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    pub overall: HealthStatus,     // 所有组件中最差的状态
    pub components: Vec<ComponentHealth>,
    pub recommendations: Vec<String>,
    pub checked_at: DateTime<Utc>,
}
