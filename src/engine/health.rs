// ==========================================
// 平台运营分析引擎 - 系统健康评估引擎
// ==========================================
// 职责: 由活跃告警推导组件健康状态，汇总实时计数
// 规则: 有 critical 告警 → critical；有 high 告警 → degraded；否则 healthy
// 红线: 整体状态 = 所有组件中最差的状态
// ==========================================

use crate::domain::monitoring::{ComponentHealth, LiveCounters, SystemHealth};
use crate::domain::record::{Alert, Project, Transaction, User};
use crate::domain::types::{AlertStatus, HealthStatus, ProjectStatus, Severity, TransactionStatus};
use crate::i18n;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// 无告警时也会出现在健康报告中的核心组件
pub const CORE_COMPONENTS: &[&str] = &["api", "database", "payments", "scheduler"];

pub struct HealthEngine {
    locale: String,
}

impl HealthEngine {
    pub fn new(locale: &str) -> Self {
        Self {
            locale: locale.to_string(),
        }
    }

    /// 评估系统健康
    ///
    /// # 参数
    /// - `alerts`: 告警列表（已解决的告警被忽略）
    pub fn assess(&self, alerts: &[Alert], now: DateTime<Utc>) -> SystemHealth {
        let mut by_component: BTreeMap<&str, Vec<&Alert>> = CORE_COMPONENTS
            .iter()
            .map(|c| (*c, Vec::new()))
            .collect();
        for alert in alerts.iter().filter(|a| a.status != AlertStatus::Resolved) {
            by_component
                .entry(alert.component.as_str())
                .or_default()
                .push(alert);
        }

        let components: Vec<ComponentHealth> = by_component
            .into_iter()
            .map(|(component, active)| self.component_health(component, &active))
            .collect();

        let overall = components
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        SystemHealth {
            overall,
            recommendations: self.recommendations(&components),
            components,
            checked_at: now,
        }
    }

    fn component_health(&self, component: &str, active: &[&Alert]) -> ComponentHealth {
        let worst = active.iter().map(|a| a.severity).max();
        let status = match worst {
            Some(Severity::Critical) => HealthStatus::Critical,
            Some(Severity::High) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        };

        let count = active.len().to_string();
        let message = match (status, worst) {
            (HealthStatus::Critical, _) => {
                i18n::t_in(&self.locale, "health.component.critical", &[("count", &count)])
            }
            (_, Some(severity)) => i18n::t_in(
                &self.locale,
                "health.component.degraded",
                &[("count", &count), ("severity", severity.as_str())],
            ),
            (_, None) => i18n::t_in(&self.locale, "health.component.healthy", &[]),
        };

        ComponentHealth {
            component: component.to_string(),
            status,
            active_alerts: active.len(),
            message,
        }
    }

    /// 建议: 严重组件优先，其次降级组件；全部健康时给出一条确认信息
    fn recommendations(&self, components: &[ComponentHealth]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for (status, key) in [
            (HealthStatus::Critical, "health.recommendation.critical"),
            (HealthStatus::Degraded, "health.recommendation.degraded"),
        ] {
            out.extend(
                components
                    .iter()
                    .filter(|c| c.status == status)
                    .map(|c| i18n::t_in(&self.locale, key, &[("component", &c.component)])),
            );
        }
        if out.is_empty() {
            out.push(i18n::t_in(&self.locale, "health.recommendation.healthy", &[]));
        }
        out
    }

    /// 实时计数
    ///
    /// # 参数
    /// - `transactions_today` / `new_users_today`: 当日取数结果
    /// - `projects`: 全部项目（统计进行中项目）
    /// - `alerts`: 未解决告警
    pub fn live_counters(
        &self,
        transactions_today: &[Transaction],
        new_users_today: &[User],
        projects: &[Project],
        alerts: &[Alert],
        now: DateTime<Utc>,
    ) -> LiveCounters {
        let revenue_today = transactions_today
            .iter()
            .filter(|t| t.status == TransactionStatus::Completed && t.kind.is_revenue())
            .map(|t| t.amount)
            .sum();
        let open_alerts: Vec<&Alert> = alerts
            .iter()
            .filter(|a| a.status != AlertStatus::Resolved)
            .collect();

        LiveCounters {
            transactions_today: transactions_today.len(),
            revenue_today,
            new_users_today: new_users_today.len(),
            active_projects: projects
                .iter()
                .filter(|p| p.status == ProjectStatus::Active)
                .count(),
            active_alerts: open_alerts.len(),
            critical_alerts: open_alerts
                .iter()
                .filter(|a| a.severity == Severity::Critical)
                .count(),
            captured_at: Some(now),
        }
    }
}

impl Default for HealthEngine {
    fn default() -> Self {
        Self::new("en")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn create_test_alert(component: &str, severity: Severity, status: AlertStatus) -> Alert {
        Alert {
            id: uuid::Uuid::new_v4().to_string(),
            component: component.to_string(),
            severity,
            status,
            message: "test".to_string(),
            created_at: now(),
        }
    }

    #[test]
    fn test_all_healthy_without_alerts() {
        let health = HealthEngine::default().assess(&[], now());
        assert_eq!(health.overall, HealthStatus::Healthy);
        assert_eq!(health.components.len(), CORE_COMPONENTS.len());
        assert_eq!(health.recommendations.len(), 1);
    }

    #[test]
    fn test_worst_component_wins() {
        let alerts = vec![
            create_test_alert("payments", Severity::High, AlertStatus::Active),
            create_test_alert("database", Severity::Critical, AlertStatus::Acknowledged),
            create_test_alert("api", Severity::Critical, AlertStatus::Resolved),
            create_test_alert("search", Severity::Low, AlertStatus::Active),
        ];
        let health = HealthEngine::default().assess(&alerts, now());

        assert_eq!(health.overall, HealthStatus::Critical);
        let status_of = |name: &str| {
            health
                .components
                .iter()
                .find(|c| c.component == name)
                .map(|c| c.status)
                .unwrap()
        };
        assert_eq!(status_of("database"), HealthStatus::Critical);
        assert_eq!(status_of("payments"), HealthStatus::Degraded);
        assert_eq!(status_of("api"), HealthStatus::Healthy);
        assert_eq!(status_of("search"), HealthStatus::Healthy);
        // critical 在前
        assert!(health.recommendations[0].contains("database"));
        assert_eq!(health.recommendations.len(), 2);
    }

    #[test]
    fn test_live_counters() {
        let alerts = vec![
            create_test_alert("db", Severity::Critical, AlertStatus::Active),
            create_test_alert("db", Severity::Low, AlertStatus::Resolved),
        ];
        let counters = HealthEngine::default().live_counters(&[], &[], &[], &alerts, now());
        assert_eq!(counters.active_alerts, 1);
        assert_eq!(counters.critical_alerts, 1);
        assert_eq!(counters.revenue_today, 0.0);
        assert_eq!(counters.captured_at, Some(now()));
    }
}
