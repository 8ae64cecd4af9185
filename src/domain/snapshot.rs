// ==========================================
// 平台运营分析引擎 - 分析快照领域模型
// ==========================================
// 用途: 历史对比的只读数据源
// 红线: 以 (周期起点, 粒度, domain) 为键，只写一次，永不修改，到期清理
// ==========================================

use crate::domain::aggregate::AggregatedResult;
use crate::domain::types::{Granularity, RecordDomain};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub snapshot_id: String,
    pub snapshot_date: NaiveDate,      // 快照所属周期的起始日期
    pub domain: RecordDomain,
    pub granularity: Granularity,

    // ===== 覆盖周期 =====
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,

    // ===== 聚合数据 =====
    pub record_count: usize,
    pub aggregated: AggregatedResult,

    // ===== 元数据 =====
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AnalyticsSnapshot {
    /// 唯一键，见 snapshot_key
    pub fn natural_key(&self) -> String {
        snapshot_key(self.period_start, self.granularity, self.domain)
    }
}

/// 构造快照唯一键: "{周期起点}/{粒度}/{domain}"
///
/// 周期起点按日期书写，小时粒度精确到小时，以日期为前缀即可按日查询
pub fn snapshot_key(
    period_start: DateTime<Utc>,
    granularity: Granularity,
    domain: RecordDomain,
) -> String {
    let stamp = match granularity {
        Granularity::Hourly => period_start.format("%Y-%m-%dT%H:00"),
        _ => period_start.format("%Y-%m-%d"),
    };
    format!("{}/{}/{}", stamp, granularity.as_str(), domain.as_str())
}
