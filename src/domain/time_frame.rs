// ==========================================
// 平台运营分析引擎 - 时间窗与过滤条件
// ==========================================
// 职责: TimeFrame（分析时间窗）与 DataFilters（记录过滤谓词）
// 红线: start <= end，否则在任何取数之前拒绝
// ==========================================

use crate::domain::types::Granularity;
use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// TimeFrame - 分析时间窗
// ==========================================
/// 分析时间窗，记录归属按半开区间 [start, end) 判定
///
/// 与分桶规则一致：紧邻的两个时间窗不会重复计数同一条记录。
/// 时区以固定 UTC 偏移（分钟）表示，分桶边界按本地时间计算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeFrame {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub granularity: Granularity,
    #[serde(default)]
    pub tz_offset_minutes: Option<i32>,
}

impl TimeFrame {
    /// 创建时间窗并校验 start <= end
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        granularity: Granularity,
    ) -> Result<Self, String> {
        let frame = Self {
            start,
            end,
            granularity,
            tz_offset_minutes: None,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// 指定时区偏移
    pub fn with_tz_offset(mut self, minutes: i32) -> Self {
        self.tz_offset_minutes = Some(minutes);
        self
    }

    /// 校验时间窗
    pub fn validate(&self) -> Result<(), String> {
        if self.start > self.end {
            return Err(format!(
                "时间窗非法: start={} 晚于 end={}",
                self.start.to_rfc3339(),
                self.end.to_rfc3339()
            ));
        }
        if let Some(minutes) = self.tz_offset_minutes {
            if minutes.checked_mul(60).and_then(FixedOffset::east_opt).is_none() {
                return Err(format!("时区偏移非法: {} 分钟", minutes));
            }
        }
        Ok(())
    }

    /// 时区偏移（非法或缺省时为 UTC）
    pub fn offset(&self) -> FixedOffset {
        self.tz_offset_minutes
            .and_then(|m| m.checked_mul(60))
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(utc_offset)
    }

    /// 时间窗长度
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// 紧邻的前一个等长时间窗（用于环比增长）
    pub fn previous_window(&self) -> TimeFrame {
        let length = self.duration();
        TimeFrame {
            start: self.start - length,
            end: self.start,
            granularity: self.granularity,
            tz_offset_minutes: self.tz_offset_minutes,
        }
    }

    /// 时间点是否落在时间窗内（半开区间）
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// 从 Unix 纪元到 end 的全量时间窗（按 ID 补充查询关联记录时使用）
    pub fn up_to(end: DateTime<Utc>, granularity: Granularity) -> Self {
        Self {
            start: DateTime::<Utc>::UNIX_EPOCH,
            end,
            granularity,
            tz_offset_minutes: None,
        }
    }
}

/// UTC 固定偏移
pub fn utc_offset() -> FixedOffset {
    Utc.fix()
}

// ==========================================
// DataFilters - 记录过滤谓词
// ==========================================
/// 记录过滤条件（所有字段可选，None 表示不过滤）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFilters {
    #[serde(default)]
    pub statuses: Option<Vec<String>>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub regions: Option<Vec<String>>,
    #[serde(default)]
    pub project_ids: Option<Vec<String>>,
    #[serde(default)]
    pub user_ids: Option<Vec<String>>,
    #[serde(default)]
    pub min_amount: Option<f64>,
    #[serde(default)]
    pub max_amount: Option<f64>,
}

/// 可被 DataFilters 过滤的记录
///
/// 每个字段返回 None 表示该记录不具备此属性（此时该条件不参与过滤）
pub trait Filterable {
    fn filter_status(&self) -> Option<&str>;
    fn filter_category(&self) -> Option<&str>;
    fn filter_region(&self) -> Option<&str> {
        None
    }
    fn filter_project_id(&self) -> Option<&str> {
        None
    }
    fn filter_user_id(&self) -> Option<&str> {
        None
    }
    fn filter_amount(&self) -> Option<f64> {
        None
    }
}

impl DataFilters {
    pub fn is_empty(&self) -> bool {
        *self == DataFilters::default()
    }

    pub fn with_statuses(mut self, statuses: &[&str]) -> Self {
        self.statuses = Some(statuses.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.categories = Some(categories.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_regions(mut self, regions: &[&str]) -> Self {
        self.regions = Some(regions.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_project_ids<S: AsRef<str>>(mut self, ids: &[S]) -> Self {
        self.project_ids = Some(ids.iter().map(|s| s.as_ref().to_string()).collect());
        self
    }

    pub fn with_amount_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    /// 判断记录是否满足全部过滤条件
    ///
    /// 所有数据域共用这一个判定，保证过滤语义一致
    pub fn matches<R: Filterable + ?Sized>(&self, record: &R) -> bool {
        list_matches(&self.statuses, record.filter_status())
            && list_matches(&self.categories, record.filter_category())
            && list_matches(&self.regions, record.filter_region())
            && list_matches(&self.project_ids, record.filter_project_id())
            && list_matches(&self.user_ids, record.filter_user_id())
            && self.amount_matches(record.filter_amount())
    }

    fn amount_matches(&self, amount: Option<f64>) -> bool {
        let Some(value) = amount else {
            return true;
        };
        if let Some(min) = self.min_amount {
            if value < min {
                return false;
            }
        }
        if let Some(max) = self.max_amount {
            if value > max {
                return false;
            }
        }
        true
    }
}

fn list_matches(allowed: &Option<Vec<String>>, value: Option<&str>) -> bool {
    match (allowed, value) {
        (Some(list), Some(v)) => list.iter().any(|a| a.eq_ignore_ascii_case(v)),
        _ => true,
    }
}
