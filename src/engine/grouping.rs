// ==========================================
// 平台运营分析引擎 - 时间窗分桶引擎
// ==========================================
// 职责: 按粒度把任意记录集合划分到时间桶
// 输入: 带创建时间的记录 + 粒度 + 时区偏移
// 输出: 桶起点 -> 记录列表 / 零填充时间序列
// ==========================================
// 红线: 桶为半开区间 [start, next_start)，恰好落在边界上的记录属于以该边界开始的桶
// 红线: 确定性、幂等；空输入 -> 空结果
// ==========================================

use crate::domain::aggregate::TimeSeriesPoint;
use crate::domain::record::Timestamped;
use crate::domain::time_frame::TimeFrame;
use crate::domain::types::Granularity;
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Timelike, Utc, Weekday,
};
use std::collections::BTreeMap;

/// 单次展开的桶数量上限（防止小粒度 + 超长时间窗）
pub const MAX_BUCKETS: usize = 100_000;

// ==========================================
// TimeGrouper - 时间窗分桶引擎
// ==========================================
pub struct TimeGrouper {
    week_start: Weekday,
}

impl TimeGrouper {
    /// 构造函数
    ///
    /// # 参数
    /// - `week_start`: 周桶起始日
    pub fn new(week_start: Weekday) -> Self {
        Self { week_start }
    }

    // ==========================================
    // 桶边界
    // ==========================================

    /// 计算时间点所在桶的起点（UTC）
    pub fn bucket_start(
        &self,
        ts: DateTime<Utc>,
        granularity: Granularity,
        offset: FixedOffset,
    ) -> DateTime<Utc> {
        let local = ts.with_timezone(&offset).naive_local();
        let date = local.date();

        let start = match granularity {
            Granularity::Hourly => midnight(date) + Duration::hours(local.hour() as i64),
            Granularity::Daily => midnight(date),
            Granularity::Weekly => {
                let days_back = (7 + date.weekday().num_days_from_monday()
                    - self.week_start.num_days_from_monday())
                    % 7;
                midnight(date - Duration::days(days_back as i64))
            }
            Granularity::Monthly => midnight(date - Duration::days(date.day0() as i64)),
            Granularity::Quarterly => {
                let month0 = date.month0() - date.month0() % 3;
                midnight(first_of_month(date.year(), month0 + 1))
            }
            Granularity::Yearly => midnight(date - Duration::days(date.ordinal0() as i64)),
        };

        to_utc(start, offset)
    }

    /// 计算下一个桶的起点（UTC）
    pub fn next_bucket_start(
        &self,
        start: DateTime<Utc>,
        granularity: Granularity,
        offset: FixedOffset,
    ) -> DateTime<Utc> {
        let local = start.with_timezone(&offset).naive_local();
        let next = match granularity {
            Granularity::Hourly => local + Duration::hours(1),
            Granularity::Daily => local + Duration::days(1),
            Granularity::Weekly => local + Duration::days(7),
            Granularity::Monthly => add_months(local, 1),
            Granularity::Quarterly => add_months(local, 3),
            Granularity::Yearly => add_months(local, 12),
        };
        to_utc(next, offset)
    }

    /// 与时间窗重叠的全部桶起点（用于时间序列零填充）
    pub fn buckets_in(&self, frame: &TimeFrame) -> Vec<DateTime<Utc>> {
        let offset = frame.offset();
        let mut buckets = Vec::new();
        if frame.start >= frame.end {
            return buckets;
        }

        let mut cursor = self.bucket_start(frame.start, frame.granularity, offset);
        while cursor < frame.end {
            if buckets.len() >= MAX_BUCKETS {
                tracing::warn!(
                    granularity = %frame.granularity,
                    max = MAX_BUCKETS,
                    "时间窗桶数量超过上限，已截断"
                );
                break;
            }
            buckets.push(cursor);
            cursor = self.next_bucket_start(cursor, frame.granularity, offset);
        }
        buckets
    }

    // ==========================================
    // 分桶
    // ==========================================

    /// 按粒度分桶
    ///
    /// # 返回
    /// 桶起点 -> 该桶内记录（保持输入顺序）
    pub fn group_by_period<'a, R: Timestamped>(
        &self,
        records: &'a [R],
        granularity: Granularity,
        offset: FixedOffset,
    ) -> BTreeMap<DateTime<Utc>, Vec<&'a R>> {
        let mut groups: BTreeMap<DateTime<Utc>, Vec<&'a R>> = BTreeMap::new();
        for record in records {
            let key = self.bucket_start(record.created_at(), granularity, offset);
            groups.entry(key).or_default().push(record);
        }
        groups
    }

    /// 生成零填充的时间序列
    ///
    /// 每个桶的值为桶内记录 value_of 之和；计数序列传入 `|_| 1.0`。
    /// 时间窗外的记录被忽略
    pub fn time_series<R, F>(
        &self,
        records: &[R],
        frame: &TimeFrame,
        metric: &str,
        value_of: F,
    ) -> Vec<TimeSeriesPoint>
    where
        R: Timestamped,
        F: Fn(&R) -> f64,
    {
        let offset = frame.offset();
        let mut sums: BTreeMap<DateTime<Utc>, f64> = self
            .buckets_in(frame)
            .into_iter()
            .map(|b| (b, 0.0))
            .collect();

        for record in records.iter().filter(|r| frame.contains(r.created_at())) {
            let key = self.bucket_start(record.created_at(), frame.granularity, offset);
            if let Some(sum) = sums.get_mut(&key) {
                *sum += value_of(record);
            }
        }

        sums.into_iter()
            .map(|(timestamp, value)| TimeSeriesPoint {
                timestamp,
                metric: metric.to_string(),
                value,
            })
            .collect()
    }
}

impl Default for TimeGrouper {
    fn default() -> Self {
        Self::new(Weekday::Mon)
    }
}

// ==========================================
// 本地时间辅助函数
// ==========================================

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

fn add_months(local: NaiveDateTime, months: u32) -> NaiveDateTime {
    local
        .checked_add_months(Months::new(months))
        .unwrap_or(NaiveDateTime::MAX)
}

/// 本地朴素时间 -> UTC（固定偏移无歧义）
fn to_utc(local: NaiveDateTime, offset: FixedOffset) -> DateTime<Utc> {
    let utc_naive = local - Duration::seconds(offset.local_minus_utc() as i64);
    Utc.from_utc_datetime(&utc_naive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::time_frame::utc_offset;

    struct Event(DateTime<Utc>);

    impl Timestamped for Event {
        fn created_at(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_daily_grouping_splits_at_midnight() {
        let grouper = TimeGrouper::default();
        let events = vec![
            Event(ts(2024, 1, 1, 10, 0)),
            Event(ts(2024, 1, 1, 23, 59)),
            Event(ts(2024, 1, 2, 0, 1)),
        ];
        let groups = grouper.group_by_period(&events, Granularity::Daily, utc_offset());

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&ts(2024, 1, 1, 0, 0)].len(), 2);
        assert_eq!(groups[&ts(2024, 1, 2, 0, 0)].len(), 1);
    }

    #[test]
    fn test_boundary_record_belongs_to_bucket_it_starts() {
        let grouper = TimeGrouper::default();
        let events = vec![Event(ts(2024, 2, 1, 0, 0))];
        let groups = grouper.group_by_period(&events, Granularity::Monthly, utc_offset());
        assert!(groups.contains_key(&ts(2024, 2, 1, 0, 0)));
    }

    #[test]
    fn test_week_start_is_configurable() {
        // 2024-01-03 是周三
        let wed = ts(2024, 1, 3, 12, 0);
        assert_eq!(
            TimeGrouper::new(Weekday::Mon).bucket_start(wed, Granularity::Weekly, utc_offset()),
            ts(2024, 1, 1, 0, 0)
        );
        assert_eq!(
            TimeGrouper::new(Weekday::Sun).bucket_start(wed, Granularity::Weekly, utc_offset()),
            ts(2023, 12, 31, 0, 0)
        );
    }

    #[test]
    fn test_quarter_and_year_boundaries() {
        let grouper = TimeGrouper::default();
        let aug = ts(2024, 8, 15, 9, 30);
        assert_eq!(
            grouper.bucket_start(aug, Granularity::Quarterly, utc_offset()),
            ts(2024, 7, 1, 0, 0)
        );
        assert_eq!(
            grouper.bucket_start(aug, Granularity::Yearly, utc_offset()),
            ts(2024, 1, 1, 0, 0)
        );
        assert_eq!(
            grouper.next_bucket_start(ts(2024, 10, 1, 0, 0), Granularity::Quarterly, utc_offset()),
            ts(2025, 1, 1, 0, 0)
        );
    }

    #[test]
    fn test_offset_shifts_daily_boundary() {
        let grouper = TimeGrouper::default();
        let plus8 = FixedOffset::east_opt(8 * 3600).unwrap();
        // UTC 2024-01-01 17:00 = 本地 2024-01-02 01:00
        let start = grouper.bucket_start(ts(2024, 1, 1, 17, 0), Granularity::Daily, plus8);
        assert_eq!(start, ts(2024, 1, 1, 16, 0));
    }

    #[test]
    fn test_time_series_is_zero_filled() {
        let grouper = TimeGrouper::default();
        let frame = TimeFrame::new(ts(2024, 1, 1, 0, 0), ts(2024, 1, 4, 0, 0), Granularity::Daily)
            .unwrap();
        let events = vec![Event(ts(2024, 1, 1, 5, 0)), Event(ts(2024, 1, 3, 5, 0))];
        let series = grouper.time_series(&events, &frame, "count", |_| 1.0);

        let values: Vec<f64> = series.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_empty_input_gives_empty_groups() {
        let grouper = TimeGrouper::default();
        let events: Vec<Event> = Vec::new();
        assert!(grouper
            .group_by_period(&events, Granularity::Hourly, utc_offset())
            .is_empty());
    }
}
