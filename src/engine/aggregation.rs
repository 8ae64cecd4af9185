// ==========================================
// 平台运营分析引擎 - 多维分解聚合引擎
// ==========================================
// 职责: 按任意维度做类别分解（计数/合计/占比/环比增长）
// 输入: 当前时间窗记录 + 前一等长时间窗记录 + 维度选择器 + 可选度量选择器
// 输出: BreakdownEntry 列表
// ==========================================
// 红线: Σ percentage = 100 (±0.01)，total = 0 时全部为 0
// 红线: 输出顺序确定: count 降序，category 升序
// ==========================================

use crate::domain::aggregate::BreakdownEntry;
use std::collections::BTreeMap;

/// 度量选择器
pub type MeasureFn<'a, R> = &'a dyn Fn(&R) -> f64;

// ==========================================
// DimensionalAggregator - 多维分解聚合引擎
// ==========================================
pub struct DimensionalAggregator {
    // 无状态引擎
}

#[derive(Default)]
struct CategoryAcc {
    count: usize,
    measure_sum: f64,
}

impl DimensionalAggregator {
    pub fn new() -> Self {
        Self {}
    }

    /// 按维度分解
    ///
    /// # 参数
    /// - `current`: 当前时间窗记录
    /// - `previous`: 前一等长时间窗记录（用于增长率）
    /// - `dimension`: 维度选择器（记录 -> 类别）
    /// - `measure`: 度量选择器；给定时增长率按度量合计计算，否则按计数计算
    ///
    /// # 增长率
    /// (cur - prev) / prev × 100；前一时间窗无该类别数据时为 0
    pub fn breakdown_by<R, D>(
        &self,
        current: &[R],
        previous: &[R],
        dimension: D,
        measure: Option<MeasureFn<'_, R>>,
    ) -> Vec<BreakdownEntry>
    where
        D: Fn(&R) -> String,
    {
        let cur = accumulate(current, &dimension, measure);
        let prev = accumulate(previous, &dimension, measure);
        let total: usize = cur.values().map(|a| a.count).sum();

        let mut entries: Vec<BreakdownEntry> = cur
            .into_iter()
            .map(|(category, acc)| {
                let (cur_value, prev_value) = match measure {
                    Some(_) => (
                        acc.measure_sum,
                        prev.get(&category).map(|p| p.measure_sum).unwrap_or(0.0),
                    ),
                    None => (
                        acc.count as f64,
                        prev.get(&category).map(|p| p.count as f64).unwrap_or(0.0),
                    ),
                };

                BreakdownEntry {
                    percentage: percentage(acc.count, total),
                    growth: growth_pct(cur_value, prev_value),
                    count: acc.count,
                    measure_sum: acc.measure_sum,
                    category,
                }
            })
            .collect();

        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        entries
    }
}

impl Default for DimensionalAggregator {
    fn default() -> Self {
        Self::new()
    }
}

fn accumulate<R, D>(
    records: &[R],
    dimension: &D,
    measure: Option<MeasureFn<'_, R>>,
) -> BTreeMap<String, CategoryAcc>
where
    D: Fn(&R) -> String,
{
    let mut map: BTreeMap<String, CategoryAcc> = BTreeMap::new();
    for record in records {
        let acc = map.entry(dimension(record)).or_default();
        acc.count += 1;
        if let Some(m) = measure {
            acc.measure_sum += m(record);
        }
    }
    map
}

/// count / total × 100，total = 0 时为 0
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// 环比增长率 (%)，无前值时为 0
pub fn growth_pct(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        (current - previous) / previous * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        status: &'static str,
        amount: f64,
    }

    fn rows(statuses: &[&'static str]) -> Vec<Row> {
        statuses
            .iter()
            .map(|s| Row { status: *s, amount: 10.0 })
            .collect()
    }

    #[test]
    fn test_breakdown_percentages_and_order() {
        let engine = DimensionalAggregator::new();
        let current = rows(&["active", "active", "active", "completed"]);
        let entries = engine.breakdown_by(&current, &[], |r: &Row| r.status.to_string(), None);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].category, "active");
        assert_eq!(entries[0].count, 3);
        assert!((entries[0].percentage - 75.0).abs() < 1e-9);
        assert_eq!(entries[1].category, "completed");
        assert!((entries[1].percentage - 25.0).abs() < 1e-9);
        // 无历史数据时增长率为 0
        assert_eq!(entries[0].growth, 0.0);
    }

    #[test]
    fn test_ties_break_by_category() {
        let engine = DimensionalAggregator::new();
        let current = rows(&["b", "a"]);
        let entries = engine.breakdown_by(&current, &[], |r: &Row| r.status.to_string(), None);
        assert_eq!(entries[0].category, "a");
        assert_eq!(entries[1].category, "b");
    }

    #[test]
    fn test_growth_uses_measure_when_given() {
        let engine = DimensionalAggregator::new();
        let current = vec![Row { status: "eu", amount: 150.0 }];
        let previous = vec![
            Row { status: "eu", amount: 50.0 },
            Row { status: "eu", amount: 50.0 },
        ];
        let measure: MeasureFn<Row> = &|r: &Row| r.amount;

        let by_amount =
            engine.breakdown_by(&current, &previous, |r: &Row| r.status.to_string(), Some(measure));
        assert!((by_amount[0].growth - 50.0).abs() < 1e-9);
        assert_eq!(by_amount[0].measure_sum, 150.0);

        let by_count = engine.breakdown_by(&current, &previous, |r: &Row| r.status.to_string(), None);
        assert!((by_count[0].growth + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        let engine = DimensionalAggregator::new();
        let entries = engine.breakdown_by(&Vec::<Row>::new(), &[], |r: &Row| r.status.to_string(), None);
        assert!(entries.is_empty());
        assert_eq!(percentage(0, 0), 0.0);
    }
}
