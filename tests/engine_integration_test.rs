// ==========================================
// 引擎集成测试
// ==========================================
// 测试目标: 分桶 → 分解 → 指标 → 趋势/预测 → 实体预测 → 对标 的典型输入输出
// ==========================================

mod helpers;

use chrono::{Duration, TimeZone, Utc};
use helpers::record_builder::{progress_update, ProjectBuilder, TransactionBuilder};
use impact_analytics::domain::prediction::RiskType;
use impact_analytics::domain::time_frame::{utc_offset, TimeFrame};
use impact_analytics::domain::types::{
    BenchmarkStatus, Granularity, MilestoneStatus, ProjectStatus, Severity, TransactionKind,
    TransactionStatus, TrendDirection,
};
use impact_analytics::domain::{Project, Transaction};
use impact_analytics::engine::{
    BenchmarkEngine, DimensionalAggregator, ForecastEngine, MetricsCalculator, PredictionEngine,
    TimeGrouper, TrendEstimator,
};

fn ts(m: u32, d: u32, h: u32, min: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, m, d, h, min, 0).unwrap()
}

// ==========================================
// 分桶与分解
// ==========================================

#[test]
fn test_daily_grouping_example() {
    let txns = vec![
        TransactionBuilder::purchase("T1", 10.0, ts(1, 1, 10, 0)).build(),
        TransactionBuilder::purchase("T2", 10.0, ts(1, 1, 23, 59)).build(),
        TransactionBuilder::purchase("T3", 10.0, ts(1, 2, 0, 1)).build(),
    ];

    let groups = TimeGrouper::default().group_by_period(&txns, Granularity::Daily, utc_offset());
    let counts: Vec<(chrono::DateTime<Utc>, usize)> =
        groups.iter().map(|(k, v)| (*k, v.len())).collect();
    assert_eq!(counts, vec![(ts(1, 1, 0, 0), 2), (ts(1, 2, 0, 0), 1)]);
}

#[test]
fn test_daily_grouping_follows_frame_offset() {
    // UTC+8: 15:30Z 是当地 23:30，16:30Z 已是次日 00:30
    let txns = vec![
        TransactionBuilder::purchase("T1", 10.0, ts(1, 1, 15, 30)).build(),
        TransactionBuilder::purchase("T2", 10.0, ts(1, 1, 16, 30)).build(),
    ];
    let frame = TimeFrame::new(ts(1, 1, 0, 0), ts(1, 3, 0, 0), Granularity::Daily)
        .unwrap()
        .with_tz_offset(8 * 60);
    assert!(frame.validate().is_ok());

    let grouper = TimeGrouper::default();
    let groups = grouper.group_by_period(&txns, Granularity::Daily, frame.offset());
    let keys: Vec<chrono::DateTime<Utc>> = groups.keys().copied().collect();
    assert_eq!(keys, vec![ts(1, 1, 0, 0) - Duration::hours(8), ts(1, 1, 16, 0)]);

    let buckets = grouper.buckets_in(&frame);
    assert_eq!(buckets.first(), Some(&(ts(1, 1, 0, 0) - Duration::hours(8))));
    assert_eq!(buckets.last(), Some(&ts(1, 2, 16, 0)));
}

#[test]
fn test_status_breakdown_example() {
    let projects: Vec<Project> = [
        ProjectStatus::Active,
        ProjectStatus::Active,
        ProjectStatus::Active,
        ProjectStatus::Completed,
    ]
    .iter()
    .enumerate()
    .map(|(i, s)| ProjectBuilder::new(&format!("P{}", i), ts(1, 1, 0, 0)).status(*s).build())
    .collect();

    let entries = DimensionalAggregator::new().breakdown_by(
        &projects,
        &[],
        |p: &Project| p.status.to_string(),
        None,
    );

    assert_eq!(entries.len(), 2);
    assert_eq!((entries[0].category.as_str(), entries[0].count), ("active", 3));
    assert!((entries[0].percentage - 75.0).abs() < 1e-9);
    assert_eq!((entries[1].category.as_str(), entries[1].count), ("completed", 1));
    assert!((entries[1].percentage - 25.0).abs() < 1e-9);
    // 无前期数据时增长率为 0
    assert!(entries.iter().all(|e| e.growth == 0.0));
}

#[test]
fn test_measure_growth_against_previous_window() {
    let current = vec![
        TransactionBuilder::purchase("T1", 100.0, ts(2, 1, 0, 0)).build(),
        TransactionBuilder::purchase("T2", 50.0, ts(2, 2, 0, 0)).build(),
    ];
    let previous = vec![TransactionBuilder::purchase("T0", 100.0, ts(1, 1, 0, 0)).build()];

    let measure: &dyn Fn(&Transaction) -> f64 = &|t| t.amount;
    let entries = DimensionalAggregator::new().breakdown_by(
        &current,
        &previous,
        |t: &Transaction| t.kind.to_string(),
        Some(measure),
    );

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].measure_sum, 150.0);
    assert!((entries[0].growth - 50.0).abs() < 1e-9);
}

// ==========================================
// 指标
// ==========================================

#[test]
fn test_financial_metrics_separate_refunds() {
    let txns = vec![
        TransactionBuilder::purchase("T1", 100.0, ts(3, 1, 0, 0)).build(),
        TransactionBuilder::purchase("T2", 50.0, ts(3, 2, 0, 0))
            .kind(TransactionKind::Retirement)
            .build(),
        TransactionBuilder::purchase("T3", 30.0, ts(3, 3, 0, 0))
            .status(TransactionStatus::Failed)
            .build(),
        TransactionBuilder::purchase("T4", 20.0, ts(3, 4, 0, 0))
            .kind(TransactionKind::Refund)
            .build(),
    ];

    let m = MetricsCalculator::default().financial_metrics(&txns);
    assert_eq!(m["total_revenue"], 150.0);
    assert_eq!(m["total_refunds"], 20.0);
    assert_eq!(m["net_revenue"], 130.0);
    assert_eq!(m["transaction_count"], 4.0);
    assert_eq!(m["average_transaction_value"], 75.0);
    assert!((m["transaction_success_rate"] - 75.0).abs() < 1e-9);
    assert!((m["refund_rate"] - 25.0).abs() < 1e-9);
}

#[test]
fn test_ratio_metrics_are_zero_on_empty_input() {
    let calc = MetricsCalculator::default();
    let m = calc.financial_metrics(&[]);
    assert_eq!(m["average_transaction_value"], 0.0);
    assert_eq!(m["transaction_success_rate"], 0.0);

    let p = calc.project_metrics(&[], &[], ts(3, 1, 0, 0));
    assert!(p.values().all(|v| *v == 0.0));
}

// ==========================================
// 趋势与预测
// ==========================================

#[test]
fn test_trend_directions() {
    let estimator = TrendEstimator::default();
    assert_eq!(estimator.analyze(&[100.0, 110.0, 121.0]).direction, TrendDirection::Increasing);
    assert_eq!(estimator.analyze(&[100.0, 90.0, 80.0]).direction, TrendDirection::Decreasing);
    assert_eq!(estimator.analyze(&[100.0, 102.0, 101.0]).direction, TrendDirection::Stable);
    assert_eq!(estimator.analyze(&[10.0, 0.0, 10.0, 0.0]).direction, TrendDirection::Volatile);

    let empty = estimator.analyze(&[]);
    assert_eq!(empty.direction, TrendDirection::Stable);
    assert_eq!(empty.delta_pct, 0.0);
}

#[test]
fn test_forecast_compounds_over_quarter() {
    let f = ForecastEngine::default()
        .forecast("total_revenue", &[100.0, 110.0, 121.0], Granularity::Monthly)
        .unwrap();

    assert!(f.history_based);
    assert!((f.next_quarter.value - 121.0 * 1.1_f64.powi(3)).abs() < 1e-6);
    let names: Vec<&str> = f.next_year.scenarios.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["conservative", "expected", "optimistic"]);
}

// ==========================================
// 实体预测
// ==========================================

#[test]
fn test_overdue_milestone_triggers_timeline_delay() {
    let now = ts(6, 1, 0, 0);
    let project = ProjectBuilder::new("P1", ts(1, 1, 0, 0))
        .progress(30.0)
        .milestone("baseline", ts(3, 1, 0, 0), MilestoneStatus::InProgress)
        .last_update(ts(5, 20, 0, 0))
        .build();

    let factors = PredictionEngine::default().risk_factors(&project, &[], now);
    assert_eq!(factors.len(), 1);
    assert_eq!(factors[0].risk_type, RiskType::TimelineDelay);
    assert_eq!(factors[0].severity, Severity::High);
}

#[test]
fn test_several_risk_rules_fire_together() {
    let now = ts(6, 1, 0, 0);
    let project = ProjectBuilder::new("P2", ts(1, 1, 0, 0))
        .funding(2_000_000.0, 0.0)
        .build();

    let prediction = PredictionEngine::default().predict_project(&project, &[], now);
    assert!(prediction.has_risk(RiskType::CommunicationGap));
    assert!(prediction.has_risk(RiskType::FundingRisk));
    assert!(!prediction.has_risk(RiskType::TimelineDelay));
}

#[test]
fn test_expected_completion_extrapolates_recent_rate() {
    let now = ts(6, 1, 0, 0);
    let project = ProjectBuilder::new("P3", ts(1, 1, 0, 0)).progress(60.0).build();
    let updates = vec![
        progress_update("R1", "P3", 40.0, 0.0, ts(5, 1, 0, 0)),
        progress_update("R2", "P3", 60.0, 0.0, ts(5, 11, 0, 0)),
    ];
    let refs: Vec<_> = updates.iter().collect();

    let engine = PredictionEngine::default();
    // 2%/天，剩余 40% → 20 天
    assert_eq!(engine.expected_completion_date(&project, &refs, now), now + Duration::days(20));

    let stalled = ProjectBuilder::new("P4", ts(1, 1, 0, 0))
        .estimated_completion(ts(7, 1, 0, 0))
        .build();
    assert_eq!(
        engine.expected_completion_date(&stalled, &[], now),
        ts(7, 1, 0, 0) + Duration::days(180)
    );
}

// ==========================================
// 对标
// ==========================================

#[test]
fn test_benchmark_compare_uses_reference_table() {
    let engine = BenchmarkEngine::default();

    let leading = engine.compare("completion_rate", 84.0).unwrap();
    assert_eq!(leading.status, BenchmarkStatus::Leading);
    assert!(leading.note.starts_with("completion_rate is leading"));

    let lagging = engine.compare("transaction_success_rate", 50.0).unwrap();
    assert_eq!(lagging.status, BenchmarkStatus::Lagging);

    assert!(engine.compare("no_such_metric", 1.0).is_none());
}
