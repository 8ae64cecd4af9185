// ==========================================
// 引擎性质测试（proptest）
// ==========================================
// 覆盖: 分解占比之和、分桶确定性、概率截断、完工日期边界、对标单调性、情景概率归一
// ==========================================

mod helpers;

use chrono::{DateTime, Duration, TimeZone, Utc};
use helpers::record_builder::{progress_update, ProjectBuilder, TransactionBuilder, UserBuilder};
use impact_analytics::domain::types::{BenchmarkStatus, Granularity, MilestoneStatus};
use impact_analytics::domain::time_frame::utc_offset;
use impact_analytics::engine::{BenchmarkEngine, DimensionalAggregator, ForecastEngine, PredictionEngine, TimeGrouper};
use proptest::prelude::*;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn granularity() -> impl Strategy<Value = Granularity> {
    prop::sample::select(Granularity::all().to_vec())
}

fn rank(status: BenchmarkStatus) -> u8 {
    match status {
        BenchmarkStatus::Lagging => 0,
        BenchmarkStatus::Competitive => 1,
        BenchmarkStatus::Leading => 2,
    }
}

proptest! {
    #[test]
    fn breakdown_percentages_sum_to_100(categories in prop::collection::vec(0u8..6, 1..200)) {
        let records: Vec<String> = categories.iter().map(|c| format!("c{}", c)).collect();
        let entries = DimensionalAggregator::new().breakdown_by(&records, &[], |r: &String| r.clone(), None);

        let sum: f64 = entries.iter().map(|e| e.percentage).sum();
        prop_assert!((sum - 100.0).abs() < 0.01, "sum = {}", sum);
        prop_assert_eq!(entries.iter().map(|e| e.count).sum::<usize>(), records.len());
        // 按数量降序、类别升序
        for pair in entries.windows(2) {
            prop_assert!(
                pair[0].count > pair[1].count
                    || (pair[0].count == pair[1].count && pair[0].category < pair[1].category)
            );
        }
    }

    #[test]
    fn group_by_period_is_deterministic_and_idempotent(
        offsets in prop::collection::vec(0i64..(400 * 24 * 60), 0..100),
        g in granularity(),
    ) {
        let txns: Vec<_> = offsets
            .iter()
            .enumerate()
            .map(|(i, m)| TransactionBuilder::purchase(&format!("T{}", i), 1.0, base() + Duration::minutes(*m)).build())
            .collect();
        let grouper = TimeGrouper::default();

        let first = grouper.group_by_period(&txns, g, utc_offset());
        let second = grouper.group_by_period(&txns, g, utc_offset());
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.values().map(|v| v.len()).sum::<usize>(), txns.len());

        for (bucket, members) in &first {
            // 桶起点再次分桶仍落在同一个桶
            prop_assert_eq!(grouper.bucket_start(*bucket, g, utc_offset()), *bucket);
            let next = grouper.next_bucket_start(*bucket, g, utc_offset());
            for t in members {
                prop_assert!(t.created_at >= *bucket && t.created_at < next);
            }
        }
    }

    #[test]
    fn completion_probability_is_clamped(
        progress in -50.0f64..250.0,
        completed in 0usize..5,
        pending in 0usize..5,
        update_days_ago in prop::option::of(0i64..400),
    ) {
        let now = base() + Duration::days(200);
        let mut builder = ProjectBuilder::new("P", base()).progress(progress);
        for i in 0..completed {
            builder = builder.milestone(&format!("done{}", i), base(), MilestoneStatus::Completed);
        }
        for i in 0..pending {
            builder = builder.milestone(&format!("todo{}", i), now + Duration::days(10), MilestoneStatus::Pending);
        }
        let project = builder.build();
        let updates: Vec<_> = update_days_ago
            .map(|d| progress_update("R", "P", 10.0, 0.0, now - Duration::days(d)))
            .into_iter()
            .collect();
        let refs: Vec<_> = updates.iter().collect();

        let p = PredictionEngine::default().completion_probability(&project, &refs, now);
        prop_assert!((5.0..=95.0).contains(&p), "p = {}", p);
    }

    #[test]
    fn expected_completion_date_never_before_now(
        first_pct in 0.0f64..100.0,
        step in prop_oneof![0.0f64..1e-4, -10.0f64..50.0],
        gap_minutes in 1i64..(400 * 24 * 60),
        declared_days in prop::option::of(0i64..100_000_000),
    ) {
        let now = base() + Duration::days(800);
        let mut builder = ProjectBuilder::new("P", base());
        if let Some(d) = declared_days {
            // 申报日期可远至可表示范围的尽头
            builder = builder.estimated_completion(
                now.checked_add_signed(Duration::days(d)).unwrap_or(DateTime::<Utc>::MAX_UTC),
            );
        }
        let project = builder.build();
        let earlier = progress_update("R1", "P", first_pct, 0.0, now - Duration::minutes(gap_minutes));
        let later = progress_update("R2", "P", first_pct + step, 0.0, now);

        let date = PredictionEngine::default().expected_completion_date(&project, &[&earlier, &later], now);
        prop_assert!(date >= now, "date = {}", date);
    }

    #[test]
    fn churn_probability_is_clamped(
        purchases in 0u32..20,
        created in 0u32..6,
        idle_days in prop::option::of(0i64..1000),
    ) {
        let now = base() + Duration::days(1000);
        let mut builder = UserBuilder::new("U", base()).purchases(purchases).projects_created(created);
        if let Some(d) = idle_days {
            builder = builder.active_at(now - Duration::days(d));
        }

        let p = PredictionEngine::default().churn_probability(&builder.build(), now);
        prop_assert!((0.05..=0.95).contains(&p), "p = {}", p);
    }

    #[test]
    fn classify_is_monotonic(
        a in -1000.0f64..1000.0,
        b in -1000.0f64..1000.0,
        average in 0.0f64..500.0,
        spread in 0.0f64..500.0,
    ) {
        let engine = BenchmarkEngine::default();
        let top = average + spread;
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(rank(engine.classify(low, average, top)) <= rank(engine.classify(high, average, top)));
    }

    #[test]
    fn scenario_probabilities_sum_to_one(
        values in prop::collection::vec(0.0f64..10_000.0, 1..24),
        g in granularity(),
    ) {
        let forecast = ForecastEngine::default().forecast("m", &values, g).unwrap();
        for horizon in forecast.horizons() {
            prop_assert!(horizon.scenarios.len() >= 3);
            prop_assert!((horizon.probability_sum() - 1.0).abs() < 1e-3);
            prop_assert!(horizon.value.is_finite());
        }
    }
}
