// Small ops utility: run one snapshot tick against a database, optionally for a past date.
//
// Usage:
//   cargo run --bin manual_snapshot_run -- [db_path] [snapshot_date YYYY-MM-DD]
//
// With a date, the tick runs as if it were midnight UTC of the following day, so the
// daily snapshot for that date is written (or skipped if it already exists).

use chrono::{Duration, NaiveDate, Utc};
use impact_analytics::app::AppState;
use impact_analytics::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let db_path = args
        .next()
        .unwrap_or_else(|| "impact_analytics.db".to_string());

    let now = match args
        .next()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    {
        Some(raw) => {
            let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d")?;
            let next = (date + Duration::days(1))
                .and_hms_opt(0, 0, 0)
                .ok_or("invalid snapshot date")?;
            next.and_utc()
        }
        None => Utc::now(),
    };

    let state = AppState::new(db_path).await?;
    let report = state
        .analytics_api
        .process_scheduled_analytics_at(now)
        .await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
