// ==========================================
// 平台运营分析引擎 - 命令行主入口
// ==========================================
// 用法:
//   impact-analytics tick
//   impact-analytics schedule <interval_secs>
//   impact-analytics report <type> <start> <end> <label> <token> [--forecast] [--benchmarks]
//   impact-analytics import <dir>
//   impact-analytics health
// 环境变量:
//   IMPACT_ANALYTICS_DB_PATH     数据库路径
//   IMPACT_ANALYTICS_LOCALE      报告语言（en / zh-CN）
//   IMPACT_ANALYTICS_LOG_FORMAT  json 时输出 JSON 行日志
// ==========================================

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use impact_analytics::app::{get_default_db_path, AppState, DEFAULT_LOCALE};
use impact_analytics::domain::{ReportOptions, ReportPeriod, ReportType};
use impact_analytics::logging;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

const USAGE: &str = "用法: impact-analytics <tick | schedule <secs> | report <type> <start> <end> <label> <token> [--forecast] [--benchmarks] | import <dir> | health>";

#[tokio::main]
async fn main() -> Result<()> {
    match std::env::var("IMPACT_ANALYTICS_LOG_FORMAT").as_deref() {
        Ok("json") => logging::init_json(),
        _ => logging::init(),
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        bail!(USAGE);
    };

    tracing::info!("==================================================");
    tracing::info!("{} v{}", impact_analytics::APP_NAME, impact_analytics::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    let locale = std::env::var("IMPACT_ANALYTICS_LOCALE").unwrap_or_else(|_| DEFAULT_LOCALE.to_string());
    tracing::info!(db_path = %db_path, "使用数据库");

    let state = AppState::with_locale(db_path, &locale)
        .await
        .map_err(|e| anyhow!(e))?;

    match command.as_str() {
        "tick" => {
            let report = state.analytics_api.process_scheduled_analytics().await?;
            print_json(&report)?;
        }
        "schedule" => {
            let secs: u64 = args
                .get(1)
                .map(|s| s.parse::<u64>())
                .transpose()
                .context("interval_secs 必须是正整数")?
                .unwrap_or(state.config.snapshot.interval_secs);
            if secs == 0 {
                bail!("interval_secs 必须大于 0");
            }
            run_schedule(&state, Duration::from_secs(secs)).await?;
        }
        "report" => {
            if args.len() < 6 {
                bail!(USAGE);
            }
            let report_type: ReportType = args[1].parse().map_err(|e: String| anyhow!(e))?;
            let period = ReportPeriod {
                start: parse_instant(&args[2])?,
                end: parse_instant(&args[3])?,
                label: args[4].clone(),
            };
            let flags = &args[6..];
            let options = ReportOptions {
                include_forecasting: flags.iter().any(|f| f == "--forecast"),
                include_benchmarks: flags.iter().any(|f| f == "--benchmarks"),
                custom_metrics: Vec::new(),
            };
            let receipt = state
                .analytics_api
                .generate_report(&args[5], report_type, period, options)
                .await?;
            print_json(&receipt)?;
        }
        "import" => {
            let dir = args.get(1).ok_or_else(|| anyhow!(USAGE))?;
            let summary = state.importer.import_dir(Path::new(dir))?;
            for message in &summary.messages {
                println!("{}", message);
            }
        }
        "health" => {
            let health = state.monitoring_api.get_system_health().await?;
            print_json(&health)?;
        }
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}

/// 周期性快照，Ctrl-C 退出
async fn run_schedule(state: &AppState, interval: Duration) -> Result<()> {
    let (tx, rx) = tokio::sync::watch::channel(false);
    let scheduler = state.scheduler.clone();
    let handle = tokio::spawn(async move { scheduler.run_loop(interval, rx).await });

    tracing::info!(interval_secs = interval.as_secs(), "快照调度已启动，Ctrl-C 退出");
    tokio::signal::ctrl_c().await.context("无法监听退出信号")?;
    tx.send(true).ok();
    handle.await.context("调度任务异常退出")?;
    Ok(())
}

/// 解析 RFC3339 时间或 YYYY-MM-DD（UTC 零点）
fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("无法解析时间: {}", raw))?;
    date.and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .ok_or_else(|| anyhow!("无法解析时间: {}", raw))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
