// ==========================================
// 机位维护排程系统 - 命令行入口
// ==========================================
// 用法:
//   stand-maintenance schedule <requests.csv|xlsx|json> [db_path] [roster.json]
//   stand-maintenance report <organization_id> <start> <end> [db_path]
// 输出: stdout 打印 JSON 结果，日志写 stderr
// ==========================================

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::json;

use stand_maintenance::app::{
    get_default_db_path, load_resource_directory, AppState, TracingNotificationListener,
};
use stand_maintenance::engine::notifier::{NotificationHub, NotificationListener};
use stand_maintenance::importer::RequestImporter;

const USAGE: &str = "用法:
  stand-maintenance schedule <requests.csv|xlsx|json> [db_path] [roster.json]
  stand-maintenance report <organization_id> <start> <end> [db_path]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stand_maintenance::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", stand_maintenance::APP_NAME);
    tracing::info!("系统版本: {}", stand_maintenance::VERSION);
    tracing::info!("==================================================");

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_default();
    let rest: Vec<String> = args.collect();

    match command.as_str() {
        "schedule" => run_schedule(&rest).await,
        "report" => run_report(&rest).await,
        _ => {
            eprintln!("{}", USAGE);
            bail!("未知命令: {:?}", command)
        }
    }
}

async fn run_schedule(args: &[String]) -> anyhow::Result<()> {
    let file = args.first().context(USAGE)?;
    let db_path = args.get(1).cloned().unwrap_or_else(get_default_db_path);
    let roster = args.get(2).map(PathBuf::from);

    let hub = NotificationHub::start(vec![
        Arc::new(TracingNotificationListener) as Arc<dyn NotificationListener>
    ]);
    let directory = load_resource_directory(roster.as_deref())?;
    let state = AppState::new(db_path, directory, Arc::new(hub.sink())).await?;

    let importer = RequestImporter::new(state.scheduler.config().local_offset());
    let imported = importer.import_file(PathBuf::from(file).as_path())?;
    for err in &imported.errors {
        tracing::warn!(row = ?err.row, "{}", err.message);
    }

    // 每条结果在资源锁内落库
    let booked = state.scheduler.optimize_and_book(imported.requests)?;

    tracing::info!(
        scheduled = booked.records.len(),
        unscheduled = booked.outcomes.len() - booked.records.len(),
        "批量排程已写入"
    );

    let output = json!({
        "rowErrors": imported.errors,
        "outcomes": booked.outcomes,
        "persisted": booked.records,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    hub.shutdown().await;
    Ok(())
}

async fn run_report(args: &[String]) -> anyhow::Result<()> {
    if args.len() < 3 {
        bail!("{}", USAGE);
    }
    let scope = &args[0];
    let start = parse_bound(&args[1], false)?;
    let end = parse_bound(&args[2], true)?;
    let db_path = args.get(3).cloned().unwrap_or_else(get_default_db_path);

    let hub = NotificationHub::start(Vec::new());
    let state = AppState::new(db_path, load_resource_directory(None)?, Arc::new(hub.sink())).await?;

    let report = state.scheduler.generate_report(scope, start, end)?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    hub.shutdown().await;
    Ok(())
}

/// 报表区间边界: RFC3339 或 YYYY-MM-DD（结束日期取当日 23:59:59 UTC）
fn parse_bound(raw: &str, end_of_day: bool) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("无法解析日期: {}", raw))?;
    let naive = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
    .context("日期超出范围")?;

    Ok(naive.and_utc())
}
