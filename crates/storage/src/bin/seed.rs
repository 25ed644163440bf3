use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::json;
use sketch_core::model::{Plan, PlansPayload, SessionMode, SessionRecord, Step, StepId};
use storage::repository::{Storage, keys};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    history: u32,
    legacy: bool,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidHistory { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidHistory { raw } => write!(f, "invalid --history value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("SKETCH_DB_URL").unwrap_or_else(|_| "sqlite:dev.sqlite3?mode=rwc".into());
        let mut history = std::env::var("SKETCH_SEED_HISTORY")
            .ok()
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(3);
        let mut legacy = false;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--history" => {
                    let value = require_value(&mut args, "--history")?;
                    history = value
                        .parse::<u32>()
                        .map_err(|_| ArgsError::InvalidHistory { raw: value.clone() })?;
                }
                "--legacy" => legacy = true,
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            history,
            legacy,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:dev.sqlite3?mode=rwc)");
    eprintln!("  --history <n>             Number of history records to append (default: 3)");
    eprintln!("  --legacy                  Write plans as a bare array without schema version");
    eprintln!("  --now <rfc3339>           Fixed current time for deterministic seeding");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment (same as flags):");
    eprintln!("  SKETCH_DB_URL, SKETCH_SEED_HISTORY");
}

fn sample_plans(date: i64) -> Result<Vec<Plan>, Box<dyn std::error::Error>> {
    let gesture = Plan::new(
        "Gesture warmup",
        vec![
            Step::pose(StepId::new(1), 10, 30)?,
            Step::pause(StepId::new(2), 60)?,
            Step::pose(StepId::new(3), 5, 60)?,
            Step::pose(StepId::new(4), 2, 300)?,
        ],
        date,
    )?;
    let long_study = Plan::new(
        "Long study",
        vec![
            Step::pose(StepId::new(1), 1, 600)?,
            Step::pause(StepId::new(2), 120)?,
            Step::pose(StepId::new(3), 1, 1200)?,
        ],
        date,
    )?;
    Ok(vec![gesture, long_study])
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let now = args.now.unwrap_or_else(Utc::now);

    let plans = sample_plans(now.timestamp_millis())?;
    let plans_doc = if args.legacy {
        serde_json::to_value(&plans)?
    } else {
        serde_json::to_value(PlansPayload::new(plans.clone()))?
    };
    storage.kv.set(keys::SESSION_PLANS, &plans_doc).await?;

    let modes = [SessionMode::Classic, SessionMode::Custom, SessionMode::Memory];
    let mut history = match storage.kv.get(keys::SESSION_HISTORY).await? {
        Some(serde_json::Value::Array(items)) => items,
        _ => Vec::new(),
    };
    for i in 0..args.history {
        let mode = modes[(i as usize) % modes.len()];
        let record = SessionRecord {
            mode: mode.as_str().to_string(),
            poses: i64::from(i + 2) * 5,
            time: i64::from(i + 2) * 5 * 60,
            custom_queue: (mode == SessionMode::Custom).then(|| {
                plans[0]
                    .steps()
                    .iter()
                    .map(|s| serde_json::to_value(s).unwrap_or_else(|_| json!({})))
                    .collect()
            }),
            memory_type: (mode == SessionMode::Memory).then(|| "flash".to_string()),
            date: Some(now.timestamp_millis()),
        };
        history.push(serde_json::to_value(record)?);
    }
    storage
        .kv
        .set(keys::SESSION_HISTORY, &serde_json::Value::Array(history))
        .await?;

    println!(
        "Seeded {} plans and {} history records into {}",
        plans.len(),
        args.history,
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
