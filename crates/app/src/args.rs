use std::fmt;

use sketch_core::model::{MemoryType, SessionMode, Step, StepId, TimerSettingsDraft};

#[derive(Debug, PartialEq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidMode { raw: String },
    InvalidMemoryType { raw: String },
    InvalidQueue { raw: String },
    InvalidToggle { flag: &'static str, raw: String },
    MissingPlanName,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidMode { raw } => write!(
                f,
                "invalid --mode value (classic, custom, relax, memory): {raw}"
            ),
            ArgsError::InvalidMemoryType { raw } => {
                write!(f, "invalid --memory-type value (flash, progressive): {raw}")
            }
            ArgsError::InvalidQueue { raw } => write!(
                f,
                "invalid --queue value (e.g. 5x60,pause:30,2x120): {raw}"
            ),
            ArgsError::InvalidToggle { flag, raw } => {
                write!(f, "invalid {flag} value (on, off): {raw}")
            }
            ArgsError::MissingPlanName => write!(f, "a plan name is required"),
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

fn parse_number<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

fn parse_toggle(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<bool, ArgsError> {
    let value = require_value(args, flag)?;
    match value.as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(ArgsError::InvalidToggle { flag, raw: value }),
    }
}

/// Parses a compact queue such as `5x60,pause:30,120`.
///
/// `NxD` is a pose step of `N` poses at `D` seconds, a bare `D` is a single
/// pose, and `pause:D` (or `p:D`) a rest. Ids are assigned from 1.
///
/// # Errors
///
/// Returns `ArgsError::InvalidQueue` on any malformed or out-of-range item.
pub fn parse_queue(raw: &str) -> Result<Vec<Step>, ArgsError> {
    let invalid = || ArgsError::InvalidQueue {
        raw: raw.to_string(),
    };
    let mut id = StepId::new(1);
    let mut steps = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let step = if let Some(secs) = item
            .strip_prefix("pause:")
            .or_else(|| item.strip_prefix("p:"))
        {
            let duration = secs.trim().parse::<u32>().map_err(|_| invalid())?;
            Step::pause(id, duration).map_err(|_| invalid())?
        } else {
            let (count, duration) = match item.split_once(['x', 'X']) {
                Some((count, duration)) => (
                    count.trim().parse::<u32>().map_err(|_| invalid())?,
                    duration.trim().parse::<u32>().map_err(|_| invalid())?,
                ),
                None => (1, item.parse::<u32>().map_err(|_| invalid())?),
            };
            Step::pose(id, count, duration).map_err(|_| invalid())?
        };
        steps.push(step);
        id = id.next();
    }
    if steps.is_empty() {
        return Err(invalid());
    }
    Ok(steps)
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(RunArgs),
    Plans,
    SavePlan { name: String, queue: Vec<Step> },
    DeletePlan { name: String },
    History,
    Settings(Box<TimerSettingsDraft>),
}

/// Where the session comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum RunSource {
    Config,
    Plan(String),
    Replay(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunArgs {
    pub source: RunSource,
    pub mode: SessionMode,
    pub duration: Option<u32>,
    pub queue: Vec<Step>,
    pub memory_type: MemoryType,
    pub images: usize,
    pub memory_poses: Option<usize>,
    /// Stop after this many ticks; `None` runs to completion.
    pub ticks: Option<u64>,
    pub realtime: bool,
    pub record: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            source: RunSource::Config,
            mode: SessionMode::Classic,
            duration: None,
            queue: Vec::new(),
            memory_type: MemoryType::Flash,
            images: 10,
            memory_poses: None,
            ticks: None,
            realtime: false,
            record: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub db_url: String,
    pub command: Command,
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app run [--mode <mode>] [--duration <secs>] [--queue <queue>]");
    eprintln!("          [--memory-type flash|progressive] [--images <n>] [--poses <n>]");
    eprintln!("          [--plan <name>] [--replay <index>] [--ticks <n>] [--realtime] [--no-record]");
    eprintln!("  app plans");
    eprintln!("  app save-plan <name> --queue <queue>");
    eprintln!("  app delete-plan <name>");
    eprintln!("  app history");
    eprintln!("  app settings [--sound on|off] [--threshold <secs>] [--default-duration <secs>]");
    eprintln!("               [--flash <secs>] [--shuffle on|off]");
    eprintln!();
    eprintln!("Every command accepts --db <sqlite_url> (default sqlite:dev.sqlite3).");
    eprintln!("Queue syntax: 5x60,pause:30,120");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SKETCH_DB_URL, SKETCH_LOG");
}

impl Args {
    /// Parse a full argument list, without the program name.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown commands, flags, or malformed values.
    pub fn parse(argv: Vec<String>, env_db_url: Option<String>) -> Result<Self, ArgsError> {
        let mut db_url = env_db_url
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "sqlite:dev.sqlite3".into());

        let mut iter = argv.into_iter().peekable();
        let cmd = iter
            .next_if(|arg| !arg.starts_with("--"))
            .unwrap_or_else(|| "run".into());

        // Global flags are pulled out first so they work after any subcommand.
        let mut rest = Vec::new();
        while let Some(arg) = iter.next() {
            if arg == "--db" {
                let value = require_value(&mut iter, "--db")?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDbUrl { raw: value });
                }
                db_url = value;
            } else {
                rest.push(arg);
            }
        }
        let mut rest = rest.into_iter();

        let command = match cmd.as_str() {
            "run" => Command::Run(parse_run(&mut rest)?),
            "plans" => {
                reject_extra(&mut rest)?;
                Command::Plans
            }
            "save-plan" => parse_save_plan(&mut rest)?,
            "delete-plan" => {
                let name = rest.next().ok_or(ArgsError::MissingPlanName)?;
                reject_extra(&mut rest)?;
                Command::DeletePlan { name }
            }
            "history" => {
                reject_extra(&mut rest)?;
                Command::History
            }
            "settings" => Command::Settings(Box::new(parse_settings(&mut rest)?)),
            other => return Err(ArgsError::UnknownCommand(other.to_string())),
        };

        Ok(Self {
            db_url: normalize_sqlite_url(db_url),
            command,
        })
    }
}

fn reject_extra(args: &mut impl Iterator<Item = String>) -> Result<(), ArgsError> {
    match args.next() {
        Some(arg) => Err(ArgsError::UnknownArg(arg)),
        None => Ok(()),
    }
}

fn parse_run(args: &mut impl Iterator<Item = String>) -> Result<RunArgs, ArgsError> {
    let mut run = RunArgs::default();
    let mut mode_set = false;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mode" => {
                let value = require_value(args, "--mode")?;
                run.mode = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidMode { raw: value })?;
                mode_set = true;
            }
            "--duration" => run.duration = Some(parse_number(args, "--duration")?),
            "--queue" => {
                let value = require_value(args, "--queue")?;
                run.queue = parse_queue(&value)?;
                if !mode_set {
                    run.mode = SessionMode::Custom;
                }
            }
            "--memory-type" => {
                let value = require_value(args, "--memory-type")?;
                run.memory_type = value
                    .parse()
                    .map_err(|_| ArgsError::InvalidMemoryType { raw: value })?;
            }
            "--images" => run.images = parse_number(args, "--images")?,
            "--poses" => run.memory_poses = Some(parse_number(args, "--poses")?),
            "--plan" => run.source = RunSource::Plan(require_value(args, "--plan")?),
            "--replay" => run.source = RunSource::Replay(parse_number(args, "--replay")?),
            "--ticks" => run.ticks = Some(parse_number(args, "--ticks")?),
            "--realtime" => run.realtime = true,
            "--no-record" => run.record = false,
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(run)
}

fn parse_save_plan(args: &mut impl Iterator<Item = String>) -> Result<Command, ArgsError> {
    let mut name = None;
    let mut queue = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--queue" => queue = Some(parse_queue(&require_value(args, "--queue")?)?),
            flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
            _ if name.is_none() => name = Some(arg),
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    let name = name.ok_or(ArgsError::MissingPlanName)?;
    let queue = queue.ok_or(ArgsError::MissingValue { flag: "--queue" })?;
    Ok(Command::SavePlan { name, queue })
}

fn parse_settings(
    args: &mut impl Iterator<Item = String>,
) -> Result<TimerSettingsDraft, ArgsError> {
    let mut draft = TimerSettingsDraft::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--sound" => draft.sound_enabled = Some(parse_toggle(args, "--sound")?),
            "--threshold" => {
                draft.tick_threshold_override = Some(parse_number(args, "--threshold")?);
            }
            "--default-duration" => {
                draft.default_duration = Some(parse_number(args, "--default-duration")?);
            }
            "--flash" => draft.memory_flash_duration = Some(parse_number(args, "--flash")?),
            "--shuffle" => draft.shuffle_images = Some(parse_toggle(args, "--shuffle")?),
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(draft)
}

pub fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}
