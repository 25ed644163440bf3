mod args;

use std::time::Duration;

use services::{AppServices, Clock, ImageSet, SessionEvent, SessionRunner};
use sketch_core::model::{SessionConfig, SessionMode, TimerSettings};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::args::{Args, ArgsError, Command, RunArgs, RunSource, print_usage};

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SKETCH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let parsed = Args::parse(argv, std::env::var("SKETCH_DB_URL").ok()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_dir(&parsed.db_url)?;
    let app = AppServices::new_sqlite(&parsed.db_url, Clock::system()).await?;

    match parsed.command {
        Command::Run(run) => run_session(&app, run).await,
        Command::Plans => list_plans(&app).await,
        Command::SavePlan { name, queue } => {
            let plan = app.plans().save_plan(name, queue).await?;
            println!("saved {:?} ({} steps)", plan.name(), plan.steps().len());
            Ok(())
        }
        Command::DeletePlan { name } => {
            if app.plans().delete_plan(&name).await? {
                println!("deleted {name:?}");
            } else {
                println!("no plan named {name:?}");
            }
            Ok(())
        }
        Command::History => list_history(&app).await,
        Command::Settings(edit) => {
            let settings = if *edit == Default::default() {
                app.settings().load().await?
            } else {
                app.settings().update(*edit).await?
            };
            print_settings(&settings);
            Ok(())
        }
    }
}

async fn run_session(app: &AppServices, run: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = app.settings().load().await?;
    let images = ImageSet::new(run.images).with_memory_poses(run.memory_poses.unwrap_or(run.images));
    let session_loop = app.session_loop();

    let mut runner = match &run.source {
        RunSource::Plan(name) => session_loop.start_from_plan(name, images).await?,
        RunSource::Replay(index) => session_loop.start_replay(*index, images).await?,
        RunSource::Config => {
            session_loop
                .start(SessionConfig {
                    session_mode: run.mode,
                    selected_duration: run.duration.unwrap_or(settings.default_duration()),
                    custom_queue: run.queue.clone(),
                    memory_type: run.memory_type,
                    images_len: images.images_len,
                    memory_poses_count: images.memory_poses_count,
                    memory_flash_duration: None,
                })
                .await?
        }
    };

    let mode = runner.state().session_mode;
    let relax_interval = u64::from(run.duration.unwrap_or(settings.default_duration()).max(1));
    println!(
        "{mode} session, image {} of {}",
        runner.current_image() + 1,
        images.images_len.max(1)
    );

    while !runner.is_complete() {
        if run.ticks.is_some_and(|limit| runner.elapsed_secs() >= limit) {
            break;
        }
        if run.ticks.is_none() && open_ended(mode) && runner.poses_completed() >= run.images as u64
        {
            break;
        }
        if run.realtime {
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        let mut events = runner.tick();
        // Relax has no countdown; the command line moves on at a fixed pace.
        if mode == SessionMode::Relax && runner.elapsed_secs() % relax_interval == 0 {
            events.extend(runner.next()?);
        }
        for event in &events {
            render_event(&runner, event);
        }
    }

    let progress = runner.progress();
    debug!(?progress, "loop finished");
    let record = if run.record {
        session_loop.complete(runner).await?
    } else {
        runner.finish(Clock::system().now())
    };
    println!(
        "done: {} poses in {} ({})",
        record.poses,
        format_clock(record.time),
        if progress.is_complete {
            "complete"
        } else {
            "stopped"
        }
    );
    Ok(())
}

fn open_ended(mode: SessionMode) -> bool {
    matches!(mode, SessionMode::Classic | SessionMode::Relax)
}

fn render_event(runner: &SessionRunner, event: &SessionEvent) {
    let at = format_clock(i64::try_from(runner.elapsed_secs()).unwrap_or(i64::MAX));
    match event {
        SessionEvent::Tick { volume } => println!("[{at}] tick ({:.0}%)", volume * 100.0),
        SessionEvent::EndSound => println!("[{at}] time"),
        SessionEvent::Cue(cue) => println!("[{at}] cue: {cue:?}"),
        SessionEvent::ImageHidden => println!("[{at}] image hidden, draw from memory"),
        SessionEvent::ImageChanged { image } => {
            let progress = runner.progress();
            let position = progress
                .pose
                .filter(|p| p.show_global)
                .map(|p| format!(" pose {}/{}", p.global_pose_index, p.total_poses))
                .unwrap_or_default();
            let left = progress
                .remaining_seconds
                .map(|s| format!(", {} left", format_clock(s)))
                .unwrap_or_default();
            println!("[{at}] image {}{position}{left}", image + 1);
        }
        SessionEvent::PauseStarted { seconds } => println!("[{at}] pause for {seconds}s"),
        SessionEvent::Finished => println!("[{at}] finished"),
    }
}

async fn list_plans(app: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let summaries = app.plans().plan_summaries().await?;
    if summaries.is_empty() {
        println!("no saved plans");
    }
    for summary in summaries {
        println!(
            "{:<24} {:>3} steps {:>4} poses {:>9}",
            summary.name,
            summary.step_count,
            summary.total_poses,
            format_clock(i64::try_from(summary.total_seconds).unwrap_or(i64::MAX)),
        );
    }
    Ok(())
}

async fn list_history(app: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let history = app.history();
    let records = history.list().await?;
    for (index, record) in records.iter().enumerate() {
        println!(
            "#{index:<4} {:<8} {:>4} poses {:>9}",
            record.mode,
            record.poses,
            format_clock(record.time),
        );
    }
    let stats = history.stats().await?;
    println!(
        "{} sessions, {} poses, {} total",
        stats.sessions,
        stats.poses,
        format_clock(stats.seconds)
    );
    Ok(())
}

fn print_settings(settings: &TimerSettings) {
    println!("sound:            {}", on_off(settings.sound_enabled()));
    match settings.tick_threshold_override() {
        Some(secs) => println!("tick threshold:   {secs}s"),
        None => println!("tick threshold:   auto"),
    }
    println!("default duration: {}s", settings.default_duration());
    println!("flash duration:   {}s", settings.memory_flash_duration());
    println!("shuffle images:   {}", on_off(settings.shuffle_images()));
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

/// Create the parent directory of a file database; the store creates the file itself.
fn prepare_sqlite_dir(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
