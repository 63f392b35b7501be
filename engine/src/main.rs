//! todopaper - wallpaper engine for a to-do list, timetable and weather.
//!
//! # Commands
//!
//! - `todopaper run`: Watch the to-do file and keep the wallpaper updated
//! - `todopaper once`: Render the wallpaper once and exit
//! - `todopaper todos`: Print the parsed to-do rows
//!
//! # Environment Variables
//!
//! See `todopaper --help` or the `config` module of the library.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use todopaper_engine::config::Config;
use todopaper_engine::error::EngineError;
use todopaper_engine::font::FontStack;
use todopaper_engine::parser::read_todo_file;
use todopaper_engine::pipeline::{RenderPaths, RenderPipeline};
use todopaper_engine::scheduler::{Scheduler, TriggerReason};
use todopaper_engine::sink::CommandSink;
use todopaper_engine::sources::{TomorrowIo, WebUntis};
use todopaper_engine::types::TodoItem;
use todopaper_engine::watcher::{FileWatcher, WatchEvent};

/// Capacity of the watch event channel.
const WATCH_CHANNEL_CAPACITY: usize = 64;

/// todopaper - to-do list wallpaper engine.
///
/// Draws a to-do list, today's timetable, upcoming holidays and the current
/// weather onto a base image and sets it as the desktop background.
#[derive(Parser, Debug)]
#[command(name = "todopaper")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    TODOPAPER_HOME              Base directory (default: ~/.todopaper)
    TODOPAPER_TODO_PATH         To-do file (default: $TODOPAPER_HOME/todo.md)
    TODOPAPER_BACKGROUND_PATH   Base image (default: $TODOPAPER_HOME/background/old.png)
    TODOPAPER_OUTPUT_PATH       Output image (default: $TODOPAPER_HOME/output/background.png)
    TODOPAPER_LOG_PATH          Log file (default: $TODOPAPER_HOME/wallpaper.log)
    TODOPAPER_FONT_PATHS        Comma-separated font fallback chain
    TODOPAPER_FONT_SIZE         Font size in pixels (default: 32)
    TODOPAPER_TICK_SECS         Periodic update interval (default: 240)
    TODOPAPER_DEBOUNCE_MS       File change debounce window (default: 2000)
    TODOPAPER_SINK_COMMAND      Wallpaper command, {path} is replaced
    TODOPAPER_WEATHER_API_KEY   tomorrow.io API key
    TODOPAPER_WEATHER_LOCATION  Weather location query
    TODOPAPER_WEATHER_URL       Weather API base URL (default: https://api.tomorrow.io)
    TODOPAPER_WEBUNTIS_SERVER   WebUntis server URL
    TODOPAPER_WEBUNTIS_SCHOOL   WebUntis school name
    TODOPAPER_WEBUNTIS_USER     WebUntis login
    TODOPAPER_WEBUNTIS_PASSWORD WebUntis password

EXAMPLES:
    # Keep the wallpaper updated
    todopaper run

    # Render once, e.g. from cron
    todopaper once

    # Inspect how the to-do file is parsed
    todopaper todos --json
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Start the wallpaper daemon.
    ///
    /// Renders immediately, then on every change of the to-do file and
    /// periodically.
    Run,

    /// Render the wallpaper once and exit.
    Once,

    /// Print the parsed to-do rows.
    Todos {
        /// Print as JSON instead of indented text.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Command::Todos { json } => run_todos(&config, json),
        Command::Once => build_runtime()?.block_on(run_once(config)),
        Command::Run => build_runtime()?.block_on(run_daemon(config)),
    }
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")
}

/// Prints the parsed to-do file.
fn run_todos(config: &Config, json: bool) -> Result<()> {
    let items = match read_todo_file(&config.todo_path) {
        Ok(items) => items,
        Err(EngineError::NotFound(path)) => {
            anyhow::bail!("To-do file not found: {}", path.display())
        }
        Err(e) => return Err(e).context("Failed to read to-do file"),
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&items).context("Failed to serialize to-do rows")?
        );
    } else {
        for item in &items {
            println!("{}", describe(item));
        }
    }
    Ok(())
}

fn describe(item: &TodoItem) -> String {
    let indent = "  ".repeat(item.indent.floor() as usize);
    let marker = match (item.checked, item.strikethrough) {
        (true, true) => "[x~]",
        (true, false) => "[x] ",
        (false, _) => "[ ] ",
    };
    format!("{marker} {indent}{}", item.display_text())
}

/// Renders once.
async fn run_once(config: Config) -> Result<()> {
    let _guard = init_logging(&config.log_path);

    let pipeline = build_pipeline(&config)?;
    let scheduler = Scheduler::new(pipeline, config.debounce_window, config.tick_interval);

    match scheduler.trigger(TriggerReason::Manual).await {
        Ok(path) => {
            println!("{}", path.display());
            Ok(())
        }
        Err(EngineError::NothingToRender) => Ok(()),
        Err(e) => Err(e).context("Render failed"),
    }
}

/// Runs the daemon until SIGINT or SIGTERM.
async fn run_daemon(config: Config) -> Result<()> {
    let _guard = init_logging(&config.log_path);

    info!("Starting wallpaper engine");
    info!(
        todo_path = %config.todo_path.display(),
        output_path = %config.output_path.display(),
        tick_secs = config.tick_interval.as_secs(),
        debounce_ms = config.debounce_window.as_millis() as u64,
        "Configuration loaded"
    );

    let pipeline = build_pipeline(&config)?;
    let scheduler = Arc::new(
        Scheduler::new(pipeline, config.debounce_window, config.tick_interval)
            .with_log_file(config.log_path.clone()),
    );

    let (watch_tx, watch_rx) = mpsc::channel::<WatchEvent>(WATCH_CHANNEL_CAPACITY);

    if let Some(dir) = config.todo_path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            info!(dir = %dir.display(), "Creating to-do directory");
            fs::create_dir_all(dir).context("Failed to create to-do directory")?;
        }
    }

    let _watcher = FileWatcher::new(config.todo_path.clone(), watch_tx)
        .map_err(EngineError::Watch)
        .with_context(|| {
            format!(
                "Failed to initialize file watcher for {}",
                config.todo_path.display()
            )
        })?;

    info!("Wallpaper engine running. Press Ctrl+C to stop.");
    scheduler.run(watch_rx, wait_for_shutdown()).await;

    info!("Wallpaper engine stopped");
    Ok(())
}

fn build_pipeline(config: &Config) -> Result<RenderPipeline> {
    let fonts = FontStack::load(&config.font_paths, config.font_size)
        .context("Failed to load fonts. Set TODOPAPER_FONT_PATHS to a readable font file")?;
    let weather = TomorrowIo::new(config.weather.clone()).context("Failed to create weather client")?;
    let timetable =
        WebUntis::new(config.webuntis.clone()).context("Failed to create timetable client")?;
    let sink = CommandSink::from_config(config.sink_command.as_deref());

    if config.weather.api_key.is_none() {
        warn!("No weather API key configured, weather will show an error");
    }

    Ok(RenderPipeline::new(
        RenderPaths::from_config(config),
        Arc::new(fonts),
        Arc::new(weather),
        Arc::new(timetable),
        Arc::new(sink),
    ))
}

/// Initializes logging to stdout and, if it can be opened, the log file.
///
/// The returned guard flushes the file writer when dropped.
fn init_logging(log_path: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match open_log_file(log_path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("Failed to open log file {}: {e}", log_path.display());
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true).with_level(true))
        .with(file_layer)
        .init();

    guard
}

fn open_log_file(path: &Path) -> std::io::Result<fs::File> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
