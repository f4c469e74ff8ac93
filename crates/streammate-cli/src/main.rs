//! Headless front end for streammate-core.
//!
//! Status lines go to stdout, tracing output to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use streammate_core::app::MonitorHandle;
use streammate_core::config::HISTORY_DISPLAY_LIMIT;
use streammate_core::ports::TaskListener;
use streammate_core::{
    App, AppBuilder, AppConfig, Artifact, Record, TargetFormat, TaskError, TaskHandle, TaskKind,
    TaskPhase, TaskSnapshot,
};
use tracing_subscriber::EnvFilter;

/// Download YouTube videos, convert media files, and keep a history of both.
#[derive(Parser)]
#[command(name = "streammate", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download a video.
    Download {
        url: String,
        /// Destination directory (defaults to the configured download dir).
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },

    /// Convert a media file to mp3, wav or mp4.
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Output format; inferred from the output extension when omitted.
        #[arg(short, long)]
        format: Option<TargetFormat>,
    },

    /// Show past downloads and conversions.
    History {
        #[arg(short, long)]
        kind: Option<TaskKind>,
        /// Show only the N most recent entries, newest first.
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Show the last few downloads the way the main window does.
        #[arg(long, conflicts_with = "limit")]
        recent: bool,
        #[arg(long)]
        json: bool,
    },

    /// Delete the whole history.
    ClearHistory,

    /// Check network connectivity.
    Status {
        /// Keep probing until Ctrl-C.
        #[arg(short, long)]
        watch: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("streammate=warn,streammate_core=warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref())?;
    let mut app = AppBuilder::new(config).build()?;
    tracing::debug!(history = %app.store().path().display(), "streammate starting");

    if let Some(warning) = app.take_startup_warning() {
        eprintln!("warning: {warning}; starting with an empty history");
    }

    match cli.command {
        Command::Download { url, dir } => {
            let submitted = app.download(&url, dir, Arc::new(ConsoleListener));
            finish(submitted).await
        }
        Command::Convert {
            input,
            output,
            format,
        } => {
            let format = match format.or_else(|| TargetFormat::from_path(&output)) {
                Some(format) => format,
                None => anyhow::bail!(
                    "cannot tell the output format from {}; pass --format",
                    output.display()
                ),
            };
            let submitted = app.convert(Some(input), Some(output), format, Arc::new(ConsoleListener));
            finish(submitted).await
        }
        Command::History {
            kind,
            limit,
            recent,
            json,
        } => {
            let (kind, limit) = history_query(kind, limit, recent);
            print_history(&app, kind, limit, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::ClearHistory => {
            app.store()
                .clear()
                .with_context(|| format!("clearing {}", app.store().path().display()))?;
            println!("History cleared.");
            Ok(ExitCode::SUCCESS)
        }
        Command::Status { watch: false } => {
            let online = app.check_connectivity().await;
            println!("Status: {}", online_label(online));
            Ok(ExitCode::from(if online { 0 } else { 1 }))
        }
        Command::Status { watch: true } => {
            let monitor = app.start_monitor(Arc::new(|online: bool| {
                println!("Status: {}", online_label(online));
            }));
            wait_for_ctrl_c(monitor).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Prints the task lifecycle the way the window's status line does.
struct ConsoleListener;

impl TaskListener for ConsoleListener {
    fn on_started(&self, task: &TaskSnapshot) {
        match task.kind {
            TaskKind::Download => println!("Downloading video..."),
            TaskKind::Conversion => println!("Converting..."),
        }
    }

    fn on_succeeded(&self, task: &TaskSnapshot, artifact: &Artifact) {
        match task.kind {
            TaskKind::Download => println!("Download completed: '{}'", artifact.label),
            TaskKind::Conversion => println!("Conversion completed: '{}'", artifact.label),
        }
        println!("  {}", artifact.location.display());
    }

    fn on_failed(&self, task: &TaskSnapshot, error: &TaskError) {
        println!("{} {}.", capitalized(task.kind), error.summary());
        if *error != TaskError::Cancelled {
            eprintln!("error: {error}");
        }
    }
}

async fn finish(submitted: Result<TaskHandle, TaskSnapshot>) -> anyhow::Result<ExitCode> {
    let snapshot = match submitted {
        Ok(handle) => {
            let mut phase = handle.subscribe();
            tokio::select! {
                _ = phase.wait_for(|p| p.is_terminal()) => {}
                _ = tokio::signal::ctrl_c() => handle.cancel(),
            }
            handle.wait().await
        }
        Err(rejected) => rejected,
    };

    Ok(match snapshot.phase {
        TaskPhase::Succeeded => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// `--recent` means the last `HISTORY_DISPLAY_LIMIT` downloads unless a kind
/// is given.
fn history_query(
    kind: Option<TaskKind>,
    limit: Option<usize>,
    recent: bool,
) -> (Option<TaskKind>, Option<usize>) {
    if recent {
        (
            kind.or(Some(TaskKind::Download)),
            Some(HISTORY_DISPLAY_LIMIT),
        )
    } else {
        (kind, limit)
    }
}

fn print_history(
    app: &App,
    kind: Option<TaskKind>,
    limit: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let records: Vec<Record> = match limit {
        Some(limit) => app.store().recent(kind, limit),
        None => app.store().list(kind),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        match kind {
            Some(kind) => println!("No {kind} recorded."),
            None => println!("History is empty."),
        }
        return Ok(());
    }

    for record in &records {
        println!(
            "[{}] {}  {}  ({:?})",
            record.kind,
            record.label,
            record.location.display(),
            record.state
        );
    }

    let counts = app.store().counts();
    println!(
        "{} downloads, {} conversions",
        counts.downloads, counts.conversions
    );
    Ok(())
}

async fn wait_for_ctrl_c(monitor: MonitorHandle) -> anyhow::Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    monitor.shutdown().await;
    Ok(())
}

fn online_label(online: bool) -> &'static str {
    if online { "Online" } else { "Offline" }
}

fn capitalized(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Download => "Download",
        TaskKind::Conversion => "Conversion",
    }
}
