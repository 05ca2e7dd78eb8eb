//! Goodtime daemon
//!
//! Runs the timer against the file-backed stores and reads commands from stdin.

use anyhow::Result;
use clap::Parser;
use goodtime_core::{models::Label, storage::init_data_dir};
use goodtime_daemon::{
    AlarmScheduler, Event, EventListener, EventManager, FinishActionType, LabelManager,
    SessionManager, SettingsManager, SystemTimeProvider, TimeProvider, TimerDeps, TimerManager,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc};

#[derive(Parser, Debug)]
#[command(name = "goodtimed")]
#[command(about = "Goodtime daemon - pomodoro timer backend", long_about = None)]
struct Args {
    /// Directory for settings, labels and session history
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Activate this label on startup
    #[arg(long)]
    label: Option<String>,

    /// Start work sessions automatically after a break
    #[arg(long)]
    auto_start_work: Option<bool>,

    /// Start breaks automatically after a work session
    #[arg(long)]
    auto_start_break: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let data_dir = match &args.data_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            dir.clone()
        }
        None => init_data_dir()?,
    };
    let log_file_path = data_dir.join("goodtimed.log");

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)?;

    // Initialize logging - write to both file and stdout
    use tracing_subscriber::fmt::writer::MakeWriterExt;
    let stdout_writer = std::io::stdout.with_max_level(tracing::Level::INFO);
    let file_writer = log_file.with_max_level(tracing::Level::DEBUG);

    tracing_subscriber::fmt()
        .with_writer(stdout_writer.and(file_writer))
        .with_env_filter(&args.log_level)
        .with_ansi(false)
        .init();

    tracing::info!("Goodtime daemon starting...");
    tracing::info!("Data directory: {}", data_dir.display());
    tracing::info!("Log file: {}", log_file_path.display());

    let settings_manager = Arc::new(SettingsManager::new(data_dir.clone())?);
    let label_manager = Arc::new(LabelManager::new(data_dir.clone())?);
    let session_manager = Arc::new(SessionManager::new(data_dir)?);

    if let Some(label) = args.label.clone() {
        settings_manager.set_label_name(label).await?;
    }
    if let Some(enabled) = args.auto_start_work {
        settings_manager.set_auto_start_work(enabled).await?;
    }
    if let Some(enabled) = args.auto_start_break {
        settings_manager.set_auto_start_break(enabled).await?;
    }

    let time: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider::new());
    let event_manager = Arc::new(EventManager::new());
    let (alarm_tx, mut alarm_rx) = mpsc::unbounded_channel();
    let alarm: Arc<dyn EventListener> = Arc::new(AlarmScheduler::new(time.clone(), alarm_tx));

    let timer = TimerManager::new(TimerDeps {
        time,
        settings: settings_manager.clone(),
        labels: label_manager.clone(),
        sessions: session_manager.clone(),
        listeners: vec![alarm, event_manager.clone() as Arc<dyn EventListener>],
    });
    timer.wait_until_ready().await;
    timer.reset_streak_if_needed();
    tracing::info!("Timer ready with label '{}'", timer.timer_data().label_name());

    let event_log = tokio::spawn(log_events(event_manager.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    tracing::info!("Daemon ready, reading commands from stdin");

    loop {
        tokio::select! {
            Some(_) = alarm_rx.recv() => {
                tracing::info!("Session deadline reached");
                timer.finish_if_due();
            }
            line = lines.next_line() => {
                match line? {
                    Some(line) => {
                        if !handle_command(&timer, &settings_manager, &label_manager, &session_manager, line.trim()).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    tracing::info!("Shutting down...");
    timer.shutdown();
    timer.flush().await;
    event_log.abort();

    Ok(())
}

/// Run one command line; returns false when the daemon should exit
async fn handle_command(
    timer: &TimerManager,
    settings: &SettingsManager,
    labels: &LabelManager,
    sessions: &SessionManager,
    line: &str,
) -> bool {
    let (command, argument) = match line.split_once(' ') {
        Some((command, argument)) => (command, argument.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "start" => timer.start(None, false),
        "toggle" => timer.toggle(),
        "pause" => timer.pause(),
        "resume" => timer.resume(),
        "+1" => timer.add_one_minute(),
        "skip" => timer.skip(),
        "next" => timer.next(false, FinishActionType::ManualNext),
        "next-update" => timer.next(true, FinishActionType::ManualNext),
        "finish" => timer.finish(),
        "reset" => timer.reset(false, FinishActionType::ManualReset),
        "reset-update" => timer.reset(true, FinishActionType::ManualReset),
        "discard" => timer.reset(false, FinishActionType::ManualDoNothing),
        "bg" => timer.on_send_to_background(),
        "fg" => timer.on_bring_to_foreground(),
        "notes" => timer.update_notes_for_last_completed_session(argument),
        "label" => {
            if let Err(e) = settings.set_label_name(argument.to_string()).await {
                tracing::error!("Failed to change label: {}", e);
            }
        }
        "label-add" => match Label::new(argument.to_string()) {
            Ok(label) => {
                if let Err(e) = labels.upsert(label).await {
                    tracing::error!("Failed to add label: {}", e);
                }
            }
            Err(e) => tracing::error!("Invalid label: {}", e),
        },
        "label-archive" => {
            if let Err(e) = labels.archive(argument).await {
                tracing::error!("Failed to archive label: {}", e);
            }
        }
        "label-delete" => {
            if let Err(e) = labels.delete(argument).await {
                tracing::error!("Failed to delete label: {}", e);
            }
        }
        "labels" => {
            for label in labels.get_all() {
                let archived = if label.is_archived { " (archived)" } else { "" };
                println!("{} {}{}", label.id, label.name, archived);
            }
        }
        "status" => match serde_json::to_string(&timer.timer_data()) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("Failed to serialize timer: {}", e),
        },
        "history" => {
            timer.flush().await;
            for session in sessions.get_all().await {
                println!(
                    "{} {} {}min {}",
                    session.end_timestamp.to_rfc3339(),
                    if session.is_work { "work" } else { "break" },
                    session.duration,
                    session.label.unwrap_or_default()
                );
            }
        }
        "quit" | "exit" => return false,
        other => tracing::warn!("Unknown command: {}", other),
    }

    true
}

async fn log_events(mut events: broadcast::Receiver<Event>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => tracing::info!("Event: {}", json),
                Err(e) => tracing::error!("Failed to serialize event: {}", e),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Event log lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
