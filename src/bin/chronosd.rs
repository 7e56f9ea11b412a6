//! Chronos daemon: runs the alarm and reminder schedulers until Ctrl+C.

use chronos::audio::dispatch::{PlaybackOutcome, SoundDispatcher};
use chronos::audio::playback::list_output_devices;
use chronos::config::LoggingConfig;
use chronos::platform::create_notifier;
use chronos::{AlarmScheduler, ChronosConfig, ChronosEvent, Store, TaskScheduler, event_callbacks};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Chronos: alarms and task reminders with durable state.
#[derive(Parser)]
#[command(name = "chronosd", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, env = "CHRONOS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding alarms.json, tasks.json and custom sounds.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Run both schedulers until interrupted.
    Run,

    /// List every known sound.
    Sounds,

    /// Play a sound once through the fallback chain.
    TestSound {
        /// Sound name, e.g. "Gentle Bell".
        name: String,
    },

    /// List audio output devices.
    Devices,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(ChronosConfig::default_config_path);
    let mut config = ChronosConfig::load_or_default(&config_path)?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = Some(dir);
    }

    // Held for the life of the process so buffered file logs are flushed.
    let _log_guard = init_logging(&config.logging)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::Sounds => list_sounds(&config),
        Command::TestSound { name } => test_sound(&config, &name),
        Command::Devices => list_devices(),
    }
}

fn init_logging(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let stderr = fmt::layer().with_writer(std::io::stderr);

    if !logging.file {
        tracing_subscriber::registry().with(filter).with(stderr).init();
        return Ok(None);
    }

    let dir = chronos::chronos_dirs::logs_dir();
    std::fs::create_dir_all(&dir)?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&dir, "chronosd.log"));
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

async fn run(config: ChronosConfig) -> anyhow::Result<()> {
    let data_dir = config.storage.resolved_data_dir();
    println!("Chronos v{}", env!("CARGO_PKG_VERSION"));
    info!("data directory: {}", data_dir.display());

    let store = Arc::new(Store::open(&data_dir)?);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ChronosEvent>();
    let (on_ring, on_reminder) = event_callbacks(event_tx);

    let mut alarm_scheduler = AlarmScheduler::new(Arc::clone(&store)).with_ring_callback(on_ring);
    if config.alarms.local_playback {
        alarm_scheduler =
            alarm_scheduler.with_playback(Arc::new(SoundDispatcher::from_config(&config)));
    }
    let alarms = Arc::new(alarm_scheduler);

    let tasks = Arc::new(
        TaskScheduler::new(Arc::clone(&store))
            .with_notifier(create_notifier(&config.notifications))
            .with_reminder_callback(on_reminder)
            .with_poll_interval(Duration::from_secs(config.reminders.poll_interval_secs)),
    );

    alarms.start()?;
    tasks.start()?;
    println!(
        "\nWatching {} alarms and {} tasks. Press Ctrl+C to stop.\n",
        alarms.list().len(),
        tasks.list().len()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, shutting down...");
                break;
            }
            event = event_rx.recv() => match event {
                Some(ChronosEvent::AlarmRing { alarm_id }) => {
                    let label = alarms.get(&alarm_id).map(|a| a.label).unwrap_or_default();
                    println!("Alarm ringing: {label} ({alarm_id})");
                }
                Some(ChronosEvent::TaskReminder { task_id }) => {
                    let title = tasks.get(&task_id).map(|t| t.title).unwrap_or_default();
                    println!("Reminder: {title} ({task_id})");
                }
                None => {
                    warn!("event channel closed");
                    break;
                }
            }
        }
    }

    alarms.shutdown().await;
    tasks.shutdown().await;
    Ok(())
}

fn list_sounds(config: &ChronosConfig) -> anyhow::Result<()> {
    let dispatcher = SoundDispatcher::from_config(config);
    println!("Sounds:");
    for sound in dispatcher.catalog().list() {
        let marker = if sound.custom { " [custom]" } else { "" };
        println!("  - {}{marker}: {}", sound.name, sound.description);
    }
    Ok(())
}

fn test_sound(config: &ChronosConfig, name: &str) -> anyhow::Result<()> {
    let dispatcher = SoundDispatcher::from_config(config);
    match dispatcher.play_once(name) {
        PlaybackOutcome::Played { backend } => println!("Played \"{name}\" via {backend}"),
        PlaybackOutcome::Silent => println!("No playback mechanism could play \"{name}\""),
    }
    Ok(())
}

fn list_devices() -> anyhow::Result<()> {
    println!("Output devices:");
    for name in list_output_devices()? {
        println!("  - {name}");
    }
    Ok(())
}
