use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use th_track::bridge::{self, Bridge, BridgeHandle, StopReason};
use th_track::config;
use th_track::controller::{LineTracker, Tracker};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// How long a cancelled tick loop gets to release its keys
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Drive a keyboard-only shooter with a tracked motion controller
#[derive(Parser, Debug)]
#[command(name = "th-track", version, about)]
struct Cli {
    /// Game process, by PID or by name substring
    target: String,

    /// Directory holding default.toml and the per-game layers
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Read tracker lines from this file instead of stdin
    #[arg(long)]
    tracker_input: Option<PathBuf>,

    /// Log per-tick details
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup(cli.verbose)?;

    let reason = bridge::block_on_session(run(cli))??;
    info!("Stopped: {:?}", reason);
    Ok(())
}

async fn run(cli: Cli) -> Result<StopReason> {
    let tracker: Box<dyn Tracker> = match &cli.tracker_input {
        Some(path) => {
            info!("Reading tracker lines from {}", path.display());
            let file = File::open(path)
                .map_err(|e| eyre!("Failed to open tracker input {}: {}", path.display(), e))?;
            Box::new(LineTracker::connect(file)?)
        }
        None => {
            info!("Reading tracker lines from stdin");
            Box::new(LineTracker::connect(io::stdin())?)
        }
    };

    let config_dir = config::config_dir(cli.config_dir);
    info!("Using configuration directory {}", config_dir.display());
    let bridge = Bridge::open(&cli.target, &config_dir, tracker)?;

    let mut handle = BridgeHandle::spawn(bridge);
    let finished = tokio::select! {
        result = handle.wait() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    let reason = match finished {
        Some(result) => result?,
        None => {
            info!("Ctrl-C received, stopping");
            handle.stop(SHUTDOWN_GRACE).await?
        }
    };
    Ok(reason)
}

fn setup(verbose: bool) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env(if verbose { Level::DEBUG } else { Level::INFO });
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
