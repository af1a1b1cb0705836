//! syncloop - Main entry point
//!
//! Loops a WAV file on the selected output device, starting on the next
//! multiple of `--round-to` seconds of wall-clock time so independent
//! instances start together, and keeps playback locked to the wall clock.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use syncloop_common::{Settings, SettingsOverrides, TomlConfig};
use syncloop_player::audio::{load_wav, AudioOutput};
use syncloop_player::playback::PlaybackEngine;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for syncloop
#[derive(Parser, Debug)]
#[command(name = "syncloop")]
#[command(about = "Loop a WAV file in sync with the wall clock")]
#[command(version)]
struct Args {
    /// WAV file to loop
    #[arg(required_unless_present = "list_devices")]
    file: Option<PathBuf>,

    /// Start on the next multiple of this many seconds
    #[arg(short, long = "round-to", env = "SYNCLOOP_ROUND_TO")]
    round_to: Option<f64>,

    /// Offset change (ms) tolerated before correcting drift
    #[arg(short, long = "tolerance-ms", env = "SYNCLOOP_TOLERANCE_MS")]
    tolerance_ms: Option<f64>,

    /// Fixed output buffer size in frames
    #[arg(short, long = "buffer-frames", env = "SYNCLOOP_BUFFER_FRAMES")]
    buffer_frames: Option<u32>,

    /// Drift check interval in milliseconds
    #[arg(long = "monitor-interval-ms", env = "SYNCLOOP_MONITOR_INTERVAL_MS")]
    monitor_interval_ms: Option<u64>,

    /// Output device name (default device when omitted or not found)
    #[arg(short, long, env = "SYNCLOOP_DEVICE")]
    device: Option<String>,

    /// Configuration file
    #[arg(short, long, env = "SYNCLOOP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long = "log-level", env = "SYNCLOOP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print output device names and exit
    #[arg(long = "list-devices")]
    list_devices: bool,
}

impl Args {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            round_to_secs: self.round_to,
            drift_tolerance_ms: self.tolerance_ms,
            buffer_frames: self.buffer_frames,
            monitor_interval_ms: self.monitor_interval_ms,
            device: self.device.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Settings come first: the log level is one of them
    let (file_config, config_source) = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration file")?;
    let settings = Settings::resolve(args.overrides(), file_config).context("Invalid configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(&settings.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "syncloop {} ({} build {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_PROFILE"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP")
    );
    match &config_source {
        Some(path) => info!("Configuration loaded from {}", path.display()),
        None => warn!("No configuration file found, using defaults"),
    }

    if args.list_devices {
        for name in AudioOutput::list_devices().context("Failed to list output devices")? {
            println!("{}", name);
        }
        return Ok(());
    }

    let path = args
        .file
        .context("No WAV file given")?;
    let audio = load_wav(&path).with_context(|| format!("Failed to load {}", path.display()))?;

    info!(
        "Loop period {}s, drift tolerance {}ms, buffer {} frames",
        settings.round_to_secs, settings.drift_tolerance_ms, settings.buffer_frames
    );

    PlaybackEngine::new(settings, audio)
        .run(shutdown_signal())
        .await
        .context("Playback failed")?;

    info!("Shutdown complete");
    Ok(())
}

/// Filter used when RUST_LOG is not set
fn default_filter(level: &str) -> String {
    format!(
        "syncloop={level},syncloop_player={level},syncloop_common={level}",
        level = level
    )
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
