//! Operator console for the keg scale appliance.
//!
//! Examples:
//!   kegscale scales
//!   kegscale tare 0
//!   kegscale calibrate 0 1000
//!   kegscale calibrate 0 "1kg weight"
//!   kegscale --appliance http://localhost:8080 watch

mod commands;
mod config;

use clap::{Parser, Subcommand};
use config::FileConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kegscale", version, about = "Operate a keg scale appliance", long_about = None)]
struct Cli {
    /// Path to the config file (defaults to ./kegscale.toml when present)
    #[arg(short, long, env = "KEGSCALE_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP address of the appliance, e.g. http://keg-scale.local
    #[arg(short, long, env = "KEGSCALE_APPLIANCE")]
    appliance: Option<String>,

    /// Seconds to wait for the appliance to answer a command
    #[arg(short, long, env = "KEGSCALE_TIMEOUT")]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the scales of the appliance
    Scales,
    /// Put a scale in standby
    Standby { index: usize },
    /// Stream live measurements from a scale
    Live { index: usize },
    /// Zero a scale
    Tare { index: usize },
    /// Calibrate against a known mass in grams, or a weight label from /config
    Calibrate { index: usize, known: String },
    /// Start recording pours for the tap entry in a JSON file
    StartRecording { index: usize, tap_entry: PathBuf },
    /// Resume a recording from a previously downloaded JSON file
    PutRecording { index: usize, recording: PathBuf },
    /// Pause the current recording
    Pause { index: usize },
    /// Continue a paused recording
    Continue { index: usize },
    /// Stop the current recording
    Stop { index: usize },
    /// Print state pushes until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kegscale=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = FileConfig::discover(cli.config.as_deref())?
        .resolve(cli.appliance.as_deref(), cli.timeout)?;

    tracing::debug!(appliance = %settings.endpoint, "resolved settings");
    commands::run(settings, cli.command).await
}
