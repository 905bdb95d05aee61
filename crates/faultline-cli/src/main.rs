//! Faultline CLI - operator tool for the error telemetry pipeline
//!
//! Provides commands for:
//! - Inspecting and exporting the local log store
//! - Querying and managing the remote collector's error store
//! - Viewing and validating configuration
//! - Sending a synthetic capture through a real pipeline

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    capture::CaptureCommand, config::ConfigCommand, load_config, local::LocalCommand,
    remote::RemoteCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "faultline", version, about = "Client-side error telemetry toolkit")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspect the local log store
    #[command(subcommand)]
    Local(LocalCommand),
    /// Talk to the remote collector
    #[command(subcommand)]
    Remote(RemoteCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Send a synthetic error through the pipeline
    Capture(CaptureCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = load_config(cli.config.as_deref())?;

    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // Diagnostics go to stderr so `--json` output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let format = OutputFormat::from_json_flag(cli.json);

    match cli.command {
        Commands::Local(cmd) => cmd.execute(&config, format).await,
        Commands::Remote(cmd) => cmd.execute(&config, format).await,
        Commands::Config(cmd) => cmd.execute(&config, &config_path, format).await,
        Commands::Capture(cmd) => cmd.execute(&config, format).await,
    }
}
