//! Faultline Collector daemon
//!
//! Serves the error store API until SIGINT or SIGTERM.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use faultline_collector::CollectorServer;
use faultline_core::config::Config;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "faultline-collectord")]
#[command(about = "Faultline remote log collector", version)]
struct Args {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `server.listen`
    #[arg(long)]
    listen: Option<String>,

    /// Override `server.errors_file`
    #[arg(long)]
    errors_file: Option<PathBuf>,
}

/// Waits for SIGINT or SIGTERM, then cancels `token`.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };

    if let Some(listen) = &args.listen {
        config.server.listen = listen.clone();
    }
    if let Some(errors_file) = &args.errors_file {
        config.server.errors_file = errors_file.clone();
    }

    let problems = config.validate();
    if !problems.is_empty() {
        let details: Vec<String> = problems.iter().map(|p| p.to_string()).collect();
        anyhow::bail!("Invalid configuration: {}", details.join("; "));
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!("Faultline collector starting (faultline-collectord)");

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let server = CollectorServer::bind(&config.server).await?;
    let result = server.run(shutdown_token).await;

    match &result {
        Ok(()) => info!("Faultline collector shut down gracefully"),
        Err(e) => error!(error = %e, "Faultline collector exiting with error"),
    }

    result
}
