//! voicebot - VK voice message bot
//!
//! Reads messages through the VK long poll API and answers each one with a
//! voice message synthesized by Piper or espeak-ng.

use std::process::ExitCode;

use tracing::{error, info};

use voicebot::{config, telemetry, AppState, Result};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration (reads .env first)
    let config = config::init();

    if let Err(e) = telemetry::init(&config.telemetry) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, code = e.error_code(), "Fatal error, shutting down");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: &config::Config) -> Result<()> {
    info!(
        api_version = %config.vk.api_version,
        group_id = ?config.vk.group_id,
        engine = ?config.voice.engine,
        "Starting voice bot"
    );

    let state = AppState::new(config).await?;

    let worker = state.worker();
    let handle = worker.start().await;
    info!("Voice bot is running");

    shutdown_signal().await;
    info!("Shutdown signal received");

    handle.stop().await?;
    info!("Voice bot stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
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
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
