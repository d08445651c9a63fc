//! Binary entry point for the Slipway CLI.

use std::io::{self, Write};
use std::net::SocketAddr;
use std::process;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tokio::net::TcpListener;

use slipway::fork::FetchError;
use slipway::telemetry::TelemetryError;
use slipway::{
    ConfigError, DeployService, GithubClient, HerokuPlatform, Janitor, JanitorError, Platform,
    PlatformError, SlipwayConfig, SweepSummary, build_router, init_tracing, spawn_sweeper,
};

mod cli;

use cli::Cli;

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("logging setup failed: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("platform client error: {0}")]
    Platform(#[from] PlatformError),
    #[error("repository host client error: {0}")]
    Host(#[from] FetchError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] io::Error),
    #[error("sweep failed: {0}")]
    Sweep(#[from] JanitorError),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let exit_code = match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

async fn dispatch(cli: Cli) -> Result<(), CliError> {
    init_tracing()?;
    let config = SlipwayConfig::load_without_cli_args()?;
    config.validate()?;
    match cli {
        Cli::Serve => serve(&config).await,
        Cli::Sweep => sweep_once(&config).await,
    }
}

fn platform_from(config: &SlipwayConfig) -> Result<Arc<dyn Platform>, CliError> {
    Ok(Arc::new(HerokuPlatform::new(config.heroku_settings())?))
}

async fn serve(config: &SlipwayConfig) -> Result<(), CliError> {
    let platform = platform_from(config)?;
    let host = Arc::new(GithubClient::new(
        config.github_api_base.trim(),
        config.request_timeout(),
    )?);
    let service = DeployService::new(config.deploy_settings()?, Arc::clone(&platform), host);

    let sweeper = if config.enable_sweeper() {
        let janitor = Janitor::new(platform, config.janitor_config()?);
        Some(spawn_sweeper(janitor, config.sweep_interval()))
    } else {
        tracing::info!("sweeper disabled");
        None
    };

    let addr = config.listen_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| CliError::Bind { addr, source })?;
    tracing::info!(%addr, "listening");

    let served = axum::serve(listener, build_router(Arc::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(CliError::Serve);

    if let Some(handle) = sweeper {
        handle.shutdown().await;
    }
    tracing::info!("server stopped");
    served
}

async fn sweep_once(config: &SlipwayConfig) -> Result<(), CliError> {
    let janitor = Janitor::new(platform_from(config)?, config.janitor_config()?);
    let summary = janitor.sweep().await?;
    writeln!(io::stdout(), "{}", summary_line(&summary)).ok();
    Ok(())
}

fn summary_line(summary: &SweepSummary) -> String {
    format!("sweep complete: {summary}")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received");
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
