#![forbid(unsafe_code)]

//! `tracker-bot`: Slack to Asana webhook relay binary.
//!
//! Bootstraps configuration, the commitment classifier, the Slack and
//! Asana clients, the background task worker, and the webhook HTTP
//! server.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use tracker_bot::asana::client::AsanaClient;
use tracker_bot::classifier;
use tracker_bot::config::GlobalConfig;
use tracker_bot::dedup::EventCache;
use tracker_bot::relay::{AppState, TaskWorker};
use tracker_bot::server;
use tracker_bot::signature::SignatureVerifier;
use tracker_bot::slack::client::SlackWebClient;
use tracker_bot::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "tracker-bot", about = "Slack→Asana webhook relay", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the configured HTTP port.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("tracker-bot bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    if let Some(port) = args.port {
        config.http_port = port;
    }

    // Load credentials from keyring / env vars.
    config.load_credentials().await?;

    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Build collaborators ─────────────────────────────
    let classifier = classifier::from_config(&config.classifier)?;
    let slack = Arc::new(SlackWebClient::new(&config.slack.bot_token)?);
    let tracker = Arc::new(AsanaClient::new(&config.asana.pat)?);

    // ── Start the background task worker ────────────────
    let (worker, worker_handle) = TaskWorker::start(
        Arc::clone(&config),
        slack.clone(),
        tracker.clone(),
    );
    info!("task worker started");

    // ── Build shared application state ──────────────────
    let state = Arc::new(AppState {
        verifier: SignatureVerifier::new(config.slack.signing_secret.clone()),
        dedup: EventCache::new(config.dedup_capacity),
        config,
        classifier,
        slack,
        tracker,
        worker,
    });

    // ── Serve until shutdown signal ─────────────────────
    let ct = CancellationToken::new();
    let server_ct = ct.clone();
    let server_state = Arc::clone(&state);
    let server_handle = tokio::spawn(async move { server::serve(server_state, server_ct).await });

    shutdown_signal().await;
    info!("shutdown signal received");
    ct.cancel();

    if let Ok(Err(err)) = server_handle.await {
        return Err(err);
    }

    // Dropping the state releases the last queue sender so the worker
    // drains and exits.
    drop(state);
    let _ = worker_handle.await;
    info!("tracker-bot shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
