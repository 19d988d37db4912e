//! Guardian-Link server
//!
//! Loads configuration, resolves collaborator capabilities, serves the frame
//! stream and operator API, and drains in-flight escalations on shutdown.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use guardian_link::api::{create_app, ApiState};
use guardian_link::collaborators::{Capabilities, Credentials};
use guardian_link::config::{AggregationScope, GuardianConfig};
use guardian_link::pipeline::PipelineCoordinator;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "guardian-link")]
#[command(about = "Guardian-Link gesture aggregation and emergency escalation service")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:8000")
    #[arg(short, long)]
    addr: Option<String>,

    /// Path to a guardian_config.toml (overrides the GUARDIAN_CONFIG search)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Aggregation scope: shared | per_device
    #[arg(long)]
    scope: Option<AggregationScope>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Validate the effective configuration and print it as TOML
    CheckConfig,
}

// ============================================================================
// Supervised Tasks
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
        }
    }
}

// ============================================================================
// Setup
// ============================================================================

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

/// Load config and apply CLI/env overrides.
///
/// Address precedence: `--addr` > `GUARDIAN_SERVER_ADDR` > TOML.
fn load_config(args: &CliArgs) -> Result<GuardianConfig> {
    let mut config = match &args.config {
        Some(path) => GuardianConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => GuardianConfig::load(),
    };

    if let Some(scope) = args.scope {
        config.escalation.scope = scope;
    }
    if let Some(addr) = args
        .addr
        .clone()
        .or_else(|| std::env::var("GUARDIAN_SERVER_ADDR").ok())
    {
        config.server.addr = addr;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Serve `app` until the token is cancelled.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: axum::Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!(task = %TaskName::HttpServer, "Serving frame stream and operator API");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!(task = %TaskName::HttpServer, "Draining open connections");
            })
            .await;

        match result {
            Ok(()) => {
                info!(task = %TaskName::HttpServer, "Stopped accepting connections");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!(task = %TaskName::HttpServer, error = %e, "Server failed");
                Err(anyhow::Error::new(e).context("HTTP server failed"))
            }
        }
    });
}

/// Wait for a stop request or the first task failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🔒 Supervisor watching {} task(s)", task_set.len());

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("🛑 Supervisor: stop requested");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!(task = %task_name, "🔒 Task exited early");
                    }
                    Some(Ok(Err(e))) => {
                        error!(error = %e, "🔒 Task failed, stopping service");
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!(error = %e, "🔒 Task panicked, stopping service");
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("supervised task panicked: {e}"));
                    }
                    None => {
                        info!("🔒 No tasks left to supervise");
                        break;
                    }
                }
            }
        }
    }

    // Let the server finish its graceful shutdown before draining escalations.
    while let Some(result) = task_set.join_next().await {
        if let Ok(Ok(task_name)) = result {
            info!("🔒 Supervisor: Task {} stopped", task_name);
        }
    }

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials live in .env during development
    let dotenv = dotenvy::dotenv();

    let args = CliArgs::parse();
    init_tracing(args.log_json);

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment from .env");
    }

    let config = load_config(&args)?;

    if let Some(SubCommand::CheckConfig) = args.command {
        println!("{}", config.to_toml()?);
        info!("Configuration is valid");
        return Ok(());
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Guardian-Link - Gesture Aggregation & Emergency Escalation");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "🗳️  Voting: {} of {} '{}' frames | Cooldown: {}s | Admission: {}ms",
        config.temporal.alarm_min_count,
        config.temporal.window_size,
        config.temporal.alarm_tag,
        config.escalation.cooldown_secs,
        config.admission.interval_ms
    );
    info!("🧭 Aggregation scope: {}", config.escalation.scope);

    let config = Arc::new(config);
    let capabilities = Capabilities::resolve(&config, &Credentials::from_env());
    let coordinator = Arc::new(PipelineCoordinator::new(Arc::clone(&config), capabilities));

    tokio::fs::create_dir_all(&config.collaborators.audio_dir)
        .await
        .with_context(|| format!("Failed to create audio dir {}", config.collaborators.audio_dir.display()))?;

    let app = create_app(
        ApiState::new(Arc::clone(&coordinator)),
        &config.collaborators.audio_dir,
        &config.collaborators.audio_url_prefix,
    );
    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.addr))?;
    info!("🌐 Listening on http://{} (frames: /ws/stream)", config.server.addr);

    // Ctrl+C stops the server; escalations drain afterwards
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Ctrl+C received, shutting down");
        shutdown_token.cancel();
    });

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());
    let result = run_supervisor(&mut task_set, cancel_token).await;

    coordinator.shutdown().await;
    info!("👋 Guardian-Link stopped");
    result
}
