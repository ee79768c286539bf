mod api;
mod config;
mod db;
mod services;
mod types;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use georep_executor::{exec, ExecutorKind, SessionManager};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use api::AppState;
use config::ControlConfig;
use services::OperationManager;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExecutorArg {
    Ssh,
    Local,
    Mock,
}

impl From<ExecutorArg> for ExecutorKind {
    fn from(arg: ExecutorArg) -> Self {
        match arg {
            ExecutorArg::Ssh => ExecutorKind::Ssh,
            ExecutorArg::Local => ExecutorKind::Local,
            ExecutorArg::Mock => ExecutorKind::Mock,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "georep-control")]
#[command(about = "Geo-replication control plane", long_about = None)]
struct Args {
    /// Bind address for HTTP server
    #[arg(long, env = "GEOREP_BIND", default_value = "0.0.0.0:8080")]
    bind: String,

    /// Database file path
    #[arg(long, env = "GEOREP_DB_PATH")]
    db_path: Option<PathBuf>,

    /// JSON config file (executor settings, timeouts)
    #[arg(long, env = "GEOREP_CONFIG")]
    config: Option<PathBuf>,

    /// Override the executor kind from the config file
    #[arg(long, value_enum)]
    executor: Option<ExecutorArg>,

    /// Override the per-batch timeout from the config file
    #[arg(long)]
    timeout_minutes: Option<u64>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting geo-replication control plane");

    let mut cfg = match &args.config {
        Some(path) => ControlConfig::load(path)?,
        None => ControlConfig::default(),
    };
    if let Some(kind) = args.executor {
        cfg.executor.kind = kind.into();
    }
    if let Some(minutes) = args.timeout_minutes {
        cfg.set_timeout_minutes(minutes)
            .context("Invalid --timeout-minutes")?;
    }

    if cfg.executor.kind == ExecutorKind::Mock {
        warn!("Mock executor selected: no commands will reach any host");
    }
    info!(
        "Executor: {:?}, timeout: {} minute(s)",
        cfg.executor.kind, cfg.timeout_minutes
    );

    // Initialize database
    let db = db::init_db(args.db_path)?;

    let sessions =
        SessionManager::new(exec::from_config(&cfg.executor)).with_timeout_minutes(cfg.timeout_minutes);

    // Create application state
    let state = Arc::new(AppState {
        db,
        sessions,
        operations: OperationManager::new(),
    });

    // Create router
    let app = api::create_router(state);

    // Parse bind address
    let addr: SocketAddr = args
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", args.bind))?;
    info!("Listening on http://{}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
