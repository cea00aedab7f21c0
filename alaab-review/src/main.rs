//! Alaab review service - main entry point
//!
//! Serves the similarity review queue, concept management and the game
//! submission workflow over HTTP.

use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Mutex;

use alaab_common::config::{resolve_data_folder, TomlConfig};
use alaab_common::db::init_database;
use alaab_common::events::EventBus;
use alaab_review::{build_router, AppState};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for alaab-review
#[derive(Parser, Debug)]
#[command(name = "alaab-review")]
#[command(about = "Similarity matching and review workflow for the Alaab games catalogue")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/alaab/config.toml, then /etc/alaab/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Folder holding the database
    #[arg(short, long)]
    data_folder: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "ALAAB_PORT")]
    port: Option<u16>,

    /// Address to bind (overrides config)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    init_tracing(&config)?;

    info!("Starting Alaab review service v{}", env!("CARGO_PKG_VERSION"));

    config
        .matching
        .validate()
        .context("Invalid [matching] configuration")?;
    info!(
        algorithm = %config.matching.algorithm,
        threshold = config.matching.threshold,
        "Matching configuration"
    );

    let data_folder = resolve_data_folder(args.data_folder.as_deref(), &config);
    let db_path = data_folder.join(&config.database_file);
    info!("Database: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let event_bus = EventBus::new(100);
    info!("Event bus capacity: {}", event_bus.capacity());
    let state = AppState::new(pool, event_bus, config.matching.clone());
    let app = build_router(state);

    let bind = args.bind.unwrap_or(config.bind_address.clone());
    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing from RUST_LOG, falling back to the configured level
fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "alaab_review={level},alaab_common={level},tower_http=info",
            level = config.logging.level
        ))
    });

    match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
