//! gnosis-cs - face recognition central server
//!
//! Builds per-group recognition datasets from profile reference images and
//! relays WebRTC signaling between clients and the analytics engine.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gnosis_common::config as common_config;
use gnosis_cs::config::ServiceConfig;
use gnosis_cs::services::{
    EncodingClient, EngineEndpoint, FileStore, LocalFileStore, SignalingClient, StoreLayout,
};
use gnosis_cs::AppState;

/// Command-line arguments for gnosis-cs
#[derive(Parser, Debug)]
#[command(name = "gnosis-cs")]
#[command(about = "Face recognition central server")]
#[command(version)]
struct Args {
    /// Root folder holding the database (and the local file store by default)
    #[arg(short, long)]
    root_folder: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and GNOSIS_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(
        "Starting gnosis-cs v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );

    let root_folder = common_config::resolve_root_folder(
        args.root_folder.as_deref(),
        common_config::ROOT_FOLDER_ENV,
        args.config.as_deref(),
    );
    let db_path = common_config::prepare_root_folder(&root_folder)
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", root_folder.display());

    let mut config =
        ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let db = gnosis_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;
    info!("Database: {}", db_path.display());

    let store = open_file_store(&config, &root_folder)?;
    let layout = StoreLayout::new(config.file_store.root.clone());

    let endpoint = EngineEndpoint::new(&config.engine.base_url, config.engine.connect_timeout())
        .context("Failed to create analytics engine client")?;
    info!("Analytics engine: {}", endpoint.base_url());

    let state = AppState::new(
        db,
        store,
        Arc::new(EncodingClient::new(endpoint.clone())),
        Arc::new(SignalingClient::new(endpoint)),
        layout,
    );
    let app = gnosis_cs::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

#[cfg(feature = "sftp")]
fn open_file_store(
    config: &ServiceConfig,
    root_folder: &std::path::Path,
) -> Result<Arc<dyn FileStore>> {
    if let Some(sftp) = &config.file_store.sftp {
        info!("File store: sftp://{}@{}:{}", sftp.username, sftp.host, sftp.port);
        return Ok(Arc::new(gnosis_cs::services::SftpFileStore::new(sftp.clone())));
    }
    Ok(open_local_store(config, root_folder))
}

#[cfg(not(feature = "sftp"))]
fn open_file_store(
    config: &ServiceConfig,
    root_folder: &std::path::Path,
) -> Result<Arc<dyn FileStore>> {
    if config.file_store.sftp.is_some() {
        anyhow::bail!(
            "[file_store.sftp] is configured but gnosis-cs was built without the `sftp` feature"
        );
    }
    Ok(open_local_store(config, root_folder))
}

fn open_local_store(config: &ServiceConfig, root_folder: &std::path::Path) -> Arc<dyn FileStore> {
    let base = config
        .file_store
        .local_dir
        .clone()
        .unwrap_or_else(|| root_folder.join("store"));
    info!("File store: local directory {}", base.display());
    Arc::new(LocalFileStore::new(base))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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
