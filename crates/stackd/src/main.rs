//! stackd — the stack reconciler daemon.
//!
//! Serves the deploy API on top of a redb record store. Releases are kept by
//! the in-memory platform.
//!
//! # Usage
//!
//! ```text
//! stackd serve --config /etc/stackd.toml --port 8443 --data-dir /var/lib/stackd
//! stackd print-config
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use stack_core::StackdConfig;
use stack_platform::MemoryPlatform;
use stack_state::StateStore;
use tracing::info;

#[derive(Parser)]
#[command(name = "stackd", about = "Stack reconciler daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the API server.
    Serve {
        /// Path to stackd.toml.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to listen on (overrides the config file).
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for the record store (overrides the config file).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML.
    PrintConfig {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,stackd=debug,stack=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            port,
            data_dir,
        } => {
            let config = stackd::load_config(config.as_deref(), port, data_dir)?;
            serve(config).await
        }
        Command::PrintConfig { config } => {
            let config = stackd::load_config(config.as_deref(), None, None)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

async fn serve(config: StackdConfig) -> anyhow::Result<()> {
    info!("stackd starting");

    std::fs::create_dir_all(&config.server.data_dir)?;
    let db_path = config.server.data_dir.join(stackd::DB_FILE);
    let store = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    let platform = Arc::new(MemoryPlatform::new());
    info!(
        namespace_prefix = %config.reconciler.namespace_prefix,
        job_chart = %config.reconciler.job_chart.name,
        "reconciler initialized"
    );

    let router = stackd::build_app(&config, store, platform);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("stackd stopped");
    Ok(())
}
