//! Wiring for the stackd daemon: config loading and router assembly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use stack_api::ApiState;
use stack_compiler::ManifestCompiler;
use stack_core::StackdConfig;
use stack_platform::ReleasePlatform;
use stack_reconciler::Reconciler;
use stack_state::StateStore;

/// File name of the record store inside the data directory.
pub const DB_FILE: &str = "stackd.redb";

/// Load `stackd.toml` (if given) and apply command-line overrides.
pub fn load_config(
    path: Option<&Path>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<StackdConfig> {
    let mut config = match path {
        Some(path) => StackdConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => StackdConfig::default(),
    };
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.server.data_dir = data_dir;
    }
    Ok(config)
}

/// Assemble the reconciler and the API router on top of it.
pub fn build_app(
    config: &StackdConfig,
    store: StateStore,
    platform: Arc<dyn ReleasePlatform>,
) -> Router {
    let reconciler = Reconciler::new(
        platform,
        Arc::new(store.clone()),
        Arc::new(ManifestCompiler),
        config.reconciler.clone(),
    );
    stack_api::build_router(ApiState {
        reconciler: Arc::new(reconciler),
        store,
    })
}
