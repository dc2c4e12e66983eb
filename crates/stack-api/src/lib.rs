//! stack-api — REST API for stack deploys.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | PUT | `/api/v1/projects/{project_id}/clusters/{cluster_id}/stacks/{name}` | Create or update a stack |
//! | GET | `/api/v1/clusters/{cluster_id}/stacks/{name}` | Get the stored application |
//! | GET | `/api/v1/clusters/{cluster_id}/stacks/{name}/events` | List deploy events |
//! | GET | `/healthz` | Liveness |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, put};
use stack_reconciler::Reconciler;
use stack_state::StateStore;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub reconciler: Arc<Reconciler>,
    pub store: StateStore,
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route(
            "/projects/{project_id}/clusters/{cluster_id}/stacks/{name}",
            put(handlers::deploy_stack),
        )
        .route("/clusters/{cluster_id}/stacks/{name}", get(handlers::get_stack))
        .route(
            "/clusters/{cluster_id}/stacks/{name}/events",
            get(handlers::list_stack_events),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::health))
}
