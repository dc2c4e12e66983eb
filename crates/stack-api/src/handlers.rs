//! REST API handlers.
//!
//! Deploys go through the reconciler; reads come straight from `StateStore`.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use stack_core::{DeployRequest, ImageInfo, ProvenancePatch};
use stack_reconciler::Outcome;
use stack_state::{ClusterId, ProjectId};
use tracing::warn;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// GET /healthz
pub async fn health() -> impl IntoResponse {
    ApiResponse::ok("ok")
}

// ── Deploy ─────────────────────────────────────────────────────

/// Deploy request body. Provenance fields sit at the top level; `""` or a
/// missing key keeps the stored value and `null` / `"null"` clears it.
#[derive(Debug, Deserialize)]
pub struct DeployBody {
    /// Stack manifest, standard base64.
    pub porter_yaml_base64: String,
    #[serde(default)]
    pub image_info: ImageInfo,
    #[serde(default)]
    pub build_output: Option<String>,
    #[serde(default)]
    pub override_release: bool,
    #[serde(default)]
    pub git_repo_id: Option<u64>,
    #[serde(flatten)]
    pub provenance: ProvenancePatch,
}

/// PUT /api/v1/projects/{project_id}/clusters/{cluster_id}/stacks/{name}
pub async fn deploy_stack(
    State(state): State<ApiState>,
    Path((project_id, cluster_id, name)): Path<(ProjectId, ClusterId, String)>,
    Json(body): Json<DeployBody>,
) -> impl IntoResponse {
    let manifest = match BASE64.decode(body.porter_yaml_base64.trim()) {
        Ok(manifest) => manifest,
        Err(e) => {
            return error_response(
                &format!("porter_yaml_base64 is not valid base64: {e}"),
                StatusCode::BAD_REQUEST,
            )
            .into_response();
        }
    };

    let request = DeployRequest {
        project_id,
        cluster_id,
        name,
        manifest,
        image_info: body.image_info,
        build_output: body.build_output,
        override_release: body.override_release,
        git_repo_id: body.git_repo_id,
        provenance: body.provenance,
    };

    match state.reconciler.reconcile(request).await {
        Ok(reconciled) => {
            let status = match reconciled.outcome {
                Outcome::Created => StatusCode::CREATED,
                Outcome::Updated => StatusCode::OK,
            };
            (status, ApiResponse::ok(reconciled)).into_response()
        }
        Err(e) => {
            let status = StatusCode::from_u16(e.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            warn!(cluster = cluster_id, error = %e, status = status.as_u16(), "deploy failed");
            error_response(&e.to_string(), status).into_response()
        }
    }
}

// ── Reads ──────────────────────────────────────────────────────

/// GET /api/v1/clusters/{cluster_id}/stacks/{name}
pub async fn get_stack(
    State(state): State<ApiState>,
    Path((cluster_id, name)): Path<(ClusterId, String)>,
) -> impl IntoResponse {
    match state.store.get_application(cluster_id, &name) {
        Ok(Some(app)) => ApiResponse::ok(app).into_response(),
        Ok(None) => error_response("stack not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// GET /api/v1/clusters/{cluster_id}/stacks/{name}/events
pub async fn list_stack_events(
    State(state): State<ApiState>,
    Path((cluster_id, name)): Path<(ClusterId, String)>,
) -> impl IntoResponse {
    let app = match state.store.get_application(cluster_id, &name) {
        Ok(Some(app)) => app,
        Ok(None) => {
            return error_response("stack not found", StatusCode::NOT_FOUND).into_response();
        }
        Err(e) => {
            return error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
                .into_response();
        }
    };
    match state.store.list_events_for_application(app.id) {
        Ok(events) => ApiResponse::ok(events).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use stack_compiler::ManifestCompiler;
    use stack_core::FieldPatch;
    use stack_core::config::ReconcilerConfig;
    use stack_platform::{MemoryPlatform, PlatformError, PlatformOp};
    use stack_reconciler::Reconciler;
    use stack_state::StateStore;

    const MANIFEST: &str = "version: v1stack\napps:\n  web:\n    type: web\n    run: serve\n";

    fn test_state() -> (ApiState, MemoryPlatform) {
        let platform = MemoryPlatform::with_journal();
        let store = StateStore::open_in_memory().unwrap();
        let reconciler = Reconciler::new(
            Arc::new(platform.clone()),
            Arc::new(store.clone()),
            Arc::new(ManifestCompiler),
            ReconcilerConfig::default(),
        );
        let state = ApiState {
            reconciler: Arc::new(reconciler),
            store,
        };
        (state, platform)
    }

    fn body(manifest: &str) -> DeployBody {
        DeployBody {
            porter_yaml_base64: BASE64.encode(manifest),
            image_info: ImageInfo::new("ghcr.io/acme/api", "v1"),
            build_output: None,
            override_release: false,
            git_repo_id: None,
            provenance: ProvenancePatch::default(),
        }
    }

    fn path(name: &str) -> Path<(ProjectId, ClusterId, String)> {
        Path((1, 1, name.to_string()))
    }

    #[tokio::test]
    async fn deploy_creates_then_updates() {
        let (state, _platform) = test_state();

        let resp = deploy_stack(State(state.clone()), path("api"), Json(body(MANIFEST))).await;
        assert_eq!(resp.into_response().status(), StatusCode::CREATED);

        let resp = deploy_stack(State(state.clone()), path("api"), Json(body(MANIFEST))).await;
        assert_eq!(resp.into_response().status(), StatusCode::OK);

        let resp = list_stack_events(State(state), Path((1, "api".to_string()))).await;
        assert_eq!(resp.into_response().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn bad_base64_is_bad_request() {
        let (state, platform) = test_state();
        let mut bad = body(MANIFEST);
        bad.porter_yaml_base64 = "%%% not base64".to_string();

        let resp = deploy_stack(State(state), path("api"), Json(bad)).await;
        assert_eq!(resp.into_response().status(), StatusCode::BAD_REQUEST);
        assert!(platform.calls().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_manifest_is_bad_request() {
        let (state, _platform) = test_state();
        let resp = deploy_stack(State(state), path("api"), Json(body("version: v9\n"))).await;
        assert_eq!(resp.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn conflict_maps_to_409() {
        let (state, _platform) = test_state();
        state
            .store
            .put_application(stack_state::ApplicationSpec {
                name: "api".to_string(),
                cluster_id: 1,
                ..Default::default()
            })
            .unwrap();

        let resp = deploy_stack(State(state), path("api"), Json(body(MANIFEST))).await;
        assert_eq!(resp.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn namespace_failure_maps_to_500() {
        let (state, platform) = test_state();
        platform
            .inject_fault(
                PlatformOp::CreateNamespace,
                "porter-stack-api",
                PlatformError::Unreachable("down".into()),
            )
            .await;

        let resp = deploy_stack(State(state), path("api"), Json(body(MANIFEST))).await;
        assert_eq!(resp.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn get_missing_stack_is_not_found() {
        let (state, _platform) = test_state();
        let resp = get_stack(State(state.clone()), Path((1, "nope".to_string()))).await;
        assert_eq!(resp.into_response().status(), StatusCode::NOT_FOUND);

        let resp = list_stack_events(State(state), Path((1, "nope".to_string()))).await;
        assert_eq!(resp.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn body_reads_flat_provenance_patches() {
        let body: DeployBody = serde_json::from_value(serde_json::json!({
            "porter_yaml_base64": "",
            "builder": "null",
            "dockerfile": null,
            "git_branch": "main",
            "repo_name": ""
        }))
        .unwrap();

        assert_eq!(body.provenance.builder, FieldPatch::Clear);
        assert_eq!(body.provenance.dockerfile, FieldPatch::Clear);
        assert_eq!(body.provenance.git_branch, FieldPatch::set("main"));
        assert!(body.provenance.repo_name.is_unset());
        assert!(body.provenance.buildpacks.is_unset());
    }
}
