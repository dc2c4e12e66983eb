//! Application rows and deploy events.
//!
//! Runs after the cluster side succeeded. Nothing here undoes cluster work:
//! if a write fails, the cluster stays ahead of the record store.

use stack_core::{DeployRequest, ProvenancePatch};
use stack_state::store::epoch_secs;
use stack_state::{ApplicationSpec, DeployEvent, Repository, StateError, application_key};
use tracing::info;

use crate::error::{ReconcileError, ReconcileResult};

/// Insert the row for a newly installed application and log revision 1.
pub fn record_create(
    repository: &dyn Repository,
    request: &DeployRequest,
) -> ReconcileResult<ApplicationSpec> {
    let key = application_key(request.cluster_id, &request.name);
    let existing = repository
        .read_by_name(request.cluster_id, &request.name)
        .map_err(|err| ReconcileError::persistence("read application", &key, err))?;
    if existing.is_some() {
        return Err(ReconcileError::Conflict {
            cluster_id: request.cluster_id,
            name: request.name.clone(),
        });
    }

    let application = repository
        .upsert(new_row(request))
        .map_err(|err| ReconcileError::persistence("insert application", &key, err))?;
    append_deploy_event(repository, &application, 1)?;

    info!(
        cluster = application.cluster_id,
        application = %application.name,
        id = application.id,
        "application recorded"
    );
    Ok(application)
}

/// Patch the existing row and log `revision`.
pub fn record_update(
    repository: &dyn Repository,
    request: &DeployRequest,
    revision: u32,
) -> ReconcileResult<ApplicationSpec> {
    let key = application_key(request.cluster_id, &request.name);
    let mut application = repository
        .read_by_name(request.cluster_id, &request.name)
        .map_err(|err| ReconcileError::persistence("read application", &key, err))?
        .ok_or_else(|| {
            ReconcileError::persistence(
                "read application",
                &key,
                StateError::not_found("application", key.as_str()),
            )
        })?;

    apply_provenance(&mut application, &request.provenance);
    if request.git_repo_id.is_some() {
        application.git_repo_id = request.git_repo_id;
    }
    application.manifest = request.manifest.clone();

    let application = repository
        .upsert(application)
        .map_err(|err| ReconcileError::persistence("update application", &key, err))?;
    append_deploy_event(repository, &application, revision)?;

    info!(
        cluster = application.cluster_id,
        application = %application.name,
        revision,
        "application updated"
    );
    Ok(application)
}

fn append_deploy_event(
    repository: &dyn Repository,
    application: &ApplicationSpec,
    revision: u32,
) -> ReconcileResult<()> {
    let event = DeployEvent::deploy_success(application.id, revision, epoch_secs());
    repository
        .append_event(&event)
        .map_err(|err| ReconcileError::persistence("append deploy event", application.table_key(), err))
}

fn new_row(request: &DeployRequest) -> ApplicationSpec {
    let provenance = &request.provenance;
    ApplicationSpec {
        name: request.name.clone(),
        cluster_id: request.cluster_id,
        project_id: request.project_id,
        repo_name: provenance.repo_name.initial_value(),
        git_repo_id: request.git_repo_id,
        git_branch: provenance.git_branch.initial_value(),
        build_context: provenance.build_context.initial_value(),
        builder: provenance.builder.initial_value(),
        buildpacks: provenance.buildpacks.initial_value(),
        dockerfile: provenance.dockerfile.initial_value(),
        image_repo_uri: provenance.image_repo_uri.initial_value(),
        pull_request_url: provenance.pull_request_url.initial_value(),
        manifest_path: provenance.manifest_path.initial_value(),
        manifest: request.manifest.clone(),
        ..Default::default()
    }
}

fn apply_provenance(application: &mut ApplicationSpec, patch: &ProvenancePatch) {
    patch.repo_name.apply_to(&mut application.repo_name);
    patch.git_branch.apply_to(&mut application.git_branch);
    patch.build_context.apply_to(&mut application.build_context);
    patch.builder.apply_to(&mut application.builder);
    patch.buildpacks.apply_to(&mut application.buildpacks);
    patch.dockerfile.apply_to(&mut application.dockerfile);
    patch.image_repo_uri.apply_to(&mut application.image_repo_uri);
    patch.pull_request_url.apply_to(&mut application.pull_request_url);
    patch.manifest_path.apply_to(&mut application.manifest_path);
}
