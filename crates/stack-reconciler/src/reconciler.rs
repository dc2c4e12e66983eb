//! Reconciliation orchestration.

use std::sync::Arc;

use serde::Serialize;
use stack_compiler::{ChartCompiler, CompileInput, CompileOptions};
use stack_core::config::ReconcilerConfig;
use stack_core::{DeployRequest, FieldPatch};
use stack_platform::{InstallConfig, ReleasePlatform};
use stack_state::{ApplicationSpec, Repository};
use tracing::{debug, info, warn};

use crate::driver::{ensure_namespace, install_main, upgrade_main};
use crate::error::{ReconcileError, ReconcileResult};
use crate::image::{ImageSources, resolve_image};
use crate::job::reconcile_job;
use crate::lock::ReleaseLocks;
use crate::probe::probe_release;
use crate::records::{record_create, record_update};
use crate::target::StackTarget;

/// Builder names that need the buildpack launcher in front of commands.
const LAUNCHER_BUILDERS: [&str; 2] = ["heroku", "paketo"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Created,
    Updated,
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reconciled {
    pub application: ApplicationSpec,
    pub outcome: Outcome,
    /// Revision recorded in the deploy event.
    pub revision: u32,
}

/// Drives deploy requests against a platform and a record store.
///
/// Cheap to share behind an `Arc`; concurrent calls for the same
/// `(cluster, name)` are serialized, all others run in parallel.
pub struct Reconciler {
    platform: Arc<dyn ReleasePlatform>,
    repository: Arc<dyn Repository>,
    compiler: Arc<dyn ChartCompiler>,
    config: ReconcilerConfig,
    locks: ReleaseLocks,
}

impl Reconciler {
    pub fn new(
        platform: Arc<dyn ReleasePlatform>,
        repository: Arc<dyn Repository>,
        compiler: Arc<dyn ChartCompiler>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            platform,
            repository,
            compiler,
            config,
            locks: ReleaseLocks::new(),
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Converge one application on `request`.
    pub async fn reconcile(&self, request: DeployRequest) -> ReconcileResult<Reconciled> {
        request.validate()?;

        let target = StackTarget::new(&self.config, request.cluster_id, &request.name);
        target.validate()?;
        let _guard = self.locks.acquire(target.cluster_id, &target.name).await;

        let platform = self.platform.as_ref();
        let prior = probe_release(platform, target.cluster_id, &target.namespace, &target.name).await;
        let should_create = prior.is_none();
        info!(
            cluster = target.cluster_id,
            namespace = %target.namespace,
            release = %target.name,
            create = should_create,
            override_release = request.override_release,
            "reconciling application"
        );

        let builder = self.effective_builder(&request);
        let inject_launcher = LAUNCHER_BUILDERS.iter().any(|name| builder.contains(*name));

        let registries = self
            .repository
            .list_registries(request.project_id)
            .map_err(|err| {
                ReconcileError::persistence("list registries", format!("project {}", request.project_id), err)
            })?;

        let image = resolve_image(&ImageSources {
            explicit: &request.image_info,
            consult_prior: should_create || request.override_release,
            prior_config: prior.as_ref().map(|release| &release.config),
            build_output: request.build_output.as_deref(),
        });
        debug!(release = %target.name, image = ?image, "image resolved");

        let merge_prior = prior.as_ref().filter(|_| !request.override_release);
        let input = CompileInput {
            manifest: request.manifest.clone(),
            image,
            prior_values: merge_prior.map(|release| release.config.clone()),
            prior_dependencies: merge_prior
                .map(|release| release.chart.metadata.dependencies.clone())
                .unwrap_or_default(),
            options: CompileOptions {
                stack_name: request.name.clone(),
                project_id: request.project_id,
                inject_launcher,
                chart_repo_url: self.config.chart_repo_url.clone(),
            },
        };
        let compiled = self.compiler.compile(&input)?;

        if should_create {
            ensure_namespace(platform, target.cluster_id, &target.namespace).await?;
        }

        if request.override_release {
            reconcile_job(
                platform,
                &self.config.job_chart,
                &target,
                compiled.job_values.as_ref(),
                &registries,
            )
            .await?;
        }

        let install = InstallConfig {
            cluster_id: target.cluster_id,
            name: target.name.clone(),
            namespace: target.namespace.clone(),
            chart: compiled.chart,
            values: compiled.values,
            registries,
        };

        let reconciled = match prior {
            None => {
                install_main(platform, &install).await?;
                let application = record_create(self.repository.as_ref(), &request)?;
                Reconciled {
                    application,
                    outcome: Outcome::Created,
                    revision: 1,
                }
            }
            Some(prior) => {
                upgrade_main(platform, &install).await?;
                let revision = prior.version + 1;
                let application = record_update(self.repository.as_ref(), &request, revision)?;
                Reconciled {
                    application,
                    outcome: Outcome::Updated,
                    revision,
                }
            }
        };

        info!(
            cluster = target.cluster_id,
            namespace = %target.namespace,
            release = %target.name,
            revision = reconciled.revision,
            outcome = ?reconciled.outcome,
            "application reconciled"
        );
        Ok(reconciled)
    }

    /// Builder from the request, or the stored one when the request leaves it unset.
    fn effective_builder(&self, request: &DeployRequest) -> String {
        match &request.provenance.builder {
            FieldPatch::Set(builder) => builder.clone(),
            FieldPatch::Clear => String::new(),
            FieldPatch::Unset => match self.repository.read_by_name(request.cluster_id, &request.name) {
                Ok(stored) => stored.map(|app| app.builder).unwrap_or_default(),
                Err(err) => {
                    warn!(release = %request.name, error = %err, "stored builder lookup failed");
                    String::new()
                }
            },
        }
    }
}
