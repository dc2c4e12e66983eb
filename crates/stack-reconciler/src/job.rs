//! Job release state machine.
//!
//! | job release exists | job values requested | action      |
//! |--------------------|----------------------|-------------|
//! | no                 | no                   | `Noop`      |
//! | no                 | yes                  | `Install`   |
//! | yes                | no                   | `Uninstall` |
//! | yes                | yes                  | `Upgrade`   |

use stack_core::config::ChartRefConfig;
use stack_platform::{Chart, InstallConfig, ReleasePlatform, Values};
use stack_state::Registry;
use tracing::{error, info};

use crate::driver::rollback;
use crate::error::{PlatformOp, ReconcileError, ReconcileResult};
use crate::probe::probe_release;
use crate::target::StackTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Noop,
    Install,
    Uninstall,
    Upgrade,
}

impl JobAction {
    pub fn plan(exists: bool, requested: bool) -> Self {
        match (exists, requested) {
            (false, false) => JobAction::Noop,
            (false, true) => JobAction::Install,
            (true, false) => JobAction::Uninstall,
            (true, true) => JobAction::Upgrade,
        }
    }
}

/// Converge the job release of `target` on `job_values`.
///
/// Empty or missing values mean no job release is wanted. Install and upgrade
/// failures uninstall the job release on a best-effort basis.
pub async fn reconcile_job(
    platform: &dyn ReleasePlatform,
    chart: &ChartRefConfig,
    target: &StackTarget,
    job_values: Option<&Values>,
    registries: &[Registry],
) -> ReconcileResult<JobAction> {
    let requested = job_values.filter(|values| !values.is_empty());
    let exists = probe_release(platform, target.cluster_id, &target.namespace, &target.job_name)
        .await
        .is_some();
    let action = JobAction::plan(exists, requested.is_some());

    let config = |values: &Values| InstallConfig {
        cluster_id: target.cluster_id,
        name: target.job_name.clone(),
        namespace: target.namespace.clone(),
        chart: Chart::new(&chart.name, &chart.version),
        values: values.clone(),
        registries: registries.to_vec(),
    };

    let result = match (action, requested) {
        (JobAction::Install, Some(values)) => platform
            .install_chart(&config(values))
            .await
            .map(drop)
            .map_err(|err| (PlatformOp::InstallJob, err)),
        (JobAction::Upgrade, Some(values)) => platform
            .upgrade_install_chart(&config(values))
            .await
            .map(drop)
            .map_err(|err| (PlatformOp::UpgradeJob, err)),
        (JobAction::Uninstall, _) => {
            return match platform
                .uninstall_chart(target.cluster_id, &target.namespace, &target.job_name)
                .await
            {
                Ok(()) => {
                    info!(
                        cluster = target.cluster_id,
                        namespace = %target.namespace,
                        release = %target.job_name,
                        "job release uninstalled"
                    );
                    Ok(action)
                }
                Err(err) if err.is_not_found() => Ok(action),
                Err(err) => Err(ReconcileError::platform(
                    PlatformOp::UninstallJob,
                    &target.job_name,
                    err,
                )),
            };
        }
        _ => Ok(()),
    };

    match result {
        Ok(()) => {
            if action != JobAction::Noop {
                info!(
                    cluster = target.cluster_id,
                    namespace = %target.namespace,
                    release = %target.job_name,
                    ?action,
                    "job release applied"
                );
            }
            Ok(action)
        }
        Err((op, err)) => {
            error!(
                cluster = target.cluster_id,
                namespace = %target.namespace,
                release = %target.job_name,
                error = %err,
                "job release failed, rolling back"
            );
            let rollback =
                rollback(platform, target.cluster_id, &target.namespace, &target.job_name).await;
            Err(ReconcileError::platform(op, &target.job_name, err).with_rollback(rollback))
        }
    }
}
