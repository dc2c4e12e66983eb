//! Namespace and main release operations.

use stack_platform::{InstallConfig, PlatformError, Release, ReleasePlatform};
use stack_state::ClusterId;
use tracing::{error, info, warn};

use crate::error::{PlatformOp, ReconcileError, ReconcileResult};

/// Create the namespace, accepting one that already exists.
pub async fn ensure_namespace(
    platform: &dyn ReleasePlatform,
    cluster_id: ClusterId,
    namespace: &str,
) -> ReconcileResult<()> {
    match platform.create_namespace(cluster_id, namespace).await {
        Ok(()) => {
            info!(cluster = cluster_id, %namespace, "namespace created");
            Ok(())
        }
        Err(err) if err.is_already_exists() => Ok(()),
        Err(err) => Err(ReconcileError::platform(
            PlatformOp::CreateNamespace,
            namespace,
            err,
        )),
    }
}

/// Install the main release, uninstalling whatever is left behind on failure.
pub async fn install_main(
    platform: &dyn ReleasePlatform,
    config: &InstallConfig,
) -> ReconcileResult<Release> {
    match platform.install_chart(config).await {
        Ok(release) => {
            info!(
                cluster = config.cluster_id,
                namespace = %config.namespace,
                release = %config.name,
                revision = release.version,
                "release installed"
            );
            Ok(release)
        }
        Err(err) => {
            error!(
                cluster = config.cluster_id,
                namespace = %config.namespace,
                release = %config.name,
                error = %err,
                "release install failed, rolling back"
            );
            let rollback = rollback(platform, config.cluster_id, &config.namespace, &config.name).await;
            Err(ReconcileError::platform(PlatformOp::InstallMain, &config.name, err)
                .with_rollback(rollback))
        }
    }
}

/// Upgrade the main release, installing it if the platform lost it.
pub async fn upgrade_main(
    platform: &dyn ReleasePlatform,
    config: &InstallConfig,
) -> ReconcileResult<Release> {
    let release = platform
        .upgrade_install_chart(config)
        .await
        .map_err(|err| ReconcileError::platform(PlatformOp::UpgradeMain, &config.name, err))?;
    info!(
        cluster = config.cluster_id,
        namespace = %config.namespace,
        release = %config.name,
        revision = release.version,
        "release upgraded"
    );
    Ok(release)
}

/// Best-effort uninstall after a failed install. Returns the failure, if any.
///
/// A release that is already gone counts as rolled back.
pub(crate) async fn rollback(
    platform: &dyn ReleasePlatform,
    cluster_id: ClusterId,
    namespace: &str,
    name: &str,
) -> Option<PlatformError> {
    match platform.uninstall_chart(cluster_id, namespace, name).await {
        Ok(()) => {
            warn!(cluster = cluster_id, %namespace, release = %name, "rolled back release");
            None
        }
        Err(err) if err.is_not_found() => None,
        Err(err) => {
            error!(
                cluster = cluster_id,
                %namespace,
                release = %name,
                error = %err,
                "rollback failed"
            );
            Some(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_platform::{Chart, MemoryPlatform, PlatformOp as Op, ReleaseStatus, Values};

    const NS: &str = "porter-stack-api";

    fn config() -> InstallConfig {
        InstallConfig {
            cluster_id: 1,
            name: "api".to_string(),
            namespace: NS.to_string(),
            chart: Chart::new("api", "0.1.0"),
            values: Values::new(),
            registries: Vec::new(),
        }
    }

    #[tokio::test]
    async fn ensure_namespace_accepts_existing() {
        let platform = MemoryPlatform::new();
        ensure_namespace(&platform, 1, NS).await.unwrap();
        ensure_namespace(&platform, 1, NS).await.unwrap();
        assert!(platform.has_namespace(1, NS).await);
    }

    #[tokio::test]
    async fn ensure_namespace_reports_other_failures() {
        let platform = MemoryPlatform::new();
        platform
            .inject_fault(Op::CreateNamespace, NS, PlatformError::Rejected("quota".into()))
            .await;
        let err = ensure_namespace(&platform, 1, NS).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Platform { op: PlatformOp::CreateNamespace, .. }
        ));
    }

    #[tokio::test]
    async fn failed_install_is_rolled_back() {
        let platform = MemoryPlatform::new();
        platform.seed_namespace(1, NS).await;
        platform
            .inject_fault(Op::Install, "api", PlatformError::Rejected("bad values".into()))
            .await;

        let err = install_main(&platform, &config()).await.unwrap_err();
        match err {
            ReconcileError::Platform { op, rollback, .. } => {
                assert_eq!(op, PlatformOp::InstallMain);
                assert!(rollback.is_none());
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(platform.release(1, NS, "api").await.is_none());
    }

    #[tokio::test]
    async fn failed_rollback_is_attached() {
        let platform = MemoryPlatform::new();
        platform.seed_namespace(1, NS).await;
        platform
            .inject_fault(Op::Install, "api", PlatformError::Rejected("bad values".into()))
            .await;
        platform
            .inject_fault(Op::Uninstall, "api", PlatformError::Unreachable("gone".into()))
            .await;

        let err = install_main(&platform, &config()).await.unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Platform { rollback: Some(PlatformError::Unreachable(_)), .. }
        ));
        let leftover = platform.release(1, NS, "api").await.unwrap();
        assert_eq!(leftover.status, ReleaseStatus::Failed);
    }

    #[tokio::test]
    async fn upgrade_installs_missing_release() {
        let platform = MemoryPlatform::new();
        platform.seed_namespace(1, NS).await;
        let release = upgrade_main(&platform, &config()).await.unwrap();
        assert_eq!(release.version, 1);
        let release = upgrade_main(&platform, &config()).await.unwrap();
        assert_eq!(release.version, 2);
    }
}
