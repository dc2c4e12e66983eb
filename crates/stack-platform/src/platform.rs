//! The orchestration platform contract.

use async_trait::async_trait;
use stack_state::ClusterId;

use crate::error::PlatformResult;
use crate::release::{InstallConfig, Release};

/// Release operations against one or more clusters.
///
/// Every call may block on the network for a long time. Implementations
/// must not assume callers hold any lock other than the per-application one.
#[async_trait]
pub trait ReleasePlatform: Send + Sync {
    /// Fetch the latest revision of a release.
    async fn get_release(
        &self,
        cluster_id: ClusterId,
        namespace: &str,
        name: &str,
    ) -> PlatformResult<Release>;

    /// Install a new release. Fails if the name is taken.
    async fn install_chart(&self, config: &InstallConfig) -> PlatformResult<Release>;

    /// Upgrade a release, installing it if it does not exist.
    async fn upgrade_install_chart(&self, config: &InstallConfig) -> PlatformResult<Release>;

    /// Remove a release and all its revisions.
    async fn uninstall_chart(
        &self,
        cluster_id: ClusterId,
        namespace: &str,
        name: &str,
    ) -> PlatformResult<()>;

    /// Create a namespace. Reports `AlreadyExists` if it is present.
    async fn create_namespace(&self, cluster_id: ClusterId, name: &str) -> PlatformResult<()>;
}
