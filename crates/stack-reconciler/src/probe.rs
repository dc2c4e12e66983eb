//! Release existence probe.

use stack_platform::{Release, ReleasePlatform};
use stack_state::ClusterId;
use tracing::debug;

/// Fetch a release, treating every platform error as "absent".
///
/// An unreachable platform therefore routes a request down the create path,
/// where the first mutation fails loudly instead.
pub async fn probe_release(
    platform: &dyn ReleasePlatform,
    cluster_id: ClusterId,
    namespace: &str,
    name: &str,
) -> Option<Release> {
    match platform.get_release(cluster_id, namespace, name).await {
        Ok(release) => {
            debug!(cluster = cluster_id, %namespace, release = %name, version = release.version, "release found");
            Some(release)
        }
        Err(err) => {
            debug!(cluster = cluster_id, %namespace, release = %name, error = %err, "release absent");
            None
        }
    }
}
