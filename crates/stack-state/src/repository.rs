//! Read/write contract the reconciler uses against the system-of-record.

use crate::error::StateResult;
use crate::types::{ApplicationSpec, ClusterId, DeployEvent, ProjectId, Registry};

/// Relational store operations needed by a reconciliation.
///
/// Implementations must be safe to share across tasks. All methods are
/// synchronous; none of them may touch the orchestration platform.
pub trait Repository: Send + Sync {
    /// Look up the application row for `(cluster_id, name)`.
    fn read_by_name(&self, cluster_id: ClusterId, name: &str) -> StateResult<Option<ApplicationSpec>>;

    /// Insert or update an application row. Rows with `id == 0` get a fresh id.
    fn upsert(&self, app: ApplicationSpec) -> StateResult<ApplicationSpec>;

    /// Append an immutable deploy event.
    fn append_event(&self, event: &DeployEvent) -> StateResult<()>;

    /// Registries visible to a project.
    fn list_registries(&self, project_id: ProjectId) -> StateResult<Vec<Registry>>;
}
