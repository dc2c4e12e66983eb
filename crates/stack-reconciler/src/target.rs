//! Naming of the releases and namespace that belong to one application.

use stack_core::RequestError;
use stack_core::config::ReconcilerConfig;
use stack_core::request::validate_name;
use stack_state::ClusterId;

/// Where an application's releases live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTarget {
    pub cluster_id: ClusterId,
    pub namespace: String,
    /// Main release name; same as the application name.
    pub name: String,
    pub job_name: String,
}

impl StackTarget {
    pub fn new(config: &ReconcilerConfig, cluster_id: ClusterId, name: &str) -> Self {
        Self {
            cluster_id,
            namespace: config.namespace_for(name),
            name: name.to_string(),
            job_name: config.job_release_name(name),
        }
    }

    /// The derived namespace and job release name must be DNS labels too;
    /// prefixes and suffixes can push a valid application name past the limit.
    pub fn validate(&self) -> Result<(), RequestError> {
        validate_name(&self.namespace)?;
        validate_name(&self.job_name)
    }
}
