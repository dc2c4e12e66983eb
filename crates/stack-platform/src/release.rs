//! Releases, charts and install configuration.

use serde::{Deserialize, Serialize};
use stack_state::{ClusterId, Registry};

/// Chart values: an arbitrary JSON object.
pub type Values = serde_json::Map<String, serde_json::Value>;

/// A chart dependency (one per application process in a stack chart).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    pub repository: String,
    /// Values section the dependency reads from; defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl Dependency {
    /// Key under which this dependency's values live.
    pub fn values_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartMetadata {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

/// Opaque deployable package. Only its metadata is inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chart {
    pub metadata: ChartMetadata,
}

impl Chart {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            metadata: ChartMetadata {
                name: name.into(),
                version: version.into(),
                dependencies: Vec::new(),
            },
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.metadata.dependencies = dependencies;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    Deployed,
    Failed,
}

/// A named, versioned deployable unit on the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    pub namespace: String,
    pub chart: Chart,
    /// Values the release was last rendered with.
    pub config: Values,
    /// Platform-owned revision counter; 1 after install.
    pub version: u32,
    pub status: ReleaseStatus,
}

/// Everything needed to install or upgrade one release.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallConfig {
    pub cluster_id: ClusterId,
    pub name: String,
    pub namespace: String,
    pub chart: Chart,
    pub values: Values,
    /// Registries the release may pull from, passed through unmodified.
    pub registries: Vec<Registry>,
}
