//! stackd.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StackdConfig {
    pub server: ServerConfig,
    pub reconciler: ReconcilerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8443,
            data_dir: PathBuf::from("/var/lib/stackd"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Prepended to the application name to form its namespace.
    pub namespace_prefix: String,
    /// Appended to the application name to form the job release name.
    pub job_suffix: String,
    /// Repository that application and job charts are pulled from.
    pub chart_repo_url: String,
    pub job_chart: ChartRefConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: "porter-stack-".to_string(),
            job_suffix: "-r".to_string(),
            chart_repo_url: "https://charts.getporter.dev".to_string(),
            job_chart: ChartRefConfig::default(),
        }
    }
}

impl ReconcilerConfig {
    /// Namespace that holds every release of `app`.
    pub fn namespace_for(&self, app: &str) -> String {
        format!("{}{}", self.namespace_prefix, app)
    }

    /// Name of the job release paired with `app`.
    pub fn job_release_name(&self, app: &str) -> String {
        format!("{}{}", app, self.job_suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartRefConfig {
    pub name: String,
    pub version: String,
}

impl Default for ChartRefConfig {
    fn default() -> Self {
        Self {
            name: "job".to_string(),
            version: "latest".to_string(),
        }
    }
}

impl StackdConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: StackdConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
