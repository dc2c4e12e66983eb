//! Stack manifest model.
//!
//! ```yaml
//! version: v1stack
//! env:
//!   LOG_LEVEL: info
//! apps:
//!   web:
//!     type: web
//!     run: node server.js
//!     config:
//!       replicas: 2
//! release:
//!   run: npm run migrate
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use stack_core::request::validate_name;
use stack_platform::Values;

use crate::error::{CompileError, CompileResult};

pub const SUPPORTED_VERSION: &str = "v1stack";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppKind {
    Web,
    Worker,
    Job,
}

impl AppKind {
    /// Chart each kind of app is deployed with.
    pub fn chart_name(self) -> &'static str {
        match self {
            AppKind::Web => "web",
            AppKind::Worker => "worker",
            AppKind::Job => "job",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(rename = "type")]
    pub kind: AppKind,
    #[serde(default)]
    pub run: Option<String>,
    #[serde(default)]
    pub config: Values,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseSection {
    pub run: String,
    #[serde(default)]
    pub config: Values,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StackManifest {
    pub version: String,
    #[serde(default)]
    pub env: BTreeMap<String, Value>,
    #[serde(default)]
    pub apps: BTreeMap<String, AppSection>,
    #[serde(default)]
    pub release: Option<ReleaseSection>,
}

impl StackManifest {
    /// Parse and validate raw manifest bytes.
    pub fn parse(raw: &[u8]) -> CompileResult<Self> {
        let text = std::str::from_utf8(raw)?;
        let manifest: StackManifest = serde_yaml::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> CompileResult<()> {
        if self.version != SUPPORTED_VERSION {
            return Err(CompileError::UnsupportedVersion {
                found: self.version.clone(),
                expected: SUPPORTED_VERSION,
            });
        }
        if self.apps.is_empty() {
            return Err(CompileError::NoApps);
        }
        for name in self.apps.keys() {
            validate_name(name).map_err(|e| CompileError::InvalidApp {
                app: name.clone(),
                reason: e.to_string(),
            })?;
            if name == "global" {
                return Err(CompileError::InvalidApp {
                    app: name.clone(),
                    reason: "name is reserved".to_string(),
                });
            }
        }
        if let Some(release) = &self.release {
            if release.run.trim().is_empty() {
                return Err(CompileError::InvalidRelease("run must not be empty".to_string()));
            }
        }
        self.env_strings()?;
        Ok(())
    }

    /// Environment as strings. Scalars are stringified; nested values are rejected.
    pub fn env_strings(&self) -> CompileResult<BTreeMap<String, String>> {
        self.env
            .iter()
            .map(|(key, value)| {
                let value = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    Value::Null => String::new(),
                    Value::Array(_) | Value::Object(_) => {
                        return Err(CompileError::InvalidEnv {
                            key: key.clone(),
                            reason: "value must be a scalar",
                        });
                    }
                };
                Ok((key.clone(), value))
            })
            .collect()
    }
}
