//! Deploy requests as handed to the reconciler.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::image::ImageInfo;
use crate::patch::FieldPatch;

/// Longest name the orchestration platform accepts for namespaces and releases.
pub const MAX_NAME_LEN: usize = 63;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("invalid name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("manifest is empty")]
    EmptyManifest,
}

/// Build provenance fields, each patched independently on update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenancePatch {
    #[serde(default, skip_serializing_if = "FieldPatch::is_unset")]
    pub repo_name: FieldPatch,
    #[serde(default, skip_serializing_if = "FieldPatch::is_unset")]
    pub git_branch: FieldPatch,
    #[serde(default, skip_serializing_if = "FieldPatch::is_unset")]
    pub build_context: FieldPatch,
    #[serde(default, skip_serializing_if = "FieldPatch::is_unset")]
    pub builder: FieldPatch,
    #[serde(default, skip_serializing_if = "FieldPatch::is_unset")]
    pub buildpacks: FieldPatch,
    #[serde(default, skip_serializing_if = "FieldPatch::is_unset")]
    pub dockerfile: FieldPatch,
    #[serde(default, skip_serializing_if = "FieldPatch::is_unset")]
    pub image_repo_uri: FieldPatch,
    #[serde(default, skip_serializing_if = "FieldPatch::is_unset")]
    pub pull_request_url: FieldPatch,
    #[serde(default, skip_serializing_if = "FieldPatch::is_unset")]
    pub manifest_path: FieldPatch,
}

/// One deploy request for a single application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub project_id: u64,
    pub cluster_id: u64,
    /// Application (stack) name; also the main release name.
    pub name: String,
    /// Raw stack manifest.
    pub manifest: Vec<u8>,
    /// Image explicitly requested by the caller.
    #[serde(default)]
    pub image_info: ImageInfo,
    /// `<repo>:<tag>` emitted by an upstream build step, if any.
    #[serde(default)]
    pub build_output: Option<String>,
    /// Discard prior release values and manage the job release explicitly.
    #[serde(default)]
    pub override_release: bool,
    #[serde(default)]
    pub git_repo_id: Option<u64>,
    #[serde(default)]
    pub provenance: ProvenancePatch,
}

impl DeployRequest {
    /// Checks that need no collaborator; run before anything touches the cluster.
    pub fn validate(&self) -> Result<(), RequestError> {
        validate_name(&self.name)?;
        if self.manifest.iter().all(u8::is_ascii_whitespace) {
            return Err(RequestError::EmptyManifest);
        }
        Ok(())
    }
}

/// Check that `name` is a DNS label.
///
/// Names derived from an application name (namespace, job release) carry a
/// prefix or suffix and have to be checked on their own.
pub fn validate_name(name: &str) -> Result<(), RequestError> {
    let invalid = |reason| RequestError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("must be at most 63 characters"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(invalid("must contain only lowercase letters, digits and '-'"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must start and end with a letter or digit"));
    }
    Ok(())
}
