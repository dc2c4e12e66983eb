//! Domain types for the application record store.
//!
//! All types are serializable to/from JSON for storage in redb tables.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned application identifier. `0` means "not yet stored".
pub type ApplicationId = u64;

pub type ClusterId = u64;

pub type ProjectId = u64;

// ── Application ───────────────────────────────────────────────────

/// Relational record of an application deployed through the reconciler.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationSpec {
    pub id: ApplicationId,
    pub name: String,
    pub cluster_id: ClusterId,
    pub project_id: ProjectId,

    // Build provenance.
    pub repo_name: String,
    pub git_repo_id: Option<u64>,
    pub git_branch: String,
    pub build_context: String,
    pub builder: String,
    pub buildpacks: String,
    pub dockerfile: String,
    pub image_repo_uri: String,
    pub pull_request_url: String,
    /// Path of the manifest inside the source repository.
    pub manifest_path: String,

    /// Raw manifest as last deployed.
    #[serde(default)]
    pub manifest: Vec<u8>,

    /// Unix timestamp (seconds) when this row was created.
    pub created_at: u64,
    /// Unix timestamp (seconds) when this row was last written.
    pub updated_at: u64,
}

impl ApplicationSpec {
    /// Build the composite key for the applications table.
    pub fn table_key(&self) -> String {
        application_key(self.cluster_id, &self.name)
    }
}

pub fn application_key(cluster_id: ClusterId, name: &str) -> String {
    format!("{cluster_id}/{name}")
}

// ── Deploy events ─────────────────────────────────────────────────

pub const EVENT_TYPE_DEPLOY: &str = "DEPLOY";

pub const EVENT_SOURCE_KUBERNETES: &str = "KUBERNETES";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    Success,
}

/// Immutable audit record appended after each successful reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeployEvent {
    pub id: Uuid,
    pub status: EventStatus,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub application_id: ApplicationId,
    /// Release version after the operation that produced this event.
    pub revision: u32,
    /// Unix timestamp (seconds).
    pub timestamp: u64,
}

impl DeployEvent {
    /// A successful deploy of `application_id` at `revision`.
    pub fn deploy_success(application_id: ApplicationId, revision: u32, timestamp: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: EventStatus::Success,
            event_type: EVENT_TYPE_DEPLOY.to_string(),
            source: EVENT_SOURCE_KUBERNETES.to_string(),
            application_id,
            revision,
            timestamp,
        }
    }

    /// Build the composite key for the events table.
    pub fn table_key(&self) -> String {
        format!(
            "{}{:020}:{}",
            event_prefix(self.application_id),
            self.timestamp,
            self.id
        )
    }
}

pub fn event_prefix(application_id: ApplicationId) -> String {
    format!("{application_id:020}:")
}

// ── Registries ────────────────────────────────────────────────────

/// Container registry a project may pull images from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registry {
    pub id: u64,
    pub project_id: ProjectId,
    pub name: String,
    pub url: String,
}

impl Registry {
    /// Build the composite key for the registries table.
    pub fn table_key(&self) -> String {
        format!("{}{:020}", registry_prefix(self.project_id), self.id)
    }
}

pub fn registry_prefix(project_id: ProjectId) -> String {
    format!("{project_id}:")
}
