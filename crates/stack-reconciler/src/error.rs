//! Reconciliation errors and their caller-facing classification.

use std::fmt;

use stack_compiler::CompileError;
use stack_core::RequestError;
use stack_platform::PlatformError;
use stack_state::{ClusterId, StateError};
use thiserror::Error;

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Cluster-side step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformOp {
    CreateNamespace,
    InstallMain,
    UpgradeMain,
    InstallJob,
    UpgradeJob,
    UninstallJob,
}

impl fmt::Display for PlatformOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlatformOp::CreateNamespace => "create namespace",
            PlatformOp::InstallMain => "install release",
            PlatformOp::UpgradeMain => "upgrade release",
            PlatformOp::InstallJob => "install job release",
            PlatformOp::UpgradeJob => "upgrade job release",
            PlatformOp::UninstallJob => "uninstall job release",
        })
    }
}

/// Who is expected to fix a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The request itself is wrong or conflicts with existing state.
    Client,
    /// Something on our side or the platform's broke.
    Internal,
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid {target}: {reason}")]
    Validation { target: String, reason: String },

    #[error("application {name:?} already exists in cluster {cluster_id}")]
    Conflict { cluster_id: ClusterId, name: String },

    #[error("{op} {target:?} failed: {source}{}", rollback_note(.rollback))]
    Platform {
        op: PlatformOp,
        target: String,
        #[source]
        source: PlatformError,
        /// Error from the compensating uninstall, if that failed too.
        rollback: Option<PlatformError>,
    },

    #[error("{op} {target:?} failed: {source}")]
    Persistence {
        op: &'static str,
        target: String,
        #[source]
        source: StateError,
    },
}

fn rollback_note(rollback: &Option<PlatformError>) -> String {
    match rollback {
        Some(err) => format!(" (rollback also failed: {err})"),
        None => String::new(),
    }
}

impl ReconcileError {
    pub fn platform(op: PlatformOp, target: impl Into<String>, source: PlatformError) -> Self {
        ReconcileError::Platform {
            op,
            target: target.into(),
            source,
            rollback: None,
        }
    }

    pub fn persistence(op: &'static str, target: impl Into<String>, source: StateError) -> Self {
        ReconcileError::Persistence {
            op,
            target: target.into(),
            source,
        }
    }

    /// Attach the failure of a compensating uninstall.
    pub fn with_rollback(mut self, failure: Option<PlatformError>) -> Self {
        if let ReconcileError::Platform { rollback, .. } = &mut self {
            *rollback = failure;
        }
        self
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            ReconcileError::Validation { .. } | ReconcileError::Conflict { .. } => ErrorClass::Client,
            // Main release failures usually come from bad chart values.
            ReconcileError::Platform {
                op: PlatformOp::InstallMain | PlatformOp::UpgradeMain,
                ..
            } => ErrorClass::Client,
            ReconcileError::Platform { .. } | ReconcileError::Persistence { .. } => {
                ErrorClass::Internal
            }
        }
    }

    pub fn http_status(&self) -> u16 {
        match (self, self.class()) {
            (ReconcileError::Conflict { .. }, _) => 409,
            (_, ErrorClass::Client) => 400,
            (_, ErrorClass::Internal) => 500,
        }
    }
}

impl From<RequestError> for ReconcileError {
    fn from(err: RequestError) -> Self {
        ReconcileError::Validation {
            target: "request".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<CompileError> for ReconcileError {
    fn from(err: CompileError) -> Self {
        ReconcileError::Validation {
            target: "manifest".to_string(),
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stack_state::Stage;

    #[test]
    fn classifies_and_maps_status() {
        let validation: ReconcileError = RequestError::EmptyManifest.into();
        assert_eq!(validation.class(), ErrorClass::Client);
        assert_eq!(validation.http_status(), 400);

        let conflict = ReconcileError::Conflict {
            cluster_id: 1,
            name: "api".to_string(),
        };
        assert_eq!(conflict.http_status(), 409);

        let main = ReconcileError::platform(
            PlatformOp::InstallMain,
            "api",
            PlatformError::Rejected("bad values".to_string()),
        );
        assert_eq!(main.class(), ErrorClass::Client);
        assert_eq!(main.http_status(), 400);

        let namespace = ReconcileError::platform(
            PlatformOp::CreateNamespace,
            "porter-stack-api",
            PlatformError::Unreachable("down".to_string()),
        );
        assert_eq!(namespace.class(), ErrorClass::Internal);
        assert_eq!(namespace.http_status(), 500);

        let job = ReconcileError::platform(
            PlatformOp::UpgradeJob,
            "api-r",
            PlatformError::Rejected("bad".to_string()),
        );
        assert_eq!(job.http_status(), 500);

        let persistence =
            ReconcileError::persistence("write application", "1/api", StateError::storage(Stage::Write, "disk"));
        assert_eq!(persistence.class(), ErrorClass::Internal);
    }

    #[test]
    fn display_includes_rollback_failure() {
        let err = ReconcileError::platform(
            PlatformOp::InstallMain,
            "api",
            PlatformError::Rejected("bad values".to_string()),
        )
        .with_rollback(Some(PlatformError::Unreachable("down".to_string())));

        let message = err.to_string();
        assert!(message.contains("install release \"api\" failed"));
        assert!(message.contains("bad values"));
        assert!(message.contains("rollback also failed"));
        assert!(message.contains("down"));
    }

    #[test]
    fn compile_errors_are_validation() {
        let err: ReconcileError = CompileError::NoApps.into();
        assert!(matches!(err, ReconcileError::Validation { ref target, .. } if target == "manifest"));
    }
}
