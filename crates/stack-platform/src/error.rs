//! Release platform error types.

use thiserror::Error;

pub type PlatformResult<T> = Result<T, PlatformError>;

/// Errors reported by the orchestration platform.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlatformError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("platform unreachable: {0}")]
    Unreachable(String),

    #[error("rejected by platform: {0}")]
    Rejected(String),
}

impl PlatformError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, PlatformError::AlreadyExists(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound(_))
    }
}
