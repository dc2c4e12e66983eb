//! Compiler error types.

use thiserror::Error;

pub type CompileResult<T> = Result<T, CompileError>;

/// Reasons a manifest cannot be turned into a chart. All are caller errors.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("manifest is not valid UTF-8")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("manifest parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("unsupported manifest version {found:?} (expected {expected:?})")]
    UnsupportedVersion { found: String, expected: &'static str },

    #[error("manifest declares no apps")]
    NoApps,

    #[error("invalid app {app:?}: {reason}")]
    InvalidApp { app: String, reason: String },

    #[error("invalid env var {key:?}: {reason}")]
    InvalidEnv { key: String, reason: &'static str },

    #[error("invalid release job: {0}")]
    InvalidRelease(String),
}
