//! Errors raised by the application record store.

use std::fmt;

use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

/// Step of a redb interaction that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transaction,
    Table,
    Read,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Transaction => "transaction",
            Stage::Table => "table open",
            Stage::Read => "read",
            Stage::Write => "write",
        })
    }
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot open record store: {0}")]
    Open(String),

    /// redb failed after the store was opened.
    #[error("record store {stage} failed: {reason}")]
    Storage { stage: Stage, reason: String },

    /// A row could not be converted to or from its JSON form.
    #[error("{record} row is not valid JSON: {reason}")]
    Codec { record: &'static str, reason: String },

    #[error("{record} {key} not found")]
    NotFound { record: &'static str, key: String },
}

impl StateError {
    pub fn storage(stage: Stage, reason: impl Into<String>) -> Self {
        Self::Storage {
            stage,
            reason: reason.into(),
        }
    }

    pub fn not_found(record: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            record,
            key: key.into(),
        }
    }
}
