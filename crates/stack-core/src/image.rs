//! Container image references.

use serde::{Deserialize, Serialize};

/// Tag assumed when a reference names no tag.
pub const DEFAULT_TAG: &str = "latest";

/// A `{repository, tag}` pair for an application's container image.
///
/// The zero value (both fields empty) means "no image known"; callers leave
/// image values unset rather than writing an empty image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub tag: String,
}

impl ImageInfo {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Both fields empty.
    pub fn is_empty(&self) -> bool {
        self.repository.is_empty() && self.tag.is_empty()
    }

    /// Both fields set.
    pub fn is_complete(&self) -> bool {
        !self.repository.is_empty() && !self.tag.is_empty()
    }

    /// Parse an image reference such as `repo:tag` or `host:5000/team/app:v2`.
    ///
    /// The tag separator is the last `:` after the last `/`, so a registry
    /// port is never mistaken for a tag. A digest (`name@sha256:...`) is kept
    /// verbatim in the tag, including its `@`. A reference without a tag gets
    /// [`DEFAULT_TAG`]. Empty or repository-less input yields the zero value.
    pub fn parse_reference(reference: &str) -> Self {
        let reference = reference.trim();
        if reference.is_empty() {
            return Self::default();
        }

        if let Some((name, digest)) = reference.split_once('@') {
            if name.is_empty() || digest.is_empty() {
                return Self::default();
            }
            return Self::new(name, format!("@{digest}"));
        }

        let name_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
        let (repository, tag) = match reference[name_start..].rfind(':') {
            Some(i) => {
                let split = name_start + i;
                (&reference[..split], &reference[split + 1..])
            }
            None => (reference, ""),
        };

        if repository.is_empty() {
            return Self::default();
        }
        let tag = if tag.is_empty() { DEFAULT_TAG } else { tag };
        Self::new(repository, tag)
    }
}
