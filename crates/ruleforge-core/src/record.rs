//! Deprecation facts extracted from release notes

use serde::{Deserialize, Serialize};

/// Kind of API change announced by a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeCategory {
    /// `X` has been renamed to `Y`
    Renamed,

    /// `X` no longer exists
    Removed,

    /// `X` is deprecated in favor of `Y`
    Changed,
}

impl std::fmt::Display for ChangeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Renamed => write!(f, "renamed"),
            Self::Removed => write!(f, "removed"),
            Self::Changed => write!(f, "changed"),
        }
    }
}

/// One structured deprecation fact
///
/// Produced per parse cycle and never persisted directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationRecord {
    /// The API token the release deprecates
    pub deprecated_api: String,

    /// Replacement token, when the release names one
    pub replacement_api: Option<String>,

    /// Change category
    pub category: ChangeCategory,

    /// Release version label
    pub source_release: String,
}

impl DeprecationRecord {
    /// `X` has been renamed to `Y`
    pub fn renamed(old: impl Into<String>, new: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            deprecated_api: old.into(),
            replacement_api: Some(new.into()),
            category: ChangeCategory::Renamed,
            source_release: release.into(),
        }
    }

    /// `X` was removed
    pub fn removed(old: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            deprecated_api: old.into(),
            replacement_api: None,
            category: ChangeCategory::Removed,
            source_release: release.into(),
        }
    }

    /// `X` is deprecated in favor of `Y`
    pub fn changed(old: impl Into<String>, new: impl Into<String>, release: impl Into<String>) -> Self {
        Self {
            deprecated_api: old.into(),
            replacement_api: Some(new.into()),
            category: ChangeCategory::Changed,
            source_release: release.into(),
        }
    }
}
