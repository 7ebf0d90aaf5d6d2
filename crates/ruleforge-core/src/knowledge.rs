//! Knowledge entries: documented correct-usage patterns rules point at

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How confident the catalogue authors are in an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    #[default]
    Medium,
    Low,
}

/// A documented correct-usage pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Stable id, the target of rule `correction_id`s
    pub id: String,

    /// Short title
    pub title: String,

    /// Markdown body
    pub content: String,

    /// Framework versions the entry applies to (e.g. ">=2.0.0")
    pub version_range: String,

    #[serde(default)]
    pub confidence: Confidence,

    /// When the entry was last checked against the framework
    pub last_verified_at: DateTime<Utc>,
}

impl KnowledgeEntry {
    /// Create an entry verified now with medium confidence
    pub fn new(id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            version_range: "*".to_string(),
            confidence: Confidence::default(),
            last_verified_at: Utc::now(),
        }
    }

    pub fn with_version_range(mut self, range: impl Into<String>) -> Self {
        self.version_range = range.into();
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }
}
