//! Store error types

use ruleforge_core::ReviewStatus;

use crate::backend::BackendError;

/// Why a store operation was refused
///
/// A refused mutation leaves the store unchanged.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Rule '{rule_id}' has an invalid pattern: {reason}")]
    InvalidPattern { rule_id: String, reason: String },

    #[error("Rule '{rule_id}' references unknown knowledge entry '{correction_id}'")]
    DanglingCorrection { rule_id: String, correction_id: String },

    #[error("Duplicate rule id: {0}")]
    DuplicateRule(String),

    #[error("Rule id '{0}' belongs to a static rule")]
    StaticRuleConflict(String),

    #[error("Rule '{0}' has no source release")]
    MissingRelease(String),

    #[error("Rule '{rule_id}' must be submitted as draft, got {status}")]
    NotDraft { rule_id: String, status: ReviewStatus },

    #[error("Rule '{rule_id}' is already {status}; supersede it with a new id")]
    AlreadyReviewed { rule_id: String, status: ReviewStatus },

    #[error("Unknown rule: {0}")]
    UnknownRule(String),

    #[error("Invalid review transition for '{rule_id}': {from} -> {to}")]
    InvalidTransition {
        rule_id: String,
        from: ReviewStatus,
        to: ReviewStatus,
    },

    #[error("Persisted state is corrupt: {0}")]
    CorruptSnapshot(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}
