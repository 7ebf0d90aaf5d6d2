//! Rule types: severities, static rules, dynamic rules and their review lifecycle
//!
//! IMPORTANT: Rule ids are part of the public API.
//! Downstream tooling keys suppressions and dashboards on them, so an id
//! is never reused for a different pattern. Superseding a rule means a new id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::ChangeCategory;

/// Rule severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    /// Should be reviewed but does not block
    Warning,

    /// Blocking violation
    Error,
}

impl RuleSeverity {
    /// Fixed severity table for synthesized rules
    ///
    /// Removed APIs no longer compile, so they are errors. Renamed and
    /// changed APIs still work for a while and are warnings.
    pub fn for_category(category: ChangeCategory) -> Self {
        match category {
            ChangeCategory::Removed => Self::Error,
            ChangeCategory::Renamed | ChangeCategory::Changed => Self::Warning,
        }
    }
}

impl std::fmt::Display for RuleSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Review state of a dynamic rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// Freshly synthesized, not yet reviewed
    #[default]
    Draft,

    /// Accepted into the active rule set
    Approved,

    /// Discarded; terminal
    Rejected,
}

impl ReviewStatus {
    /// Whether the status can no longer change
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Draft)
    }

    /// Check if a transition to `target` is legal
    ///
    /// Only Draft -> Approved and Draft -> Rejected are allowed.
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Draft, Self::Approved) | (Self::Draft, Self::Rejected)
        )
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// A review decision issued by an operator or an approval policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl From<ReviewDecision> for ReviewStatus {
    fn from(decision: ReviewDecision) -> Self {
        match decision {
            ReviewDecision::Approved => Self::Approved,
            ReviewDecision::Rejected => Self::Rejected,
        }
    }
}

impl std::str::FromStr for ReviewDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "approve" | "approved" => Ok(Self::Approved),
            "reject" | "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown review decision '{}' (expected approve or reject)", other)),
        }
    }
}

/// A hand-authored rule from the static catalogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticRule {
    /// Stable rule id
    pub id: String,

    /// Regular expression applied to submitted source
    pub pattern: String,

    /// Human-readable explanation of the violation
    pub description: String,

    /// Knowledge entry documenting the correct usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction_id: Option<String>,

    /// Severity level
    pub severity: RuleSeverity,
}

impl StaticRule {
    /// Create a new static rule
    pub fn new(
        id: impl Into<String>,
        pattern: impl Into<String>,
        description: impl Into<String>,
        severity: RuleSeverity,
    ) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            description: description.into(),
            correction_id: None,
            severity,
        }
    }

    /// Attach a knowledge entry reference
    pub fn with_correction(mut self, correction_id: impl Into<String>) -> Self {
        self.correction_id = Some(correction_id.into());
        self
    }
}

/// A rule synthesized from a release note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicRule {
    /// Stable rule id (`auto-{slug}-{release}`)
    pub id: String,

    /// The API token this rule was synthesized from
    pub deprecated_api: String,

    /// Change category announced by the release
    pub category: ChangeCategory,

    /// Regular expression applied to submitted source
    pub pattern: String,

    /// Human-readable explanation of the violation
    pub description: String,

    /// Severity level
    pub severity: RuleSeverity,

    /// Suggested replacement, present only when the release named one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_suggestion: Option<String>,

    /// Knowledge entry documenting the correct usage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correction_id: Option<String>,

    /// Release the rule was mined from
    pub source_release: String,

    /// Review state
    pub review_status: ReviewStatus,

    /// When the synthesizer produced the rule
    pub generated_at: DateTime<Utc>,
}

impl DynamicRule {
    /// Attach a knowledge entry reference
    pub fn with_correction(mut self, correction_id: impl Into<String>) -> Self {
        self.correction_id = Some(correction_id.into());
        self
    }

    /// Compare everything except review state and generation time
    ///
    /// Re-ingesting the same release yields rules that are equal under this
    /// comparison even though `generated_at` differs.
    pub fn same_content(&self, other: &DynamicRule) -> bool {
        self.id == other.id
            && self.deprecated_api == other.deprecated_api
            && self.category == other.category
            && self.pattern == other.pattern
            && self.description == other.description
            && self.severity == other.severity
            && self.fix_suggestion == other.fix_suggestion
            && self.correction_id == other.correction_id
            && self.source_release == other.source_release
    }
}

/// Where an active rule came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RuleOrigin {
    /// Hand-authored catalogue entry
    Static,

    /// Mined from a release
    Dynamic { source_release: String },
}

/// Uniform view of an active rule, static or approved dynamic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub pattern: String,
    pub description: String,
    pub severity: RuleSeverity,
    pub fix_suggestion: Option<String>,
    pub correction_id: Option<String>,
    pub origin: RuleOrigin,
}

impl From<&StaticRule> for Rule {
    fn from(rule: &StaticRule) -> Self {
        Self {
            id: rule.id.clone(),
            pattern: rule.pattern.clone(),
            description: rule.description.clone(),
            severity: rule.severity,
            fix_suggestion: None,
            correction_id: rule.correction_id.clone(),
            origin: RuleOrigin::Static,
        }
    }
}

impl From<&DynamicRule> for Rule {
    fn from(rule: &DynamicRule) -> Self {
        Self {
            id: rule.id.clone(),
            pattern: rule.pattern.clone(),
            description: rule.description.clone(),
            severity: rule.severity,
            fix_suggestion: rule.fix_suggestion.clone(),
            correction_id: rule.correction_id.clone(),
            origin: RuleOrigin::Dynamic {
                source_release: rule.source_release.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_table_is_fixed() {
        assert_eq!(RuleSeverity::for_category(ChangeCategory::Removed), RuleSeverity::Error);
        assert_eq!(RuleSeverity::for_category(ChangeCategory::Renamed), RuleSeverity::Warning);
        assert_eq!(RuleSeverity::for_category(ChangeCategory::Changed), RuleSeverity::Warning);
    }

    #[test]
    fn review_transitions() {
        assert!(ReviewStatus::Draft.can_transition_to(ReviewStatus::Approved));
        assert!(ReviewStatus::Draft.can_transition_to(ReviewStatus::Rejected));
        assert!(!ReviewStatus::Draft.can_transition_to(ReviewStatus::Draft));
        assert!(!ReviewStatus::Approved.can_transition_to(ReviewStatus::Rejected));
        assert!(!ReviewStatus::Rejected.can_transition_to(ReviewStatus::Approved));
        assert!(ReviewStatus::Approved.is_terminal());
        assert!(!ReviewStatus::Draft.is_terminal());
    }

    #[test]
    fn review_decision_parsing() {
        assert_eq!("approve".parse::<ReviewDecision>(), Ok(ReviewDecision::Approved));
        assert_eq!("Rejected".parse::<ReviewDecision>(), Ok(ReviewDecision::Rejected));
        assert!("maybe".parse::<ReviewDecision>().is_err());
    }

    #[test]
    fn severity_serialization() {
        let json = serde_json::to_string(&RuleSeverity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
