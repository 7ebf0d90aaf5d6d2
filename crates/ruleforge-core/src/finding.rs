//! Findings produced by matching rules against source text

use serde::{Deserialize, Serialize};

use crate::rule::RuleSeverity;

/// Resolution state of a finding's knowledge entry reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Correction {
    /// The referenced entry exists in the snapshot the check ran against
    Resolved { title: String },

    /// The referenced entry is missing
    Unresolved,
}

/// One match of a rule against submitted source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Rule that matched
    pub rule_id: String,

    pub severity: RuleSeverity,

    /// Rule description
    pub description: String,

    pub fix_suggestion: Option<String>,

    /// Knowledge entry the rule points at
    pub correction_id: Option<String>,

    /// Present iff `correction_id` is
    pub correction: Option<Correction>,

    /// The exact matched span
    pub matched_text: String,

    /// 1-indexed line of the match start
    pub line_number: usize,
}

impl Finding {
    pub fn is_error(&self) -> bool {
        self.severity == RuleSeverity::Error
    }
}

/// Result of checking one source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CheckResult {
    /// Findings in rule order, then match order
    pub findings: Vec<Finding>,

    /// True iff any finding has severity Error
    pub blocking: bool,
}

impl CheckResult {
    /// Build a result, deriving the blocking flag from the findings
    pub fn from_findings(findings: Vec<Finding>) -> Self {
        let blocking = findings.iter().any(Finding::is_error);
        Self { findings, blocking }
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}
