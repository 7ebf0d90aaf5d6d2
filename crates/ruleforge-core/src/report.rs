//! Check report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use serde::{Deserialize, Serialize};

use crate::finding::{CheckResult, Finding};
use crate::rule::RuleSeverity;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary statistics for a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReportSummary {
    /// Total number of findings
    pub total: usize,

    /// Number of error findings
    pub errors: usize,

    /// Number of warning findings
    pub warnings: usize,

    /// Number of files checked
    pub files_checked: usize,
}

/// Findings for one checked file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    /// Path relative to where the check was started
    pub path: String,

    pub findings: Vec<Finding>,
}

/// Check report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Summary statistics
    pub summary: ReportSummary,

    /// True iff any file produced a blocking result
    pub blocking: bool,

    /// Per-file findings, only files with findings are listed
    pub files: Vec<FileReport>,
}

impl Report {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::default(),
            blocking: false,
            files: Vec::new(),
        }
    }

    /// Record the result for one file
    pub fn add_file(&mut self, path: impl Into<String>, result: CheckResult) {
        self.summary.files_checked += 1;
        if result.findings.is_empty() {
            return;
        }

        for finding in &result.findings {
            match finding.severity {
                RuleSeverity::Error => self.summary.errors += 1,
                RuleSeverity::Warning => self.summary.warnings += 1,
            }
        }
        self.summary.total += result.findings.len();
        self.blocking |= result.blocking;
        self.files.push(FileReport {
            path: path.into(),
            findings: result.findings,
        });
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for Report {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: RuleSeverity) -> Finding {
        Finding {
            rule_id: "hb-eventloopfuture-wait".to_string(),
            severity,
            description: "Blocking wait".to_string(),
            fix_suggestion: None,
            correction_id: None,
            correction: None,
            matched_text: ".wait()".to_string(),
            line_number: 3,
        }
    }

    #[test]
    fn empty_report() {
        let report = Report::new();
        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.summary.total, 0);
        assert!(!report.blocking);
    }

    #[test]
    fn report_counts_findings_per_file() {
        let mut report = Report::new();
        report.add_file("Sources/App/App.swift", CheckResult::from_findings(vec![
            finding(RuleSeverity::Error),
            finding(RuleSeverity::Warning),
        ]));
        report.add_file("Sources/App/Clean.swift", CheckResult::default());

        assert_eq!(report.summary.files_checked, 2);
        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.warnings, 1);
        assert_eq!(report.files.len(), 1);
        assert!(report.blocking);
    }

    #[test]
    fn report_serialization() {
        let report = Report::new();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"files\""));
    }
}
