//! Template-based release note parser

use regex::{Captures, Regex};
use ruleforge_core::{ChangeCategory, DeprecationRecord};
use std::collections::HashSet;
use std::sync::LazyLock;

/// `X` has been renamed to `Y`
static RENAMED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`(?P<old>[^`]+)`\s+has\s+been\s+renamed\s+to\s+`(?P<new>[^`]+)`")
        .expect("renamed template is a valid regex")
});

/// Removed ... `X` (the first backtick token after the keyword)
static REMOVED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+]\s+)?(?i:removed)\b[^`]*`(?P<old>[^`]+)`")
        .expect("removed template is a valid regex")
});

/// `X` ... deprecated in favor of `Y`
static CHANGED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`(?P<old>[^`]+)`.*?\bdeprecated\s+in\s+favou?r\s+of\s+`(?P<new>[^`]+)`")
        .expect("changed template is a valid regex")
});

/// One line template; order in `TEMPLATES` is significant
struct Template {
    category: ChangeCategory,
    regex: &'static LazyLock<Regex>,
}

static TEMPLATES: [Template; 3] = [
    Template { category: ChangeCategory::Renamed, regex: &RENAMED },
    Template { category: ChangeCategory::Removed, regex: &REMOVED },
    Template { category: ChangeCategory::Changed, regex: &CHANGED },
];

/// Counters describing one parse pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseStats {
    /// Lines examined
    pub lines_scanned: usize,

    /// Lines that matched a template
    pub lines_matched: usize,

    /// Matches dropped because the same (token, category) was already seen
    pub duplicates_collapsed: usize,
}

impl ParseStats {
    /// Lines that matched no template
    pub fn lines_skipped(&self) -> usize {
        self.lines_scanned - self.lines_matched
    }
}

/// Extracts deprecation records from release note text
///
/// The parser is a pure function of its input: it never fails and never has
/// side effects. Unrecognised lines are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangelogParser;

impl ChangelogParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one release body into deduplicated records
    pub fn parse(&self, text: &str, version: &str) -> Vec<DeprecationRecord> {
        self.parse_with_stats(text, version).0
    }

    /// Parse one release body, also returning counters for diagnostics
    pub fn parse_with_stats(&self, text: &str, version: &str) -> (Vec<DeprecationRecord>, ParseStats) {
        let version = version.trim();
        let mut stats = ParseStats::default();
        let mut seen: HashSet<(String, ChangeCategory)> = HashSet::new();
        let mut records = Vec::new();

        for line in text.lines() {
            stats.lines_scanned += 1;

            let Some(record) = Self::parse_line(line, version) else {
                continue;
            };
            stats.lines_matched += 1;

            if !seen.insert((record.deprecated_api.clone(), record.category)) {
                stats.duplicates_collapsed += 1;
                continue;
            }

            tracing::debug!(
                release = version,
                category = %record.category,
                token = %record.deprecated_api,
                "extracted deprecation record"
            );
            records.push(record);
        }

        (records, stats)
    }

    /// Test one line against the templates, first match wins
    fn parse_line(line: &str, version: &str) -> Option<DeprecationRecord> {
        TEMPLATES.iter().find_map(|template| {
            let caps = template.regex.captures(line)?;
            Self::build_record(template.category, &caps, version)
        })
    }

    fn build_record(category: ChangeCategory, caps: &Captures<'_>, version: &str) -> Option<DeprecationRecord> {
        let old = caps.name("old").map(|m| m.as_str().trim()).filter(|s| !s.is_empty())?;

        let record = match category {
            ChangeCategory::Removed => DeprecationRecord::removed(old, version),
            ChangeCategory::Renamed | ChangeCategory::Changed => {
                let new = caps.name("new").map(|m| m.as_str().trim()).filter(|s| !s.is_empty())?;
                if category == ChangeCategory::Renamed {
                    DeprecationRecord::renamed(old, new, version)
                } else {
                    DeprecationRecord::changed(old, new, version)
                }
            }
        };

        Some(record)
    }
}
