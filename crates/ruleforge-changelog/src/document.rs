//! Multi-release CHANGELOG documents
//!
//! A CHANGELOG.md holds many releases under markdown headings such as
//! `## 2.1.0`, `## [2.1.0] - 2024-01-01`, `## [2.1.0](https://...) - 2024-01-01`
//! or `# v2.1.0`. Each section is parsed under its own version label.

use regex::Regex;
use ruleforge_core::DeprecationRecord;
use std::sync::LazyLock;

use crate::parser::ChangelogParser;

static RELEASE_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#{1,3}\s+\[?v?(?P<version>\d+(?:\.\d+)*(?:-[0-9A-Za-z.\-]+)?)\]?(?:\([^)]*\))?(?:\s|$)")
        .expect("release heading is a valid regex")
});

/// The body of one release in a changelog document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSection {
    pub version: String,
    pub body: String,
}

/// Split a changelog document into release sections, in document order
///
/// Text before the first release heading is ignored.
pub fn split_releases(text: &str) -> Vec<ReleaseSection> {
    let mut sections: Vec<ReleaseSection> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = RELEASE_HEADING.captures(line) {
            sections.push(ReleaseSection {
                version: caps["version"].to_string(),
                body: String::new(),
            });
            continue;
        }

        if let Some(current) = sections.last_mut() {
            current.body.push_str(line);
            current.body.push('\n');
        }
    }

    sections
}

impl ChangelogParser {
    /// Parse every release section of a changelog document
    ///
    /// Sections without any recognised deprecation are omitted.
    pub fn parse_document(&self, text: &str) -> Vec<(String, Vec<DeprecationRecord>)> {
        split_releases(text)
            .into_iter()
            .filter_map(|section| {
                let records = self.parse(&section.body, &section.version);
                if records.is_empty() {
                    None
                } else {
                    Some((section.version, records))
                }
            })
            .collect()
    }
}
