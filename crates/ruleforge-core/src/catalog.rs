//! Static rule catalogue (catalogue TOML)
//!
//! A catalogue is the hand-curated half of the rule set: knowledge entries
//! plus the static rules that point at them. Declaration order of `[[rule]]`
//! tables is preserved because it decides finding order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::knowledge::KnowledgeEntry;
use crate::rule::StaticRule;

const BUILTIN_CATALOG: &str = include_str!("../catalog/hummingbird.toml");

/// Hand-authored rules and knowledge entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Catalog {
    #[serde(default, rename = "entry")]
    pub entries: Vec<KnowledgeEntry>,

    #[serde(default, rename = "rule")]
    pub rules: Vec<StaticRule>,
}

impl Catalog {
    /// The catalogue shipped with the binary
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml(BUILTIN_CATALOG)
    }

    /// Load a catalogue from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = toml::from_str(toml)
            .map_err(|e| CatalogError::ParseError(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalogue from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&contents)
    }

    /// Check id uniqueness and that every correction id resolves
    ///
    /// Pattern compilation is left to the store, which owns the compiled form.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut entry_ids = HashSet::new();
        for entry in &self.entries {
            if !entry_ids.insert(entry.id.as_str()) {
                return Err(CatalogError::DuplicateEntry(entry.id.clone()));
            }
        }

        let mut rule_ids = HashSet::new();
        for rule in &self.rules {
            if !rule_ids.insert(rule.id.as_str()) {
                return Err(CatalogError::DuplicateRule(rule.id.clone()));
            }
            if let Some(correction_id) = &rule.correction_id {
                if !entry_ids.contains(correction_id.as_str()) {
                    return Err(CatalogError::DanglingCorrection {
                        rule_id: rule.id.clone(),
                        correction_id: correction_id.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Split into the pair `RuleStore::load_static` takes
    pub fn into_parts(self) -> (Vec<StaticRule>, Vec<KnowledgeEntry>) {
        (self.rules, self.entries)
    }
}

/// Catalogue error types
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Duplicate knowledge entry id: {0}")]
    DuplicateEntry(String),

    #[error("Duplicate rule id: {0}")]
    DuplicateRule(String),

    #[error("Rule '{rule_id}' references unknown knowledge entry '{correction_id}'")]
    DanglingCorrection { rule_id: String, correction_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Confidence;
    use crate::rule::RuleSeverity;

    #[test]
    fn builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert!(!catalog.rules.is_empty());
        assert!(!catalog.entries.is_empty());

        // Declaration order is preserved
        assert_eq!(catalog.rules[0].id, "hb-eventloopfuture-wait");
        assert_eq!(catalog.rules[0].severity, RuleSeverity::Error);

        let entry = catalog.entries.iter().find(|e| e.id == "async-handlers").unwrap();
        assert_eq!(entry.confidence, Confidence::High);
    }

    #[test]
    fn dangling_correction_rejected() {
        let toml = r#"
            [[rule]]
            id = "r1"
            pattern = 'foo'
            description = "Foo"
            correction_id = "missing"
            severity = "warning"
        "#;

        let err = Catalog::from_toml(toml).unwrap_err();
        assert!(matches!(err, CatalogError::DanglingCorrection { .. }));
    }

    #[test]
    fn duplicate_rule_rejected() {
        let toml = r#"
            [[rule]]
            id = "r1"
            pattern = 'foo'
            description = "Foo"
            severity = "warning"

            [[rule]]
            id = "r1"
            pattern = 'bar'
            description = "Bar"
            severity = "error"
        "#;

        let err = Catalog::from_toml(toml).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateRule(id) if id == "r1"));
    }

    #[test]
    fn empty_catalog_is_valid() {
        let catalog = Catalog::from_toml("").unwrap();
        assert!(catalog.rules.is_empty());
        assert!(catalog.entries.is_empty());
    }
}
