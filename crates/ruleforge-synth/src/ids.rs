//! Rule id allocation
//!
//! Ids have the form `auto-{slug}-{release}`. Two different records can
//! slug to the same base id (`HBRequest.logger` and `HBRequest::logger`,
//! or one token announced as both renamed and removed). The first claimant
//! keeps the base id; later ones get `-2`, `-3`, ... up to the registry's
//! limit. A claimant that already owns an id gets it back unchanged, which
//! is what makes re-ingesting a release idempotent.

use ruleforge_core::{ChangeCategory, DynamicRule};
use std::collections::HashMap;

/// Lowercase, collapse non-alphanumeric runs to one hyphen, trim hyphens
pub fn slug(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut pending_hyphen = false;

    for c in token.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    out
}

/// Who holds an id
#[derive(Debug, Clone, PartialEq, Eq)]
enum Claim {
    /// Held by something that is never a synthesis target (a static rule)
    Reserved,

    /// Held by the rule synthesized from this token and category
    Token(String, ChangeCategory),
}

/// Tracks which ids are taken and by what
#[derive(Debug, Clone)]
pub struct IdRegistry {
    claims: HashMap<String, Claim>,
    max_suffix: u32,
}

impl IdRegistry {
    pub fn new(max_suffix: u32) -> Self {
        Self {
            claims: HashMap::new(),
            max_suffix,
        }
    }

    /// Mark an id as unavailable to synthesis
    pub fn reserve(&mut self, id: impl Into<String>) {
        self.claims.insert(id.into(), Claim::Reserved);
    }

    /// Register an existing dynamic rule so its id is reused on re-ingestion
    pub fn record(&mut self, rule: &DynamicRule) {
        self.claims.insert(
            rule.id.clone(),
            Claim::Token(rule.deprecated_api.clone(), rule.category),
        );
    }

    /// Allocate an id for a token, or `None` when every suffix is taken
    pub fn claim(&mut self, base_id: &str, token: &str, category: ChangeCategory) -> Option<String> {
        let wanted = Claim::Token(token.to_string(), category);

        let candidates = std::iter::once(base_id.to_string())
            .chain((2..=self.max_suffix).map(|n| format!("{}-{}", base_id, n)));

        for candidate in candidates {
            match self.claims.get(&candidate) {
                None => {
                    self.claims.insert(candidate.clone(), wanted);
                    return Some(candidate);
                }
                Some(existing) if *existing == wanted => return Some(candidate),
                Some(_) => continue,
            }
        }

        None
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}

impl Default for IdRegistry {
    fn default() -> Self {
        Self::new(99)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_rules() {
        assert_eq!(slug("HBApplication"), "hbapplication");
        assert_eq!(slug("HBRequest.logger"), "hbrequest-logger");
        assert_eq!(slug("Router.add(_:method:use:)"), "router-add-method-use");
        assert_eq!(slug("--weird__token!!"), "weird-token");
        assert_eq!(slug("()"), "");
    }

    #[test]
    fn same_claimant_gets_same_id() {
        let mut registry = IdRegistry::default();
        let first = registry.claim("auto-hbfoo-1.0.0", "HBFoo", ChangeCategory::Removed);
        let second = registry.claim("auto-hbfoo-1.0.0", "HBFoo", ChangeCategory::Removed);
        assert_eq!(first.as_deref(), Some("auto-hbfoo-1.0.0"));
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn different_token_gets_suffix() {
        let mut registry = IdRegistry::default();
        registry.claim("auto-hbrequest-logger-2.0.0", "HBRequest.logger", ChangeCategory::Removed);
        let other = registry.claim("auto-hbrequest-logger-2.0.0", "HBRequest::logger", ChangeCategory::Removed);
        assert_eq!(other.as_deref(), Some("auto-hbrequest-logger-2.0.0-2"));

        let third = registry.claim("auto-hbrequest-logger-2.0.0", "HBRequest/logger", ChangeCategory::Removed);
        assert_eq!(third.as_deref(), Some("auto-hbrequest-logger-2.0.0-3"));
    }

    #[test]
    fn same_token_other_category_gets_suffix() {
        let mut registry = IdRegistry::default();
        registry.claim("auto-hbfoo-1.0.0", "HBFoo", ChangeCategory::Renamed);
        let removed = registry.claim("auto-hbfoo-1.0.0", "HBFoo", ChangeCategory::Removed);
        assert_eq!(removed.as_deref(), Some("auto-hbfoo-1.0.0-2"));
    }

    #[test]
    fn reserved_ids_are_skipped() {
        let mut registry = IdRegistry::default();
        registry.reserve("auto-hbfoo-1.0.0");
        let id = registry.claim("auto-hbfoo-1.0.0", "HBFoo", ChangeCategory::Removed);
        assert_eq!(id.as_deref(), Some("auto-hbfoo-1.0.0-2"));
    }

    #[test]
    fn exhausted_suffixes() {
        let mut registry = IdRegistry::new(2);
        registry.claim("auto-x-1", "x", ChangeCategory::Removed);
        registry.claim("auto-x-1", "x.", ChangeCategory::Removed);
        assert_eq!(registry.claim("auto-x-1", ".x", ChangeCategory::Removed), None);
    }
}
