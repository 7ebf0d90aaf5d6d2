//! Immutable store state
//!
//! A `StoreState` is never modified once it is published. Mutations clone
//! it, change the clone, and publish the clone.

use regex::Regex;
use ruleforge_core::{DynamicRule, KnowledgeEntry, ReviewStatus, Rule, StaticRule};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::StoreError;

/// An active rule together with its compiled pattern
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: Rule,
    regex: Regex,
}

impl CompiledRule {
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn id(&self) -> &str {
        &self.rule.id
    }
}

/// Compile a pattern, mapping failures to `InvalidPattern`
pub(crate) fn compile(rule_id: &str, pattern: &str) -> Result<Regex, StoreError> {
    Regex::new(pattern).map_err(|e| StoreError::InvalidPattern {
        rule_id: rule_id.to_string(),
        reason: e.to_string(),
    })
}

/// One published version of the store
#[derive(Debug, Clone)]
pub struct StoreState {
    /// Declaration order
    static_rules: Vec<StaticRule>,

    dynamic_rules: BTreeMap<String, DynamicRule>,

    entries: BTreeMap<String, KnowledgeEntry>,

    /// Compiled pattern for every rule, static and dynamic
    patterns: HashMap<String, Regex>,

    /// Static rules in declaration order, then approved dynamic rules by generation time
    approved: Arc<[CompiledRule]>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            static_rules: Vec::new(),
            dynamic_rules: BTreeMap::new(),
            entries: BTreeMap::new(),
            patterns: HashMap::new(),
            approved: Arc::from(Vec::new()),
        }
    }
}

impl StoreState {
    /// The active rule set in canonical order
    pub fn approved_rules(&self) -> &[CompiledRule] {
        &self.approved
    }

    pub fn static_rules(&self) -> &[StaticRule] {
        &self.static_rules
    }

    /// Dynamic rules ordered by id
    pub fn dynamic_rules(&self) -> impl Iterator<Item = &DynamicRule> {
        self.dynamic_rules.values()
    }

    pub fn dynamic_rule(&self, id: &str) -> Option<&DynamicRule> {
        self.dynamic_rules.get(id)
    }

    pub fn knowledge_entry(&self, id: &str) -> Option<&KnowledgeEntry> {
        self.entries.get(id)
    }

    /// Knowledge entries ordered by id
    pub fn entries(&self) -> impl Iterator<Item = &KnowledgeEntry> {
        self.entries.values()
    }

    pub fn is_static(&self, id: &str) -> bool {
        self.static_rules.iter().any(|r| r.id == id)
    }

    pub(crate) fn ensure_correction(&self, rule_id: &str, correction_id: Option<&str>) -> Result<(), StoreError> {
        match correction_id {
            Some(cid) if !self.entries.contains_key(cid) => Err(StoreError::DanglingCorrection {
                rule_id: rule_id.to_string(),
                correction_id: cid.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Replace the static set and the knowledge entries
    ///
    /// The caller has already validated ids, patterns and correction ids.
    pub(crate) fn replace_static(
        &mut self,
        rules: Vec<StaticRule>,
        compiled: Vec<Regex>,
        entries: Vec<KnowledgeEntry>,
    ) {
        for old in &self.static_rules {
            self.patterns.remove(&old.id);
        }
        for (rule, regex) in rules.iter().zip(compiled) {
            self.patterns.insert(rule.id.clone(), regex);
        }
        self.static_rules = rules;
        self.entries = entries.into_iter().map(|e| (e.id.clone(), e)).collect();
    }

    pub(crate) fn upsert_entry(&mut self, entry: KnowledgeEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    pub(crate) fn put_dynamic(&mut self, rule: DynamicRule, regex: Regex) {
        self.patterns.insert(rule.id.clone(), regex);
        self.dynamic_rules.insert(rule.id.clone(), rule);
    }

    pub(crate) fn set_status(&mut self, id: &str, status: ReviewStatus) -> Option<&DynamicRule> {
        let rule = self.dynamic_rules.get_mut(id)?;
        rule.review_status = status;
        Some(rule)
    }

    /// Recompute the cached active rule set
    pub(crate) fn rebuild_approved(&mut self) {
        let mut approved: Vec<&DynamicRule> = self
            .dynamic_rules
            .values()
            .filter(|r| r.review_status == ReviewStatus::Approved)
            .collect();
        approved.sort_by(|a, b| a.generated_at.cmp(&b.generated_at).then_with(|| a.id.cmp(&b.id)));

        let statics = self.static_rules.iter().map(|r| (Rule::from(r), r.id.as_str()));
        let dynamics = approved.into_iter().map(|r| (Rule::from(r), r.id.as_str()));

        let patterns = &self.patterns;
        let rebuilt: Arc<[CompiledRule]> = statics
            .chain(dynamics)
            .filter_map(|(rule, id)| {
                let regex = patterns.get(id)?.clone();
                Some(CompiledRule { rule, regex })
            })
            .collect();

        self.approved = rebuilt;
    }
}
