//! The rule store

use ruleforge_core::{DynamicRule, KnowledgeEntry, ReviewStatus, Rule, StaticRule};
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use crate::backend::StoreBackend;
use crate::error::StoreError;
use crate::persist::{PersistedState, StoreDocument};
use crate::state::{compile, StoreState};

/// What an accepted `upsert_dynamic` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// New id
    Inserted,

    /// Replaced a Draft rule with different content
    Replaced,

    /// Identical content already stored; the stored rule is kept as is
    Unchanged,
}

/// Concurrency-safe holder of static rules, dynamic rules and knowledge entries
///
/// Construct one per process and share it as `Arc<RuleStore>`.
#[derive(Debug, Default)]
pub struct RuleStore {
    state: RwLock<Arc<StoreState>>,
}

impl RuleStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// The current published state
    ///
    /// Rules and entries read from one snapshot are mutually consistent.
    pub fn snapshot(&self) -> Arc<StoreState> {
        // A poisoned lock still holds a fully published state: states are
        // only ever replaced whole.
        match self.state.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Apply a mutation to a private copy and publish it if it succeeds
    fn update<T>(&self, mutate: impl FnOnce(&mut StoreState) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut guard = match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut next = StoreState::clone(&guard);
        let outcome = mutate(&mut next)?;
        next.rebuild_approved();
        *guard = Arc::new(next);

        Ok(outcome)
    }

    /// Bootstrap the static catalogue and knowledge entries
    ///
    /// Replaces any previous static set and entry set in one step. Loading
    /// the same input twice leaves the store in the same state.
    pub fn load_static(&self, rules: Vec<StaticRule>, entries: Vec<KnowledgeEntry>) -> Result<(), StoreError> {
        let entry_ids: HashSet<&str> = entries.iter().map(|e| e.id.as_str()).collect();

        let mut seen = HashSet::new();
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(StoreError::DuplicateRule(rule.id.clone()));
            }
            if let Some(cid) = &rule.correction_id {
                if !entry_ids.contains(cid.as_str()) {
                    return Err(StoreError::DanglingCorrection {
                        rule_id: rule.id.clone(),
                        correction_id: cid.clone(),
                    });
                }
            }
            compiled.push(compile(&rule.id, &rule.pattern)?);
        }

        let (rule_count, entry_count) = (rules.len(), entries.len());
        self.update(|state| {
            if let Some(clash) = rules.iter().find(|r| state.dynamic_rule(&r.id).is_some()) {
                return Err(StoreError::DuplicateRule(clash.id.clone()));
            }
            state.replace_static(rules, compiled, entries);
            Ok(())
        })?;

        tracing::info!(rules = rule_count, entries = entry_count, "loaded static catalogue");
        Ok(())
    }

    /// Insert or replace knowledge entries by id
    pub fn upsert_entries(&self, entries: Vec<KnowledgeEntry>) -> Result<usize, StoreError> {
        let count = entries.len();
        self.update(|state| {
            for entry in entries {
                state.upsert_entry(entry);
            }
            Ok(count)
        })
    }

    /// Insert or replace a synthesized rule by id
    ///
    /// Rejected, with the store unchanged, when the pattern does not compile,
    /// the correction id does not resolve, the id belongs to a static rule,
    /// the rule is not a Draft, or it would overwrite an already reviewed
    /// rule with different content.
    pub fn upsert_dynamic(&self, rule: DynamicRule) -> Result<UpsertOutcome, StoreError> {
        if rule.source_release.trim().is_empty() {
            return Err(StoreError::MissingRelease(rule.id));
        }
        if rule.review_status != ReviewStatus::Draft {
            return Err(StoreError::NotDraft {
                rule_id: rule.id,
                status: rule.review_status,
            });
        }
        let regex = compile(&rule.id, &rule.pattern)?;

        let rule_id = rule.id.clone();
        let outcome = self.update(|state| {
            if state.is_static(&rule.id) {
                return Err(StoreError::StaticRuleConflict(rule.id.clone()));
            }
            state.ensure_correction(&rule.id, rule.correction_id.as_deref())?;

            let outcome = match state.dynamic_rule(&rule.id) {
                None => UpsertOutcome::Inserted,
                Some(existing) if existing.same_content(&rule) => return Ok(UpsertOutcome::Unchanged),
                Some(existing) if existing.review_status.is_terminal() => {
                    return Err(StoreError::AlreadyReviewed {
                        rule_id: rule.id.clone(),
                        status: existing.review_status,
                    });
                }
                Some(_) => UpsertOutcome::Replaced,
            };

            state.put_dynamic(rule, regex);
            Ok(outcome)
        });

        match &outcome {
            Ok(o) => tracing::debug!(rule_id = %rule_id, outcome = ?o, "upserted dynamic rule"),
            Err(e) => tracing::warn!(rule_id = %rule_id, error = %e, "dynamic rule rejected"),
        }
        outcome
    }

    /// Move a Draft rule to Approved or Rejected
    ///
    /// Any other transition fails with `InvalidTransition` and leaves the
    /// rule untouched.
    pub fn set_review_status(&self, id: &str, status: ReviewStatus) -> Result<DynamicRule, StoreError> {
        let updated = self.update(|state| {
            let current = match state.dynamic_rule(id) {
                Some(rule) => rule.review_status,
                None if state.is_static(id) => return Err(StoreError::StaticRuleConflict(id.to_string())),
                None => return Err(StoreError::UnknownRule(id.to_string())),
            };

            if !current.can_transition_to(status) {
                return Err(StoreError::InvalidTransition {
                    rule_id: id.to_string(),
                    from: current,
                    to: status,
                });
            }

            state
                .set_status(id, status)
                .cloned()
                .ok_or_else(|| StoreError::UnknownRule(id.to_string()))
        })?;

        tracing::info!(rule_id = %id, status = %status, "review status changed");
        Ok(updated)
    }

    /// Static rules in declaration order, then approved dynamic rules by generation time
    pub fn all_approved_rules(&self) -> Vec<Rule> {
        self.snapshot().approved_rules().iter().map(|c| c.rule.clone()).collect()
    }

    pub fn knowledge_entry(&self, id: &str) -> Option<KnowledgeEntry> {
        self.snapshot().knowledge_entry(id).cloned()
    }

    pub fn all_entries(&self) -> Vec<KnowledgeEntry> {
        self.snapshot().entries().cloned().collect()
    }

    pub fn static_rules(&self) -> Vec<StaticRule> {
        self.snapshot().static_rules().to_vec()
    }

    pub fn dynamic_rule(&self, id: &str) -> Option<DynamicRule> {
        self.snapshot().dynamic_rule(id).cloned()
    }

    /// Every dynamic rule regardless of review state, ordered by id
    pub fn dynamic_rules(&self) -> Vec<DynamicRule> {
        self.snapshot().dynamic_rules().cloned().collect()
    }

    /// Write the full logical state to a backend
    pub fn persist(&self, backend: &dyn StoreBackend) -> Result<(), StoreError> {
        let state = self.snapshot();
        let persisted = PersistedState {
            static_rules: state.static_rules().to_vec(),
            dynamic_rules: state.dynamic_rules().cloned().collect(),
            entries: state.entries().cloned().collect(),
        };
        let counts = (persisted.static_rules.len(), persisted.dynamic_rules.len());

        let bytes = StoreDocument::new(persisted)?.encode()?;
        backend.save(&bytes)?;

        tracing::info!(
            backend = backend.name(),
            static_rules = counts.0,
            dynamic_rules = counts.1,
            "persisted rule store"
        );
        Ok(())
    }

    /// Replace the whole state with the backend's snapshot
    ///
    /// Returns `false` and leaves the store untouched when the backend holds
    /// no snapshot. Every pattern is recompiled; a snapshot that fails
    /// validation is refused as a whole.
    pub fn restore(&self, backend: &dyn StoreBackend) -> Result<bool, StoreError> {
        let Some(bytes) = backend.load()? else {
            tracing::debug!(backend = backend.name(), "no snapshot to restore");
            return Ok(false);
        };
        let document = StoreDocument::decode(&bytes)?;
        let PersistedState {
            static_rules,
            dynamic_rules,
            entries,
        } = document.state;

        let mut ids = HashSet::new();
        let mut static_compiled = Vec::with_capacity(static_rules.len());
        for rule in &static_rules {
            if !ids.insert(rule.id.clone()) {
                return Err(StoreError::DuplicateRule(rule.id.clone()));
            }
            static_compiled.push(compile(&rule.id, &rule.pattern)?);
        }

        let mut dynamic_compiled = Vec::with_capacity(dynamic_rules.len());
        for rule in dynamic_rules {
            if !ids.insert(rule.id.clone()) {
                return Err(StoreError::DuplicateRule(rule.id));
            }
            let regex = compile(&rule.id, &rule.pattern)?;
            dynamic_compiled.push((rule, regex));
        }

        let (static_count, dynamic_count) = (static_rules.len(), dynamic_compiled.len());
        self.update(|state| {
            let mut fresh = StoreState::default();
            fresh.replace_static(static_rules, static_compiled, entries);
            for (rule, regex) in dynamic_compiled {
                fresh.put_dynamic(rule, regex);
            }
            *state = fresh;
            Ok(())
        })?;

        tracing::info!(
            backend = backend.name(),
            static_rules = static_count,
            dynamic_rules = dynamic_count,
            "restored rule store"
        );
        Ok(true)
    }
}
