//! Matching approved rules against source text
//!
//! The engine reads one store snapshot per check, so the rules it applies and
//! the knowledge entries it resolves corrections against always come from the
//! same published state.

use ruleforge_core::{CheckResult, Correction, Finding};
use ruleforge_store::{CompiledRule, RuleStore, StoreState};
use std::sync::Arc;

/// Applies the active rule set to submitted code
#[derive(Debug, Clone)]
pub struct MatchEngine {
    store: Arc<RuleStore>,
}

impl MatchEngine {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }

    /// Check source text against every approved rule
    ///
    /// Findings come out in rule order (static rules, then approved dynamic
    /// rules), and within a rule in match order. Overlapping matches from
    /// different rules are all reported.
    pub fn check(&self, text: &str) -> CheckResult {
        let snapshot = self.store.snapshot();
        Self::check_snapshot(&snapshot, text)
    }

    /// Check against an explicit snapshot
    pub fn check_snapshot(snapshot: &StoreState, text: &str) -> CheckResult {
        let lines = LineIndex::new(text);
        let mut findings = Vec::new();

        for compiled in snapshot.approved_rules() {
            for m in compiled.regex().find_iter(text) {
                findings.push(Self::finding(snapshot, compiled, m.as_str(), lines.line_of(m.start())));
            }
        }

        let result = CheckResult::from_findings(findings);
        tracing::debug!(
            rules = snapshot.approved_rules().len(),
            findings = result.findings.len(),
            blocking = result.blocking,
            "checked source text"
        );
        result
    }

    fn finding(snapshot: &StoreState, compiled: &CompiledRule, matched: &str, line_number: usize) -> Finding {
        let rule = &compiled.rule;

        let correction = rule.correction_id.as_deref().map(|cid| match snapshot.knowledge_entry(cid) {
            Some(entry) => Correction::Resolved {
                title: entry.title.clone(),
            },
            None => {
                tracing::warn!(rule_id = %rule.id, correction_id = cid, "correction does not resolve");
                Correction::Unresolved
            }
        });

        Finding {
            rule_id: rule.id.clone(),
            severity: rule.severity,
            description: rule.description.clone(),
            fix_suggestion: rule.fix_suggestion.clone(),
            correction_id: rule.correction_id.clone(),
            correction,
            matched_text: matched.to_string(),
            line_number,
        }
    }
}

/// Byte offset -> 1-based line number
struct LineIndex {
    /// Byte offset at which each line starts
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { starts }
    }

    fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(next) => next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ruleforge_changelog::ChangelogParser;
    use ruleforge_core::{KnowledgeEntry, ReviewStatus, RuleSeverity, StaticRule};
    use ruleforge_synth::PatternSynthesizer;

    fn engine() -> MatchEngine {
        let store = Arc::new(RuleStore::new());
        store
            .load_static(
                vec![
                    StaticRule::new("s-wait", r"\.wait\(\)", "Blocking wait", RuleSeverity::Error)
                        .with_correction("async"),
                    StaticRule::new("s-try", r"\btry!", "Force try", RuleSeverity::Warning),
                ],
                vec![KnowledgeEntry::new("async", "Async handlers", "Use await.")],
            )
            .unwrap();
        MatchEngine::new(store)
    }

    /// Mine, approve and return the rule for the removed `HBRequest.logger`
    fn approve_logger_rule(store: &RuleStore, correction: Option<&str>) -> String {
        let records = ChangelogParser::new().parse("- Removed deprecated `HBRequest.logger` property", "2.1.0");
        let synthesizer = PatternSynthesizer::default();
        let mut rule = synthesizer
            .synthesize(&records[0], &mut synthesizer.registry())
            .unwrap();
        if let Some(cid) = correction {
            rule = rule.with_correction(cid);
        }

        store.upsert_dynamic(rule.clone()).unwrap();
        store.set_review_status(&rule.id, ReviewStatus::Approved).unwrap();
        rule.id
    }

    #[test]
    fn line_index() {
        let index = LineIndex::new("a\nbc\n\nd");
        assert_eq!(index.line_of(0), 1);
        assert_eq!(index.line_of(1), 1);
        assert_eq!(index.line_of(2), 2);
        assert_eq!(index.line_of(5), 3);
        assert_eq!(index.line_of(6), 4);
    }

    #[test]
    fn empty_text_has_no_findings() {
        let result = engine().check("");
        assert!(result.is_empty());
        assert!(!result.blocking);
    }

    #[test]
    fn findings_carry_line_numbers_and_corrections() {
        let text = "let x = try! foo()\nfuture.wait()\nfuture.wait()";
        let result = engine().check(text);

        let summary: Vec<(&str, usize)> = result
            .findings
            .iter()
            .map(|f| (f.rule_id.as_str(), f.line_number))
            .collect();
        assert_eq!(summary, vec![("s-wait", 2), ("s-wait", 3), ("s-try", 1)]);

        assert_eq!(result.findings[0].matched_text, ".wait()");
        assert_eq!(
            result.findings[0].correction,
            Some(Correction::Resolved {
                title: "Async handlers".to_string()
            })
        );
        assert_eq!(result.findings[2].correction, None);
        assert!(result.blocking);
    }

    #[test]
    fn warnings_alone_do_not_block() {
        let result = engine().check("try! foo()");
        assert_eq!(result.findings.len(), 1);
        assert!(!result.blocking);
    }

    #[test]
    fn dangling_correction_is_unresolved() {
        let store = Arc::new(RuleStore::new());
        store
            .load_static(vec![], vec![KnowledgeEntry::new("logging", "Request logging", "Use context.logger.")])
            .unwrap();
        let id = approve_logger_rule(&store, Some("logging"));

        // Refreshing the catalogue drops the entry the dynamic rule points at
        store.load_static(vec![], vec![]).unwrap();

        let result = MatchEngine::new(store).check("request.logger.info(\"hi\")");
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].rule_id, id);
        assert_eq!(result.findings[0].matched_text, ".logger");
        assert_eq!(result.findings[0].correction_id.as_deref(), Some("logging"));
        assert_eq!(result.findings[0].correction, Some(Correction::Unresolved));
        assert!(result.blocking);
    }

    #[test]
    fn overlapping_matches_are_all_reported() {
        let store = Arc::new(RuleStore::new());
        store
            .load_static(
                vec![StaticRule::new("s-logger", r"\brequest\.logger\b", "Request logger", RuleSeverity::Warning)],
                vec![],
            )
            .unwrap();
        let id = approve_logger_rule(&store, None);

        let result = MatchEngine::new(store).check("request.logger.info(\"hi\")");
        let summary: Vec<(&str, &str, usize)> = result
            .findings
            .iter()
            .map(|f| (f.rule_id.as_str(), f.matched_text.as_str(), f.line_number))
            .collect();
        assert_eq!(
            summary,
            vec![("s-logger", "request.logger", 1), (id.as_str(), ".logger", 1)]
        );
    }

    #[test]
    fn empty_store_matches_nothing() {
        let engine = MatchEngine::new(Arc::new(RuleStore::new()));
        assert!(engine.check("future.wait()").is_empty());
    }
}
