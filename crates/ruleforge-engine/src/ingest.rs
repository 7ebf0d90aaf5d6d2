//! Ingestion cycles
//!
//! One cycle parses release notes, synthesizes Draft rules from the records,
//! and upserts them into the store. Failures are per record: a record that
//! cannot be synthesized or stored is listed in the report and the cycle
//! moves on.
//!
//! At most one cycle runs at a time. A cycle started while another is in
//! flight returns `IngestOutcome::Coalesced` without doing any work.

use ruleforge_changelog::{split_releases, ChangelogParser, ParseStats};
use ruleforge_core::DeprecationRecord;
use ruleforge_store::{RuleStore, UpsertOutcome};
use ruleforge_synth::{IdRegistry, PatternSynthesizer, SynthesisError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A synthesized rule the store refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRule {
    pub rule_id: String,
    pub reason: String,
}

/// Counters and rejections from one ingestion cycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IngestReport {
    /// Release versions that contributed at least one record
    pub releases: Vec<String>,

    /// Parser counters, summed over all releases
    pub parse: ParseStats,

    /// Records handed to the synthesizer
    pub records_parsed: usize,

    pub inserted: usize,
    pub replaced: usize,
    pub unchanged: usize,

    /// Records that did not become a rule
    pub synthesis_rejected: Vec<SynthesisError>,

    /// Rules the store refused
    pub store_rejected: Vec<RejectedRule>,
}

impl IngestReport {
    /// Rules newly inserted or replaced
    pub fn accepted(&self) -> usize {
        self.inserted + self.replaced
    }

    pub fn rejected(&self) -> usize {
        self.synthesis_rejected.len() + self.store_rejected.len()
    }

    fn add_stats(&mut self, stats: ParseStats) {
        self.parse.lines_scanned += stats.lines_scanned;
        self.parse.lines_matched += stats.lines_matched;
        self.parse.duplicates_collapsed += stats.duplicates_collapsed;
    }
}

/// Result of asking for an ingestion cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The cycle ran
    Completed(IngestReport),

    /// Another cycle was already running; nothing was done
    Coalesced,
}

impl IngestOutcome {
    pub fn report(&self) -> Option<&IngestReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Coalesced => None,
        }
    }
}

/// Clears the running flag when a cycle ends, including by panic
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs parse -> synthesize -> upsert cycles against a shared store
#[derive(Debug)]
pub struct Ingestor {
    store: Arc<RuleStore>,
    parser: ChangelogParser,
    synthesizer: PatternSynthesizer,
    running: AtomicBool,
}

impl Ingestor {
    pub fn new(store: Arc<RuleStore>, synthesizer: PatternSynthesizer) -> Self {
        Self {
            store,
            parser: ChangelogParser::new(),
            synthesizer,
            running: AtomicBool::new(false),
        }
    }

    /// Whether a cycle is in flight
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn try_begin(&self) -> Option<CycleGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| CycleGuard(&self.running))
    }

    /// Ingest the body of a single release
    pub fn ingest(&self, raw: &str, version: &str) -> IngestOutcome {
        let Some(_guard) = self.try_begin() else {
            tracing::info!(release = version, "ingestion already running, coalesced");
            return IngestOutcome::Coalesced;
        };

        let (records, stats) = self.parser.parse_with_stats(raw, version);
        let mut report = IngestReport::default();
        report.add_stats(stats);

        self.run(vec![(version.trim().to_string(), records)], report)
    }

    /// Ingest every release section of a changelog document
    pub fn ingest_document(&self, text: &str) -> IngestOutcome {
        let Some(_guard) = self.try_begin() else {
            tracing::info!("ingestion already running, coalesced");
            return IngestOutcome::Coalesced;
        };

        let mut report = IngestReport::default();
        let releases: Vec<_> = split_releases(text)
            .into_iter()
            .map(|section| {
                let (records, stats) = self.parser.parse_with_stats(&section.body, &section.version);
                report.add_stats(stats);
                (section.version, records)
            })
            .collect();

        self.run(releases, report)
    }

    /// An id registry seeded with every id the store already holds
    fn registry(&self) -> IdRegistry {
        let snapshot = self.store.snapshot();
        let mut registry = self.synthesizer.registry();
        for rule in snapshot.static_rules() {
            registry.reserve(rule.id.clone());
        }
        for rule in snapshot.dynamic_rules() {
            registry.record(rule);
        }
        registry
    }

    fn run(&self, releases: Vec<(String, Vec<DeprecationRecord>)>, mut report: IngestReport) -> IngestOutcome {
        let mut registry = self.registry();

        for (version, records) in releases {
            if records.is_empty() {
                continue;
            }
            report.releases.push(version);

            for record in records {
                report.records_parsed += 1;

                let rule = match self.synthesizer.synthesize(&record, &mut registry) {
                    Ok(rule) => rule,
                    Err(e) => {
                        tracing::warn!(token = %record.deprecated_api, error = %e, "record not synthesized");
                        report.synthesis_rejected.push(e);
                        continue;
                    }
                };

                let rule_id = rule.id.clone();
                match self.store.upsert_dynamic(rule) {
                    Ok(UpsertOutcome::Inserted) => report.inserted += 1,
                    Ok(UpsertOutcome::Replaced) => report.replaced += 1,
                    Ok(UpsertOutcome::Unchanged) => report.unchanged += 1,
                    Err(e) => report.store_rejected.push(RejectedRule {
                        rule_id,
                        reason: e.to_string(),
                    }),
                }
            }
        }

        tracing::info!(
            releases = ?report.releases,
            records = report.records_parsed,
            inserted = report.inserted,
            replaced = report.replaced,
            unchanged = report.unchanged,
            rejected = report.rejected(),
            "ingestion cycle finished"
        );

        IngestOutcome::Completed(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ruleforge_core::{KnowledgeEntry, ReviewStatus, RuleSeverity, StaticRule};

    fn ingestor() -> Ingestor {
        let store = Arc::new(RuleStore::new());
        store
            .load_static(
                vec![StaticRule::new("s-wait", r"\.wait\(\)", "Blocking wait", RuleSeverity::Error)],
                vec![KnowledgeEntry::new("async", "Async handlers", "Use await.")],
            )
            .unwrap();
        Ingestor::new(store, PatternSynthesizer::default())
    }

    const NOTES: &str = "\
- `HBApplication` has been renamed to `Application`
- Removed deprecated `HBRequest.eventLoop`
- Fixed a crash in the router
";

    #[test]
    fn cycle_reports_counts() {
        let ingestor = ingestor();
        let report = ingestor.ingest(NOTES, "2.1.0").report().cloned().unwrap();

        assert_eq!(report.releases, vec!["2.1.0".to_string()]);
        assert_eq!(report.records_parsed, 2);
        assert_eq!(report.inserted, 2);
        assert_eq!(report.parse.lines_scanned, 3);
        assert_eq!(report.parse.lines_skipped(), 1);
        assert_eq!(report.rejected(), 0);
        assert!(!ingestor.is_running());
    }

    #[test]
    fn repeat_cycle_is_unchanged() {
        let ingestor = ingestor();
        ingestor.ingest(NOTES, "2.1.0");
        let report = ingestor.ingest(NOTES, "2.1.0").report().cloned().unwrap();

        assert_eq!(report.inserted, 0);
        assert_eq!(report.unchanged, 2);
        assert_eq!(ingestor.store.dynamic_rules().len(), 2);
    }

    #[test]
    fn overlapping_cycle_is_coalesced() {
        let ingestor = ingestor();
        let _held = ingestor.try_begin().unwrap();

        assert_eq!(ingestor.ingest(NOTES, "2.1.0"), IngestOutcome::Coalesced);
        assert_eq!(ingestor.ingest_document("## 2.1.0\n"), IngestOutcome::Coalesced);
        assert!(ingestor.store.dynamic_rules().is_empty());
    }

    #[test]
    fn guard_releases_flag() {
        let ingestor = ingestor();
        drop(ingestor.try_begin().unwrap());
        assert!(!ingestor.is_running());
        assert!(matches!(ingestor.ingest("", "2.1.0"), IngestOutcome::Completed(_)));
    }

    #[test]
    fn missing_release_is_a_synthesis_rejection() {
        let ingestor = ingestor();
        let report = ingestor.ingest(NOTES, "  ").report().cloned().unwrap();

        assert_eq!(report.synthesis_rejected.len(), 2);
        assert!(matches!(report.synthesis_rejected[0], SynthesisError::MissingRelease { .. }));
        assert!(ingestor.store.dynamic_rules().is_empty());
    }

    #[test]
    fn reviewed_rules_survive_reingestion() {
        let ingestor = ingestor();
        ingestor.ingest(NOTES, "2.1.0");
        ingestor
            .store
            .set_review_status("auto-hbapplication-2.1.0", ReviewStatus::Approved)
            .unwrap();

        let report = ingestor.ingest(NOTES, "2.1.0").report().cloned().unwrap();
        assert_eq!(report.unchanged, 2);
        assert_eq!(
            ingestor.store.dynamic_rule("auto-hbapplication-2.1.0").unwrap().review_status,
            ReviewStatus::Approved
        );
    }

    #[test]
    fn document_cycle_covers_every_release() {
        let ingestor = ingestor();
        let text = "\
# Changelog

## [2.1.0] - 2024-05-02
- `HBApplication` has been renamed to `Application`

## 2.0.0
- Removed `HBRouterBuilder`
- Nothing else
";
        let report = ingestor.ingest_document(text).report().cloned().unwrap();

        assert_eq!(report.releases, vec!["2.1.0".to_string(), "2.0.0".to_string()]);
        assert_eq!(report.inserted, 2);
        assert!(ingestor.store.dynamic_rule("auto-hbrouterbuilder-2.0.0").is_some());
    }
}
