//! End-to-end rule lifecycle: release notes -> Draft rule -> review -> check

use pretty_assertions::assert_eq;
use ruleforge_core::{Catalog, Correction, ReviewDecision, ReviewStatus, RuleSeverity};
use ruleforge_engine::{IngestOutcome, RuleService};
use ruleforge_store::{MemoryBackend, RuleStore, StoreError};
use ruleforge_synth::PatternSynthesizer;
use std::sync::Arc;

const RELEASE_2_1_0: &str = "\
## What's changed
- `HBApplication` has been renamed to `Application`
- Removed deprecated `HBRequest.logger` property
- Improved router performance
";

fn service() -> RuleService {
    RuleService::new(Arc::new(RuleStore::new()), PatternSynthesizer::default())
}

fn builtin_service() -> RuleService {
    let service = service();
    let (rules, entries) = Catalog::builtin().unwrap().into_parts();
    service.store().load_static(rules, entries).unwrap();
    service
}

#[test]
fn renamed_type_becomes_warning_rule() {
    let service = service();
    service.ingest(RELEASE_2_1_0, "2.1.0");

    let rule = service.store().dynamic_rule("auto-hbapplication-2.1.0").unwrap();
    assert_eq!(rule.severity, RuleSeverity::Warning);
    assert_eq!(rule.review_status, ReviewStatus::Draft);
    assert_eq!(
        rule.fix_suggestion.as_deref(),
        Some("Replace 'HBApplication' with 'Application'")
    );

    let regex = regex_for(&rule.pattern);
    assert!(regex.is_match("let app = HBApplication()"));
    assert!(!regex.is_match("let w = MyHBApplicationWrapper()"));
}

#[test]
fn removed_property_becomes_error_rule() {
    let service = service();
    service.ingest(RELEASE_2_1_0, "2.1.0");

    let rule = service.store().dynamic_rule("auto-hbrequest-logger-2.1.0").unwrap();
    assert_eq!(rule.severity, RuleSeverity::Error);
    assert_eq!(rule.fix_suggestion, None);
    assert!(regex_for(&rule.pattern).is_match("request.logger.info(\"hi\")"));
}

#[test]
fn approved_rule_produces_single_finding() {
    let service = service();
    service.ingest(RELEASE_2_1_0, "2.1.0");

    assert!(service.check("let app = HBApplication()").is_empty());

    service
        .review("auto-hbapplication-2.1.0", ReviewDecision::Approved)
        .unwrap();

    let result = service.check("let app = HBApplication()");
    assert_eq!(result.findings.len(), 1);
    assert_eq!(result.findings[0].rule_id, "auto-hbapplication-2.1.0");
    assert_eq!(result.findings[0].matched_text, "HBApplication");
    assert_eq!(result.findings[0].line_number, 1);
    assert!(!result.blocking);
}

#[test]
fn second_review_is_refused() {
    let service = service();
    service.ingest(RELEASE_2_1_0, "2.1.0");

    service
        .review("auto-hbapplication-2.1.0", ReviewDecision::Approved)
        .unwrap();
    let err = service
        .review("auto-hbapplication-2.1.0", ReviewDecision::Rejected)
        .unwrap_err();

    assert!(matches!(err, StoreError::InvalidTransition { .. }));
    assert_eq!(
        service.store().dynamic_rule("auto-hbapplication-2.1.0").unwrap().review_status,
        ReviewStatus::Approved
    );
}

#[test]
fn release_without_deprecations_adds_nothing() {
    let service = builtin_service();
    let before = service.store().all_approved_rules();

    let outcome = service.ingest("- Faster routing\n- Fixed a typo in the docs\n", "2.2.0");
    let IngestOutcome::Completed(report) = outcome else {
        panic!("cycle should have run");
    };

    assert_eq!(report.accepted(), 0);
    assert_eq!(report.rejected(), 0);
    assert_eq!(report.records_parsed, 0);
    assert!(service.store().dynamic_rules().is_empty());
    assert_eq!(service.store().all_approved_rules(), before);
}

#[test]
fn reingesting_a_release_changes_nothing() {
    let service = service();
    service.ingest(RELEASE_2_1_0, "2.1.0");
    let first = service.store().dynamic_rules();

    let report = service.ingest(RELEASE_2_1_0, "2.1.0").report().cloned().unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.unchanged, 2);
    assert_eq!(service.store().dynamic_rules(), first);
}

#[test]
fn static_rules_come_first_and_resolve_corrections() {
    let service = builtin_service();
    service.ingest(RELEASE_2_1_0, "2.1.0");
    service
        .review("auto-hbapplication-2.1.0", ReviewDecision::Approved)
        .unwrap();

    let text = "let app = HBApplication()\nlet value = future.wait()\n";
    let result = service.check(text);

    let ids: Vec<&str> = result.findings.iter().map(|f| f.rule_id.as_str()).collect();
    assert_eq!(ids, vec!["hb-eventloopfuture-wait", "auto-hbapplication-2.1.0"]);
    assert_eq!(result.findings[0].line_number, 2);
    assert!(matches!(result.findings[0].correction, Some(Correction::Resolved { .. })));
    assert!(result.blocking);
}

#[test]
fn check_is_deterministic() {
    let service = builtin_service();
    service.ingest(RELEASE_2_1_0, "2.1.0");
    service
        .review("auto-hbapplication-2.1.0", ReviewDecision::Approved)
        .unwrap();
    service
        .review("auto-hbrequest-logger-2.1.0", ReviewDecision::Approved)
        .unwrap();

    let text = "let app = HBApplication()\nrequest.logger.info(\"x\")\ntry! run()\n";
    assert_eq!(service.check(text), service.check(text));
}

#[test]
fn rejected_rules_never_match() {
    let service = service();
    service.ingest(RELEASE_2_1_0, "2.1.0");
    service
        .review("auto-hbapplication-2.1.0", ReviewDecision::Rejected)
        .unwrap();

    assert!(service.check("let app = HBApplication()").is_empty());
}

#[test]
fn state_survives_persist_and_restore() {
    let backend = MemoryBackend::new();
    let bytes = {
        let service = builtin_service().with_backend(Box::new(MemoryBackend::new()));
        service.ingest(RELEASE_2_1_0, "2.1.0");
        service
            .review("auto-hbapplication-2.1.0", ReviewDecision::Approved)
            .unwrap();
        service.store().persist(&backend).unwrap();
        backend.contents().unwrap()
    };

    let reloaded = MemoryBackend::new();
    reloaded.set_contents(bytes);
    let service = service().with_backend(Box::new(reloaded));
    assert!(service.restore().unwrap());

    let result = service.check("let app = HBApplication()");
    assert_eq!(result.findings.len(), 1);
    assert_eq!(
        service.store().dynamic_rule("auto-hbrequest-logger-2.1.0").unwrap().review_status,
        ReviewStatus::Draft
    );
}

fn regex_for(pattern: &str) -> regex::Regex {
    regex::Regex::new(pattern).unwrap()
}
