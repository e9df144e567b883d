use std::collections::{BTreeMap, HashMap};

use st_qa_engine::analysis::confidence::ConfidenceLevel;
use st_qa_engine::ast::{ParsingError, SyntaxTree};
use st_qa_engine::config::Config;
use st_qa_engine::qa::enhance::{apply_severity_overrides, exclude_suppressed, filter_by_confidence};
use st_qa_engine::qa::{
    stable_issue_id, AnalysisLevel, Feedback, FeedbackAction, QAIssue, QaEnhancer, QaError, Severity, SuppressionSource,
};

fn issue(rule: &str, severity: Severity, line: usize) -> QAIssue {
    QAIssue::new(rule, severity, "Maintainability", "finding").at("main.st", line)
}

fn sources(text: &str) -> HashMap<String, String> {
    HashMap::from([("main.st".to_string(), text.to_string())])
}

#[test]
fn unused_variable_findings_score_high() {
    let enhanced = QaEnhancer::new().enhance(&[issue("QA006", Severity::Warning, 4)], &HashMap::new());
    assert_eq!(enhanced.len(), 1);
    let e = &enhanced[0];
    assert_eq!(e.confidence_score, 100);
    assert_eq!(e.confidence, ConfidenceLevel::High);
    assert_eq!(e.analysis_level, AnalysisLevel::Ast);
    assert_eq!(e.issue_id, stable_issue_id(&e.issue));
    assert_eq!(e.issue_id.len(), 12);
    assert!(!e.is_suppressed());
}

#[test]
fn global_findings_lose_a_little_confidence() {
    let mut global = issue("QA021", Severity::Warning, 3);
    global.category = "Architecture".into();
    let enhanced = QaEnhancer::new().enhance(&[global], &HashMap::new());
    // unused-variable preset (+30 +20) and the global penalty (-5)
    assert_eq!(enhanced[0].confidence_score, 95);
}

#[test]
fn parse_errors_make_findings_ambiguous() {
    let error = ParsingError { line: 2, column: 6, message: "expected expression".into(), offending_symbol: Some(";".into()) };
    let broken = SyntaxTree::failed("main.st", "PROGRAM MAIN\nx := ;", vec![error]);
    let issues = [issue("QA007", Severity::Info, 2)];
    let with_tree = QaEnhancer::new().enhance_with_trees(&issues, &HashMap::new(), std::slice::from_ref(&broken));
    let without = QaEnhancer::new().enhance(&issues, &HashMap::new());
    assert_eq!(without[0].confidence_score, 80);
    assert_eq!(with_tree[0].confidence_score, 60);
}

#[test]
fn suppressed_issues_are_marked_and_can_be_excluded() {
    let text = "PROGRAM MAIN\nx := 42; // qa-ignore: QA007\ny := 43;\nEND_PROGRAM";
    let issues = [issue("QA007", Severity::Info, 2), issue("QA007", Severity::Info, 4)];
    let enhanced = QaEnhancer::new().enhance(&issues, &sources(text));

    let first = enhanced[0].suppression.as_ref().expect("inline marker");
    assert_eq!(first.source, SuppressionSource::Inline);
    assert!(enhanced[1].suppression.is_none());
    assert_eq!(enhanced[0].related_issue_ids, vec![enhanced[1].issue_id.clone()]);

    let kept = exclude_suppressed(enhanced);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].issue.line, 4);
}

#[test]
fn disabled_rules_from_config_suppress_everywhere() {
    let cfg = Config { disabled_rules: vec!["QA006".into()], ..Config::default() };
    let mut elsewhere = issue("QA006", Severity::Warning, 9);
    elsewhere.file_path = "other.st".into();
    let enhanced = QaEnhancer::from_config(&cfg).enhance(&[elsewhere], &sources(""));
    assert_eq!(enhanced[0].suppression.as_ref().map(|s| s.source), Some(SuppressionSource::Config));
}

#[test]
fn confidence_filter_drops_low_findings() {
    let issues = [issue("QA006", Severity::Warning, 1), issue("QA999", Severity::Warning, 2)];
    let enhanced = QaEnhancer::new().enhance(&issues, &HashMap::new());
    assert_eq!(enhanced[1].confidence, ConfidenceLevel::Low, "unknown rule family is ambiguous");
    let kept = filter_by_confidence(enhanced, ConfidenceLevel::Medium);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].issue.rule_id, "QA006");
}

#[test]
fn severity_overrides_become_feedback() {
    let mut enhanced = QaEnhancer::new().enhance(&[issue("QA007", Severity::Info, 2)], &HashMap::new());
    let before = enhanced[0].risk_score;
    let overrides = BTreeMap::from([("qa007".to_string(), "critical".to_string())]);
    let applied = apply_severity_overrides(&mut enhanced, &overrides).expect("valid override");
    assert_eq!(applied, 1);
    assert_eq!(enhanced[0].effective_severity(), Severity::Critical);
    assert_eq!(enhanced[0].issue.severity, Severity::Info, "raw issue is untouched");
    assert!(enhanced[0].risk_score > before);
    assert!(!enhanced[0].is_suppressed());

    let bad = BTreeMap::from([("QA007".to_string(), "urgent".to_string())]);
    match apply_severity_overrides(&mut enhanced, &bad) {
        Err(QaError::InvalidSeverityOverride { rule_id, value }) => assert_eq!((rule_id.as_str(), value.as_str()), ("QA007", "urgent")),
        other => panic!("expected InvalidSeverityOverride, got {other:?}"),
    }
}

#[test]
fn rejecting_feedback_suppresses() {
    let mut enhanced = QaEnhancer::new().enhance(&[issue("QA007", Severity::Info, 2)], &HashMap::new());
    let mut feedback = Feedback::new(FeedbackAction::Reject);
    feedback.comment = Some("scaling constant documented in the datasheet".into());
    enhanced[0].apply_feedback(feedback);
    let s = enhanced[0].suppression.as_ref().expect("rejected");
    assert_eq!(s.source, SuppressionSource::Feedback);
    assert!(enhanced[0].summary().contains("suppressed[feedback]"));
}
