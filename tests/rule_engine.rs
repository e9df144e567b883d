use std::sync::Arc;

use st_qa_engine::ast::VarScope;
use st_qa_engine::metrics::MetricsCollector;
use st_qa_engine::CancellationToken;
use st_qa_engine::qa::{
    deduplicate, ChangeKind, ChangeSet, ChangeType, FailurePolicy, LogicChange, QAIssue, QaError, QaRuleChecker,
    QaRuleEngine, Severity, VariableChange,
};

struct PanickyRule;

impl QaRuleChecker for PanickyRule {
    fn rule_id(&self) -> &str {
        "TEST_PANIC"
    }
    fn rule_name(&self) -> &str {
        "panics on logic"
    }
    fn description(&self) -> &str {
        "always panics for logic changes"
    }
    fn severity(&self) -> Severity {
        Severity::Info
    }
    fn check_logic_change(&self, _change: &LogicChange) -> Vec<QAIssue> {
        panic!("boom in checker")
    }
}

struct EveryVariableRule(&'static str);

impl QaRuleChecker for EveryVariableRule {
    fn rule_id(&self) -> &str {
        self.0
    }
    fn rule_name(&self) -> &str {
        "every variable"
    }
    fn description(&self) -> &str {
        "reports each variable change"
    }
    fn severity(&self) -> Severity {
        Severity::Info
    }
    fn check_variable_change(&self, change: &VariableChange) -> Vec<QAIssue> {
        vec![QAIssue::new(self.0, Severity::Info, "Test", "seen").at(&change.file_path, change.line)]
    }
}

/// Cancels the shared token the first time it sees a variable change.
struct CancelOnFirstVariable(CancellationToken);

impl QaRuleChecker for CancelOnFirstVariable {
    fn rule_id(&self) -> &str {
        "TEST_CANCEL"
    }
    fn rule_name(&self) -> &str {
        "cancels the run"
    }
    fn description(&self) -> &str {
        "requests cancellation while checking"
    }
    fn severity(&self) -> Severity {
        Severity::Info
    }
    fn check_variable_change(&self, _change: &VariableChange) -> Vec<QAIssue> {
        self.0.cancel();
        Vec::new()
    }
}

fn sample_changes() -> ChangeSet {
    ChangeSet {
        variable_changes: vec![
            VariableChange::new(ChangeType::Modified, "counter", VarScope::Local, "main.st", 4)
                .with_types(Some("DINT"), Some("INT")),
            VariableChange::new(ChangeType::Added, "pData", VarScope::Local, "main.st", 6)
                .with_types(None, Some("POINTER TO INT")),
        ],
        logic_changes: vec![LogicChange::added(
            "MAIN",
            "main.st",
            10,
            "IF rSpeed = 1.5 THEN\n    values[idx + 1] := 42;\nEND_IF",
        )],
        data_type_changes: Vec::new(),
    }
}

#[test]
fn empty_engine_returns_empty_report() {
    let engine = QaRuleEngine::empty();
    let report = engine.analyze(&sample_changes()).expect("no checkers cannot fail");
    assert!(report.issues.is_empty());
    assert!(report.failures.is_empty());
    assert_eq!(report.rules_run, 0);
}

#[test]
fn default_engine_flags_narrowing_pointer_float_and_bounds() {
    let engine = QaRuleEngine::new();
    let report = engine.analyze(&sample_changes()).expect("run");
    let ids: Vec<&str> = report.issues.iter().map(|i| i.rule_id.as_str()).collect();
    for expected in ["QA001", "QA002", "QA003", "QA005", "QA007"] {
        assert!(ids.contains(&expected), "expected {expected} in {ids:?}");
    }
    // Critical issues sort first
    assert_eq!(report.issues[0].severity, Severity::Critical);
    let bounds = report.issues.iter().find(|i| i.rule_id == "QA003").expect("QA003");
    assert_eq!(bounds.line, 11, "line is derived from the match offset");
    assert_eq!(bounds.location, "main.st:11");
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let engine = QaRuleEngine::new();
    let changes = sample_changes();
    let seq = engine.analyze(&changes).expect("sequential");
    let par = engine.analyze_parallel(&changes).expect("parallel");
    assert_eq!(seq.issues, par.issues);
    assert_eq!(seq.rules_run, par.rules_run);
}

#[test]
fn duplicate_rule_ids_are_accepted_and_deduplicated_later() {
    let mut engine = QaRuleEngine::empty();
    engine.register(Box::new(EveryVariableRule("DUP")));
    engine.register(Box::new(EveryVariableRule("DUP")));
    assert_eq!(engine.rule_count(), 2);
    let report = engine.analyze(&sample_changes()).expect("run");
    assert_eq!(report.issues.len(), 4);
    assert_eq!(deduplicate(report.issues).len(), 2);
}

#[test]
fn panicking_checker_is_skipped_and_recorded() {
    let mut engine = QaRuleEngine::empty();
    engine.register(Box::new(PanickyRule));
    engine.register(Box::new(EveryVariableRule("OK")));
    let report = engine.analyze(&sample_changes()).expect("skip policy keeps going");
    assert_eq!(report.issues.len(), 2, "other checkers still contribute");
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.rule_id, "TEST_PANIC");
    assert_eq!(failure.kind, ChangeKind::Logic);
    assert!(failure.message.contains("boom in checker"));
    let err: QaError = failure.into();
    assert!(err.to_string().contains("TEST_PANIC"));
}

#[test]
fn abort_policy_stops_the_run() {
    let mut engine = QaRuleEngine::empty();
    engine.register(Box::new(PanickyRule));
    engine.set_failure_policy(FailurePolicy::Abort);
    match engine.analyze(&sample_changes()) {
        Err(QaError::RunAborted { rule_id, message }) => {
            assert_eq!(rule_id, "TEST_PANIC");
            assert!(message.contains("boom"));
        }
        other => panic!("expected RunAborted, got {other:?}"),
    }
}

#[test]
fn disabled_rules_do_not_run() {
    let mut engine = QaRuleEngine::new();
    engine.disable_rule("QA001");
    let report = engine.analyze(&sample_changes()).expect("run");
    assert!(report.issues.iter().all(|i| i.rule_id != "QA001"));
    engine.enable_rule("QA001");
    assert!(engine.is_enabled("QA001"));
}

#[test]
fn metrics_observe_rule_runs() {
    let metrics = Arc::new(MetricsCollector::new());
    let mut engine = QaRuleEngine::empty();
    engine.register(Box::new(PanickyRule));
    engine.register(Box::new(EveryVariableRule("OK")));
    engine.attach_metrics(Arc::clone(&metrics));
    engine.analyze(&sample_changes()).expect("run");
    let snap = metrics.snapshot();
    assert_eq!(snap.rule_runs, 1);
    assert_eq!(snap.rules_executed, 2);
    assert_eq!(snap.checker_failures, 1);
    assert_eq!(metrics.issues_with_severity(Severity::Info), 2);
}

#[test]
fn cancelled_token_runs_no_rules() {
    let token = CancellationToken::new();
    token.cancel();
    let report = QaRuleEngine::new().analyze_cancellable(&sample_changes(), &token).expect("cancellation is not an error");
    assert!(report.cancelled);
    assert_eq!(report.rules_run, 0);
    assert!(report.issues.is_empty());
    assert_eq!(report.changes_examined, 3);
}

#[test]
fn cancellation_between_rules_keeps_finished_findings() {
    let token = CancellationToken::new();
    let mut engine = QaRuleEngine::empty();
    engine.register(Box::new(EveryVariableRule("FIRST")));
    engine.register(Box::new(CancelOnFirstVariable(token.clone())));
    engine.register(Box::new(EveryVariableRule("LATER")));

    let report = engine.analyze_cancellable(&sample_changes(), &token).expect("run");
    assert!(report.cancelled);
    assert_eq!(report.rules_run, 2);
    assert_eq!(report.issues.len(), 2);
    assert!(report.issues.iter().all(|i| i.rule_id == "FIRST"));

    let full = engine.analyze_cancellable(&sample_changes(), &CancellationToken::new()).expect("run");
    assert!(!full.cancelled);
    assert_eq!(full.rules_run, 3);
    assert_eq!(full.issues.len(), 4);
}
