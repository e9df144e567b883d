use std::collections::HashMap;

use st_qa_engine::analysis::confidence::AstAnalysisSignals;
use st_qa_engine::ast::VarScope;
use st_qa_engine::qa::enhance::exclude_suppressed;
use st_qa_engine::qa::{ChangeSet, ChangeType, VariableChange};
use st_qa_engine::{ConfidenceCalculator, ConfidenceLevel, QaEnhancer, QaRuleEngine, Severity};

fn removed_global() -> ChangeSet {
    ChangeSet {
        variable_changes: vec![VariableChange::new(ChangeType::Removed, "gFlag", VarScope::Global, "gvl.st", 3)
            .with_types(Some("BOOL"), None)],
        ..ChangeSet::default()
    }
}

#[test]
fn removed_global_flows_from_rule_to_confidence() {
    let report = QaRuleEngine::new().analyze(&removed_global()).expect("run completes");
    assert!(report.failures.is_empty());
    let issue = report
        .issues
        .iter()
        .find(|i| i.rule_id == "QA021")
        .expect("removed global is reported");
    assert_eq!(issue.severity, Severity::Warning);
    assert_eq!(issue.location, "gvl.st:3");
    assert!(issue.description.contains("gFlag"));

    let signals = AstAnalysisSignals::new().ast_confirmed().global_variable();
    let result = ConfidenceCalculator::new().calculate(Some(&signals), Some(issue));
    assert_eq!(result.score, 75);
    assert_eq!(result.level, ConfidenceLevel::Medium);
    assert!(result.validate_breakdown());
}

#[test]
fn removed_global_is_kept_unless_suppressed() {
    let report = QaRuleEngine::new().analyze(&removed_global()).expect("run completes");
    let qa021: Vec<_> = report.issues.iter().filter(|i| i.rule_id == "QA021").cloned().collect();

    let plain = QaEnhancer::new().enhance(&qa021, &HashMap::new());
    assert_eq!(exclude_suppressed(plain).len(), 1);

    let source = "VAR_GLOBAL\n    gSpeed : INT;\n    // qa-ignore: QA021\nEND_VAR\n";
    let sources = HashMap::from([("gvl.st".to_string(), source.to_string())]);
    let marked = QaEnhancer::new().enhance(&qa021, &sources);
    assert!(exclude_suppressed(marked).is_empty());
}
