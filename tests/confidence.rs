use proptest::prelude::*;

use st_qa_engine::analysis::confidence::{
    count_similar, rule_kind_for, AstAnalysisSignals, ConfidenceCalculator, ConfidenceLevel, SimilarityKey,
};
use st_qa_engine::qa::{QAIssue, Severity};

fn warning(rule: &str) -> QAIssue {
    QAIssue::new(rule, Severity::Warning, "Architecture", "finding").at("gvl.st", 3)
}

#[test]
fn ast_confirmed_global_scores_medium() {
    let issue = warning("QA021");
    let signals = AstAnalysisSignals::new().ast_confirmed().global_variable();
    let result = ConfidenceCalculator::new().calculate(Some(&signals), Some(&issue));
    assert_eq!(result.score, 75);
    assert_eq!(result.level, ConfidenceLevel::Medium);
    assert_eq!(
        result.breakdown,
        vec![("AST confirmed".to_string(), 30), ("Global variable".to_string(), -5)]
    );
    assert!(result.detailed_report().contains("Global variable: -5"));
}

#[test]
fn similar_bonus_starts_at_three() {
    let calc = ConfidenceCalculator::new();
    assert_eq!(calc.calculate_simple(false, false, 2).score, 50);
    assert_eq!(calc.calculate_simple(false, false, 3).score, 60);
    assert_eq!(calc.calculate_simple(false, false, 3).level, ConfidenceLevel::Medium);
}

#[test]
fn clamped_result_reports_the_raw_total() {
    let issue = QAIssue::new("QA001", Severity::Critical, "Type Safety", "narrowing");
    let s = AstAnalysisSignals::new().ast_confirmed().dataflow_confirmed().similar(5);
    let result = ConfidenceCalculator::new().calculate(Some(&s), Some(&issue));
    assert_eq!(result.score, 100);
    assert!(result.detailed_report().contains("clamped from 115"));
}

#[test]
fn aggregate_keeps_the_best_bag() {
    let calc = ConfidenceCalculator::new();
    let bags = vec![
        AstAnalysisSignals::new().ambiguous(),
        AstAnalysisSignals::new().ast_confirmed(),
        AstAnalysisSignals::new().dataflow_confirmed(),
    ];
    let result = calc.calculate_aggregate(&bags, None);
    assert_eq!(result.score, 80);
    assert!(result.reasons.iter().any(|r| r == "3 analyses, best selected"));

    let empty = calc.calculate_aggregate(&[], None);
    assert_eq!((empty.score, empty.level), (50, ConfidenceLevel::Low));
}

#[test]
fn statistics_summarise_levels() {
    let calc = ConfidenceCalculator::new();
    let results = vec![
        calc.calculate_simple(true, true, 0),
        calc.calculate_simple(true, false, 0),
        calc.calculate(None, None),
    ];
    let stats = calc.statistics(&results);
    assert_eq!(stats.total, 3);
    assert_eq!((stats.high, stats.medium, stats.low), (1, 1, 1));
    assert_eq!(stats.min_score, 50);
    assert_eq!(stats.max_score, 100);
    assert_eq!(stats.average_score, 76);
    assert!((stats.medium_or_high_percentage - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(calc.statistics(&[]).total, 0);
}

#[test]
fn presets_follow_rule_family() {
    let calc = ConfidenceCalculator::new();
    let issue = warning("QA006");
    let kind = rule_kind_for(&issue.rule_id);
    assert_eq!(kind, "UNUSED_VARIABLE");
    let signals = calc.default_signals_for(kind, &issue);
    assert!(signals.confirmed_by_ast && signals.confirmed_by_dataflow);
    assert!(signals.context.iter().any(|(k, v)| k == "RuleId" && v == "QA006"));
    assert!(calc.default_signals_for(rule_kind_for("QA999"), &issue).ambiguous_context);
}

#[test]
fn similarity_counts_by_key() {
    let mut other_category = warning("QA021");
    other_category.category = "Naming".into();
    let issues = vec![warning("QA021"), warning("QA021"), other_category, warning("QA006")];
    assert_eq!(count_similar(&issues, SimilarityKey::RuleAndCategory), vec![2, 2, 1, 1]);
    assert_eq!(count_similar(&issues, SimilarityKey::RuleId), vec![3, 3, 3, 1]);
}

fn signal_bags() -> impl Strategy<Value = AstAnalysisSignals> {
    (any::<[bool; 6]>(), 0u32..8).prop_map(|(flags, similar)| AstAnalysisSignals {
        confirmed_by_ast: flags[0],
        confirmed_by_dataflow: flags[1],
        ambiguous_context: flags[2],
        possible_external_reference: flags[3],
        is_io_variable: flags[4],
        is_global_variable: flags[5],
        similar_occurrences: similar,
        ..Default::default()
    })
}

proptest! {
    #[test]
    fn breakdown_always_reproduces_the_score(signals in signal_bags(), critical in any::<bool>()) {
        let severity = if critical { Severity::Critical } else { Severity::Info };
        let issue = QAIssue::new("QA001", severity, "Type Safety", "t");
        let result = ConfidenceCalculator::new().calculate(Some(&signals), Some(&issue));
        prop_assert!(result.score <= 100);
        prop_assert!(result.validate_breakdown(), "breakdown {:?} vs score {}", result.breakdown, result.score);
        prop_assert_eq!(result.level, ConfidenceLevel::from_score(result.score));
    }

    #[test]
    fn more_confirmation_never_lowers_the_score(signals in signal_bags()) {
        let calc = ConfidenceCalculator::new();
        let base = calc.calculate(Some(&signals), None).score;
        let confirmed = calc.calculate(Some(&signals.clone().ast_confirmed()), None).score;
        prop_assert!(confirmed >= base);
    }
}
