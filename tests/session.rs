use st_qa_engine::ast::{AstBuilder, SyntaxTree, VarScope};
use st_qa_engine::qa::{QAIssue, Severity};
use st_qa_engine::{ValidationMode, ValidationSession};

fn main_tree() -> SyntaxTree {
    let b = AstBuilder::new("main.st");
    let main = b.program(
        "MAIN",
        (1, 4),
        vec![b.var_block(VarScope::Local, 2, vec![b.var("x", "INT", 3)])],
        vec![b.assign(4, "x", b.int(1, 4))],
    );
    SyntaxTree::new("main.st", "PROGRAM MAIN\nVAR\n    x : INT;\nEND_VAR\nx := 1;\nEND_PROGRAM\n", vec![main], Vec::new())
        .expect("tree builds")
}

fn finding(rule: &str, severity: Severity, category: &str) -> QAIssue {
    QAIssue::new(rule, severity, category, "finding").at("main.st", 5)
}

#[test]
fn new_session_is_open_and_named_after_the_project() {
    let session = ValidationSession::new("/plc/projects/Bottling", ValidationMode::Incremental);
    assert_eq!(session.project_name, "Bottling");
    assert_eq!(session.id.len(), 16);
    assert!(session.id.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(!session.is_completed());
    assert!(session.duration().num_milliseconds() >= 0);
}

#[test]
fn quality_score_is_zero_without_files() {
    let mut session = ValidationSession::new("/plc/Empty", ValidationMode::Full);
    session.add_violations([finding("QA007", Severity::Info, "Maintainability")]);
    assert_eq!(session.calculate_quality_score(), 0.0);
}

#[test]
fn quality_score_weights_severity_per_file() {
    let mut session = ValidationSession::new("/plc/Plant", ValidationMode::Full);
    session.add_tree(main_tree());
    session.add_violations([
        finding("QA001", Severity::Critical, "Type Safety"),
        finding("QA007", Severity::Info, "Maintainability"),
        finding("QA010", Severity::Warning, "Maintainability"),
    ]);
    // 100 - (10 + 2 + 5) / 1 file
    assert!((session.calculate_quality_score() - 83.0).abs() < 1e-9);
    assert!((session.quality_score - 83.0).abs() < 1e-9);
    assert_eq!(session.total_lines(), 6);
    assert_eq!(session.scanned_files[0].language, "StructuredText");

    let by_severity = session.violations_by_severity();
    assert_eq!(by_severity.get(&Severity::Critical), Some(&1));
    assert_eq!(by_severity.get(&Severity::Warning), Some(&1));

    let compliance = session.constitution_compliance();
    assert_eq!(compliance.get("Type Safety"), Some(&0.0));
    assert_eq!(compliance.get("Maintainability"), Some(&0.0), "clamped at zero");
}

#[test]
fn heavy_penalties_clamp_at_zero() {
    let mut session = ValidationSession::new("/plc/Plant", ValidationMode::Full);
    session.add_tree(main_tree());
    session.add_violations((0..11).map(|_| finding("QA001", Severity::Critical, "Type Safety")));
    assert_eq!(session.calculate_quality_score(), 0.0);
}

#[test]
fn completing_freezes_the_duration() {
    let mut session = ValidationSession::new("/plc/Plant", ValidationMode::Full);
    session.complete();
    assert!(session.is_completed());
    let first = session.duration();
    std::thread::sleep(std::time::Duration::from_millis(5));
    assert_eq!(session.duration(), first);
}
