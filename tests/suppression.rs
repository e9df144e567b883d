use st_qa_engine::qa::{QAIssue, Severity, SuppressionChecker, SuppressionSource};

const SOURCE: &str = "\
(* qa-ignore-file: QA020 *)
PROGRAM MAIN
VAR
    x : INT;
END_VAR
x := 42; // qa-ignore: QA007
// qa-ignore: QA005
IF rSpeed = 1.5 THEN
    x := 1;
END_IF
(* qa-ignore-start: QA001, QA002 *)
x := DINT_TO_INT(big);
(* qa-ignore-end *)
x := DINT_TO_INT(big);
// qa-ignore-start
y := 7;
";

#[test]
fn inline_marker_covers_its_line_and_the_next() {
    let checker = SuppressionChecker::new(SOURCE);
    let s = checker.check("QA007", 6).expect("same-line marker");
    assert_eq!(s.source, SuppressionSource::Inline);
    assert_eq!(checker.check("QA005", 8).map(|s| s.source), Some(SuppressionSource::Inline));
    assert!(checker.check("QA007", 9).is_none(), "two lines below is out of reach");
    assert!(checker.check("QA001", 6).is_none(), "other rules are not covered");
}

#[test]
fn block_markers_cover_the_region_only() {
    let checker = SuppressionChecker::new(SOURCE);
    let s = checker.check("qa001", 12).expect("inside the block");
    assert_eq!(s.source, SuppressionSource::Block);
    assert!(s.reason.contains("lines 11-13"), "{}", s.reason);
    assert!(checker.check("QA001", 14).is_none());
}

#[test]
fn unterminated_block_runs_to_end_of_file() {
    let checker = SuppressionChecker::new(SOURCE);
    let s = checker.check("QA999", 16).expect("bare marker means all rules");
    assert_eq!(s.source, SuppressionSource::Block);
}

#[test]
fn file_marker_applies_everywhere() {
    let checker = SuppressionChecker::new(SOURCE);
    let issue = QAIssue::new("QA020", Severity::Info, "Style", "mixed indentation").at("main.st", 9);
    assert_eq!(checker.check_issue(&issue).map(|s| s.source), Some(SuppressionSource::File));
}

#[test]
fn file_marker_past_the_header_window_is_ignored() {
    let mut source = "x := 1;\n".repeat(12);
    source.push_str("(* qa-ignore-file: QA020 *)\n");
    let checker = SuppressionChecker::new(&source);
    assert!(checker.check("QA020", 2).is_none());
}

#[test]
fn configuration_takes_precedence_over_markers() {
    let checker = SuppressionChecker::new(SOURCE).with_disabled_rules(["qa007"]);
    let s = checker.check("QA007", 6).expect("disabled rule");
    assert_eq!(s.source, SuppressionSource::Config);
    assert_eq!(s.reason, "QA007 disabled in configuration");
}
