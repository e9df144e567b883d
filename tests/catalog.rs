use st_qa_engine::ast::VarScope;
use st_qa_engine::qa::catalog::{self, SaCategory, SaTarget, TableRule};
use st_qa_engine::qa::{ChangeType, LogicChange, QaRuleChecker, QaRuleEngine, Severity, VariableChange};

fn table_rule(id: &str) -> TableRule {
    let compiled = catalog::compiled_rules()
        .iter()
        .find(|r| r.spec.id == id)
        .unwrap_or_else(|| panic!("{id} missing from catalogue"));
    TableRule::new(compiled)
}

#[test]
fn lookup_finds_rows_by_id() {
    let spec = catalog::lookup("SA0001").expect("SA0001 exists");
    assert_eq!(spec.category, SaCategory::UnreachableUnusedCode);
    assert_eq!(spec.target, SaTarget::Logic);
    assert!(catalog::lookup("SA9999").is_none());
}

#[test]
fn constant_false_condition_is_reported_on_its_line() {
    let change = LogicChange::added("MAIN", "main.st", 30, "x := 1;\nIF FALSE THEN\n    x := 2;\nEND_IF");
    let issues = table_rule("SA0001").check_logic_change(&change);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].line, 31);
    assert_eq!(issues[0].rule_id, "SA0001");
    assert_eq!(issues[0].category, "Unreachable/Unused Code");
}

#[test]
fn literal_zero_divisor_is_critical() {
    let change = LogicChange::added("MAIN", "main.st", 1, "ratio := total / 0;\nok := total / divisor;");
    let issues = table_rule("SA0040").check_logic_change(&change);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Critical);
    assert_eq!(issues[0].line, 1);
}

#[test]
fn one_issue_per_line_per_row() {
    let change = LogicChange::added("MAIN", "main.st", 1, "a := b = TRUE OR c = FALSE;");
    let issues = table_rule("SA0046").check_logic_change(&change);
    assert_eq!(issues.len(), 1);
}

#[test]
fn variable_rows_render_the_declaration() {
    let change = VariableChange::new(ChangeType::Added, "counter", VarScope::Local, "main.st", 12).with_types(None, Some("INT"));
    let issues = table_rule("SA0065").check_variable_change(&change);
    assert_eq!(issues.len(), 1, "bare declaration has no initial value");

    let initialised = change.clone().with_initial_values(None, Some("0"));
    assert!(table_rule("SA0065").check_variable_change(&initialised).is_empty());

    // logic rows ignore variable changes
    assert!(table_rule("SA0001").check_variable_change(&change).is_empty());
}

#[test]
fn rows_off_by_default_are_not_in_the_engine() {
    let spec = catalog::lookup("SA0065").expect("row exists");
    assert!(!spec.enabled_by_default);
    let engine = QaRuleEngine::new();
    assert!(engine.rules().all(|r| r.rule_id() != "SA0065"));
    assert!(engine.rules().any(|r| r.rule_id() == "SA0001"));
}

#[test]
fn case_without_else_is_reported_once() {
    let code = "CASE nMode OF\n    1: x := 1;\n    2: x := 2;\nEND_CASE\nCASE nMode OF\n    1: x := 1;\nELSE\n    x := 0;\nEND_CASE";
    let issues = table_rule("SA0072").check_logic_change(&LogicChange::added("MAIN", "main.st", 1, code));
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].line, 1);
    assert_eq!(issues[0].severity, Severity::Warning);
}

#[test]
fn elsif_chain_needs_an_else() {
    let open = "IF a THEN\n    x := 1;\nELSIF b THEN\n    x := 2;\nEND_IF";
    let closed = "IF a THEN\n    x := 1;\nELSIF b THEN\n    x := 2;\nELSE\n    x := 0;\nEND_IF";
    let rule = table_rule("SA0071");
    assert_eq!(rule.check_logic_change(&LogicChange::added("MAIN", "main.st", 10, open)).len(), 1);
    assert!(rule.check_logic_change(&LogicChange::added("MAIN", "main.st", 10, closed)).is_empty());
}

#[test]
fn naming_rows_accept_the_conventional_prefix() {
    let rule = table_rule("SA0074");
    let flagged = rule.check_logic_change(&LogicChange::added("Motor", "motor.st", 1, "FUNCTION_BLOCK Motor\nVAR\nEND_VAR"));
    assert_eq!(flagged.len(), 1);
    let fine = LogicChange::added("FB_Motor", "motor.st", 1, "FUNCTION_BLOCK FB_Motor\nVAR\nEND_VAR");
    assert!(rule.check_logic_change(&fine).is_empty());
}

#[test]
fn unparenthesised_mask_comparison_is_reported() {
    let code = "IF nStatus AND 16#01 = 0 THEN\n    x := 1;\nEND_IF\nIF (nStatus AND 16#02) <> 0 THEN\n    x := 2;\nEND_IF";
    let issues = table_rule("SA0117").check_logic_change(&LogicChange::added("MAIN", "main.st", 1, code));
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].line, 1);
}

#[test]
fn subrange_variables_are_reported() {
    let change = VariableChange::new(ChangeType::Added, "percent", VarScope::Local, "main.st", 4)
        .with_types(None, Some("INT(0..100)"));
    assert_eq!(table_rule("SA0008").check_variable_change(&change).len(), 1);
    let plain = change.clone().with_types(None, Some("INT"));
    assert!(table_rule("SA0008").check_variable_change(&plain).is_empty());
}

#[test]
fn full_catalogue_is_reachable_through_all_rules() {
    let all = catalog::all_rules();
    assert_eq!(all.len(), catalog::SA_RULES.len());
    assert_eq!(all.len(), 179);
    let enabled = QaRuleEngine::new().rules().filter(|r| r.rule_id().starts_with("SA")).count();
    assert!(enabled < all.len() && enabled > 44, "enabled catalogue rows: {enabled}");
}
