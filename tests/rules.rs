use st_qa_engine::ast::{DataTypeKind, VarScope};
use st_qa_engine::qa::rules::{
    ArrayBoundsRule, FloatingPointComparisonRule, GlobalVariableOveruseRule, HardcodedIoAddressRule,
    InfiniteLoopRiskRule, MagicNumberRule, NullCheckRule, TypeNarrowingRule, UninitializedVariableRule,
    UnusedGlobalRule, UnusedVariableRule,
};
use st_qa_engine::qa::{
    ChangeSet, ChangeType, DataTypeChange, FieldChange, LogicChange, QaRuleChecker, Severity, VariableChange,
};

fn local(change_type: ChangeType, name: &str, line: usize) -> VariableChange {
    VariableChange::new(change_type, name, VarScope::Local, "plant.st", line)
}

fn logic(code: &str) -> LogicChange {
    LogicChange::added("FB_Plant", "plant.st", 20, code)
}

#[test]
fn qa001_flags_narrowing_only() {
    let narrowed = local(ChangeType::Modified, "counter", 5).with_types(Some("DINT"), Some("INT"));
    let issues = TypeNarrowingRule.check_variable_change(&narrowed);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Critical);
    assert_eq!(issues[0].category, "Type Safety");
    assert!(issues[0].description.contains("32 bit"), "{}", issues[0].description);

    let widened = local(ChangeType::Modified, "counter", 5).with_types(Some("INT"), Some("DINT"));
    assert!(TypeNarrowingRule.check_variable_change(&widened).is_empty());

    let added = local(ChangeType::Added, "counter", 5).with_types(None, Some("SINT"));
    assert!(TypeNarrowingRule.check_variable_change(&added).is_empty(), "only modifications narrow");
}

#[test]
fn qa002_requires_initialiser_for_scalar_and_pointer_types() {
    let bare = local(ChangeType::Added, "bReady", 7).with_types(None, Some("BOOL"));
    assert_eq!(UninitializedVariableRule.check_variable_change(&bare).len(), 1);

    let pointer = local(ChangeType::Added, "pData", 8).with_types(None, Some("POINTER TO INT"));
    assert_eq!(UninitializedVariableRule.check_variable_change(&pointer).len(), 1);

    let initialised = local(ChangeType::Added, "bReady", 7)
        .with_types(None, Some("BOOL"))
        .with_initial_values(None, Some("FALSE"));
    assert!(UninitializedVariableRule.check_variable_change(&initialised).is_empty());

    let timer = local(ChangeType::Added, "tonDelay", 9).with_types(None, Some("TON"));
    assert!(UninitializedVariableRule.check_variable_change(&timer).is_empty(), "FB instances initialise themselves");
}

#[test]
fn qa003_skips_literal_and_checked_indices() {
    let unchecked = ArrayBoundsRule.check_logic_change(&logic("value := buffer[idx];"));
    assert_eq!(unchecked.len(), 1);
    assert_eq!(unchecked[0].line, 20);

    let literal = ArrayBoundsRule.check_logic_change(&logic("value := buffer[3];"));
    assert!(literal.is_empty());

    let checked = ArrayBoundsRule
        .check_logic_change(&logic("IF idx >= 0 AND idx <= 9 THEN\n    value := buffer[idx];\nEND_IF"));
    assert!(checked.is_empty(), "range-checked index must not be reported: {checked:?}");

    let computed = ArrayBoundsRule
        .check_logic_change(&logic("IF idx >= 0 AND idx <= 9 THEN\n    value := buffer[idx + 1];\nEND_IF"));
    assert_eq!(computed.len(), 1, "a computed index escapes the range check");
    assert_eq!(computed[0].line, 21);
}

#[test]
fn qa004_wants_a_null_test_before_dereference() {
    let unchecked = NullCheckRule.check_logic_change(&logic("value := pData^;\nother := pData^;"));
    assert_eq!(unchecked.len(), 1, "one report per pointer");

    let checked = NullCheckRule.check_logic_change(&logic("IF pData <> 0 THEN\n    value := pData^;\nEND_IF"));
    assert!(checked.is_empty());

    let mut udt = DataTypeChange::new(ChangeType::Modified, "ST_Recipe", DataTypeKind::Struct, "types.st", 3);
    udt.field_changes.push(FieldChange {
        change_type: ChangeType::Modified,
        field_name: "data".into(),
        old_data_type: Some("INT".into()),
        new_data_type: Some("REFERENCE TO INT".into()),
    });
    let field = NullCheckRule.check_data_type_change(&udt);
    assert_eq!(field.len(), 1);
    assert_eq!(field[0].severity, Severity::Warning);
}

#[test]
fn qa005_flags_exact_float_tests_in_conditions() {
    let exact = FloatingPointComparisonRule.check_logic_change(&logic("IF rSetpoint = 1.5 THEN\n    bDone := TRUE;\nEND_IF"));
    assert_eq!(exact.len(), 1);
    assert_eq!(exact[0].category, "Floating Point");

    let tolerant = FloatingPointComparisonRule
        .check_logic_change(&logic("IF ABS(rSetpoint - rActual) < 0.001 THEN\n    bDone := TRUE;\nEND_IF"));
    assert!(tolerant.is_empty());

    let assignment = FloatingPointComparisonRule.check_logic_change(&logic("rSetpoint := 1.5;"));
    assert!(assignment.is_empty(), "no condition, no comparison");

    let integers = FloatingPointComparisonRule.check_logic_change(&logic("IF nState = 3 THEN\n    nState := 4;\nEND_IF"));
    assert!(integers.is_empty());
}

#[test]
fn qa006_matches_placeholder_names() {
    for name in ["temp1", "tmp", "dummy", "var3", "x", "foo"] {
        let change = local(ChangeType::Added, name, 4);
        assert_eq!(UnusedVariableRule.check_variable_change(&change).len(), 1, "{name} should be flagged");
    }
    for name in ["motorSpeed", "temperature", "xAxis"] {
        let change = local(ChangeType::Added, name, 4);
        assert!(UnusedVariableRule.check_variable_change(&change).is_empty(), "{name} should pass");
    }
}

#[test]
fn qa007_ignores_allowed_and_typed_literals() {
    let init = local(ChangeType::Added, "limit", 3).with_initial_values(None, Some("42"));
    assert_eq!(MagicNumberRule.check_variable_change(&init).len(), 1);

    let allowed = local(ChangeType::Added, "limit", 3).with_initial_values(None, Some("100"));
    assert!(MagicNumberRule.check_variable_change(&allowed).is_empty());

    let typed = MagicNumberRule.check_logic_change(&logic("tonDelay(IN := TRUE, PT := T#5S);\nmask := 16#FF;"));
    assert!(typed.is_empty(), "typed literals carry their own meaning: {typed:?}");

    let magic = MagicNumberRule.check_logic_change(&logic("rOut := rIn * 3.75 + 42; // 7 in a comment"));
    assert_eq!(magic.len(), 1);
    assert!(magic[0].description.contains("3.75"));
    assert!(magic[0].description.contains("42"));
    assert!(!magic[0].description.contains(", 7"), "comments are stripped");
}

#[test]
fn qa013_counts_globals_per_file() {
    let rule = GlobalVariableOveruseRule::new(10, 20);
    let globals = |file: &str, n: usize| -> Vec<VariableChange> {
        (0..n)
            .map(|i| VariableChange::new(ChangeType::Added, &format!("gValue{i}"), VarScope::Global, file, i + 1))
            .collect()
    };

    let spread = ChangeSet { variable_changes: [globals("a.st", 6), globals("b.st", 6)].concat(), ..Default::default() };
    assert!(rule.check_change_set(&spread).is_empty(), "counts are per file");

    let warn = ChangeSet { variable_changes: globals("a.st", 10), ..Default::default() };
    let issues = rule.check_change_set(&warn);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Warning);
    assert_eq!(issues[0].line, 10);

    let critical = ChangeSet { variable_changes: globals("a.st", 20), ..Default::default() };
    assert_eq!(rule.check_change_set(&critical)[0].severity, Severity::Critical);
}

#[test]
fn qa014_reports_each_direct_address() {
    let issues = HardcodedIoAddressRule
        .check_logic_change(&logic("bStart AT %IX1.0 : BOOL;\nbLamp AT %QX2.3 : BOOL;\nnWord : WORD;"));
    assert_eq!(issues.len(), 2);
    assert_eq!(issues[0].line, 20);
    assert_eq!(issues[1].line, 21);
}

#[test]
fn qa015_needs_an_exit_path() {
    let unbounded = InfiniteLoopRiskRule.check_logic_change(&logic("nPos := 0;\nWHILE bRunning DO\n    nPos := nPos + 1;\nEND_WHILE"));
    assert_eq!(unbounded.len(), 1);
    assert_eq!(unbounded[0].line, 21);

    let with_exit = InfiniteLoopRiskRule.check_logic_change(&logic(
        "WHILE bRunning DO\n    nPos := nPos + 1;\n    IF nPos > MAX_STEPS THEN\n        EXIT;\n    END_IF\nEND_WHILE",
    ));
    assert!(with_exit.is_empty());

    let repeat = InfiniteLoopRiskRule.check_logic_change(&logic("REPEAT\n    nPos := nPos + 1;\nUNTIL bDone\nEND_REPEAT"));
    assert_eq!(repeat.len(), 1);
}

#[test]
fn qa021_handles_removed_and_unprefixed_globals() {
    let removed = VariableChange::new(ChangeType::Removed, "gFlag", VarScope::Global, "gvl.st", 4);
    let issues = UnusedGlobalRule.check_variable_change(&removed);
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].severity, Severity::Warning);
    assert_eq!(issues[0].category, "Architecture");

    let unprefixed = VariableChange::new(ChangeType::Added, "flag", VarScope::Global, "gvl.st", 5);
    assert_eq!(UnusedGlobalRule.check_variable_change(&unprefixed)[0].category, "Naming");

    let prefixed = VariableChange::new(ChangeType::Added, "gFlag", VarScope::Global, "gvl.st", 5);
    assert!(UnusedGlobalRule.check_variable_change(&prefixed).is_empty());

    let local_removed = local(ChangeType::Removed, "flag", 6);
    assert!(UnusedGlobalRule.check_variable_change(&local_removed).is_empty());
}
