use st_qa_engine::analysis::dataflow::{analyze_tree, DataFlowOptions, DeadCodeKind};
use st_qa_engine::analysis::VariableUsageAnalyzer;
use st_qa_engine::ast::{AstBuilder, BinaryOp, RootNode, SyntaxTree, VarScope};
use st_qa_engine::CancellationToken;

fn tree(file: &str, roots: Vec<RootNode>) -> SyntaxTree {
    SyntaxTree::new(file, "", roots, Vec::new()).expect("tree builds")
}

fn sequential() -> VariableUsageAnalyzer {
    VariableUsageAnalyzer { parallel: false, ..VariableUsageAnalyzer::new(DataFlowOptions::default()) }
}

#[test]
fn reads_inside_index_expressions_count_as_use() {
    let b = AstBuilder::new("main.st");
    let main = b.program(
        "MAIN",
        (1, 12),
        vec![b.var_block(
            VarScope::Local,
            2,
            vec![
                b.var("result", "INT", 3),
                b.var("idx", "INT", 4),
                b.var("offset", "INT", 5),
                b.array_var("buf", "INT", 0, 9, 6),
                b.var("spare", "INT", 7),
            ],
        )],
        vec![
            b.assign(9, "result", b.index("buf", b.binary(BinaryOp::Add, b.var_ref("idx", 9), b.var_ref("offset", 9)), 9)),
            b.call_stmt(10, "LogValue", vec![b.var_ref("result", 10)]),
        ],
    );
    let analysis = sequential().analyze("proj", &[tree("main.st", vec![main])]);

    let unused: Vec<&str> = analysis.unused.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(unused, vec!["spare"]);
    assert!(analysis.uninitialized.is_empty(), "INT locals have IEC defaults");

    let offset = analysis.usage_of("OFFSET").expect("case-insensitive lookup");
    assert_eq!((offset.reads, offset.writes), (1, 0));
    let result = analysis.usage_of("result").expect("result stats");
    assert_eq!((result.reads, result.writes), (1, 1));
    assert_eq!((result.first_line, result.last_line), (Some(9), Some(10)));
}

#[test]
fn assigned_but_never_read_is_still_unused() {
    let b = AstBuilder::new("main.st");
    let main = b.program(
        "MAIN",
        (1, 6),
        vec![b.var_block(VarScope::Local, 2, vec![b.var("counter", "DINT", 3)])],
        vec![b.assign(5, "counter", b.int(7, 5))],
    );
    let analysis = sequential().analyze("proj", &[tree("main.st", vec![main])]);
    assert_eq!(analysis.unused.len(), 1);
    assert!(analysis.unused[0].assigned);
    let issues = analysis.to_issues();
    assert_eq!(issues[0].rule_id, "VAR001");
    assert_eq!(issues[0].title, "Variable assigned but never read");
}

#[test]
fn code_after_return_is_dead() {
    let b = AstBuilder::new("main.st");
    let main = b.program(
        "MAIN",
        (1, 10),
        vec![b.var_block(VarScope::Local, 2, vec![b.var("x", "INT", 3)])],
        vec![
            b.assign(5, "x", b.int(1, 5)),
            b.ret(6),
            b.assign(7, "x", b.int(2, 7)),
            b.call_stmt(8, "Use", vec![b.var_ref("x", 8)]),
        ],
    );
    let flows = analyze_tree(&tree("main.st", vec![main]), &DataFlowOptions::default());
    let dead = &flows[0].dead_code;
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].kind, DeadCodeKind::UnreachableCode);
    assert_eq!((dead[0].start_line, dead[0].end_line), (7, 8));
    assert!(dead[0].description.contains("after RETURN at line 6"), "{}", dead[0].description);
    // def-use is still recorded for dead statements
    assert_eq!(flows[0].variable("x").map(|v| v.uses.clone()), Some(vec![8]));
}

#[test]
fn exit_only_kills_the_rest_of_its_loop() {
    let b = AstBuilder::new("main.st");
    let main = b.program(
        "MAIN",
        (1, 12),
        vec![b.var_block(VarScope::Local, 2, vec![b.var("i", "INT", 3), b.var("sum", "INT", 4)])],
        vec![
            b.for_loop(
                6,
                "i",
                b.int(0, 6),
                b.int(9, 6),
                None,
                vec![b.exit(7), b.assign(8, "sum", b.binary(BinaryOp::Add, b.var_ref("sum", 8), b.var_ref("i", 8)))],
            ),
            b.call_stmt(10, "Use", vec![b.var_ref("sum", 10)]),
        ],
    );
    let flows = analyze_tree(&tree("main.st", vec![main]), &DataFlowOptions::default());
    let dead = &flows[0].dead_code;
    assert_eq!(dead.len(), 1, "only the statement after EXIT: {dead:?}");
    assert_eq!(dead[0].start_line, 8);
    assert!(dead[0].description.contains("EXIT"));
}

#[test]
fn constant_false_branch_is_reported() {
    let b = AstBuilder::new("main.st");
    let main = b.program(
        "MAIN",
        (1, 10),
        vec![
            b.constant_block(VarScope::Local, 2, vec![b.var_init("DEBUG", "BOOL", b.boolean(false, 3), 3)]),
            b.var_block(VarScope::Local, 4, vec![b.var("x", "INT", 5)]),
        ],
        vec![b.if_then(7, b.var_ref("DEBUG", 7), vec![b.assign(8, "x", b.int(1, 8))])],
    );
    let flows = analyze_tree(&tree("main.st", vec![main]), &DataFlowOptions::default());
    assert_eq!(flows[0].dead_code.len(), 1);
    assert_eq!(flows[0].dead_code[0].kind, DeadCodeKind::AlwaysFalseCondition);
}

#[test]
fn case_and_while_report_their_own_lines() {
    let b = AstBuilder::new("main.st");
    let main = b.program(
        "MAIN",
        (1, 14),
        vec![b.var_block(VarScope::Local, 2, vec![b.var("mode", "INT", 3), b.var("x", "INT", 4)])],
        vec![
            b.case(6, b.var_ref("mode", 6), vec![(vec![b.int(1, 7)], vec![b.ret(7)])], Some(vec![b.ret(9)])),
            b.assign(11, "x", b.int(1, 11)),
            b.call_stmt(12, "Use", vec![b.var_ref("x", 12)]),
        ],
    );
    let flows = analyze_tree(&tree("main.st", vec![main]), &DataFlowOptions::default());
    let dead = &flows[0].dead_code;
    assert_eq!(dead.len(), 1, "{dead:?}");
    assert_eq!((dead[0].start_line, dead[0].end_line), (11, 12));
    assert!(dead[0].description.contains("after RETURN at line 6"), "{}", dead[0].description);

    let idle = b.program(
        "IDLE",
        (20, 26),
        vec![b.var_block(VarScope::Local, 21, vec![b.var("n", "INT", 22)])],
        vec![b.while_loop(24, b.boolean(false, 24), vec![b.assign(25, "n", b.int(1, 25))])],
    );
    let flows = analyze_tree(&tree("main.st", vec![idle]), &DataFlowOptions::default());
    let dead = &flows[0].dead_code;
    assert_eq!(dead.len(), 1, "{dead:?}");
    assert_eq!(dead[0].kind, DeadCodeKind::AlwaysFalseCondition);
    assert_eq!((dead[0].start_line, dead[0].end_line), (25, 25));
}

#[test]
fn unassigned_pointer_read_is_uninitialised() {
    let b = AstBuilder::new("fb.st");
    let fb = b.function_block(
        "FB_Reader",
        (1, 8),
        vec![b.var_block(VarScope::Local, 2, vec![b.var("pData", "POINTER TO INT", 3), b.var("value", "INT", 4)])],
        vec![b.assign(6, "value", b.deref("pData", 6)), b.call_stmt(7, "Use", vec![b.var_ref("value", 7)])],
    );
    let analysis = sequential().analyze("proj", &[tree("fb.st", vec![fb])]);
    assert_eq!(analysis.uninitialized.len(), 1);
    let u = &analysis.uninitialized[0];
    assert_eq!((u.name.as_str(), u.declared_line, u.first_use_line), ("pData", 3, 6));
    assert!(analysis.to_issues().iter().any(|i| i.rule_id == "VAR002"));
}

#[test]
fn globals_and_functions_are_checked_project_wide() {
    let b = AstBuilder::new("gvl.st");
    let gvl = b.global_vars(
        "GVL_Plant",
        1,
        vec![b.var_block(VarScope::Global, 2, vec![b.var("gUsed", "BOOL", 3), b.var("gUnused", "BOOL", 4)])],
    );
    let b2 = AstBuilder::new("main.st");
    let main = b2.program(
        "MAIN",
        (1, 6),
        vec![],
        vec![b2.if_then(3, b2.var_ref("gUsed", 3), vec![b2.call_stmt(4, "Use", vec![])])],
    );
    let helper = b2.function("F_Helper", "INT", (8, 12), vec![], vec![b2.assign(10, "F_Helper", b2.int(1, 10))]);
    let trees = [tree("gvl.st", vec![gvl]), tree("main.st", vec![main, helper])];

    let analysis = sequential().analyze("proj", &trees);
    let unused: Vec<(&str, Option<&str>)> =
        analysis.unused.iter().map(|u| (u.name.as_str(), u.pou_name.as_deref())).collect();
    assert_eq!(unused, vec![("gUnused", None)]);
    let dead: Vec<_> = analysis.dead_code.iter().filter(|d| d.kind == DeadCodeKind::UnusedFunction).collect();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].pou_name, "F_Helper");

    let with_entry = VariableUsageAnalyzer { entry_points: vec!["f_helper".into()], ..sequential() };
    assert!(with_entry.analyze("proj", &trees).dead_code.is_empty());
}

#[test]
fn cancelled_run_is_partial_and_skips_project_checks() {
    let b = AstBuilder::new("gvl.st");
    let gvl = b.global_vars("GVL", 1, vec![b.var_block(VarScope::Global, 2, vec![b.var("gIdle", "BOOL", 3)])]);
    let token = CancellationToken::new();
    token.cancel();
    let analysis = sequential().analyze_cancellable("proj", &[tree("gvl.st", vec![gvl])], &token);
    assert!(analysis.partial);
    assert_eq!(analysis.files_analyzed, 0);
    assert!(analysis.unused.is_empty(), "global usage needs every file");
}
