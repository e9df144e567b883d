use st_qa_engine::analysis::AnalysisError;
use st_qa_engine::ast::{AstBuilder, AstError, NodeId, SyntaxTree};
use st_qa_engine::qa::{ChangeKind, QaError};

fn build_tree(roots_empty: bool) -> anyhow::Result<SyntaxTree> {
    let b = AstBuilder::new("main.st");
    let roots = if roots_empty { Vec::new() } else { vec![b.program("MAIN", (1, 2), vec![], vec![])] };
    Ok(SyntaxTree::new("main.st", "", roots, Vec::new())?)
}

#[test]
fn ast_returns_typed_error_on_empty_tree() {
    let err = build_tree(true).expect_err("no roots and no errors");
    match err.downcast_ref::<AstError>() {
        Some(AstError::EmptyTree(file)) => assert_eq!(file, "main.st"),
        other => panic!("expected AstError::EmptyTree, got {other:?}"),
    }
    assert!(build_tree(false).is_ok());
}

#[test]
fn unknown_nodes_are_typed_errors() {
    let tree = build_tree(false).expect("tree");
    let mut index = tree.index().clone();
    match index.set_parent(NodeId(9_999), NodeId(0)) {
        Err(AstError::UnknownNode(_)) => {}
        other => panic!("expected UnknownNode, got {other:?}"),
    }
}

#[test]
fn qa_errors_survive_anyhow() {
    let err: anyhow::Error = QaError::CheckerFailed {
        rule_id: "QA003".into(),
        kind: ChangeKind::Logic,
        message: "index out of range".into(),
    }
    .into();
    let qa = err.downcast_ref::<QaError>().expect("QaError expected");
    assert!(matches!(qa, QaError::CheckerFailed { kind: ChangeKind::Logic, .. }));
    assert_eq!(err.to_string(), "rule QA003 failed while checking a Logic change: index out of range");
}

#[test]
fn analysis_errors_render_context() {
    let err: anyhow::Error = AnalysisError::Cancelled { completed: 3, total: 8 }.into();
    assert_eq!(err.to_string(), "analysis cancelled after 3 of 8 unit(s)");
    assert!(matches!(err.downcast_ref::<AnalysisError>(), Some(AnalysisError::Cancelled { completed: 3, total: 8 })));

    let failed = AnalysisError::SubAnalysisFailed { analysis: "compilation".into(), message: "no compiler".into() };
    assert_eq!(failed.to_string(), "compilation analysis failed: no compiler");
}
