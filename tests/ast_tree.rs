use st_qa_engine::ast::visitor::{walk_variable_ref, Visitor};
use st_qa_engine::ast::{
    AstBuilder, AstError, BinaryOp, ComplexityVisitor, NodeKind, NodeRef, ParsingError, RootNode, Statement,
    SyntaxTree, VarScope, VariableRef,
};

fn motor_program(b: &AstBuilder) -> RootNode {
    b.program(
        "PRG_Motor",
        (1, 20),
        vec![b.var_block(
            VarScope::Local,
            2,
            vec![b.var("speed", "INT", 3), b.var("running", "BOOL", 4), b.array_var("buf", "INT", 0, 9, 5)],
        )],
        vec![
            b.if_else(
                8,
                b.binary(BinaryOp::And, b.var_ref("running", 8), b.binary(BinaryOp::GreaterThan, b.var_ref("speed", 8), b.int(0, 8))),
                vec![b.assign(9, "speed", b.binary(BinaryOp::Add, b.var_ref("speed", 9), b.int(1, 9)))],
                vec![(b.var_ref("running", 10), vec![b.assign(11, "speed", b.int(0, 11))])],
                Some(vec![b.assign(13, "running", b.boolean(false, 13))]),
            ),
            b.for_loop(15, "i", b.int(0, 15), b.int(9, 15), None, vec![b.assign(16, "speed", b.index("buf", b.var_ref("i", 16), 16))]),
        ],
    )
}

#[test]
fn tree_indexes_every_node_with_parent_links() {
    let b = AstBuilder::new("motor.st");
    let tree = SyntaxTree::new("motor.st", "PROGRAM PRG_Motor\nEND_PROGRAM\n", vec![motor_program(&b)], Vec::new())
        .expect("tree builds");

    assert!(tree.is_valid());
    assert_eq!(tree.pous().count(), 1);
    let nodes = tree.descendants();
    assert_eq!(nodes.len(), tree.node_count(), "pre-order walk must visit every indexed node once");

    // every non-root node points back at an indexed parent
    let root_id = nodes[0].id();
    for node in nodes.iter().skip(1) {
        let parent = tree.parent_of(node.id()).expect("child has a parent");
        assert!(tree.index().info(parent).is_some());
    }
    assert_eq!(tree.parent_of(root_id), None);
}

#[test]
fn path_to_root_ends_at_the_pou() {
    let b = AstBuilder::new("motor.st");
    let tree = SyntaxTree::new("motor.st", "", vec![motor_program(&b)], Vec::new()).expect("tree builds");
    let deepest = tree
        .descendants()
        .into_iter()
        .filter(|n| n.kind() == NodeKind::VariableRef)
        .last()
        .expect("variable reference exists");
    let path = tree.index().path_to_root(deepest.id()).expect("path");
    let top = *path.last().expect("non-empty path");
    assert_eq!(tree.index().info(top).map(|i| i.kind), Some(NodeKind::Program));
    assert!(path.len() >= 3, "variable sits below statement and POU, got {path:?}");
}

#[test]
fn sharing_a_node_between_roots_is_rejected() {
    let b = AstBuilder::new("dup.st");
    let root = motor_program(&b);
    let err = SyntaxTree::new("dup.st", "", vec![root.clone(), root], Vec::new()).expect_err("shared node");
    assert!(matches!(err, AstError::DuplicateNode(_)), "unexpected error: {err:?}");
}

#[test]
fn reparenting_is_rejected_but_same_parent_is_a_noop() {
    let b = AstBuilder::new("motor.st");
    let tree = SyntaxTree::new("motor.st", "", vec![motor_program(&b)], Vec::new()).expect("tree builds");
    let mut index = tree.index().clone();
    let nodes = tree.descendants();
    let child = nodes.last().expect("node").id();
    let parent = index.parent_of(child).expect("parent");
    assert!(index.set_parent(child, parent).is_ok());

    let other = nodes[0].id();
    match index.set_parent(child, other) {
        Err(AstError::NodeAlreadyParented { existing, requested, .. }) => {
            assert_eq!(existing, parent);
            assert_eq!(requested, other);
        }
        other => panic!("expected NodeAlreadyParented, got {other:?}"),
    }
}

#[test]
fn attaching_a_root_below_its_own_descendant_is_rejected() {
    let b = AstBuilder::new("motor.st");
    let tree = SyntaxTree::new("motor.st", "", vec![motor_program(&b)], Vec::new()).expect("tree builds");
    let mut index = tree.index().clone();
    let nodes = tree.descendants();
    let root = nodes[0].id();
    let leaf = nodes.last().expect("node").id();

    match index.set_parent(root, leaf) {
        Err(AstError::ParentCycle { node, parent }) => assert_eq!((node, parent), (root, leaf)),
        other => panic!("expected ParentCycle, got {other:?}"),
    }
    assert!(matches!(index.set_parent(root, root), Err(AstError::ParentCycle { .. })));
    assert_eq!(index.parent_of(root), None, "rejected attach leaves the root detached");
    assert!(index.path_to_root(leaf).expect("path").ends_with(&[root]));
}

#[test]
fn empty_tree_without_errors_is_an_error() {
    let err = SyntaxTree::new("empty.st", "", Vec::new(), Vec::new()).expect_err("empty");
    assert!(matches!(err, AstError::EmptyTree(ref f) if f == "empty.st"));
}

#[test]
fn failed_tree_keeps_errors_for_reporting() {
    let tree = SyntaxTree::failed(
        "broken.st",
        "PROGRAM P\nx := ;\n",
        vec![ParsingError { line: 2, column: 6, message: "unexpected ';'".into(), offending_symbol: Some(";".into()) }],
    );
    assert!(!tree.is_valid());
    assert_eq!(tree.node_count(), 0);
    assert_eq!(tree.error_summary(), "broken.st:2:6 unexpected ';' (near ';')");
}

#[derive(Default)]
struct ReadCollector {
    names: Vec<String>,
}

impl Visitor for ReadCollector {
    fn visit_variable_ref(&mut self, var: &VariableRef) {
        self.names.push(var.name.clone());
        walk_variable_ref(self, var)
    }
}

#[test]
fn visitor_reaches_index_subexpressions() {
    let b = AstBuilder::new("motor.st");
    let root = motor_program(&b);
    let mut collector = ReadCollector::default();
    collector.visit_root(&root);
    assert!(collector.names.contains(&"buf".to_string()));
    assert!(collector.names.contains(&"i".to_string()), "index expression must be walked: {:?}", collector.names);
    // assignment targets go through visit_target, not visit_variable_ref
    assert_eq!(collector.names.iter().filter(|n| *n == "running").count(), 2);
}

#[test]
fn complexity_counts_branches_loops_and_logic() {
    let b = AstBuilder::new("motor.st");
    let RootNode::Pou(pou) = motor_program(&b) else { panic!("expected POU") };
    let metrics = ComplexityVisitor::analyze(&pou);
    // 1 + IF + ELSIF + FOR + AND
    assert_eq!(metrics.cyclomatic_complexity, 5);
    assert_eq!(metrics.loop_count, 1);
    assert_eq!(metrics.logical_operator_count, 1);
    assert_eq!(metrics.nesting_depth, 1);
    assert_eq!(metrics.line_count, 20);
    assert!(matches!(pou.body[0], Statement::If(_)));
    assert!(NodeRef::from(&RootNode::Pou(pou.clone())).children().len() >= 2);
}
