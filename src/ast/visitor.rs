//! Traversal contract over the node model.
//!
//! [`Visitor`] is the void form: one method per concrete node kind, each
//! defaulting to the matching `walk_*` function so implementors only override
//! what they inspect. [`ExpressionFold`] and [`StatementFold`] are the
//! value-returning forms and have no defaults, so every kind must be handled.
use serde::{Deserialize, Serialize};

use super::nodes::*;

pub trait Visitor {
    fn visit_root(&mut self, root: &RootNode) {
        walk_root(self, root)
    }
    fn visit_pou(&mut self, pou: &Pou) {
        walk_pou(self, pou)
    }
    fn visit_global_vars(&mut self, list: &GlobalVarList) {
        walk_global_vars(self, list)
    }
    fn visit_var_block(&mut self, block: &VarDeclList) {
        walk_var_block(self, block)
    }
    fn visit_var_decl(&mut self, decl: &VarDecl) {
        walk_var_decl(self, decl)
    }
    fn visit_statement(&mut self, stmt: &Statement) {
        walk_statement(self, stmt)
    }
    fn visit_assignment(&mut self, stmt: &Assignment) {
        walk_assignment(self, stmt)
    }
    fn visit_if(&mut self, stmt: &IfStatement) {
        walk_if(self, stmt)
    }
    fn visit_case(&mut self, stmt: &CaseStatement) {
        walk_case(self, stmt)
    }
    fn visit_for(&mut self, stmt: &ForStatement) {
        walk_for(self, stmt)
    }
    fn visit_while(&mut self, stmt: &WhileStatement) {
        walk_while(self, stmt)
    }
    fn visit_repeat(&mut self, stmt: &RepeatStatement) {
        walk_repeat(self, stmt)
    }
    fn visit_exit(&mut self, _meta: &NodeMeta) {}
    fn visit_return(&mut self, _meta: &NodeMeta) {}
    fn visit_expression(&mut self, expr: &Expression) {
        walk_expression(self, expr)
    }
    fn visit_binary(&mut self, expr: &BinaryExpr) {
        walk_binary(self, expr)
    }
    fn visit_unary(&mut self, expr: &UnaryExpr) {
        self.visit_expression(&expr.operand)
    }
    fn visit_literal(&mut self, _expr: &LiteralExpr) {}
    fn visit_variable_ref(&mut self, var: &VariableRef) {
        walk_variable_ref(self, var)
    }
    /// Write target of an assignment or FOR loop. Index expressions are still reads.
    fn visit_target(&mut self, var: &VariableRef) {
        walk_variable_ref(self, var)
    }
    fn visit_call(&mut self, call: &FunctionCall) {
        walk_call(self, call)
    }
    fn visit_data_type(&mut self, decl: &DataTypeDecl) {
        walk_data_type(self, decl)
    }
    fn visit_struct(&mut self, ty: &StructType) {
        for field in &ty.fields {
            self.visit_var_decl(field);
        }
    }
    fn visit_enum(&mut self, _ty: &EnumType) {}
}

pub fn walk_root<V: Visitor + ?Sized>(v: &mut V, root: &RootNode) {
    match root {
        RootNode::Pou(p) => v.visit_pou(p),
        RootNode::GlobalVars(g) => v.visit_global_vars(g),
        RootNode::DataType(d) => v.visit_data_type(d),
    }
}

pub fn walk_pou<V: Visitor + ?Sized>(v: &mut V, pou: &Pou) {
    for block in &pou.var_blocks {
        v.visit_var_block(block);
    }
    walk_body(v, &pou.body);
}

pub fn walk_global_vars<V: Visitor + ?Sized>(v: &mut V, list: &GlobalVarList) {
    for block in &list.var_blocks {
        v.visit_var_block(block);
    }
}

pub fn walk_var_block<V: Visitor + ?Sized>(v: &mut V, block: &VarDeclList) {
    for decl in &block.variables {
        v.visit_var_decl(decl);
    }
}

pub fn walk_var_decl<V: Visitor + ?Sized>(v: &mut V, decl: &VarDecl) {
    if let Some(init) = &decl.initial_value {
        v.visit_expression(init);
    }
}

pub fn walk_body<V: Visitor + ?Sized>(v: &mut V, body: &[Statement]) {
    for stmt in body {
        v.visit_statement(stmt);
    }
}

pub fn walk_statement<V: Visitor + ?Sized>(v: &mut V, stmt: &Statement) {
    match stmt {
        Statement::Assignment(s) => v.visit_assignment(s),
        Statement::If(s) => v.visit_if(s),
        Statement::Case(s) => v.visit_case(s),
        Statement::For(s) => v.visit_for(s),
        Statement::While(s) => v.visit_while(s),
        Statement::Repeat(s) => v.visit_repeat(s),
        Statement::Exit(m) => v.visit_exit(m),
        Statement::Return(m) => v.visit_return(m),
        Statement::Call(c) => v.visit_call(c),
    }
}

pub fn walk_assignment<V: Visitor + ?Sized>(v: &mut V, stmt: &Assignment) {
    v.visit_expression(&stmt.value);
    v.visit_target(&stmt.target);
}

pub fn walk_if<V: Visitor + ?Sized>(v: &mut V, stmt: &IfStatement) {
    v.visit_expression(&stmt.condition);
    walk_body(v, &stmt.then_body);
    for clause in &stmt.elsif {
        v.visit_expression(&clause.condition);
        walk_body(v, &clause.body);
    }
    if let Some(body) = &stmt.else_body {
        walk_body(v, body);
    }
}

pub fn walk_case<V: Visitor + ?Sized>(v: &mut V, stmt: &CaseStatement) {
    v.visit_expression(&stmt.selector);
    for element in &stmt.elements {
        for value in &element.values {
            v.visit_expression(value);
        }
        walk_body(v, &element.body);
    }
    if let Some(body) = &stmt.else_body {
        walk_body(v, body);
    }
}

pub fn walk_for<V: Visitor + ?Sized>(v: &mut V, stmt: &ForStatement) {
    v.visit_expression(&stmt.start);
    v.visit_expression(&stmt.end);
    if let Some(step) = &stmt.step {
        v.visit_expression(step);
    }
    v.visit_target(&stmt.variable);
    walk_body(v, &stmt.body);
}

pub fn walk_while<V: Visitor + ?Sized>(v: &mut V, stmt: &WhileStatement) {
    v.visit_expression(&stmt.condition);
    walk_body(v, &stmt.body);
}

pub fn walk_repeat<V: Visitor + ?Sized>(v: &mut V, stmt: &RepeatStatement) {
    walk_body(v, &stmt.body);
    v.visit_expression(&stmt.until);
}

pub fn walk_expression<V: Visitor + ?Sized>(v: &mut V, expr: &Expression) {
    match expr {
        Expression::Binary(e) => v.visit_binary(e),
        Expression::Unary(e) => v.visit_unary(e),
        Expression::Literal(e) => v.visit_literal(e),
        Expression::Variable(e) => v.visit_variable_ref(e),
        Expression::Call(e) => v.visit_call(e),
    }
}

pub fn walk_binary<V: Visitor + ?Sized>(v: &mut V, expr: &BinaryExpr) {
    v.visit_expression(&expr.left);
    v.visit_expression(&expr.right);
}

pub fn walk_variable_ref<V: Visitor + ?Sized>(v: &mut V, var: &VariableRef) {
    for index in &var.indices {
        v.visit_expression(index);
    }
}

pub fn walk_call<V: Visitor + ?Sized>(v: &mut V, call: &FunctionCall) {
    for arg in &call.args {
        if arg.output {
            if let Expression::Variable(target) = &arg.value {
                v.visit_target(target);
                continue;
            }
        }
        v.visit_expression(&arg.value);
    }
}

pub fn walk_data_type<V: Visitor + ?Sized>(v: &mut V, decl: &DataTypeDecl) {
    match &decl.definition {
        TypeDefinition::Struct(s) | TypeDefinition::Union(s) => v.visit_struct(s),
        TypeDefinition::Enum(e) => v.visit_enum(e),
        TypeDefinition::Alias(_) => {}
    }
}

impl RootNode {
    pub fn accept<V: Visitor + ?Sized>(&self, v: &mut V) {
        v.visit_root(self)
    }
}

impl Statement {
    pub fn accept<V: Visitor + ?Sized>(&self, v: &mut V) {
        v.visit_statement(self)
    }

    pub fn fold<F: StatementFold + ?Sized>(&self, f: &mut F) -> F::Output {
        match self {
            Statement::Assignment(s) => f.fold_assignment(s),
            Statement::If(s) => f.fold_if(s),
            Statement::Case(s) => f.fold_case(s),
            Statement::For(s) => f.fold_for(s),
            Statement::While(s) => f.fold_while(s),
            Statement::Repeat(s) => f.fold_repeat(s),
            Statement::Exit(m) => f.fold_exit(m),
            Statement::Return(m) => f.fold_return(m),
            Statement::Call(c) => f.fold_call(c),
        }
    }
}

impl Expression {
    pub fn accept<V: Visitor + ?Sized>(&self, v: &mut V) {
        v.visit_expression(self)
    }

    pub fn fold<F: ExpressionFold + ?Sized>(&self, f: &mut F) -> F::Output {
        match self {
            Expression::Binary(e) => f.fold_binary(e),
            Expression::Unary(e) => f.fold_unary(e),
            Expression::Literal(e) => f.fold_literal(e),
            Expression::Variable(e) => f.fold_variable(e),
            Expression::Call(e) => f.fold_call(e),
        }
    }
}

pub trait ExpressionFold {
    type Output;
    fn fold_binary(&mut self, expr: &BinaryExpr) -> Self::Output;
    fn fold_unary(&mut self, expr: &UnaryExpr) -> Self::Output;
    fn fold_literal(&mut self, expr: &LiteralExpr) -> Self::Output;
    fn fold_variable(&mut self, var: &VariableRef) -> Self::Output;
    fn fold_call(&mut self, call: &FunctionCall) -> Self::Output;
}

pub trait StatementFold {
    type Output;
    fn fold_assignment(&mut self, stmt: &Assignment) -> Self::Output;
    fn fold_if(&mut self, stmt: &IfStatement) -> Self::Output;
    fn fold_case(&mut self, stmt: &CaseStatement) -> Self::Output;
    fn fold_for(&mut self, stmt: &ForStatement) -> Self::Output;
    fn fold_while(&mut self, stmt: &WhileStatement) -> Self::Output;
    fn fold_repeat(&mut self, stmt: &RepeatStatement) -> Self::Output;
    fn fold_exit(&mut self, meta: &NodeMeta) -> Self::Output;
    fn fold_return(&mut self, meta: &NodeMeta) -> Self::Output;
    fn fold_call(&mut self, call: &FunctionCall) -> Self::Output;
}

/// Complexity metrics for one POU.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    pub pou_name: String,
    pub cyclomatic_complexity: u32,
    pub cognitive_complexity: u32,
    pub nesting_depth: u32,
    pub decision_points: u32,
    pub loop_count: u32,
    pub logical_operator_count: u32,
    pub parameter_count: u32,
    pub return_points: u32,
    pub statement_count: u32,
    pub line_count: usize,
}

/// Cyclomatic/cognitive complexity of a POU body.
///
/// Cyclomatic complexity is `1 + IF + ELSIF + case elements + loops + AND/OR`.
pub struct ComplexityVisitor {
    cyclomatic_complexity: u32,
    cognitive_complexity: u32,
    nesting_depth: u32,
    current_depth: u32,
    decision_points: u32,
    loop_count: u32,
    logical_operator_count: u32,
    return_points: u32,
    statement_count: u32,
}

impl Default for ComplexityVisitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ComplexityVisitor {
    pub fn new() -> Self {
        Self {
            cyclomatic_complexity: 1,
            cognitive_complexity: 0,
            nesting_depth: 0,
            current_depth: 0,
            decision_points: 0,
            loop_count: 0,
            logical_operator_count: 0,
            return_points: 0,
            statement_count: 0,
        }
    }

    pub fn analyze(pou: &Pou) -> ComplexityMetrics {
        let mut visitor = Self::new();
        visitor.visit_pou(pou);
        let mut metrics = visitor.build_metrics();
        metrics.pou_name = pou.name.clone();
        metrics.parameter_count = pou.parameter_count() as u32;
        metrics.line_count = pou.meta.span.end_line.saturating_sub(pou.meta.span.start_line) + 1;
        metrics
    }

    pub fn enter_scope(&mut self) {
        self.current_depth += 1;
        if self.current_depth > self.nesting_depth {
            self.nesting_depth = self.current_depth;
        }
    }

    pub fn exit_scope(&mut self) {
        if self.current_depth > 0 {
            self.current_depth -= 1;
        }
    }

    fn decision(&mut self, count: u32) {
        self.cyclomatic_complexity += count;
        self.decision_points += count;
        self.cognitive_complexity += count * (1 + self.current_depth);
    }

    fn nested_body(&mut self, body: &[Statement]) {
        self.enter_scope();
        walk_body(self, body);
        self.exit_scope();
    }

    pub fn build_metrics(&self) -> ComplexityMetrics {
        ComplexityMetrics {
            pou_name: String::new(),
            cyclomatic_complexity: self.cyclomatic_complexity,
            cognitive_complexity: self.cognitive_complexity,
            nesting_depth: self.nesting_depth,
            decision_points: self.decision_points,
            loop_count: self.loop_count,
            logical_operator_count: self.logical_operator_count,
            parameter_count: 0,
            return_points: self.return_points,
            statement_count: self.statement_count,
            line_count: 0,
        }
    }
}

impl Visitor for ComplexityVisitor {
    fn visit_statement(&mut self, stmt: &Statement) {
        self.statement_count += 1;
        walk_statement(self, stmt)
    }

    fn visit_if(&mut self, stmt: &IfStatement) {
        self.decision(1 + stmt.elsif.len() as u32);
        self.visit_expression(&stmt.condition);
        self.nested_body(&stmt.then_body);
        for clause in &stmt.elsif {
            self.visit_expression(&clause.condition);
            self.nested_body(&clause.body);
        }
        if let Some(body) = &stmt.else_body {
            self.nested_body(body);
        }
    }

    fn visit_case(&mut self, stmt: &CaseStatement) {
        self.decision(stmt.elements.len() as u32);
        self.visit_expression(&stmt.selector);
        for element in &stmt.elements {
            self.nested_body(&element.body);
        }
        if let Some(body) = &stmt.else_body {
            self.nested_body(body);
        }
    }

    fn visit_for(&mut self, stmt: &ForStatement) {
        self.loop_count += 1;
        self.decision(1);
        self.nested_body(&stmt.body);
    }

    fn visit_while(&mut self, stmt: &WhileStatement) {
        self.loop_count += 1;
        self.decision(1);
        self.visit_expression(&stmt.condition);
        self.nested_body(&stmt.body);
    }

    fn visit_repeat(&mut self, stmt: &RepeatStatement) {
        self.loop_count += 1;
        self.decision(1);
        self.nested_body(&stmt.body);
        self.visit_expression(&stmt.until);
    }

    fn visit_return(&mut self, _meta: &NodeMeta) {
        self.return_points += 1;
    }

    fn visit_binary(&mut self, expr: &BinaryExpr) {
        if expr.op.is_logical() {
            self.logical_operator_count += 1;
            self.cyclomatic_complexity += 1;
            self.cognitive_complexity += 1;
        }
        walk_binary(self, expr)
    }
}
