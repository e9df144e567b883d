//! Intraprocedural data flow over one POU.
//!
//! A single structural pass over the statement tree computes:
//! - def-use chains for every declared variable, plus reads and writes of
//!   names the POU does not declare (globals, enum values, instances of other
//!   files)
//! - definite assignment for locals that have no implicit default, so reads
//!   before any assignment on some path are reported
//! - per-statement reachability and loop/conditional nesting
//! - dead regions: code after RETURN/EXIT, branches behind constant conditions
//!
//! The pass is conservative in one direction only. A read is reported as
//! uninitialised when at least one structurally possible path reaches it
//! without an assignment; branches it cannot rule out are assumed taken.
use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::ast::visitor::{walk_call, walk_variable_ref, ExpressionFold, StatementFold, Visitor};
use crate::ast::{
    Assignment, BinaryExpr, BinaryOp, CaseStatement, Expression, ForStatement, FunctionCall, IfStatement,
    LiteralExpr, NodeMeta, Pou, RepeatStatement, SideTable, Statement, SyntaxTree, UnaryExpr, UnaryOp, VarDecl,
    VarScope, VariableRef, WhileStatement,
};

/// Elementary types that IEC 61131-3 initialises to a zero value.
pub const DEFAULT_INITIALIZED_TYPES: &[&str] = &[
    "BOOL", "BYTE", "WORD", "DWORD", "LWORD", "SINT", "INT", "DINT", "LINT", "USINT", "UINT", "UDINT", "ULINT",
    "REAL", "LREAL",
];

pub fn has_implicit_default(data_type: &str) -> bool {
    let upper = data_type.trim().to_ascii_uppercase();
    let base = match upper.rsplit_once(" OF ") {
        Some((prefix, element)) if prefix.trim_start().starts_with("ARRAY") => element.trim().to_string(),
        _ => upper,
    };
    DEFAULT_INITIALIZED_TYPES.contains(&base.as_str())
}

fn is_indirection(decl: &VarDecl) -> bool {
    let upper = decl.data_type.trim().to_ascii_uppercase();
    decl.pointer
        || decl.reference
        || upper.starts_with("POINTER TO")
        || upper.starts_with("REFERENCE TO")
        || upper.starts_with("REF_TO")
}

fn key(name: &str) -> String {
    name.to_ascii_uppercase()
}

// ---------------------------------------------------------------------------
// Constant folding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
}

impl ConstValue {
    pub fn as_bool(self) -> Option<bool> {
        match self {
            ConstValue::Bool(b) => Some(b),
            ConstValue::Int(_) => None,
        }
    }
}

/// Folds expressions built from literals and `VAR CONSTANT` names.
pub struct ConstEvaluator<'a> {
    constants: &'a HashMap<String, ConstValue>,
}

impl<'a> ConstEvaluator<'a> {
    pub fn new(constants: &'a HashMap<String, ConstValue>) -> Self {
        Self { constants }
    }

    pub fn eval(&mut self, expr: &Expression) -> Option<ConstValue> {
        expr.fold(self)
    }
}

impl ExpressionFold for ConstEvaluator<'_> {
    type Output = Option<ConstValue>;

    fn fold_binary(&mut self, expr: &BinaryExpr) -> Option<ConstValue> {
        use ConstValue::{Bool, Int};
        let left = expr.left.fold(self);
        let right = expr.right.fold(self);
        // FALSE AND x, TRUE OR x
        match (expr.op, left, right) {
            (BinaryOp::And, Some(Bool(false)), _) | (BinaryOp::And, _, Some(Bool(false))) => return Some(Bool(false)),
            (BinaryOp::Or, Some(Bool(true)), _) | (BinaryOp::Or, _, Some(Bool(true))) => return Some(Bool(true)),
            _ => {}
        }
        match (left?, right?) {
            (Int(a), Int(b)) => match expr.op {
                BinaryOp::Add => a.checked_add(b).map(Int),
                BinaryOp::Subtract => a.checked_sub(b).map(Int),
                BinaryOp::Multiply => a.checked_mul(b).map(Int),
                BinaryOp::Divide => a.checked_div(b).map(Int),
                BinaryOp::Modulo => a.checked_rem(b).map(Int),
                BinaryOp::Equal => Some(Bool(a == b)),
                BinaryOp::NotEqual => Some(Bool(a != b)),
                BinaryOp::LessThan => Some(Bool(a < b)),
                BinaryOp::LessThanOrEqual => Some(Bool(a <= b)),
                BinaryOp::GreaterThan => Some(Bool(a > b)),
                BinaryOp::GreaterThanOrEqual => Some(Bool(a >= b)),
                BinaryOp::And => Some(Int(a & b)),
                BinaryOp::Or => Some(Int(a | b)),
                BinaryOp::Xor => Some(Int(a ^ b)),
            },
            (Bool(a), Bool(b)) => match expr.op {
                BinaryOp::And => Some(Bool(a && b)),
                BinaryOp::Or => Some(Bool(a || b)),
                BinaryOp::Xor | BinaryOp::NotEqual => Some(Bool(a != b)),
                BinaryOp::Equal => Some(Bool(a == b)),
                _ => None,
            },
            _ => None,
        }
    }

    fn fold_unary(&mut self, expr: &UnaryExpr) -> Option<ConstValue> {
        match (expr.op, expr.operand.fold(self)?) {
            (UnaryOp::Not, ConstValue::Bool(b)) => Some(ConstValue::Bool(!b)),
            (UnaryOp::Not, ConstValue::Int(i)) => Some(ConstValue::Int(!i)),
            (UnaryOp::Minus, ConstValue::Int(i)) => i.checked_neg().map(ConstValue::Int),
            (UnaryOp::Minus, ConstValue::Bool(_)) => None,
        }
    }

    fn fold_literal(&mut self, expr: &LiteralExpr) -> Option<ConstValue> {
        expr.as_bool()
            .map(ConstValue::Bool)
            .or_else(|| expr.as_i64().map(ConstValue::Int))
    }

    fn fold_variable(&mut self, var: &VariableRef) -> Option<ConstValue> {
        if !var.field_path.is_empty() || !var.indices.is_empty() || var.dereference {
            return None;
        }
        self.constants.get(&key(&var.name)).copied()
    }

    fn fold_call(&mut self, _call: &FunctionCall) -> Option<ConstValue> {
        None
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefUseInfo {
    pub name: String,
    pub scope: VarScope,
    pub data_type: String,
    pub declared_line: usize,
    pub constant: bool,
    /// Lines of assignments, FOR loop heads and output bindings.
    pub definitions: Vec<usize>,
    /// Lines of reads, including index sub-expressions and call arguments.
    pub uses: Vec<usize>,
    pub initialized_at_declaration: bool,
    pub implicit_default: bool,
    pub defined_before_use: bool,
}

impl DefUseInfo {
    pub fn is_initialized(&self) -> bool {
        self.initialized_at_declaration || self.implicit_default
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFlowInfo {
    pub reachable: bool,
    pub loop_depth: u32,
    pub conditional_depth: u32,
}

impl ControlFlowInfo {
    pub fn in_loop(&self) -> bool {
        self.loop_depth > 0
    }

    pub fn in_conditional(&self) -> bool {
        self.conditional_depth > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeadCodeKind {
    UnreachableCode,
    AlwaysFalseCondition,
    AlwaysTrueCondition,
    UnusedFunction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadCode {
    pub kind: DeadCodeKind,
    pub file_path: String,
    pub pou_name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UninitializedRead {
    pub variable: String,
    pub line: usize,
    pub declared_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// POU called; for instance calls, the instance's type.
    pub callee: String,
    pub line: usize,
    pub instance: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DataFlowOptions {
    /// Require every local to be assigned before it is read, defaults or not.
    pub strict_initialization: bool,
}

#[derive(Debug, Clone)]
pub struct PouDataFlow {
    pub pou_name: String,
    pub file_path: String,
    /// Keyed by upper-cased name.
    pub variables: BTreeMap<String, DefUseInfo>,
    pub external_reads: BTreeMap<String, Vec<usize>>,
    pub external_writes: BTreeMap<String, Vec<usize>>,
    pub calls: Vec<CallSite>,
    pub control_flow: SideTable<ControlFlowInfo>,
    pub uninitialized_reads: Vec<UninitializedRead>,
    pub dead_code: Vec<DeadCode>,
}

impl PouDataFlow {
    pub fn variable(&self, name: &str) -> Option<&DefUseInfo> {
        self.variables.get(&key(name))
    }

    pub fn is_reachable(&self, stmt: &Statement) -> bool {
        self.control_flow.get(stmt.meta().id).map(|c| c.reachable).unwrap_or(false)
    }
}

pub fn analyze_tree(tree: &SyntaxTree, options: &DataFlowOptions) -> Vec<PouDataFlow> {
    tree.pous().map(|pou| analyze_pou(pou, &tree.file_path, options)).collect()
}

pub fn analyze_pou(pou: &Pou, file_path: &str, options: &DataFlowOptions) -> PouDataFlow {
    let mut walker = FlowWalker::new(pou, file_path, options);
    walker.declarations(pou);
    walker.walk_block(&pou.body);
    walker.finish()
}

// ---------------------------------------------------------------------------
// Access collection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Access {
    Read(String, usize),
    Write(String, usize),
    Call { name: String, line: usize },
}

/// Reads and writes of one statement or expression in evaluation order.
#[derive(Default)]
struct AccessCollector {
    events: Vec<Access>,
}

impl Visitor for AccessCollector {
    fn visit_variable_ref(&mut self, var: &VariableRef) {
        self.events.push(Access::Read(var.name.clone(), var.meta.line()));
        walk_variable_ref(self, var)
    }

    fn visit_target(&mut self, var: &VariableRef) {
        walk_variable_ref(self, var);
        if var.dereference {
            // writing through p^ reads p
            self.events.push(Access::Read(var.name.clone(), var.meta.line()));
        }
        self.events.push(Access::Write(var.name.clone(), var.meta.line()));
    }

    fn visit_call(&mut self, call: &FunctionCall) {
        self.events.push(Access::Call { name: call.name.clone(), line: call.meta.line() });
        walk_call(self, call)
    }
}

fn collect_expr(expr: &Expression) -> Vec<Access> {
    let mut c = AccessCollector::default();
    c.visit_expression(expr);
    c.events
}

// ---------------------------------------------------------------------------
// Structural walk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Flow {
    /// Control never reaches the next statement of the block.
    stops: bool,
    /// Every stopping path ends in RETURN.
    returns: bool,
    line: usize,
}

impl Flow {
    fn falls() -> Self {
        Flow { stops: false, returns: false, line: 0 }
    }
}

fn intersect(states: Vec<HashSet<String>>) -> Option<HashSet<String>> {
    let mut iter = states.into_iter();
    let first = iter.next()?;
    Some(iter.fold(first, |acc, s| acc.intersection(&s).cloned().collect()))
}

fn block_end(body: &[Statement]) -> usize {
    body.iter().map(|s| s.meta().span.end_line.max(s.line())).max().unwrap_or(0)
}

struct FlowWalker<'a> {
    options: &'a DataFlowOptions,
    constants: HashMap<String, ConstValue>,
    /// Locals without an implicit default that must be assigned before use.
    tracked: HashSet<String>,
    /// name -> declared type, for resolving instance calls
    types: HashMap<String, String>,
    assigned: HashSet<String>,
    reported: HashSet<String>,
    reachable: bool,
    loop_depth: u32,
    conditional_depth: u32,
    exit_states: Vec<Vec<HashSet<String>>>,
    out: PouDataFlow,
}

impl<'a> FlowWalker<'a> {
    fn new(pou: &Pou, file_path: &str, options: &'a DataFlowOptions) -> Self {
        Self {
            options,
            constants: HashMap::new(),
            tracked: HashSet::new(),
            types: HashMap::new(),
            assigned: HashSet::new(),
            reported: HashSet::new(),
            reachable: true,
            loop_depth: 0,
            conditional_depth: 0,
            exit_states: Vec::new(),
            out: PouDataFlow {
                pou_name: pou.name.clone(),
                file_path: file_path.to_string(),
                variables: BTreeMap::new(),
                external_reads: BTreeMap::new(),
                external_writes: BTreeMap::new(),
                calls: Vec::new(),
                control_flow: SideTable::default(),
                uninitialized_reads: Vec::new(),
                dead_code: Vec::new(),
            },
        }
    }

    fn declarations(&mut self, pou: &Pou) {
        for (block, decl) in pou.variables() {
            let k = key(&decl.name);
            let local = matches!(block.scope, VarScope::Local | VarScope::Temp);
            let initialized_at_declaration = decl.initial_value.is_some();
            let implicit_default = has_implicit_default(&decl.data_type);

            if let Some(init) = &decl.initial_value {
                self.apply(collect_expr(init));
                if block.constant {
                    if let Some(value) = ConstEvaluator::new(&self.constants).eval(init) {
                        self.constants.insert(k.clone(), value);
                    }
                }
            }

            let needs_assignment = local
                && !initialized_at_declaration
                && (self.options.strict_initialization || (!implicit_default && is_indirection(decl)));
            if needs_assignment {
                self.tracked.insert(k.clone());
            }
            self.types.insert(k.clone(), decl.data_type.clone());
            self.out.variables.insert(
                k,
                DefUseInfo {
                    name: decl.name.clone(),
                    scope: block.scope,
                    data_type: decl.data_type.clone(),
                    declared_line: decl.meta.line(),
                    constant: block.constant,
                    definitions: Vec::new(),
                    uses: Vec::new(),
                    initialized_at_declaration,
                    implicit_default,
                    defined_before_use: true,
                },
            );
        }
    }

    fn apply(&mut self, events: Vec<Access>) {
        for event in events {
            match event {
                Access::Read(name, line) => self.read(&name, line),
                Access::Write(name, line) => self.write(&name, line),
                Access::Call { name, line } => self.call(&name, line),
            }
        }
    }

    fn read(&mut self, name: &str, line: usize) {
        let k = key(name);
        match self.out.variables.get_mut(&k) {
            Some(info) => info.uses.push(line),
            None => {
                self.out.external_reads.entry(name.to_string()).or_default().push(line);
                return;
            }
        }
        if self.reachable && self.tracked.contains(&k) && !self.assigned.contains(&k) && self.reported.insert(k.clone()) {
            let (variable, declared_line) = self
                .out
                .variables
                .get(&k)
                .map(|i| (i.name.clone(), i.declared_line))
                .unwrap_or_else(|| (name.to_string(), 0));
            self.out.uninitialized_reads.push(UninitializedRead { variable, line, declared_line });
        }
    }

    fn write(&mut self, name: &str, line: usize) {
        let k = key(name);
        match self.out.variables.get_mut(&k) {
            Some(info) => info.definitions.push(line),
            None => {
                // a function's result is assigned through its own name
                if k != key(&self.out.pou_name) {
                    self.out.external_writes.entry(name.to_string()).or_default().push(line);
                }
            }
        }
        self.assigned.insert(k);
    }

    fn call(&mut self, name: &str, line: usize) {
        let k = key(name);
        match self.types.get(&k).filter(|t| !t.is_empty()).cloned() {
            Some(instance_type) => {
                // calling an FB instance uses it
                if let Some(info) = self.out.variables.get_mut(&k) {
                    info.uses.push(line);
                }
                self.out.calls.push(CallSite { callee: instance_type, line, instance: Some(name.to_string()) });
            }
            None => self.out.calls.push(CallSite { callee: name.to_string(), line, instance: None }),
        }
    }

    fn note(&mut self, stmt: &Statement) {
        self.out.control_flow.insert(
            stmt.meta().id,
            ControlFlowInfo {
                reachable: self.reachable,
                loop_depth: self.loop_depth,
                conditional_depth: self.conditional_depth,
            },
        );
    }

    fn dead(&mut self, kind: DeadCodeKind, start_line: usize, end_line: usize, description: String) {
        if !self.reachable {
            return;
        }
        self.out.dead_code.push(DeadCode {
            kind,
            file_path: self.out.file_path.clone(),
            pou_name: self.out.pou_name.clone(),
            start_line,
            end_line: end_line.max(start_line),
            description,
        });
    }

    fn walk_block(&mut self, body: &[Statement]) -> Flow {
        let mut flow = Flow::falls();
        for (i, stmt) in body.iter().enumerate() {
            if flow.stops {
                let what = if flow.returns { "RETURN" } else { "EXIT" };
                self.dead(
                    DeadCodeKind::UnreachableCode,
                    stmt.line(),
                    block_end(&body[i..]),
                    format!("{} statement(s) after {what} at line {}", body.len() - i, flow.line),
                );
                self.walk_dead(&body[i..]);
                return flow;
            }
            self.note(stmt);
            flow = stmt.fold(self);
        }
        flow
    }

    /// Walk code that can never run: def-use is still recorded, state is not kept.
    fn walk_dead(&mut self, body: &[Statement]) {
        let saved = (self.assigned.clone(), self.reachable);
        self.reachable = false;
        self.walk_block(body);
        self.assigned = saved.0;
        self.reachable = saved.1;
    }

    fn const_condition(&self, expr: &Expression) -> Option<bool> {
        ConstEvaluator::new(&self.constants).eval(expr).and_then(ConstValue::as_bool)
    }

    fn loop_body(&mut self, body: &[Statement]) -> (Flow, Vec<HashSet<String>>) {
        self.loop_depth += 1;
        self.exit_states.push(Vec::new());
        let flow = self.walk_block(body);
        let exits = self.exit_states.pop().unwrap_or_default();
        self.loop_depth -= 1;
        (flow, exits)
    }

    fn finish(mut self) -> PouDataFlow {
        for info in self.out.variables.values_mut() {
            let first_def = info.definitions.iter().min();
            let first_use = info.uses.iter().min();
            let local = matches!(info.scope, VarScope::Local | VarScope::Temp);
            info.defined_before_use = !local
                || info.is_initialized()
                || match (first_def, first_use) {
                    (_, None) => true,
                    (Some(d), Some(u)) => d < u,
                    (None, Some(_)) => false,
                };
        }
        self.out
    }
}

impl StatementFold for FlowWalker<'_> {
    type Output = Flow;

    fn fold_assignment(&mut self, stmt: &Assignment) -> Flow {
        let mut c = AccessCollector::default();
        crate::ast::visitor::walk_assignment(&mut c, stmt);
        self.apply(c.events);
        Flow::falls()
    }

    fn fold_if(&mut self, stmt: &IfStatement) -> Flow {
        self.apply(collect_expr(&stmt.condition));
        let pre = self.assigned.clone();
        let mut branches: Vec<(Option<bool>, &[Statement], usize)> =
            vec![(self.const_condition(&stmt.condition), stmt.then_body.as_slice(), stmt.meta.line())];
        let mut outs = Vec::new();
        let mut all_stop = true;
        let mut all_return = true;
        let mut decided: Option<usize> = None;

        for clause in &stmt.elsif {
            branches.push((None, clause.body.as_slice(), clause.span.start_line));
        }
        self.conditional_depth += 1;
        for (idx, (mut constant, body, line)) in branches.into_iter().enumerate() {
            if idx > 0 {
                let condition = &stmt.elsif[idx - 1].condition;
                if decided.is_none() {
                    self.assigned = pre.clone();
                    self.apply(collect_expr(condition));
                }
                constant = self.const_condition(condition);
            }
            if let Some(true_line) = decided {
                self.dead(
                    DeadCodeKind::AlwaysTrueCondition,
                    line,
                    block_end(body).max(line),
                    format!("ELSIF branch never taken: condition at line {true_line} is always TRUE"),
                );
                self.walk_dead(body);
                continue;
            }
            if constant == Some(false) {
                self.dead(
                    DeadCodeKind::AlwaysFalseCondition,
                    line,
                    block_end(body).max(line),
                    "condition is always FALSE".to_string(),
                );
                self.walk_dead(body);
                continue;
            }
            self.assigned = pre.clone();
            let flow = self.walk_block(body);
            if flow.stops {
                all_return &= flow.returns;
            } else {
                all_stop = false;
                outs.push(self.assigned.clone());
            }
            if constant == Some(true) {
                decided = Some(line);
            }
        }

        match (&stmt.else_body, decided) {
            (Some(body), Some(true_line)) => {
                let start = body.first().map(Statement::line).unwrap_or(stmt.meta.line());
                self.dead(
                    DeadCodeKind::AlwaysTrueCondition,
                    start,
                    block_end(body),
                    format!("ELSE branch never taken: condition at line {true_line} is always TRUE"),
                );
                self.walk_dead(body);
            }
            (Some(body), None) => {
                self.assigned = pre.clone();
                let flow = self.walk_block(body);
                if flow.stops {
                    all_return &= flow.returns;
                } else {
                    all_stop = false;
                    outs.push(self.assigned.clone());
                }
            }
            (None, Some(_)) => {}
            (None, None) => {
                all_stop = false;
                outs.push(pre.clone());
            }
        }
        self.conditional_depth -= 1;

        self.assigned = intersect(outs).unwrap_or(pre);
        Flow { stops: all_stop, returns: all_stop && all_return, line: stmt.meta.line() }
    }

    fn fold_case(&mut self, stmt: &CaseStatement) -> Flow {
        self.apply(collect_expr(&stmt.selector));
        let pre = self.assigned.clone();
        let mut outs = Vec::new();
        let mut all_stop = true;
        let mut all_return = true;

        self.conditional_depth += 1;
        let bodies = stmt.elements.iter().map(|e| e.body.as_slice()).chain(stmt.else_body.as_deref());
        for body in bodies {
            self.assigned = pre.clone();
            let flow = self.walk_block(body);
            if flow.stops {
                all_return &= flow.returns;
            } else {
                all_stop = false;
                outs.push(self.assigned.clone());
            }
        }
        self.conditional_depth -= 1;
        if stmt.else_body.is_none() {
            all_stop = false;
            outs.push(pre.clone());
        }

        self.assigned = intersect(outs).unwrap_or(pre);
        Flow { stops: all_stop, returns: all_stop && all_return, line: stmt.meta.line() }
    }

    fn fold_for(&mut self, stmt: &ForStatement) -> Flow {
        let mut c = AccessCollector::default();
        c.visit_expression(&stmt.start);
        c.visit_expression(&stmt.end);
        if let Some(step) = &stmt.step {
            c.visit_expression(step);
        }
        c.visit_target(&stmt.variable);
        self.apply(c.events);

        // the body may run zero times
        let pre = self.assigned.clone();
        self.loop_body(&stmt.body);
        self.assigned = pre;
        Flow::falls()
    }

    fn fold_while(&mut self, stmt: &WhileStatement) -> Flow {
        self.apply(collect_expr(&stmt.condition));
        let pre = self.assigned.clone();
        if self.const_condition(&stmt.condition) == Some(false) {
            self.dead(
                DeadCodeKind::AlwaysFalseCondition,
                stmt.body.first().map(Statement::line).unwrap_or(stmt.meta.line()),
                block_end(&stmt.body).max(stmt.meta.line()),
                "WHILE condition is always FALSE; the body never runs".to_string(),
            );
            self.walk_dead(&stmt.body);
        } else {
            self.loop_body(&stmt.body);
        }
        self.assigned = pre;
        Flow::falls()
    }

    fn fold_repeat(&mut self, stmt: &RepeatStatement) -> Flow {
        let pre = self.assigned.clone();
        let (flow, exits) = self.loop_body(&stmt.body);
        let mut outs = exits;
        if !flow.stops {
            self.apply(collect_expr(&stmt.until));
            outs.push(self.assigned.clone());
        } else {
            let saved = self.reachable;
            self.reachable = false;
            self.apply(collect_expr(&stmt.until));
            self.reachable = saved;
        }
        // the body runs at least once; only an unconditional RETURN stops the block
        let stops = flow.stops && flow.returns && outs.is_empty();
        self.assigned = intersect(outs).unwrap_or(pre);
        Flow { stops, returns: stops, line: flow.line }
    }

    fn fold_exit(&mut self, meta: &NodeMeta) -> Flow {
        if self.reachable {
            let state = self.assigned.clone();
            if let Some(top) = self.exit_states.last_mut() {
                top.push(state);
            }
        }
        Flow { stops: true, returns: false, line: meta.line() }
    }

    fn fold_return(&mut self, meta: &NodeMeta) -> Flow {
        Flow { stops: true, returns: true, line: meta.line() }
    }

    fn fold_call(&mut self, call: &FunctionCall) -> Flow {
        let mut c = AccessCollector::default();
        c.visit_call(call);
        self.apply(c.events);
        Flow::falls()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AstBuilder, RootNode};

    fn pou(root: RootNode) -> Pou {
        match root {
            RootNode::Pou(p) => p,
            _ => unreachable!(),
        }
    }

    #[test]
    fn constant_folding_handles_short_circuit() {
        let b = AstBuilder::new("t.st");
        let consts = HashMap::from([("DEBUG".to_string(), ConstValue::Bool(false))]);
        let expr = b.binary(BinaryOp::And, b.var_ref("DEBUG", 1), b.var_ref("x", 1));
        assert_eq!(ConstEvaluator::new(&consts).eval(&expr), Some(ConstValue::Bool(false)));
        let sum = b.binary(BinaryOp::GreaterThan, b.binary(BinaryOp::Add, b.int(2, 1), b.int(3, 1)), b.int(4, 1));
        assert_eq!(ConstEvaluator::new(&consts).eval(&sum), Some(ConstValue::Bool(true)));
        let div0 = b.binary(BinaryOp::Divide, b.int(1, 1), b.int(0, 1));
        assert_eq!(ConstEvaluator::new(&consts).eval(&div0), None);
    }

    #[test]
    fn assignment_on_one_branch_only_is_not_definite() {
        let b = AstBuilder::new("t.st");
        let p = pou(b.program(
            "P",
            (1, 10),
            vec![b.var_block(VarScope::Local, 2, vec![b.var("x", "INT", 3), b.var("c", "BOOL", 4)])],
            vec![
                b.if_then(6, b.var_ref("c", 6), vec![b.assign(7, "x", b.int(1, 7))]),
                b.assign(9, "c", b.binary(BinaryOp::GreaterThan, b.var_ref("x", 9), b.int(0, 9))),
            ],
        ));
        let strict = DataFlowOptions { strict_initialization: true };
        let flow = analyze_pou(&p, "t.st", &strict);
        let vars: Vec<_> = flow.uninitialized_reads.iter().map(|r| r.variable.as_str()).collect();
        assert_eq!(vars, vec!["c", "x"]);

        let relaxed = analyze_pou(&p, "t.st", &DataFlowOptions::default());
        assert!(relaxed.uninitialized_reads.is_empty(), "INT and BOOL have IEC defaults");
    }

    #[test]
    fn both_branches_assigning_is_definite() {
        let b = AstBuilder::new("t.st");
        let p = pou(b.program(
            "P",
            (1, 10),
            vec![b.var_block(VarScope::Local, 2, vec![b.var("x", "INT", 3)])],
            vec![
                b.if_else(
                    5,
                    b.boolean(true, 5),
                    vec![b.assign(6, "x", b.int(1, 6))],
                    vec![],
                    Some(vec![b.assign(8, "x", b.int(2, 8))]),
                ),
                b.call_stmt(9, "Use", vec![b.var_ref("x", 9)]),
            ],
        ));
        let flow = analyze_pou(&p, "t.st", &DataFlowOptions { strict_initialization: true });
        assert!(flow.uninitialized_reads.is_empty());
        assert_eq!(flow.dead_code.len(), 1);
        assert_eq!(flow.dead_code[0].kind, DeadCodeKind::AlwaysTrueCondition);
    }
}
