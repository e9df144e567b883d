//! Structured Text node model.
//!
//! The node universe is closed: every concrete kind is a variant of one of the
//! enums below, so adding a kind breaks every exhaustive `match` until the
//! traversal code handles it.
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Arena handle of a node inside one [`SyntaxTree`](super::tree::SyntaxTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 1-based source positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Span {
    pub fn new(start_line: usize, start_column: usize, end_line: usize, end_column: usize) -> Self {
        Self { start_line, start_column, end_line, end_column }
    }

    pub fn line(line: usize) -> Self {
        Self::new(line, 1, line, 1)
    }

    pub fn lines(start_line: usize, end_line: usize) -> Self {
        Self::new(start_line, 1, end_line, 1)
    }
}

/// Identity and position shared by every node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMeta {
    pub id: NodeId,
    pub file: Arc<str>,
    pub span: Span,
}

impl NodeMeta {
    pub fn line(&self) -> usize {
        self.span.start_line
    }
}

/// Fieldless tag of every concrete node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Program,
    FunctionBlock,
    Function,
    GlobalVarList,
    VarDeclList,
    VarDecl,
    Assignment,
    If,
    Case,
    For,
    While,
    Repeat,
    Exit,
    Return,
    BinaryExpr,
    UnaryExpr,
    Literal,
    VariableRef,
    FunctionCall,
    DataTypeDecl,
    StructType,
    EnumType,
}

impl NodeKind {
    pub fn is_pou(self) -> bool {
        matches!(self, NodeKind::Program | NodeKind::FunctionBlock | NodeKind::Function)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// ---------------------------------------------------------------------------
// Program organisation units
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum PouKind {
    Program,
    FunctionBlock { extends: Option<String>, implements: Vec<String> },
    Function { return_type: String },
}

/// A program, function block or function.
#[derive(Debug, Clone, PartialEq)]
pub struct Pou {
    pub meta: NodeMeta,
    pub kind: PouKind,
    pub name: String,
    pub var_blocks: Vec<VarDeclList>,
    pub body: Vec<Statement>,
}

impl Pou {
    pub fn node_kind(&self) -> NodeKind {
        match self.kind {
            PouKind::Program => NodeKind::Program,
            PouKind::FunctionBlock { .. } => NodeKind::FunctionBlock,
            PouKind::Function { .. } => NodeKind::Function,
        }
    }

    /// Keyword used for the POU in source and in graph exports.
    pub fn type_label(&self) -> &'static str {
        match self.kind {
            PouKind::Program => "PROGRAM",
            PouKind::FunctionBlock { .. } => "FUNCTION_BLOCK",
            PouKind::Function { .. } => "FUNCTION",
        }
    }

    pub fn variables(&self) -> impl Iterator<Item = (&VarDeclList, &VarDecl)> {
        self.var_blocks
            .iter()
            .flat_map(|block| block.variables.iter().map(move |v| (block, v)))
    }

    pub fn parameter_count(&self) -> usize {
        self.var_blocks
            .iter()
            .filter(|b| matches!(b.scope, VarScope::Input | VarScope::InOut))
            .map(|b| b.variables.len())
            .sum()
    }
}

/// Global variable list (GVL).
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVarList {
    pub meta: NodeMeta,
    pub name: String,
    pub var_blocks: Vec<VarDeclList>,
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarScope {
    Local,
    Input,
    Output,
    InOut,
    Global,
    External,
    Temp,
}

impl VarScope {
    pub fn keyword(self) -> &'static str {
        match self {
            VarScope::Local => "VAR",
            VarScope::Input => "VAR_INPUT",
            VarScope::Output => "VAR_OUTPUT",
            VarScope::InOut => "VAR_IN_OUT",
            VarScope::Global => "VAR_GLOBAL",
            VarScope::External => "VAR_EXTERNAL",
            VarScope::Temp => "VAR_TEMP",
        }
    }

    /// Interface variables are written or read by callers.
    pub fn is_interface(self) -> bool {
        matches!(self, VarScope::Input | VarScope::Output | VarScope::InOut)
    }

    pub fn is_global(self) -> bool {
        matches!(self, VarScope::Global | VarScope::External)
    }
}

impl fmt::Display for VarScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclList {
    pub meta: NodeMeta,
    pub scope: VarScope,
    pub constant: bool,
    pub variables: Vec<VarDecl>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayRange {
    pub lower: i64,
    pub upper: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub meta: NodeMeta,
    pub name: String,
    pub data_type: String,
    pub initial_value: Option<Expression>,
    pub array_ranges: Vec<ArrayRange>,
    pub pointer: bool,
    pub reference: bool,
    /// Direct address from an `AT %IX1.0` clause.
    pub address: Option<String>,
}

impl VarDecl {
    pub fn is_array(&self) -> bool {
        !self.array_ranges.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Assignment(Assignment),
    If(IfStatement),
    Case(CaseStatement),
    For(ForStatement),
    While(WhileStatement),
    Repeat(RepeatStatement),
    Exit(NodeMeta),
    Return(NodeMeta),
    /// A call used as a statement, e.g. an FB instance invocation.
    Call(FunctionCall),
}

impl Statement {
    pub fn meta(&self) -> &NodeMeta {
        match self {
            Statement::Assignment(s) => &s.meta,
            Statement::If(s) => &s.meta,
            Statement::Case(s) => &s.meta,
            Statement::For(s) => &s.meta,
            Statement::While(s) => &s.meta,
            Statement::Repeat(s) => &s.meta,
            Statement::Exit(m) | Statement::Return(m) => m,
            Statement::Call(c) => &c.meta,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Statement::Assignment(_) => NodeKind::Assignment,
            Statement::If(_) => NodeKind::If,
            Statement::Case(_) => NodeKind::Case,
            Statement::For(_) => NodeKind::For,
            Statement::While(_) => NodeKind::While,
            Statement::Repeat(_) => NodeKind::Repeat,
            Statement::Exit(_) => NodeKind::Exit,
            Statement::Return(_) => NodeKind::Return,
            Statement::Call(_) => NodeKind::FunctionCall,
        }
    }

    pub fn line(&self) -> usize {
        self.meta().line()
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, Statement::For(_) | Statement::While(_) | Statement::Repeat(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub meta: NodeMeta,
    pub target: VariableRef,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElsifClause {
    pub span: Span,
    pub condition: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub meta: NodeMeta,
    pub condition: Expression,
    pub then_body: Vec<Statement>,
    pub elsif: Vec<ElsifClause>,
    pub else_body: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseElement {
    pub span: Span,
    pub values: Vec<Expression>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseStatement {
    pub meta: NodeMeta,
    pub selector: Expression,
    pub elements: Vec<CaseElement>,
    pub else_body: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    pub meta: NodeMeta,
    pub variable: VariableRef,
    pub start: Expression,
    pub end: Expression,
    pub step: Option<Expression>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStatement {
    pub meta: NodeMeta,
    pub condition: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepeatStatement {
    pub meta: NodeMeta,
    pub body: Vec<Statement>,
    pub until: Expression,
}

// ---------------------------------------------------------------------------
// Expressions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "MOD",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "<>",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Xor => "XOR",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::LessThan
                | BinaryOp::LessThanOrEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanOrEqual
        )
    }

    /// Short-circuit style operators that add a decision to a condition.
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiteralKind {
    Integer,
    Real,
    String,
    WString,
    Boolean,
    Time,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    Literal(LiteralExpr),
    Variable(VariableRef),
    Call(FunctionCall),
}

impl Expression {
    pub fn meta(&self) -> &NodeMeta {
        match self {
            Expression::Binary(e) => &e.meta,
            Expression::Unary(e) => &e.meta,
            Expression::Literal(e) => &e.meta,
            Expression::Variable(e) => &e.meta,
            Expression::Call(e) => &e.meta,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Expression::Binary(_) => NodeKind::BinaryExpr,
            Expression::Unary(_) => NodeKind::UnaryExpr,
            Expression::Literal(_) => NodeKind::Literal,
            Expression::Variable(_) => NodeKind::VariableRef,
            Expression::Call(_) => NodeKind::FunctionCall,
        }
    }

    pub fn line(&self) -> usize {
        self.meta().line()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub meta: NodeMeta,
    pub op: BinaryOp,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpr {
    pub meta: NodeMeta,
    pub op: UnaryOp,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiteralExpr {
    pub meta: NodeMeta,
    pub kind: LiteralKind,
    pub value: String,
}

impl LiteralExpr {
    pub fn as_bool(&self) -> Option<bool> {
        if self.kind != LiteralKind::Boolean {
            return None;
        }
        match self.value.to_ascii_uppercase().as_str() {
            "TRUE" | "1" => Some(true),
            "FALSE" | "0" => Some(false),
            _ => None,
        }
    }

    /// Integer value, accepting `_` separators and `16#`/`8#`/`2#` prefixes.
    pub fn as_i64(&self) -> Option<i64> {
        if self.kind != LiteralKind::Integer {
            return None;
        }
        let text = self.value.replace('_', "");
        let (radix, digits) = match text.split_once('#') {
            Some((base, rest)) => (base.parse::<u32>().ok()?, rest.to_string()),
            None => (10, text),
        };
        i64::from_str_radix(&digits, radix).ok()
    }
}

/// `name.field[idx]^` style access.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableRef {
    pub meta: NodeMeta,
    pub name: String,
    pub field_path: Vec<String>,
    pub indices: Vec<Expression>,
    pub dereference: bool,
}

impl VariableRef {
    pub fn qualified_name(&self) -> String {
        if self.field_path.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.field_path.join("."))
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallArg {
    /// Formal parameter name for `name := value` / `name => target` arguments.
    pub name: Option<String>,
    pub value: Expression,
    /// True for output bindings (`=>`).
    pub output: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub meta: NodeMeta,
    pub name: String,
    pub args: Vec<CallArg>,
}

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataTypeKind {
    Struct,
    Enum,
    Alias,
    Union,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    pub meta: NodeMeta,
    pub fields: Vec<VarDecl>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub name: String,
    pub value: Option<i64>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub meta: NodeMeta,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    Struct(StructType),
    Union(StructType),
    Enum(EnumType),
    Alias(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataTypeDecl {
    pub meta: NodeMeta,
    pub name: String,
    pub definition: TypeDefinition,
}

impl DataTypeDecl {
    pub fn kind(&self) -> DataTypeKind {
        match self.definition {
            TypeDefinition::Struct(_) => DataTypeKind::Struct,
            TypeDefinition::Union(_) => DataTypeKind::Union,
            TypeDefinition::Enum(_) => DataTypeKind::Enum,
            TypeDefinition::Alias(_) => DataTypeKind::Alias,
        }
    }
}

// ---------------------------------------------------------------------------
// Roots and borrowed views
// ---------------------------------------------------------------------------

/// Top-level node of one source file.
#[derive(Debug, Clone, PartialEq)]
pub enum RootNode {
    Pou(Pou),
    GlobalVars(GlobalVarList),
    DataType(DataTypeDecl),
}

impl RootNode {
    pub fn meta(&self) -> &NodeMeta {
        match self {
            RootNode::Pou(p) => &p.meta,
            RootNode::GlobalVars(g) => &g.meta,
            RootNode::DataType(d) => &d.meta,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RootNode::Pou(p) => &p.name,
            RootNode::GlobalVars(g) => &g.name,
            RootNode::DataType(d) => &d.name,
        }
    }
}

/// Borrowed view over any node, used by generic (non-typed) traversals.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Pou(&'a Pou),
    GlobalVars(&'a GlobalVarList),
    VarDeclList(&'a VarDeclList),
    VarDecl(&'a VarDecl),
    Statement(&'a Statement),
    Expression(&'a Expression),
    /// Assignment or loop-variable target.
    Target(&'a VariableRef),
    DataType(&'a DataTypeDecl),
    Struct(&'a StructType),
    Enum(&'a EnumType),
}

impl<'a> NodeRef<'a> {
    pub fn meta(&self) -> &'a NodeMeta {
        match *self {
            NodeRef::Pou(n) => &n.meta,
            NodeRef::GlobalVars(n) => &n.meta,
            NodeRef::VarDeclList(n) => &n.meta,
            NodeRef::VarDecl(n) => &n.meta,
            NodeRef::Statement(n) => n.meta(),
            NodeRef::Expression(n) => n.meta(),
            NodeRef::Target(n) => &n.meta,
            NodeRef::DataType(n) => &n.meta,
            NodeRef::Struct(n) => &n.meta,
            NodeRef::Enum(n) => &n.meta,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match *self {
            NodeRef::Pou(n) => n.node_kind(),
            NodeRef::GlobalVars(_) => NodeKind::GlobalVarList,
            NodeRef::VarDeclList(_) => NodeKind::VarDeclList,
            NodeRef::VarDecl(_) => NodeKind::VarDecl,
            NodeRef::Statement(n) => n.kind(),
            NodeRef::Expression(n) => n.kind(),
            NodeRef::Target(_) => NodeKind::VariableRef,
            NodeRef::DataType(_) => NodeKind::DataTypeDecl,
            NodeRef::Struct(_) => NodeKind::StructType,
            NodeRef::Enum(_) => NodeKind::EnumType,
        }
    }

    pub fn id(&self) -> NodeId {
        self.meta().id
    }

    /// Direct children in source order.
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        let mut out = Vec::new();
        match *self {
            NodeRef::Pou(p) => {
                out.extend(p.var_blocks.iter().map(NodeRef::VarDeclList));
                out.extend(p.body.iter().map(NodeRef::Statement));
            }
            NodeRef::GlobalVars(g) => out.extend(g.var_blocks.iter().map(NodeRef::VarDeclList)),
            NodeRef::VarDeclList(b) => out.extend(b.variables.iter().map(NodeRef::VarDecl)),
            NodeRef::VarDecl(v) => out.extend(v.initial_value.iter().map(NodeRef::Expression)),
            NodeRef::Statement(s) => statement_children(s, &mut out),
            NodeRef::Expression(e) => match e {
                Expression::Binary(b) => {
                    out.push(NodeRef::Expression(&b.left));
                    out.push(NodeRef::Expression(&b.right));
                }
                Expression::Unary(u) => out.push(NodeRef::Expression(&u.operand)),
                Expression::Literal(_) => {}
                Expression::Variable(v) => out.extend(v.indices.iter().map(NodeRef::Expression)),
                Expression::Call(c) => out.extend(c.args.iter().map(|a| NodeRef::Expression(&a.value))),
            },
            NodeRef::Target(v) => out.extend(v.indices.iter().map(NodeRef::Expression)),
            NodeRef::DataType(d) => match &d.definition {
                TypeDefinition::Struct(s) | TypeDefinition::Union(s) => out.push(NodeRef::Struct(s)),
                TypeDefinition::Enum(e) => out.push(NodeRef::Enum(e)),
                TypeDefinition::Alias(_) => {}
            },
            NodeRef::Struct(s) => out.extend(s.fields.iter().map(NodeRef::VarDecl)),
            NodeRef::Enum(_) => {}
        }
        out
    }
}

fn statement_children<'a>(stmt: &'a Statement, out: &mut Vec<NodeRef<'a>>) {
    match stmt {
        Statement::Assignment(a) => {
            out.push(NodeRef::Target(&a.target));
            out.push(NodeRef::Expression(&a.value));
        }
        Statement::If(s) => {
            out.push(NodeRef::Expression(&s.condition));
            out.extend(s.then_body.iter().map(NodeRef::Statement));
            for clause in &s.elsif {
                out.push(NodeRef::Expression(&clause.condition));
                out.extend(clause.body.iter().map(NodeRef::Statement));
            }
            if let Some(body) = &s.else_body {
                out.extend(body.iter().map(NodeRef::Statement));
            }
        }
        Statement::Case(s) => {
            out.push(NodeRef::Expression(&s.selector));
            for element in &s.elements {
                out.extend(element.values.iter().map(NodeRef::Expression));
                out.extend(element.body.iter().map(NodeRef::Statement));
            }
            if let Some(body) = &s.else_body {
                out.extend(body.iter().map(NodeRef::Statement));
            }
        }
        Statement::For(s) => {
            out.push(NodeRef::Target(&s.variable));
            out.push(NodeRef::Expression(&s.start));
            out.push(NodeRef::Expression(&s.end));
            out.extend(s.step.iter().map(NodeRef::Expression));
            out.extend(s.body.iter().map(NodeRef::Statement));
        }
        Statement::While(s) => {
            out.push(NodeRef::Expression(&s.condition));
            out.extend(s.body.iter().map(NodeRef::Statement));
        }
        Statement::Repeat(s) => {
            out.extend(s.body.iter().map(NodeRef::Statement));
            out.push(NodeRef::Expression(&s.until));
        }
        Statement::Exit(_) | Statement::Return(_) => {}
        Statement::Call(c) => out.extend(c.args.iter().map(|a| NodeRef::Expression(&a.value))),
    }
}

impl<'a> From<&'a RootNode> for NodeRef<'a> {
    fn from(root: &'a RootNode) -> Self {
        match root {
            RootNode::Pou(p) => NodeRef::Pou(p),
            RootNode::GlobalVars(g) => NodeRef::GlobalVars(g),
            RootNode::DataType(d) => NodeRef::DataType(d),
        }
    }
}
