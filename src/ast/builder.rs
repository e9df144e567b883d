//! Programmatic construction of syntax trees.
//!
//! The grammar front-end lives outside this crate; parsers and tests use
//! [`AstBuilder`] to emit nodes with unique ids and consistent positions.
use std::cell::Cell;
use std::sync::Arc;

use super::nodes::*;

pub struct AstBuilder {
    file: Arc<str>,
    next_id: Cell<u32>,
}

fn body_end(start: usize, body: &[Statement]) -> usize {
    body.iter().map(|s| s.meta().span.end_line).max().unwrap_or(start).max(start)
}

impl AstBuilder {
    pub fn new(file: &str) -> Self {
        Self { file: Arc::from(file), next_id: Cell::new(0) }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn meta(&self, span: Span) -> NodeMeta {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        NodeMeta { id: NodeId(id), file: Arc::clone(&self.file), span }
    }

    pub fn at(&self, line: usize) -> NodeMeta {
        self.meta(Span::line(line))
    }

    // -- POUs ---------------------------------------------------------------

    pub fn pou(
        &self,
        kind: PouKind,
        name: &str,
        lines: (usize, usize),
        var_blocks: Vec<VarDeclList>,
        body: Vec<Statement>,
    ) -> Pou {
        Pou {
            meta: self.meta(Span::lines(lines.0, lines.1)),
            kind,
            name: name.to_string(),
            var_blocks,
            body,
        }
    }

    pub fn program(&self, name: &str, lines: (usize, usize), var_blocks: Vec<VarDeclList>, body: Vec<Statement>) -> RootNode {
        RootNode::Pou(self.pou(PouKind::Program, name, lines, var_blocks, body))
    }

    pub fn function_block(&self, name: &str, lines: (usize, usize), var_blocks: Vec<VarDeclList>, body: Vec<Statement>) -> RootNode {
        let kind = PouKind::FunctionBlock { extends: None, implements: Vec::new() };
        RootNode::Pou(self.pou(kind, name, lines, var_blocks, body))
    }

    pub fn function(
        &self,
        name: &str,
        return_type: &str,
        lines: (usize, usize),
        var_blocks: Vec<VarDeclList>,
        body: Vec<Statement>,
    ) -> RootNode {
        let kind = PouKind::Function { return_type: return_type.to_string() };
        RootNode::Pou(self.pou(kind, name, lines, var_blocks, body))
    }

    pub fn global_vars(&self, name: &str, line: usize, var_blocks: Vec<VarDeclList>) -> RootNode {
        let end = var_blocks.iter().map(|b| b.meta.span.end_line).max().unwrap_or(line);
        RootNode::GlobalVars(GlobalVarList {
            meta: self.meta(Span::lines(line, end)),
            name: name.to_string(),
            var_blocks,
        })
    }

    // -- declarations -------------------------------------------------------

    pub fn var_block(&self, scope: VarScope, line: usize, variables: Vec<VarDecl>) -> VarDeclList {
        let end = variables.iter().map(|v| v.meta.span.end_line).max().unwrap_or(line) + 1;
        VarDeclList { meta: self.meta(Span::lines(line, end)), scope, constant: false, variables }
    }

    pub fn constant_block(&self, scope: VarScope, line: usize, variables: Vec<VarDecl>) -> VarDeclList {
        VarDeclList { constant: true, ..self.var_block(scope, line, variables) }
    }

    pub fn var(&self, name: &str, data_type: &str, line: usize) -> VarDecl {
        VarDecl {
            meta: self.at(line),
            name: name.to_string(),
            data_type: data_type.to_string(),
            initial_value: None,
            array_ranges: Vec::new(),
            pointer: data_type.to_ascii_uppercase().starts_with("POINTER TO"),
            reference: data_type.to_ascii_uppercase().starts_with("REFERENCE TO"),
            address: None,
        }
    }

    pub fn var_init(&self, name: &str, data_type: &str, init: Expression, line: usize) -> VarDecl {
        VarDecl { initial_value: Some(init), ..self.var(name, data_type, line) }
    }

    pub fn var_at(&self, name: &str, data_type: &str, address: &str, line: usize) -> VarDecl {
        VarDecl { address: Some(address.to_string()), ..self.var(name, data_type, line) }
    }

    pub fn array_var(&self, name: &str, element_type: &str, lower: i64, upper: i64, line: usize) -> VarDecl {
        VarDecl {
            array_ranges: vec![ArrayRange { lower, upper }],
            ..self.var(name, &format!("ARRAY[{lower}..{upper}] OF {element_type}"), line)
        }
    }

    // -- statements ---------------------------------------------------------

    pub fn assign(&self, line: usize, target: &str, value: Expression) -> Statement {
        let target = self.target(target, line);
        self.assign_to(line, target, value)
    }

    pub fn assign_to(&self, line: usize, target: VariableRef, value: Expression) -> Statement {
        Statement::Assignment(Assignment { meta: self.at(line), target, value })
    }

    pub fn if_then(&self, line: usize, condition: Expression, then_body: Vec<Statement>) -> Statement {
        self.if_else(line, condition, then_body, Vec::new(), None)
    }

    pub fn if_else(
        &self,
        line: usize,
        condition: Expression,
        then_body: Vec<Statement>,
        elsif: Vec<(Expression, Vec<Statement>)>,
        else_body: Option<Vec<Statement>>,
    ) -> Statement {
        let mut end = body_end(line, &then_body);
        let elsif = elsif
            .into_iter()
            .map(|(condition, body)| {
                let start = condition.line();
                let clause_end = body_end(start, &body);
                end = end.max(clause_end);
                ElsifClause { span: Span::lines(start, clause_end), condition, body }
            })
            .collect();
        if let Some(body) = &else_body {
            end = end.max(body_end(line, body));
        }
        Statement::If(IfStatement {
            meta: self.meta(Span::lines(line, end + 1)),
            condition,
            then_body,
            elsif,
            else_body,
        })
    }

    pub fn case(
        &self,
        line: usize,
        selector: Expression,
        elements: Vec<(Vec<Expression>, Vec<Statement>)>,
        else_body: Option<Vec<Statement>>,
    ) -> Statement {
        let mut end = line;
        let elements = elements
            .into_iter()
            .map(|(values, body)| {
                let start = values.first().map(Expression::line).unwrap_or(line);
                let element_end = body_end(start, &body);
                end = end.max(element_end);
                CaseElement { span: Span::lines(start, element_end), values, body }
            })
            .collect();
        if let Some(body) = &else_body {
            end = end.max(body_end(line, body));
        }
        Statement::Case(CaseStatement {
            meta: self.meta(Span::lines(line, end + 1)),
            selector,
            elements,
            else_body,
        })
    }

    pub fn for_loop(
        &self,
        line: usize,
        variable: &str,
        start: Expression,
        end: Expression,
        step: Option<Expression>,
        body: Vec<Statement>,
    ) -> Statement {
        let last = body_end(line, &body);
        Statement::For(ForStatement {
            meta: self.meta(Span::lines(line, last + 1)),
            variable: self.target(variable, line),
            start,
            end,
            step,
            body,
        })
    }

    pub fn while_loop(&self, line: usize, condition: Expression, body: Vec<Statement>) -> Statement {
        let last = body_end(line, &body);
        Statement::While(WhileStatement { meta: self.meta(Span::lines(line, last + 1)), condition, body })
    }

    pub fn repeat_until(&self, line: usize, body: Vec<Statement>, until: Expression) -> Statement {
        let last = body_end(line, &body).max(until.line());
        Statement::Repeat(RepeatStatement { meta: self.meta(Span::lines(line, last)), body, until })
    }

    pub fn exit(&self, line: usize) -> Statement {
        Statement::Exit(self.at(line))
    }

    pub fn ret(&self, line: usize) -> Statement {
        Statement::Return(self.at(line))
    }

    pub fn call_stmt(&self, line: usize, name: &str, args: Vec<Expression>) -> Statement {
        Statement::Call(self.function_call(name, args, line))
    }

    pub fn call_stmt_named(&self, line: usize, name: &str, args: Vec<(&str, Expression)>) -> Statement {
        let args = args
            .into_iter()
            .map(|(n, value)| CallArg { name: Some(n.to_string()), value, output: false })
            .collect();
        Statement::Call(FunctionCall { meta: self.at(line), name: name.to_string(), args })
    }

    // -- expressions --------------------------------------------------------

    fn literal(&self, kind: LiteralKind, value: String, line: usize) -> Expression {
        Expression::Literal(LiteralExpr { meta: self.at(line), kind, value })
    }

    pub fn int(&self, value: i64, line: usize) -> Expression {
        self.literal(LiteralKind::Integer, value.to_string(), line)
    }

    pub fn real(&self, value: &str, line: usize) -> Expression {
        self.literal(LiteralKind::Real, value.to_string(), line)
    }

    pub fn boolean(&self, value: bool, line: usize) -> Expression {
        self.literal(LiteralKind::Boolean, if value { "TRUE" } else { "FALSE" }.to_string(), line)
    }

    pub fn string(&self, value: &str, line: usize) -> Expression {
        self.literal(LiteralKind::String, value.to_string(), line)
    }

    pub fn time(&self, value: &str, line: usize) -> Expression {
        self.literal(LiteralKind::Time, value.to_string(), line)
    }

    pub fn target(&self, name: &str, line: usize) -> VariableRef {
        VariableRef {
            meta: self.at(line),
            name: name.to_string(),
            field_path: Vec::new(),
            indices: Vec::new(),
            dereference: false,
        }
    }

    pub fn var_ref(&self, name: &str, line: usize) -> Expression {
        Expression::Variable(self.target(name, line))
    }

    pub fn field(&self, name: &str, fields: &[&str], line: usize) -> Expression {
        let mut var = self.target(name, line);
        var.field_path = fields.iter().map(|f| f.to_string()).collect();
        Expression::Variable(var)
    }

    pub fn index(&self, name: &str, index: Expression, line: usize) -> Expression {
        let mut var = self.target(name, line);
        var.indices.push(index);
        Expression::Variable(var)
    }

    pub fn deref(&self, name: &str, line: usize) -> Expression {
        let mut var = self.target(name, line);
        var.dereference = true;
        Expression::Variable(var)
    }

    pub fn binary(&self, op: BinaryOp, left: Expression, right: Expression) -> Expression {
        let span = Span::new(
            left.meta().span.start_line,
            left.meta().span.start_column,
            right.meta().span.end_line,
            right.meta().span.end_column,
        );
        Expression::Binary(BinaryExpr { meta: self.meta(span), op, left: Box::new(left), right: Box::new(right) })
    }

    pub fn not(&self, operand: Expression) -> Expression {
        let line = operand.line();
        Expression::Unary(UnaryExpr { meta: self.at(line), op: UnaryOp::Not, operand: Box::new(operand) })
    }

    pub fn neg(&self, operand: Expression) -> Expression {
        let line = operand.line();
        Expression::Unary(UnaryExpr { meta: self.at(line), op: UnaryOp::Minus, operand: Box::new(operand) })
    }

    pub fn function_call(&self, name: &str, args: Vec<Expression>, line: usize) -> FunctionCall {
        FunctionCall {
            meta: self.at(line),
            name: name.to_string(),
            args: args.into_iter().map(|value| CallArg { name: None, value, output: false }).collect(),
        }
    }

    pub fn call(&self, name: &str, args: Vec<Expression>, line: usize) -> Expression {
        Expression::Call(self.function_call(name, args, line))
    }

    // -- data types ---------------------------------------------------------

    pub fn struct_type(&self, name: &str, line: usize, fields: Vec<VarDecl>) -> RootNode {
        let end = fields.iter().map(|f| f.meta.span.end_line).max().unwrap_or(line) + 1;
        RootNode::DataType(DataTypeDecl {
            meta: self.meta(Span::lines(line, end)),
            name: name.to_string(),
            definition: TypeDefinition::Struct(StructType { meta: self.meta(Span::lines(line, end)), fields }),
        })
    }

    pub fn enum_type(&self, name: &str, line: usize, values: &[(&str, Option<i64>)]) -> RootNode {
        let values: Vec<EnumValue> = values
            .iter()
            .enumerate()
            .map(|(i, (n, v))| EnumValue { name: n.to_string(), value: *v, line: line + 1 + i })
            .collect();
        let end = line + values.len() + 1;
        RootNode::DataType(DataTypeDecl {
            meta: self.meta(Span::lines(line, end)),
            name: name.to_string(),
            definition: TypeDefinition::Enum(EnumType { meta: self.meta(Span::lines(line, end)), values }),
        })
    }

    pub fn alias_type(&self, name: &str, line: usize, target: &str) -> RootNode {
        RootNode::DataType(DataTypeDecl {
            meta: self.at(line),
            name: name.to_string(),
            definition: TypeDefinition::Alias(target.to_string()),
        })
    }
}
