//! Abstract syntax tree produced by the parser.
//!
//! Every node carries the source line it started on so the evaluator
//! can attach it to diagnostics (spec.md §3.2, §4.3).

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Var {
        name: String,
        value: Expression,
        line: usize,
    },
    Return {
        value: Option<Expression>,
        line: usize,
    },
    Block {
        statements: Vec<Statement>,
        line: usize,
    },
    Expr {
        expr: Expression,
        line: usize,
    },
    NoOp,
}

impl Statement {
    pub fn line(&self) -> usize {
        match self {
            Statement::Var { line, .. }
            | Statement::Return { line, .. }
            | Statement::Block { line, .. }
            | Statement::Expr { line, .. } => *line,
            Statement::NoOp => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Ident {
        name: String,
        line: usize,
    },
    IntLit {
        value: i64,
        line: usize,
    },
    BoolLit {
        value: bool,
        line: usize,
    },
    StrLit {
        value: String,
        line: usize,
    },
    ArrayLit {
        items: Vec<Expression>,
        line: usize,
    },
    MapLit {
        pairs: Vec<(Expression, Expression)>,
        line: usize,
    },
    Prefix {
        op: String,
        right: Box<Expression>,
        line: usize,
    },
    Infix {
        op: String,
        left: Box<Expression>,
        right: Box<Expression>,
        line: usize,
    },
    If {
        cond: Box<Expression>,
        cons: Box<Statement>,
        alt: Option<Box<Statement>>,
        line: usize,
    },
    FunLit {
        params: Vec<String>,
        body: Box<Statement>,
        line: usize,
    },
    Call {
        func: Box<Expression>,
        args: Vec<Expression>,
        line: usize,
    },
    MethodCall {
        receiver: Box<Expression>,
        name: String,
        args: Vec<Expression>,
        line: usize,
    },
    Index {
        target: Box<Expression>,
        index: Box<Expression>,
        line: usize,
    },
    Try {
        expr: Box<Expression>,
        line: usize,
    },
}

impl Expression {
    pub fn line(&self) -> usize {
        match self {
            Expression::Ident { line, .. }
            | Expression::IntLit { line, .. }
            | Expression::BoolLit { line, .. }
            | Expression::StrLit { line, .. }
            | Expression::ArrayLit { line, .. }
            | Expression::MapLit { line, .. }
            | Expression::Prefix { line, .. }
            | Expression::Infix { line, .. }
            | Expression::If { line, .. }
            | Expression::FunLit { line, .. }
            | Expression::Call { line, .. }
            | Expression::MethodCall { line, .. }
            | Expression::Index { line, .. }
            | Expression::Try { line, .. } => *line,
        }
    }
}

/// A parsed program: a flat sequence of top-level statements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}
