//! Pratt expression-precedence parser (spec.md §4.2).
//!
//! Grounded on the teacher's hand-written `Parser` in spirit (manual
//! recursive-descent over a token stream, accumulated errors) but
//! restructured around precedence-climbing since the teacher's actual
//! `parser/mod.rs` delegates to a pest grammar, which this spec's
//! hand-rolled front end has no use for.

pub mod error;

use crate::ast::{Expression, Program, Statement};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
pub use error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Logical,     // && ||
    Equals,      // == !=
    LessGreater, // < <= > >=
    Or,          // | ^
    And,         // &
    Shift,       // << >>
    Sum,         // + -
    Product,     // * / %
    Prefix,      // ! - ~
    Method,      // .
    Call,        // (
    Index,       // [
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::And | TokenKind::Or => Precedence::Logical,
        TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
        TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => {
            Precedence::LessGreater
        }
        TokenKind::Pipe | TokenKind::Caret => Precedence::Or,
        TokenKind::Amp => Precedence::And,
        TokenKind::Shl | TokenKind::Shr => Precedence::Shift,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Asterisk | TokenKind::Slash | TokenKind::Percent => Precedence::Product,
        TokenKind::Dot => Precedence::Method,
        TokenKind::LParen => Precedence::Call,
        TokenKind::LBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
}

impl Parser {
    pub fn new(src: &str) -> Self {
        let mut lexer = Lexer::new(src);
        let mut tokens = Vec::new();
        loop {
            let tok = lexer.next_token();
            let is_illegal = tok.kind == TokenKind::Illegal;
            let is_eof = tok.kind == TokenKind::Eof;
            let line = tok.line;
            tokens.push(tok);
            if is_illegal {
                let msg = lexer
                    .last_error
                    .clone()
                    .unwrap_or_else(|| "illegal token".to_string());
                tokens.push(Token::new(TokenKind::Eof, "", line));
                return Self {
                    tokens,
                    pos: 0,
                    errors: vec![ParseError::new(msg, line)],
                };
            }
            if is_eof {
                break;
            }
        }
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_tok(&self) -> &Token {
        let idx = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn advance(&mut self) -> Token {
        let tok = self.cur().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn cur_is(&self, kind: TokenKind) -> bool {
        self.cur().kind == kind
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek_tok().kind == kind
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.cur_is(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::new(
                format!("expected {:?}, found {:?}", kind, self.cur().kind),
                self.cur().line,
            ))
        }
    }

    fn skip_newlines(&mut self) {
        while self.cur_is(TokenKind::Newline) {
            self.advance();
        }
    }

    /// Parse the whole token stream, accumulating as many errors as
    /// possible rather than stopping at the first one (spec.md §4.2).
    pub fn parse_program(mut self) -> (Program, Vec<ParseError>) {
        let mut statements = Vec::new();

        while !self.cur_is(TokenKind::Eof) {
            if self.cur_is(TokenKind::Newline) {
                self.advance();
                continue;
            }
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    self.errors.push(e);
                    self.advance();
                }
            }
        }

        (Program { statements }, self.errors)
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.cur().kind {
            TokenKind::Var => self.parse_var_statement(),
            TokenKind::Ret => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_var_statement(&mut self) -> Result<Statement, ParseError> {
        let line = self.cur().line;
        self.advance(); // 'var'

        let name_tok = self.expect(TokenKind::Ident)?;
        self.expect(TokenKind::Assign)?;

        let value = self.parse_expression(Precedence::Lowest)?;
        self.end_of_statement()?;

        Ok(Statement::Var {
            name: name_tok.literal,
            value,
            line,
        })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, ParseError> {
        let line = self.cur().line;
        self.advance(); // 'ret'

        if self.cur_is(TokenKind::Newline) || self.cur_is(TokenKind::Eof) || self.cur_is(TokenKind::RBrace) {
            return Ok(Statement::Return { value: None, line });
        }

        let value = self.parse_expression(Precedence::Lowest)?;
        self.end_of_statement()?;

        Ok(Statement::Return {
            value: Some(value),
            line,
        })
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, ParseError> {
        let line = self.cur().line;
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.end_of_statement()?;
        Ok(Statement::Expr { expr, line })
    }

    /// Statements are terminated by a newline or EOF; a closing `}`
    /// also ends the final statement of a block.
    fn end_of_statement(&mut self) -> Result<(), ParseError> {
        if self.cur_is(TokenKind::Newline) {
            self.advance();
        } else if self.cur_is(TokenKind::Eof) || self.cur_is(TokenKind::RBrace) {
            // fine: caller's block/program loop will notice
        } else {
            return Err(ParseError::new(
                format!("expected end of statement, found {:?}", self.cur().kind),
                self.cur().line,
            ));
        }
        Ok(())
    }

    fn parse_block(&mut self) -> Result<Statement, ParseError> {
        let line = self.cur().line;
        self.expect(TokenKind::LBrace)?;
        self.skip_newlines();

        let mut statements = Vec::new();
        while !self.cur_is(TokenKind::RBrace) {
            if self.cur_is(TokenKind::Eof) {
                return Err(ParseError::eof("block", self.cur().line));
            }
            if self.cur_is(TokenKind::Newline) {
                self.advance();
                continue;
            }
            statements.push(self.parse_statement()?);
            self.skip_newlines();
        }
        self.expect(TokenKind::RBrace)?;

        Ok(Statement::Block { statements, line })
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expression, ParseError> {
        let mut left = self.parse_prefix()?;

        while !self.cur_is(TokenKind::Newline)
            && !self.cur_is(TokenKind::Eof)
            && precedence < precedence_of(self.cur().kind)
        {
            left = self.parse_infix(left)?;
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<Expression, ParseError> {
        let tok = self.cur().clone();
        match tok.kind {
            TokenKind::Ident => {
                self.advance();
                Ok(Expression::Ident {
                    name: tok.literal,
                    line: tok.line,
                })
            }
            TokenKind::Int => {
                self.advance();
                let value = parse_int_literal(&tok.literal)
                    .ok_or_else(|| ParseError::new(format!("invalid integer '{}'", tok.literal), tok.line))?;
                Ok(Expression::IntLit {
                    value,
                    line: tok.line,
                })
            }
            TokenKind::Str => {
                self.advance();
                Ok(Expression::StrLit {
                    value: tok.literal,
                    line: tok.line,
                })
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                Ok(Expression::BoolLit {
                    value: tok.kind == TokenKind::True,
                    line: tok.line,
                })
            }
            TokenKind::Bang | TokenKind::Minus | TokenKind::Tilde => {
                self.advance();
                let right = self.parse_expression(Precedence::Prefix)?;
                Ok(Expression::Prefix {
                    op: tok.literal,
                    right: Box::new(right),
                    line: tok.line,
                })
            }
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let expr = self.parse_expression(Precedence::Lowest)?;
                self.skip_newlines();
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_map_literal(),
            TokenKind::If => self.parse_if_expression(),
            TokenKind::Fun => self.parse_function_literal(),
            TokenKind::Try => {
                self.advance();
                let expr = self.parse_expression(Precedence::Lowest)?;
                Ok(Expression::Try {
                    expr: Box::new(expr),
                    line: tok.line,
                })
            }
            other => Err(ParseError::new(
                format!("no prefix parse function for {other:?}"),
                tok.line,
            )),
        }
    }

    fn parse_infix(&mut self, left: Expression) -> Result<Expression, ParseError> {
        let tok = self.cur().clone();
        match tok.kind {
            TokenKind::LParen => self.parse_call(left),
            TokenKind::LBracket => self.parse_index(left),
            TokenKind::Dot => self.parse_method_call(left),
            _ => self.parse_binary(left),
        }
    }

    fn parse_binary(&mut self, left: Expression) -> Result<Expression, ParseError> {
        let tok = self.advance();
        let precedence = precedence_of(tok.kind);
        let right = self.parse_expression(precedence)?;
        Ok(Expression::Infix {
            op: tok.literal,
            left: Box::new(left),
            right: Box::new(right),
            line: tok.line,
        })
    }

    fn parse_call(&mut self, func: Expression) -> Result<Expression, ParseError> {
        let line = self.cur().line;
        let args = self.parse_expr_list(TokenKind::LParen, TokenKind::RParen)?;
        Ok(Expression::Call {
            func: Box::new(func),
            args,
            line,
        })
    }

    fn parse_index(&mut self, target: Expression) -> Result<Expression, ParseError> {
        let line = self.cur().line;
        self.advance(); // '['
        self.skip_newlines();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.skip_newlines();
        self.expect(TokenKind::RBracket)?;
        Ok(Expression::Index {
            target: Box::new(target),
            index: Box::new(index),
            line,
        })
    }

    fn parse_method_call(&mut self, receiver: Expression) -> Result<Expression, ParseError> {
        let line = self.cur().line;
        self.advance(); // '.'
        let name_tok = self.expect(TokenKind::Ident)?;
        let args = if self.cur_is(TokenKind::LParen) {
            self.parse_expr_list(TokenKind::LParen, TokenKind::RParen)?
        } else {
            Vec::new()
        };
        Ok(Expression::MethodCall {
            receiver: Box::new(receiver),
            name: name_tok.literal,
            args,
            line,
        })
    }

    fn parse_expr_list(
        &mut self,
        open: TokenKind,
        close: TokenKind,
    ) -> Result<Vec<Expression>, ParseError> {
        self.expect(open)?;
        self.skip_newlines();

        let mut items = Vec::new();
        if self.cur_is(close) {
            self.advance();
            return Ok(items);
        }

        items.push(self.parse_expression(Precedence::Lowest)?);
        self.skip_newlines();
        while self.cur_is(TokenKind::Comma) {
            self.advance();
            self.skip_newlines();
            items.push(self.parse_expression(Precedence::Lowest)?);
            self.skip_newlines();
        }

        self.skip_newlines();
        self.expect(close)?;
        Ok(items)
    }

    fn parse_array_literal(&mut self) -> Result<Expression, ParseError> {
        let line = self.cur().line;
        let items = self.parse_expr_list(TokenKind::LBracket, TokenKind::RBracket)?;
        Ok(Expression::ArrayLit { items, line })
    }

    fn parse_map_literal(&mut self) -> Result<Expression, ParseError> {
        let line = self.cur().line;
        self.expect(TokenKind::LBrace)?;
        self.skip_newlines();

        let mut pairs = Vec::new();
        while !self.cur_is(TokenKind::RBrace) {
            if self.cur_is(TokenKind::Eof) {
                return Err(ParseError::eof("map literal", self.cur().line));
            }
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect(TokenKind::Colon)?;
            self.skip_newlines();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            self.skip_newlines();
            if self.cur_is(TokenKind::Comma) {
                self.advance();
                self.skip_newlines();
            } else {
                break;
            }
        }
        self.skip_newlines();
        self.expect(TokenKind::RBrace)?;

        Ok(Expression::MapLit { pairs, line })
    }

    fn parse_if_expression(&mut self) -> Result<Expression, ParseError> {
        let line = self.cur().line;
        self.advance(); // 'if'

        let cond = self.parse_expression(Precedence::Lowest)?;
        let cons = self.parse_block()?;

        let alt = if self.cur_is(TokenKind::Else) {
            self.advance();
            Some(Box::new(self.parse_block()?))
        } else {
            None
        };

        Ok(Expression::If {
            cond: Box::new(cond),
            cons: Box::new(cons),
            alt,
            line,
        })
    }

    fn parse_function_literal(&mut self) -> Result<Expression, ParseError> {
        let line = self.cur().line;
        self.advance(); // 'fun'
        self.expect(TokenKind::LParen)?;

        let mut params = Vec::new();
        if !self.cur_is(TokenKind::RParen) {
            let first = self.expect(TokenKind::Ident)?;
            params.push(first.literal);
            while self.cur_is(TokenKind::Comma) {
                self.advance();
                let next = self.expect(TokenKind::Ident)?;
                params.push(next.literal);
            }
        }
        self.expect(TokenKind::RParen)?;

        let body = self.parse_block()?;

        Ok(Expression::FunLit {
            params,
            body: Box::new(body),
            line,
        })
    }
}

fn parse_int_literal(literal: &str) -> Option<i64> {
    if let Some(hex) = literal.strip_prefix("0x").or_else(|| literal.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else {
        literal.parse::<i64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Program {
        let (program, errors) = Parser::new(src).parse_program();
        assert!(errors.is_empty(), "unexpected parse errors: {errors:?}");
        program
    }

    #[test]
    fn parses_var_statement() {
        let program = parse_ok("var x = 1 + 2");
        assert_eq!(program.statements.len(), 1);
        assert!(matches!(program.statements[0], Statement::Var { .. }));
    }

    #[test]
    fn precedence_groups_product_over_sum() {
        let program = parse_ok("1 + 2 * 3");
        let Statement::Expr { expr, .. } = &program.statements[0] else {
            panic!("expected expr statement");
        };
        let Expression::Infix { op, left, right, .. } = expr else {
            panic!("expected infix");
        };
        assert_eq!(op, "+");
        assert!(matches!(**left, Expression::IntLit { value: 1, .. }));
        assert!(matches!(**right, Expression::Infix { .. }));
    }

    #[test]
    fn method_call_binds_tighter_than_call() {
        let program = parse_ok("a.b(c)");
        let Statement::Expr { expr, .. } = &program.statements[0] else {
            panic!("expected expr statement");
        };
        assert!(matches!(expr, Expression::MethodCall { .. }));
    }

    #[test]
    fn if_else_without_parens() {
        let program = parse_ok("if x { 1 } else { 2 }");
        let Statement::Expr { expr, .. } = &program.statements[0] else {
            panic!("expected expr statement");
        };
        assert!(matches!(expr, Expression::If { alt: Some(_), .. }));
    }

    #[test]
    fn accumulates_multiple_errors() {
        let (_, errors) = Parser::new("var = 1\nvar y 2").parse_program();
        assert!(errors.len() >= 2, "expected multiple errors, got {errors:?}");
    }

    #[test]
    fn try_is_lowest_precedence_prefix() {
        let program = parse_ok("ret try 1 / x");
        let Statement::Return { value: Some(expr), .. } = &program.statements[0] else {
            panic!("expected return with value");
        };
        assert!(matches!(expr, Expression::Try { .. }));
    }
}
