//! Primary expression parsing.
//!
//! Handles:
//! - Unary operators: `-`, `+`, `~` (a sign directly before a numeric
//!   literal is folded into the literal)
//! - Literals: integers, floats, strings, bytes, booleans, NULL, arrays
//! - Parameters (@name)
//! - Function calls for known function names
//! - Parenthesized expressions
//! - Identifiers and dotted path expressions

use crate::ast::{Expr, UnaryOperator};
use crate::error::ParseResult;
use crate::keywords::{is_function, is_keyword};
use crate::lexer::{parse_int64, TokenKind};
use crate::parser::Parser;

impl Parser {
    pub(super) fn parse_unary_expression(&mut self) -> ParseResult<Expr> {
        let tok = self.current_token().clone();

        if tok.is("-") || tok.is("+") {
            let negative = tok.is("-");
            let next = self.peek_token(1).clone();
            match next.kind {
                TokenKind::Int64 { base } => {
                    self.advance();
                    self.advance();
                    let n = parse_int64(&next.value, base, negative)
                        .map_err(|msg| self.error_at(&next, msg))?;
                    return Ok(Expr::Integer(n));
                }
                TokenKind::Float64(f) => {
                    self.advance();
                    self.advance();
                    return Ok(Expr::Float(if negative { -f } else { f }));
                }
                _ => {}
            }
        }

        let op = if tok.is("-") {
            UnaryOperator::Neg
        } else if tok.is("+") {
            UnaryOperator::Plus
        } else if tok.is("~") {
            UnaryOperator::BitNot
        } else {
            return self.parse_primary_expression();
        };
        self.advance();
        let operand = self.parse_primary_expression()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Expr> {
        let tok = self.current_token().clone();

        match &tok.kind {
            TokenKind::Int64 { base } => {
                self.advance();
                let n = parse_int64(&tok.value, *base, false)
                    .map_err(|msg| self.error_at(&tok, msg))?;
                return Ok(Expr::Integer(n));
            }
            TokenKind::Float64(f) => {
                self.advance();
                return Ok(Expr::Float(*f));
            }
            TokenKind::String(s) => {
                self.advance();
                return Ok(Expr::String(s.clone()));
            }
            TokenKind::Bytes(b) => {
                self.advance();
                return Ok(Expr::Bytes(b.clone()));
            }
            TokenKind::Param(name) => {
                self.advance();
                return Ok(Expr::Param(name.clone()));
            }
            TokenKind::Eof => return Err(self.error("unexpected end of input")),
            _ => {}
        }

        if tok.is("(") {
            self.advance();
            let expr = self.parse_expr()?;
            self.expect(")")?;
            return Ok(Expr::Paren(Box::new(expr)));
        }

        if tok.kind == TokenKind::Ident && is_function(&tok.value) && self.peek_token(1).is("(") {
            self.advance();
            let args = self.parse_paren_expr_list()?;
            return Ok(Expr::Func {
                name: tok.value.to_ascii_uppercase(),
                args,
            });
        }

        let literal = if tok.is("TRUE") {
            Expr::Bool(true)
        } else if tok.is("FALSE") {
            Expr::Bool(false)
        } else if tok.is("NULL") {
            Expr::Null
        } else if tok.is("*") {
            Expr::Star
        } else if tok.is("ARRAY") || tok.is("[") {
            return self.parse_array_literal();
        } else {
            return self.parse_path_expression();
        };
        self.advance();
        Ok(literal)
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expr> {
        self.eat(&["ARRAY"]);
        let mut items = Vec::new();
        self.parse_comma_list("[", "]", |p| {
            items.push(p.parse_expr()?);
            Ok(())
        })?;
        Ok(Expr::Array(items))
    }

    /// An identifier, or a dotted path of identifiers.
    fn parse_path_expression(&mut self) -> ParseResult<Expr> {
        let mut path = Vec::new();
        loop {
            let tok = self.current_token();
            let part = match &tok.kind {
                TokenKind::QuotedIdent(name) => name.clone(),
                TokenKind::Ident if !is_keyword(&tok.value) => tok.value.clone(),
                _ => {
                    return Err(self.error(format!("got {:?}, expected identifier", tok.value)));
                }
            };
            self.advance();
            path.push(part);
            if !self.eat(&["."]) {
                break;
            }
        }
        if path.len() == 1 {
            return Ok(Expr::Ident(path.remove(0)));
        }
        Ok(Expr::Path(path))
    }

    pub(crate) fn parse_paren_expr_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut list = Vec::new();
        self.parse_comma_list("(", ")", |p| {
            list.push(p.parse_expr()?);
            Ok(())
        })?;
        Ok(list)
    }

    pub(crate) fn parse_expr_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut list = vec![self.parse_expr()?];
        while self.eat(&[","]) {
            list.push(self.parse_expr()?);
        }
        Ok(list)
    }
}
