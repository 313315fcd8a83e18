//! Comparison and arithmetic operator parsing.
//!
//! Handles operators:
//! - Comparison: `<`, `<=`, `>`, `>=`, `=`, `!=`, `<>`
//! - Pattern matching: `LIKE`, `NOT LIKE`
//! - Ranges: `BETWEEN`, `NOT BETWEEN`
//! - Arithmetic and bitwise: `|`, `^`, `&`, `>>`, `<<`, `-`, `+`, `||`, `/`, `*`

use crate::ast::{ArithOperator, ComparisonOperator, Expr};
use crate::error::ParseResult;
use crate::parser::Parser;

/// Binary arithmetic operators, one left-associative level each, lowest
/// precedence first.
const ARITH_LEVELS: &[(&str, ArithOperator)] = &[
    ("|", ArithOperator::BitOr),
    ("^", ArithOperator::BitXor),
    ("&", ArithOperator::BitAnd),
    (">>", ArithOperator::BitShr),
    ("<<", ArithOperator::BitShl),
    ("-", ArithOperator::Sub),
    ("+", ArithOperator::Add),
    ("||", ArithOperator::Concat),
    ("/", ArithOperator::Div),
    ("*", ArithOperator::Mul),
];

impl Parser {
    /// Parse a comparison operator if present.
    /// Returns Some(operator) if found, None otherwise.
    pub(super) fn parse_comparison_operator(&mut self) -> Option<ComparisonOperator> {
        let tok = self.current_token();
        let op = if tok.is("NOT") {
            return self.parse_negated_operator();
        } else if tok.is("LIKE") {
            ComparisonOperator::Like
        } else if tok.is("BETWEEN") {
            ComparisonOperator::Between
        } else if tok.is("<") {
            ComparisonOperator::Lt
        } else if tok.is("<=") {
            ComparisonOperator::Le
        } else if tok.is(">") {
            ComparisonOperator::Gt
        } else if tok.is(">=") {
            ComparisonOperator::Ge
        } else if tok.is("=") {
            ComparisonOperator::Eq
        } else if tok.is("!=") || tok.is("<>") {
            ComparisonOperator::Ne
        } else {
            return None;
        };
        self.advance();
        Some(op)
    }

    /// Parse negated operators: NOT LIKE, NOT BETWEEN.
    /// Leaves `NOT` alone when something else follows it (e.g. `NOT IN`).
    fn parse_negated_operator(&mut self) -> Option<ComparisonOperator> {
        let next = self.peek_token(1);
        let op = if next.is("LIKE") {
            ComparisonOperator::NotLike
        } else if next.is("BETWEEN") {
            ComparisonOperator::NotBetween
        } else {
            return None;
        };
        self.advance(); // consume NOT
        self.advance(); // consume LIKE or BETWEEN
        Some(op)
    }

    pub(super) fn parse_arith_expression(&mut self) -> ParseResult<Expr> {
        self.parse_arith_level(0)
    }

    fn parse_arith_level(&mut self, level: usize) -> ParseResult<Expr> {
        let Some(&(symbol, op)) = ARITH_LEVELS.get(level) else {
            return self.parse_unary_expression();
        };
        let mut left = self.parse_arith_level(level + 1)?;
        while self.eat(&[symbol]) {
            let right = self.parse_arith_level(level + 1)?;
            left = Expr::arith(op, left, right);
        }
        Ok(left)
    }
}
