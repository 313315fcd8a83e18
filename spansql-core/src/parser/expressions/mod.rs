//! Expression parsing.
//!
//! One method per precedence level, lowest first:
//! OR, AND, NOT, IS, IN, comparison, the arithmetic chain
//! (see [`operators`]), unary operators, then primaries (see [`primary`]).

mod operators;
mod primary;

use crate::ast::{Expr, IsTarget, LogicalOperator};
use crate::error::ParseResult;
use crate::lexer::Token;
use crate::parser::Parser;

impl Parser {
    pub(crate) fn parse_expr(&mut self) -> ParseResult<Expr> {
        self.parse_or_expression()
    }

    /// Parse an expression that must be usable as a boolean.
    pub(crate) fn parse_bool_expr(&mut self) -> ParseResult<Expr> {
        let start = self.current_token().clone();
        let expr = self.parse_expr()?;
        if !expr.is_bool_expr() {
            return Err(self.error_at(&start, "got non-bool expression"));
        }
        Ok(expr)
    }

    fn parse_or_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and_expression()?;
        while self.current_token().is("OR") {
            let op_tok = self.next();
            let right = self.parse_and_expression()?;
            self.check_bool_operands(&op_tok, &left, &right)?;
            left = Expr::logical(LogicalOperator::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and_expression(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_not_expression()?;
        while self.current_token().is("AND") {
            let op_tok = self.next();
            let right = self.parse_not_expression()?;
            self.check_bool_operands(&op_tok, &left, &right)?;
            left = Expr::logical(LogicalOperator::And, left, right);
        }
        Ok(left)
    }

    fn check_bool_operands(
        &self,
        op_tok: &Token,
        left: &Expr,
        right: &Expr,
    ) -> ParseResult<()> {
        if left.is_bool_expr() && right.is_bool_expr() {
            return Ok(());
        }
        Err(self.error_at(
            op_tok,
            format!("operands of {} must be boolean expressions", op_tok.value.to_ascii_uppercase()),
        ))
    }

    fn parse_not_expression(&mut self) -> ParseResult<Expr> {
        if !self.current_token().is("NOT") {
            return self.parse_is_expression();
        }
        let not_tok = self.next();
        let operand = self.parse_not_expression()?;
        if !operand.is_bool_expr() {
            return Err(self.error_at(&not_tok, "operand of NOT must be a boolean expression"));
        }
        Ok(Expr::Not(Box::new(operand)))
    }

    fn parse_is_expression(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_in_expression()?;
        if !self.eat(&["IS"]) {
            return Ok(expr);
        }
        let neg = self.eat(&["NOT"]);

        let tok = self.next();
        let rhs = if tok.is("NULL") {
            IsTarget::Null
        } else if tok.is("TRUE") {
            IsTarget::True
        } else if tok.is("FALSE") {
            IsTarget::False
        } else {
            return Err(self.error_at(
                &tok,
                format!("got {:?}, want NULL or TRUE or FALSE", tok.value),
            ));
        };

        Ok(Expr::Is {
            lhs: Box::new(expr),
            neg,
            rhs,
        })
    }

    fn parse_in_expression(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_comparison_expression()?;

        let checkpoint = self.checkpoint();
        let neg = self.eat(&["NOT"]);
        if !self.eat(&["IN"]) {
            self.restore(checkpoint);
            return Ok(expr);
        }
        let unnest = self.eat(&["UNNEST"]);
        let rhs = self.parse_paren_expr_list()?;

        Ok(Expr::In {
            lhs: Box::new(expr),
            neg,
            unnest,
            rhs,
        })
    }

    fn parse_comparison_expression(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_arith_expression()?;

        while let Some(op) = self.parse_comparison_operator() {
            let rhs = self.parse_arith_expression()?;
            let rhs2 = if op.is_between() {
                self.expect("AND")?;
                Some(Box::new(self.parse_arith_expression()?))
            } else {
                None
            };
            expr = Expr::Comparison {
                op,
                lhs: Box::new(expr),
                rhs: Box::new(rhs),
                rhs2,
            };
        }
        Ok(expr)
    }
}
