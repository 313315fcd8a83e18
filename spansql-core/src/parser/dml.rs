//! DML statement parsing: DELETE and UPDATE.

use crate::ast::{Delete, DmlStmt, Update, UpdateItem};
use crate::error::ParseResult;
use crate::parser::Parser;

impl Parser {
    pub(crate) fn parse_dml_stmt(&mut self) -> ParseResult<DmlStmt> {
        // DELETE [FROM] table WHERE condition
        if self.eat(&["DELETE"]) {
            self.eat(&["FROM"]);
            let table = self.parse_name()?;
            self.expect("WHERE")?;
            let where_clause = self.parse_bool_expr()?;
            return Ok(DmlStmt::Delete(Delete {
                table,
                where_clause,
            }));
        }

        // UPDATE table SET column = { expr | DEFAULT } [, ...] WHERE condition
        if self.eat(&["UPDATE"]) {
            let table = self.parse_name()?;
            self.expect("SET")?;

            let mut items = Vec::new();
            loop {
                items.push(self.parse_update_item()?);
                if !self.eat(&[","]) {
                    break;
                }
            }

            self.expect("WHERE")?;
            let where_clause = self.parse_bool_expr()?;
            return Ok(DmlStmt::Update(Update {
                table,
                items,
                where_clause,
            }));
        }

        Err(self.error("unknown DML statement"))
    }

    fn parse_update_item(&mut self) -> ParseResult<UpdateItem> {
        let column = self.parse_name()?;
        self.expect("=")?;
        let value = if self.eat(&["DEFAULT"]) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        Ok(UpdateItem { column, value })
    }
}
