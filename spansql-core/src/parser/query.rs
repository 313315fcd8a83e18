//! Query parsing.
//!
//! ```text
//! SELECT [ALL | DISTINCT] expr [AS alias] [, ...]
//!     [FROM from_item [tablesample] [, ...]]
//!     [WHERE bool_expr]
//!     [GROUP BY expr [, ...]]
//!     [ORDER BY expr [ASC | DESC] [, ...]]
//!     [LIMIT count [OFFSET skip]]
//! ```

use std::collections::BTreeMap;

use crate::ast::{
    JoinType, LiteralOrParam, Order, Query, Select, SelectFrom, SelectFromJoin, SelectFromTable,
    SelectFromUnnest, TableSample, TableSampleMethod, TableSampleSizeType,
};
use crate::error::ParseResult;
use crate::lexer::{parse_int64, TokenKind};
use crate::parser::{describe, Parser};

impl Parser {
    pub(crate) fn parse_query(&mut self) -> ParseResult<Query> {
        let select = self.parse_select()?;

        let mut order = Vec::new();
        if self.eat(&["ORDER", "BY"]) {
            loop {
                order.push(self.parse_order()?);
                if !self.eat(&[","]) {
                    break;
                }
            }
        }

        let mut limit = None;
        let mut offset = None;
        if self.eat(&["LIMIT"]) {
            limit = Some(self.parse_literal_or_param()?);
            if self.eat(&["OFFSET"]) {
                offset = Some(self.parse_literal_or_param()?);
            }
        }

        Ok(Query {
            select,
            order,
            limit,
            offset,
        })
    }

    fn parse_select(&mut self) -> ParseResult<Select> {
        self.expect("SELECT")?;
        // ALL is the default.
        let distinct = !self.eat(&["ALL"]) && self.eat(&["DISTINCT"]);
        let mut select = Select {
            distinct,
            ..Default::default()
        };

        let mut aliases = Vec::new();
        loop {
            select.list.push(self.parse_expr()?);
            aliases.push(if self.eat(&["AS"]) {
                self.parse_name()?
            } else {
                String::new()
            });
            if !self.eat(&[","]) {
                break;
            }
        }
        if aliases.iter().any(|a| !a.is_empty()) {
            select.list_aliases = aliases;
        }

        if self.eat(&["FROM"]) {
            let mut samples = Vec::new();
            loop {
                select.from.push(self.parse_select_from()?);
                samples.push(if self.sniff(&["TABLESAMPLE"]) {
                    Some(self.parse_table_sample()?)
                } else {
                    None
                });
                if !self.eat(&[","]) {
                    break;
                }
            }
            if samples.iter().any(Option::is_some) {
                select.table_samples = samples;
            }
        }

        if self.eat(&["WHERE"]) {
            select.where_clause = Some(self.parse_bool_expr()?);
        }

        if self.eat(&["GROUP", "BY"]) {
            select.group_by = self.parse_expr_list()?;
        }

        Ok(select)
    }

    /// A from item followed by any number of joins, grouped to the left.
    fn parse_select_from(&mut self) -> ParseResult<SelectFrom> {
        let mut from = self.parse_from_item()?;

        while let Some((join_type, mut hints)) = self.parse_join_type() {
            if self.sniff(&["@", "{"]) {
                self.parse_hints(&mut hints)?;
            }
            let rhs = self.parse_from_item()?;

            let mut join = SelectFromJoin {
                join_type,
                lhs: from,
                rhs,
                on: None,
                using: Vec::new(),
                hints,
            };
            if self.eat(&["ON"]) {
                join.on = Some(self.parse_bool_expr()?);
            }
            if self.sniff(&["USING"]) {
                if join.on.is_some() {
                    return Err(self.error("join may not have both ON and USING clauses"));
                }
                self.advance();
                join.using = self.parse_name_list()?;
            }
            from = SelectFrom::Join(Box::new(join));
        }

        Ok(from)
    }

    /// `UNNEST ( expr ) [AS alias]` or `table [AS alias]`.
    fn parse_from_item(&mut self) -> ParseResult<SelectFrom> {
        if self.eat(&["UNNEST"]) {
            self.expect("(")?;
            let expr = self.parse_expr()?;
            self.expect(")")?;
            let alias = self.parse_alias()?;
            return Ok(SelectFrom::Unnest(SelectFromUnnest { expr, alias }));
        }

        let table = self.parse_name()?;
        let alias = self.parse_alias()?;
        Ok(SelectFrom::Table(SelectFromTable { table, alias }))
    }

    fn parse_alias(&mut self) -> ParseResult<Option<String>> {
        if self.eat(&["AS"]) {
            return Ok(Some(self.parse_name()?));
        }
        Ok(None)
    }

    /// Consume a join keyword sequence such as `LEFT OUTER HASH JOIN`.
    /// `HASH` is recorded as a join method hint.
    fn parse_join_type(&mut self) -> Option<(JoinType, BTreeMap<String, String>)> {
        let checkpoint = self.checkpoint();

        let join_type = if self.eat(&["INNER"]) {
            JoinType::Inner
        } else if self.eat(&["CROSS"]) {
            JoinType::Cross
        } else if self.eat(&["FULL"]) {
            JoinType::Full
        } else if self.eat(&["LEFT"]) {
            JoinType::Left
        } else if self.eat(&["RIGHT"]) {
            JoinType::Right
        } else {
            JoinType::Inner
        };
        if matches!(join_type, JoinType::Full | JoinType::Left | JoinType::Right) {
            self.eat(&["OUTER"]);
        }

        let mut hints = BTreeMap::new();
        if self.eat(&["HASH"]) {
            hints.insert("JOIN_METHOD".to_string(), "HASH_JOIN".to_string());
        }

        if !self.eat(&["JOIN"]) {
            self.restore(checkpoint);
            return None;
        }
        Some((join_type, hints))
    }

    /// `@{ key = value [, ...] }`
    fn parse_hints(&mut self, hints: &mut BTreeMap<String, String>) -> ParseResult<()> {
        self.expect("@")?;
        self.parse_comma_list("{", "}", |p| {
            let key = p.parse_name()?;
            p.expect("=")?;
            let value = p.parse_name()?;
            hints.insert(key, value);
            Ok(())
        })
    }

    /// `TABLESAMPLE { BERNOULLI | RESERVOIR } ( size { PERCENT | ROWS } )`
    fn parse_table_sample(&mut self) -> ParseResult<TableSample> {
        self.expect("TABLESAMPLE")?;

        let tok = self.next();
        let method = if tok.is("BERNOULLI") {
            TableSampleMethod::Bernoulli
        } else if tok.is("RESERVOIR") {
            TableSampleMethod::Reservoir
        } else {
            return Err(self.error_at(
                &tok,
                format!("got {}, want BERNOULLI or RESERVOIR", describe(&tok)),
            ));
        };

        self.expect("(")?;
        let size = self.parse_expr()?;

        let tok = self.next();
        let size_type = if tok.is("PERCENT") {
            TableSampleSizeType::Percent
        } else if tok.is("ROWS") {
            TableSampleSizeType::Rows
        } else {
            return Err(self.error_at(
                &tok,
                format!("got {}, want PERCENT or ROWS", describe(&tok)),
            ));
        };
        self.expect(")")?;

        Ok(TableSample {
            method,
            size,
            size_type,
        })
    }

    /// `expr [ASC | DESC]`
    fn parse_order(&mut self) -> ParseResult<Order> {
        let expr = self.parse_expr()?;
        let desc = if self.eat(&["DESC"]) {
            true
        } else {
            self.eat(&["ASC"]);
            false
        };
        Ok(Order { expr, desc })
    }

    fn parse_literal_or_param(&mut self) -> ParseResult<LiteralOrParam> {
        let tok = self.next();
        match &tok.kind {
            TokenKind::Int64 { base } => parse_int64(&tok.value, *base, false)
                .map(LiteralOrParam::Integer)
                .map_err(|msg| self.error_at(&tok, msg)),
            TokenKind::Param(name) => Ok(LiteralOrParam::Param(name.clone())),
            _ => Err(self.error_at(
                &tok,
                format!("got {}, want literal or parameter", describe(&tok)),
            )),
        }
    }
}
