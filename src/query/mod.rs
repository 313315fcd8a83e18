//! SELECT evaluation.
//!
//! A query becomes a chain of [`RowIter`]s: table snapshot, WHERE filter,
//! grouping and aggregation (materialized), SELECT list projection, ORDER
//! BY (materialized), then OFFSET and LIMIT.

pub mod dml;
pub(crate) mod eval;
pub(crate) mod funcs;
pub mod iter;

use spansql_core::ast::{LiteralOrParam, SelectFrom};
use spansql_core::{parse_query, Expr, Query, Select};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;
use std::sync::Arc;

use crate::error::{DbError, DbResult};
use crate::storage::{ColumnInfo, Database};
use crate::value::{compare_value_lists, rows_equal, Value};
use iter::{LimitIter, NullIter, OffsetIter, RawIter, Scope, SelIter, SelectItem, WhereIter};

pub use iter::{collect_rows, RowIter};

/// Query parameters, by name without the leading `@`.
pub type Params = BTreeMap<String, Value>;

impl Database {
    /// Run a query.
    pub fn query(&self, q: &Query, params: &Params) -> DbResult<Box<dyn RowIter>> {
        let params = Arc::new(params.clone());

        // ORDER BY expressions ride along as extra SELECT list items and are
        // stripped after sorting.
        let mut select = q.select.clone();
        let order_width = q.order.len();
        if order_width > 0 {
            select.list.extend(q.order.iter().map(|o| o.expr.clone()));
            if !select.list_aliases.is_empty() {
                select
                    .list_aliases
                    .resize(select.list.len(), String::new());
            }
        }

        let mut ri: Box<dyn RowIter> = Box::new(self.eval_select(&select, &params)?);

        if order_width > 0 {
            let mut raw = RawIter::collect(ri)?;
            let desc: Vec<bool> = q.order.iter().map(|o| o.desc).collect();
            let width = raw.cols().len() - order_width;
            raw.rows_mut().sort_by(|a, b| {
                compare_value_lists(&a[width..], &b[width..], Some(desc.as_slice()))
            });
            raw.cols_mut().truncate(width);
            for row in raw.rows_mut() {
                row.truncate(width);
            }
            ri = Box::new(raw);
        }

        // OFFSET only applies alongside LIMIT.
        if let Some(limit) = &q.limit {
            if let Some(offset) = &q.offset {
                let skip = eval_literal_or_param(offset, &params, "OFFSET")?;
                ri = Box::new(OffsetIter { inner: ri, skip });
            }
            let remaining = eval_literal_or_param(limit, &params, "LIMIT")?;
            ri = Box::new(LimitIter {
                inner: ri,
                remaining,
            });
        }

        tracing::debug!("Planned query: {}", q);
        Ok(ri)
    }

    /// Parse and run a query.
    pub fn query_sql(&self, sql: &str, params: &Params) -> DbResult<Box<dyn RowIter>> {
        let q = parse_query(sql)?;
        self.query(&q, params)
    }

    fn eval_select(&self, sel: &Select, params: &Arc<Params>) -> DbResult<SelIter> {
        let mut aliases = HashMap::new();
        for (alias, e) in sel.list_aliases.iter().zip(&sel.list) {
            if !alias.is_empty() {
                aliases.insert(alias.clone(), e.clone());
            }
        }
        let scope = Scope {
            params: Arc::clone(params),
            aliases: Arc::new(aliases),
        };

        if sel.table_samples.iter().any(Option::is_some) {
            return Err(DbError::Unimplemented(
                "TABLESAMPLE is not supported".to_string(),
            ));
        }
        let mut ri: Box<dyn RowIter> = match sel.from.as_slice() {
            [] => Box::new(NullIter::default()),
            [SelectFrom::Table(from)] => {
                Box::new(self.table_snapshot(&from.table, from.alias.as_deref())?)
            }
            [SelectFrom::Join(_)] => {
                return Err(DbError::Unimplemented(
                    "joins are not supported".to_string(),
                ))
            }
            [SelectFrom::Unnest(_)] => {
                return Err(DbError::Unimplemented(
                    "SELECT from UNNEST is not supported".to_string(),
                ))
            }
            _ => {
                return Err(DbError::Unimplemented(
                    "selecting from more than one table is not supported".to_string(),
                ))
            }
        };

        if let Some(cond) = &sel.where_clause {
            ri = Box::new(WhereIter {
                inner: ri,
                cond: cond.clone(),
                scope: scope.clone(),
            });
        }

        // GROUP BY sorts rows so each group is a contiguous run.
        let mut groups: Option<Vec<Range<usize>>> = None;
        if !sel.group_by.is_empty() {
            let raw = RawIter::collect(ri)?;
            let cols = raw.cols().to_vec();
            let mut keyed = raw
                .into_rows()
                .into_iter()
                .map(|row| {
                    let key = scope.context(&cols, &row).eval_expr_list(&sel.group_by)?;
                    Ok((key, row))
                })
                .collect::<DbResult<Vec<_>>>()?;
            keyed.sort_by(|a, b| compare_value_lists(&a.0, &b.0, None));

            let mut ranges = Vec::new();
            let mut start = 0;
            for i in 1..keyed.len() {
                if !rows_equal(&keyed[i - 1].0, &keyed[i].0) {
                    ranges.push(start..i);
                    start = i;
                }
            }
            if !keyed.is_empty() {
                ranges.push(start..keyed.len());
            }
            groups = Some(ranges);
            ri = Box::new(RawIter::with_rows(
                cols,
                keyed.into_iter().map(|(_, row)| row).collect(),
            ));
        }

        let mut list: Vec<SelectItem> = sel
            .list
            .iter()
            .map(|e| match e {
                Expr::Star => SelectItem::Star,
                e => SelectItem::Expr(e.clone()),
            })
            .collect();

        if let Some(pos) = sel.list.iter().position(is_aggregate_call) {
            let agg_expr = &sel.list[pos];
            if sel
                .list
                .iter()
                .any(|e| is_aggregate_call(e) && e != agg_expr)
            {
                return Err(DbError::Unimplemented(
                    "only one aggregate function is supported".to_string(),
                ));
            }
            ri = Box::new(self.aggregate(ri, agg_expr, pos, groups, &scope)?);
            for (item, e) in list.iter_mut().zip(&sel.list) {
                if names_aggregate(e, agg_expr, &scope.aliases) {
                    *item = SelectItem::Aggregate { agg_index: pos };
                }
            }
        }

        let in_cols = ri.cols().to_vec();
        let typing = scope.context(&in_cols, &[]);
        let mut cols = Vec::with_capacity(list.len());
        for (i, item) in list.iter().enumerate() {
            let mut ci = match item {
                SelectItem::Star => {
                    cols.extend(in_cols.iter().filter(|c| c.agg_index.is_none()).cloned());
                    continue;
                }
                SelectItem::Expr(e) => typing.col_info(e)?,
                SelectItem::Aggregate { agg_index } => in_cols
                    .iter()
                    .find(|c| c.agg_index == Some(*agg_index))
                    .cloned()
                    .ok_or_else(|| {
                        DbError::InvalidArgument(format!(
                            "no aggregate column for SELECT list item {}",
                            agg_index
                        ))
                    })?,
            };
            if let Some(alias) = sel.list_aliases.get(i).filter(|a| !a.is_empty()) {
                ci.name = alias.clone();
            }
            ci.agg_index = None;
            cols.push(ci);
        }

        Ok(SelIter::new(ri, list, cols, sel.distinct, scope))
    }

    /// Collapse each group to its first row plus the aggregate's value,
    /// in a trailing column tagged with `agg_index`. Without GROUP BY the
    /// whole input is one group, so an empty input still yields a row.
    fn aggregate(
        &self,
        ri: Box<dyn RowIter>,
        agg_expr: &Expr,
        agg_index: usize,
        groups: Option<Vec<Range<usize>>>,
        scope: &Scope,
    ) -> DbResult<RawIter> {
        let Expr::Func { name, args } = agg_expr else {
            return Err(DbError::InvalidArgument(format!(
                "{} is not an aggregate",
                agg_expr
            )));
        };
        let (Some(agg), [arg]) = (funcs::aggregate(name), args.as_slice()) else {
            return Err(DbError::InvalidArgument(format!(
                "{} is not an aggregate",
                agg_expr
            )));
        };
        let star = matches!(arg, Expr::Star);
        if star && !agg.accept_star {
            return Err(DbError::InvalidArgument(format!(
                "aggregate function {} does not accept * as an argument",
                name
            )));
        }

        let raw = RawIter::collect(ri)?;
        let cols = raw.cols().to_vec();
        let rows = raw.into_rows();
        let groups = groups.unwrap_or_else(|| vec![0..rows.len()]);

        let arg_type = if star {
            None
        } else {
            Some(scope.context(&cols, &[]).col_info(arg)?.ty)
        };
        let mut agg_col = ColumnInfo::new(agg_expr.to_string(), agg.result_type(arg_type)?);
        agg_col.agg_index = Some(agg_index);

        let mut out_cols = cols.clone();
        out_cols.push(agg_col);
        let mut out = RawIter::new(out_cols);
        for group in groups {
            let mut values = Vec::with_capacity(group.len());
            for row in &rows[group.clone()] {
                values.push(if star {
                    // Any non-NULL placeholder counts.
                    Value::Int64(1)
                } else {
                    scope.context(&cols, row).eval_expr(arg)?
                });
            }
            let value = agg.eval(&values)?;

            let mut out_row = match rows.get(group.start) {
                Some(first) if !group.is_empty() => first.clone(),
                _ => vec![Value::Null; cols.len()],
            };
            out_row.push(value);
            out.push(out_row);
        }
        Ok(out)
    }

    /// Copy a table's rows, tagging columns with the name they're reached by
    /// in path expressions.
    fn table_snapshot(&self, name: &str, alias: Option<&str>) -> DbResult<RawIter> {
        let table = self.table(name)?;
        let t = table.lock();
        let qualifier = alias.unwrap_or(name);
        let cols = t
            .cols()
            .iter()
            .map(|c| ColumnInfo {
                alias: vec![qualifier.to_string(), c.name.clone()],
                ..c.clone()
            })
            .collect();
        Ok(RawIter::with_rows(cols, t.rows().to_vec()))
    }
}

fn is_aggregate_call(e: &Expr) -> bool {
    matches!(e, Expr::Func { name, args } if args.len() == 1 && funcs::aggregate(name).is_some())
}

/// Whether a SELECT list item is the aggregate itself or an alias of it.
fn names_aggregate(e: &Expr, agg_expr: &Expr, aliases: &HashMap<String, Expr>) -> bool {
    match e {
        Expr::Ident(name) => aliases.get(name) == Some(agg_expr),
        e => e == agg_expr,
    }
}

fn eval_literal_or_param(lp: &LiteralOrParam, params: &Params, what: &str) -> DbResult<usize> {
    let n = match lp {
        LiteralOrParam::Integer(i) => *i,
        LiteralOrParam::Param(name) => match params.get(name) {
            None => return Err(DbError::InvalidArgument(format!("unbound param @{}", name))),
            Some(Value::Int64(i)) => *i,
            Some(Value::String(s)) => s.parse::<i64>().map_err(|_| {
                DbError::InvalidArgument(format!(
                    "{} parameter @{} is {:?}, want INT64",
                    what, name, s
                ))
            })?,
            Some(other) => {
                return Err(DbError::InvalidArgument(format!(
                    "{} parameter @{} is {}, want INT64",
                    what,
                    name,
                    other.kind()
                )))
            }
        },
    };
    usize::try_from(n)
        .map_err(|_| DbError::InvalidArgument(format!("{} must not be negative, got {}", what, n)))
}
