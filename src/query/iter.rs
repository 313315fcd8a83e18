//! Row iterators making up the query pipeline.

use spansql_core::Expr;
use std::collections::HashMap;
use std::sync::Arc;

use super::eval::EvalContext;
use super::Params;
use crate::error::{DbError, DbResult};
use crate::storage::ColumnInfo;
use crate::value::{rows_equal, Row, Value};

/// A stream of rows sharing one column list.
pub trait RowIter: Send {
    fn cols(&self) -> &[ColumnInfo];

    /// The next row, or `None` once exhausted.
    fn next_row(&mut self) -> DbResult<Option<Row>>;
}

/// Drain the remaining rows of an iterator.
pub fn collect_rows(iter: &mut dyn RowIter) -> DbResult<Vec<Row>> {
    let mut rows = Vec::new();
    while let Some(row) = iter.next_row()? {
        rows.push(row);
    }
    Ok(rows)
}

/// Everything an iterator needs to evaluate expressions against its input.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    pub params: Arc<Params>,
    /// SELECT list aliases, by name.
    pub aliases: Arc<HashMap<String, Expr>>,
}

impl Scope {
    pub fn context<'a>(&'a self, cols: &'a [ColumnInfo], row: &'a [Value]) -> EvalContext<'a> {
        EvalContext::new(cols, row, &self.params, &self.aliases)
    }
}

// ==================== Materialized rows ====================

/// Rows held in memory.
#[derive(Debug, Clone, Default)]
pub struct RawIter {
    cols: Vec<ColumnInfo>,
    rows: Vec<Row>,
    pos: usize,
}

impl RawIter {
    pub fn new(cols: Vec<ColumnInfo>) -> Self {
        Self {
            cols,
            rows: Vec::new(),
            pos: 0,
        }
    }

    pub fn with_rows(cols: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self { cols, rows, pos: 0 }
    }

    /// Drain another iterator into memory.
    pub fn collect(mut iter: Box<dyn RowIter>) -> DbResult<Self> {
        let cols = iter.cols().to_vec();
        let rows = collect_rows(iter.as_mut())?;
        Ok(RawIter::with_rows(cols, rows))
    }

    /// Append the given cells of `src`; all of them if `col_indexes` is `None`.
    pub(crate) fn add(&mut self, src: &Row, col_indexes: Option<&[usize]>) {
        let row = match col_indexes {
            Some(indexes) => indexes.iter().map(|&i| src[i].clone()).collect(),
            None => src.clone(),
        };
        self.rows.push(row);
    }

    pub(crate) fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows[self.pos..]
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }

    pub(crate) fn cols_mut(&mut self) -> &mut Vec<ColumnInfo> {
        &mut self.cols
    }

    pub fn into_rows(mut self) -> Vec<Row> {
        self.rows.split_off(self.pos)
    }
}

impl RowIter for RawIter {
    fn cols(&self) -> &[ColumnInfo] {
        &self.cols
    }

    fn next_row(&mut self) -> DbResult<Option<Row>> {
        match self.rows.get_mut(self.pos) {
            Some(row) => {
                self.pos += 1;
                Ok(Some(std::mem::take(row)))
            }
            None => Ok(None),
        }
    }
}

/// A single row with no columns; the input of a SELECT without FROM.
#[derive(Debug, Default)]
pub(crate) struct NullIter {
    done: bool,
}

impl RowIter for NullIter {
    fn cols(&self) -> &[ColumnInfo] {
        &[]
    }

    fn next_row(&mut self) -> DbResult<Option<Row>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        Ok(Some(Vec::new()))
    }
}

// ==================== Filtering ====================

/// Passes rows for which the condition is TRUE.
pub(crate) struct WhereIter {
    pub inner: Box<dyn RowIter>,
    pub cond: Expr,
    pub scope: Scope,
}

impl RowIter for WhereIter {
    fn cols(&self) -> &[ColumnInfo] {
        self.inner.cols()
    }

    fn next_row(&mut self) -> DbResult<Option<Row>> {
        while let Some(row) = self.inner.next_row()? {
            let matched = self
                .scope
                .context(self.inner.cols(), &row)
                .eval_bool_expr(&self.cond)?;
            if matched == Some(true) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }
}

// ==================== Projection ====================

/// One entry of a SELECT list after aggregation has been planned.
#[derive(Debug, Clone)]
pub(crate) enum SelectItem {
    /// Every input column except aggregate values.
    Star,
    Expr(Expr),
    /// The value computed for the aggregate in this list position, read
    /// from the input column tagged with the same index.
    Aggregate { agg_index: usize },
}

/// Evaluates the SELECT list for each input row.
pub(crate) struct SelIter {
    inner: Box<dyn RowIter>,
    list: Vec<SelectItem>,
    cols: Vec<ColumnInfo>,
    distinct: bool,
    seen: Vec<Row>,
    scope: Scope,
}

impl SelIter {
    pub fn new(
        inner: Box<dyn RowIter>,
        list: Vec<SelectItem>,
        cols: Vec<ColumnInfo>,
        distinct: bool,
        scope: Scope,
    ) -> Self {
        Self {
            inner,
            list,
            cols,
            distinct,
            seen: Vec::new(),
            scope,
        }
    }

    fn project(&self, row: Row) -> DbResult<Row> {
        let in_cols = self.inner.cols();
        let ctx = self.scope.context(in_cols, &row);
        let mut out = Vec::with_capacity(self.cols.len());
        for item in &self.list {
            match item {
                SelectItem::Star => out.extend(
                    row.iter()
                        .zip(in_cols)
                        .filter(|(_, col)| col.agg_index.is_none())
                        .map(|(v, _)| v.clone()),
                ),
                SelectItem::Expr(e) => out.push(ctx.eval_expr(e)?),
                SelectItem::Aggregate { agg_index } => {
                    let i = in_cols
                        .iter()
                        .position(|c| c.agg_index == Some(*agg_index))
                        .ok_or_else(|| {
                            DbError::InvalidArgument(format!(
                                "no aggregate value for SELECT list item {}",
                                agg_index
                            ))
                        })?;
                    out.push(row[i].clone());
                }
            }
        }
        Ok(out)
    }
}

impl RowIter for SelIter {
    fn cols(&self) -> &[ColumnInfo] {
        &self.cols
    }

    fn next_row(&mut self) -> DbResult<Option<Row>> {
        while let Some(row) = self.inner.next_row()? {
            let out = self.project(row)?;
            if self.distinct {
                if self.seen.iter().any(|prev| rows_equal(prev, &out)) {
                    continue;
                }
                self.seen.push(out.clone());
            }
            return Ok(Some(out));
        }
        Ok(None)
    }
}

// ==================== LIMIT / OFFSET ====================

pub(crate) struct OffsetIter {
    pub inner: Box<dyn RowIter>,
    pub skip: usize,
}

impl RowIter for OffsetIter {
    fn cols(&self) -> &[ColumnInfo] {
        self.inner.cols()
    }

    fn next_row(&mut self) -> DbResult<Option<Row>> {
        while self.skip > 0 {
            self.skip -= 1;
            if self.inner.next_row()?.is_none() {
                return Ok(None);
            }
        }
        self.inner.next_row()
    }
}

pub(crate) struct LimitIter {
    pub inner: Box<dyn RowIter>,
    pub remaining: usize,
}

impl RowIter for LimitIter {
    fn cols(&self) -> &[ColumnInfo] {
        self.inner.cols()
    }

    fn next_row(&mut self) -> DbResult<Option<Row>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        self.inner.next_row()
    }
}
