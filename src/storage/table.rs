//! Tables: column metadata plus rows kept sorted by primary key.

use serde_json::Value as JsonValue;
use spansql_core::ast::{ColumnAlteration, ColumnOptions, CreateTable, KeyPart, Position};
use spansql_core::{ColumnDef, Type, TypeBase};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::keys::ResolvedRange;
use crate::error::{DbError, DbResult};
use crate::value::{compare_value_lists, rows_equal, val_for_type, Row, Value, WriteValue};

/// Metadata for one column of a table or of a query result.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub ty: Type,
    pub not_null: bool,
    pub allow_commit_timestamp: bool,
    /// Set on the synthetic column carrying an aggregate value; the index
    /// of the aggregate in the SELECT list.
    pub agg_index: Option<usize>,
    /// Qualified name (`[table, column]`) matched by path expressions.
    pub alias: Vec<String>,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            not_null: false,
            allow_commit_timestamp: false,
            agg_index: None,
            alias: Vec::new(),
        }
    }

    fn from_def(cd: &ColumnDef) -> Self {
        Self {
            not_null: cd.not_null,
            allow_commit_timestamp: cd.options.allow_commit_timestamp.unwrap_or(false),
            ..Self::new(cd.name.clone(), cd.ty)
        }
    }
}

#[derive(Debug, Default)]
pub struct Table {
    cols: Vec<ColumnInfo>,
    col_index: HashMap<String, usize>,
    /// Declaration order of each column, used when regenerating DDL.
    orig_index: HashMap<String, usize>,
    pk_cols: usize,
    pk_desc: Vec<bool>,
    /// Sorted by the primary key columns, honouring `pk_desc`.
    rows: Vec<Row>,
}

impl Table {
    /// Build an empty table. Primary key columns are moved to the front,
    /// in key order; the remaining columns keep their declared order.
    pub(crate) fn create(ct: &CreateTable) -> DbResult<Table> {
        if ct.primary_key.is_empty() {
            return Err(DbError::InvalidArgument(format!(
                "table {} has no primary key",
                ct.name
            )));
        }

        let orig_index = ct
            .columns
            .iter()
            .enumerate()
            .map(|(i, cd)| (cd.name.clone(), i))
            .collect();
        let pk_rank: HashMap<&str, usize> = ct
            .primary_key
            .iter()
            .enumerate()
            .map(|(i, kp)| (kp.column.as_str(), i))
            .collect();

        let mut columns: Vec<&ColumnDef> = ct.columns.iter().collect();
        columns.sort_by_key(|cd| pk_rank.get(cd.name.as_str()).copied().unwrap_or(usize::MAX));

        let mut table = Table {
            orig_index,
            pk_cols: ct.primary_key.len(),
            pk_desc: ct.primary_key.iter().map(|kp| kp.desc).collect(),
            ..Default::default()
        };
        for cd in columns {
            table.add_column(cd, true)?;
        }
        for kp in &ct.primary_key {
            if !table.col_index.contains_key(&kp.column) {
                return Err(DbError::InvalidArgument(format!(
                    "primary key column {:?} not in table",
                    kp.column
                )));
            }
        }
        Ok(table)
    }

    pub fn cols(&self) -> &[ColumnInfo] {
        &self.cols
    }

    pub fn pk_cols(&self) -> usize {
        self.pk_cols
    }

    pub fn pk_desc(&self) -> &[bool] {
        &self.pk_desc
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.col_index.get(name).copied()
    }

    /// Physical indexes of the named columns.
    pub fn col_indexes<S: AsRef<str>>(&self, cols: &[S]) -> DbResult<Vec<usize>> {
        cols.iter()
            .map(|col| {
                let col = col.as_ref();
                self.column_index(col).ok_or_else(|| {
                    DbError::InvalidArgument(format!("column {} not in table", col))
                })
            })
            .collect()
    }

    // ==================== Keys ====================

    /// Convert a full primary key from wire form.
    pub fn primary_key(&self, values: &[JsonValue]) -> DbResult<Vec<Value>> {
        if values.len() != self.pk_cols {
            return Err(DbError::InvalidArgument(format!(
                "primary key length mismatch: got {} values, table has {}",
                values.len(),
                self.pk_cols
            )));
        }
        self.primary_key_prefix(values)
    }

    /// Convert a primary key prefix from wire form.
    pub fn primary_key_prefix(&self, values: &[JsonValue]) -> DbResult<Vec<Value>> {
        if values.len() > self.pk_cols {
            return Err(DbError::InvalidArgument(format!(
                "primary key length too long: got {} values, table has {}",
                values.len(),
                self.pk_cols
            )));
        }
        values
            .iter()
            .zip(&self.cols)
            .map(|(v, col)| match val_for_type(v, &col.ty)? {
                WriteValue::Value(x) => Ok(x),
                WriteValue::CommitTimestamp => Err(DbError::InvalidArgument(format!(
                    "commit timestamp placeholder is not a key value for column {}",
                    col.name
                ))),
            })
            .collect()
    }

    fn cmp_key(&self, key: &[Value], row: &Row) -> Ordering {
        compare_value_lists(key, &row[..self.pk_cols], Some(self.pk_desc.as_slice()))
    }

    /// Position of the row holding `pk`, and whether it exists. When absent,
    /// the position is where the row would be inserted.
    pub(crate) fn row_for_pk(&self, pk: &[Value]) -> (usize, bool) {
        let i = self
            .rows
            .partition_point(|row| self.cmp_key(pk, row) == Ordering::Greater);
        let found = i < self.rows.len() && rows_equal(pk, &self.rows[i][..self.pk_cols]);
        (i, found)
    }

    /// Half-open interval of row positions covered by the range.
    pub(crate) fn find_range(&self, r: &ResolvedRange) -> (usize, usize) {
        let start = if r.start_closed {
            self.rows
                .partition_point(|row| self.cmp_key(&r.start, row) == Ordering::Greater)
        } else {
            self.rows
                .partition_point(|row| self.cmp_key(&r.start, row) != Ordering::Less)
        };
        let end = if r.end_closed {
            self.rows
                .partition_point(|row| self.cmp_key(&r.end, row) != Ordering::Less)
        } else {
            self.rows
                .partition_point(|row| self.cmp_key(&r.end, row) == Ordering::Greater)
        };
        (start, end.max(start))
    }

    // ==================== Rows ====================

    pub(crate) fn insert_row(&mut self, pos: usize, row: Row) {
        self.rows.insert(pos, row);
    }

    /// Overwrite the given columns of an existing row.
    pub(crate) fn update_row(&mut self, pos: usize, row: &Row, col_indexes: &[usize]) {
        let target = &mut self.rows[pos];
        for &i in col_indexes {
            target[i] = row[i].clone();
        }
    }

    pub(crate) fn delete_rows(&mut self, start: usize, end: usize) {
        if end > start {
            self.rows.drain(start..end);
        }
    }

    /// Remove the rows at the given ascending positions.
    pub(crate) fn remove_positions(&mut self, positions: &[usize]) {
        let mut doomed = positions.iter().copied().peekable();
        let mut i = 0;
        self.rows.retain(|_| {
            let drop = doomed.next_if_eq(&i).is_some();
            i += 1;
            !drop
        });
    }

    pub(crate) fn set_cell(&mut self, pos: usize, col: usize, value: Value) {
        self.rows[pos][col] = value;
    }

    pub(crate) fn clear(&mut self) {
        self.rows.clear();
    }

    // ==================== Schema changes ====================

    pub(crate) fn add_column(&mut self, cd: &ColumnDef, new_table: bool) -> DbResult<()> {
        if !new_table && cd.not_null {
            return Err(DbError::InvalidArgument(
                "new non-key columns cannot be NOT NULL".to_string(),
            ));
        }
        if self.col_index.contains_key(&cd.name) {
            return Err(DbError::AlreadyExists(format!(
                "column {} already exists",
                cd.name
            )));
        }
        check_commit_timestamp_option(&cd.name, &cd.ty, cd.options.allow_commit_timestamp)?;

        if !self.rows.is_empty() {
            if cd.not_null {
                return Err(DbError::Unimplemented(
                    "can't add NOT NULL columns to non-empty tables yet".to_string(),
                ));
            }
            for row in &mut self.rows {
                row.push(Value::Null);
            }
        }

        self.cols.push(ColumnInfo::from_def(cd));
        self.col_index.insert(cd.name.clone(), self.cols.len() - 1);
        if !new_table {
            let next = self.orig_index.len();
            self.orig_index.insert(cd.name.clone(), next);
        }
        Ok(())
    }

    pub(crate) fn drop_column(&mut self, name: &str) -> DbResult<()> {
        let ci = self
            .column_index(name)
            .ok_or_else(|| DbError::InvalidArgument(format!("unknown column {:?}", name)))?;
        if ci < self.pk_cols {
            return Err(DbError::InvalidArgument(format!(
                "can't drop primary key column {:?}",
                name
            )));
        }

        self.cols.remove(ci);
        self.col_index = self
            .cols
            .iter()
            .enumerate()
            .map(|(i, col)| (col.name.clone(), i))
            .collect();
        if let Some(pre) = self.orig_index.remove(name) {
            for i in self.orig_index.values_mut() {
                if *i > pre {
                    *i -= 1;
                }
            }
        }
        for row in &mut self.rows {
            row.remove(ci);
        }
        Ok(())
    }

    /// Apply `ALTER COLUMN`. `sql` is the statement text used in errors.
    pub(crate) fn alter_column(
        &mut self,
        name: &str,
        alteration: &ColumnAlteration,
        sql: &str,
    ) -> DbResult<()> {
        let ci = self
            .column_index(name)
            .ok_or_else(|| DbError::InvalidArgument(format!("unknown column {:?}", name)))?;

        let (new_ty, not_null) = match alteration {
            ColumnAlteration::SetType { ty, not_null } => (*ty, *not_null),
            ColumnAlteration::SetOptions(ColumnOptions {
                allow_commit_timestamp,
            }) => {
                let col = &mut self.cols[ci];
                check_commit_timestamp_option(&col.name, &col.ty, *allow_commit_timestamp)?;
                if let Some(allow) = allow_commit_timestamp {
                    col.allow_commit_timestamp = *allow;
                }
                return Ok(());
            }
        };

        let old_ty = self.cols[ci].ty;
        if !self.cols[ci].not_null && not_null {
            if ci < self.pk_cols {
                return Err(DbError::InvalidArgument(format!(
                    "cannot set NOT NULL on primary key column {:?}",
                    name
                )));
            }
            if old_ty.array {
                return Err(DbError::InvalidArgument(format!(
                    "cannot set NOT NULL on array-typed column {:?}",
                    name
                )));
            }
            if self.rows.iter().any(|row| row[ci].is_null()) {
                return Err(DbError::InvalidArgument(format!(
                    "cannot set NOT NULL on column {:?} that contains NULL values",
                    name
                )));
            }
        }

        let string_or_bytes = |t: &Type| matches!(t.base, TypeBase::String | TypeBase::Bytes);
        let conversion = if string_or_bytes(&old_ty)
            && string_or_bytes(&new_ty)
            && !old_ty.array
            && !new_ty.array
        {
            // Length limit changes need no conversion.
            match (old_ty.base, new_ty.base) {
                (TypeBase::Bytes, TypeBase::String) => Some(TypeBase::String),
                (TypeBase::String, TypeBase::Bytes) => Some(TypeBase::Bytes),
                _ => None,
            }
        } else if old_ty == new_ty {
            None
        } else {
            return Err(DbError::InvalidArgument(format!(
                "unsupported ALTER COLUMN {}",
                sql
            )));
        };

        if conversion == Some(TypeBase::String) {
            let invalid = self
                .rows
                .iter()
                .any(|row| matches!(&row[ci], Value::Bytes(b) if std::str::from_utf8(b).is_err()));
            if invalid {
                return Err(DbError::InvalidArgument(format!(
                    "cannot convert column {:?} to STRING: it holds bytes that are not valid UTF-8",
                    name
                )));
            }
        }

        let col = &mut self.cols[ci];
        col.not_null = not_null;
        col.ty = new_ty;
        if let Some(target) = conversion {
            for row in &mut self.rows {
                row[ci] = match std::mem::replace(&mut row[ci], Value::Null) {
                    Value::Bytes(b) if target == TypeBase::String => match String::from_utf8(b) {
                        Ok(s) => Value::String(s),
                        Err(e) => Value::Bytes(e.into_bytes()),
                    },
                    Value::String(s) if target == TypeBase::Bytes => Value::Bytes(s.into_bytes()),
                    other => other,
                };
            }
        }
        Ok(())
    }

    /// Regenerate the `CREATE TABLE` statement for this table.
    pub(crate) fn to_create_table(&self, name: &str) -> CreateTable {
        let mut declared: Vec<&ColumnInfo> = self.cols.iter().collect();
        declared.sort_by_key(|col| self.orig_index.get(&col.name).copied().unwrap_or(usize::MAX));

        let columns = declared
            .into_iter()
            .map(|col| ColumnDef {
                not_null: col.not_null,
                options: ColumnOptions {
                    allow_commit_timestamp: col.allow_commit_timestamp.then_some(true),
                },
                ..ColumnDef::new(col.name.clone(), col.ty)
            })
            .collect();
        let primary_key = self.cols[..self.pk_cols]
            .iter()
            .zip(&self.pk_desc)
            .map(|(col, &desc)| KeyPart {
                column: col.name.clone(),
                desc,
            })
            .collect();

        CreateTable {
            name: name.to_string(),
            columns,
            constraints: Vec::new(),
            primary_key,
            interleave: None,
            position: Position::default(),
        }
    }
}

fn check_commit_timestamp_option(name: &str, ty: &Type, allow: Option<bool>) -> DbResult<()> {
    if allow == Some(true) && (ty.array || ty.base != TypeBase::Timestamp) {
        return Err(DbError::InvalidArgument(format!(
            "allow_commit_timestamp is only valid on TIMESTAMP columns, not {} ({})",
            name, ty
        )));
    }
    Ok(())
}
