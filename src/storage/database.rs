use parking_lot::{Mutex, RwLock};
use serde_json::Value as JsonValue;
use spansql_core::ast::{CreateIndex, TableAlteration};
use spansql_core::{parse_ddl, DdlStmt};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::keys::{KeySet, ResolvedRange};
use super::table::Table;
use crate::error::{DbError, DbResult};
use crate::query::iter::RawIter;
use crate::transaction::clock::{Clock, SystemClock};
use crate::transaction::manager::TransactionManager;
use crate::transaction::Transaction;
use crate::value::{format_timestamp, val_for_type, Row, Value, WriteValue};
use chrono::{DateTime, Utc};

#[derive(Default)]
struct Schema {
    tables: BTreeMap<String, Arc<Mutex<Table>>>,
    /// Indexes are recorded but not materialized.
    indexes: BTreeMap<String, CreateIndex>,
}

/// An in-memory database.
///
/// Lock order: the transaction write lock, then the schema lock, then a
/// table lock.
pub struct Database {
    schema: RwLock<Schema>,
    transactions: Arc<TransactionManager>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("tables", &self.table_names())
            .finish()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

/// How `write_values` treats a row whose key is (or isn't) present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Insert,
    Update,
    InsertOrUpdate,
}

impl Database {
    /// Create an empty database using the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty database whose commit timestamps come from `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            schema: RwLock::new(Schema::default()),
            transactions: Arc::new(TransactionManager::new(clock)),
        }
    }

    /// Create a read-write transaction. Call `start` before using it.
    pub fn new_transaction(&self) -> Transaction {
        self.transactions.begin(false)
    }

    /// Create a read-only transaction
    pub fn new_read_only_transaction(&self) -> Transaction {
        self.transactions.begin(true)
    }

    /// The most recently assigned commit timestamp
    pub fn last_commit_timestamp(&self) -> Option<DateTime<Utc>> {
        self.transactions.last_commit_timestamp()
    }

    /// Names of all tables, sorted
    pub fn table_names(&self) -> Vec<String> {
        self.schema.read().tables.keys().cloned().collect()
    }

    pub(crate) fn table(&self, name: &str) -> DbResult<Arc<Mutex<Table>>> {
        self.schema
            .read()
            .tables
            .get(name)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("no table named {}", name)))
    }

    // ==================== DDL ====================

    /// Apply a single schema change
    pub fn apply_ddl(&self, stmt: &DdlStmt) -> DbResult<()> {
        let mut schema = self.schema.write();
        match stmt {
            DdlStmt::CreateTable(ct) => {
                if schema.tables.contains_key(&ct.name) {
                    return Err(DbError::AlreadyExists(format!(
                        "table {} already exists",
                        ct.name
                    )));
                }
                let table = Table::create(ct)?;
                schema
                    .tables
                    .insert(ct.name.clone(), Arc::new(Mutex::new(table)));
            }
            DdlStmt::CreateIndex(ci) => {
                if schema.indexes.contains_key(&ci.name) {
                    return Err(DbError::AlreadyExists(format!(
                        "index {} already exists",
                        ci.name
                    )));
                }
                let table = schema
                    .tables
                    .get(&ci.table)
                    .ok_or_else(|| DbError::NotFound(format!("no table named {}", ci.table)))?;
                let t = table.lock();
                let columns = ci.columns.iter().map(|kp| &kp.column).chain(&ci.storing);
                for col in columns {
                    if t.column_index(col).is_none() {
                        return Err(DbError::NotFound(format!(
                            "no column named {} in table {}",
                            col, ci.table
                        )));
                    }
                }
                drop(t);
                schema.indexes.insert(ci.name.clone(), ci.clone());
            }
            DdlStmt::DropTable(dt) => {
                if !schema.tables.contains_key(&dt.name) {
                    return Err(DbError::NotFound(format!("no table named {}", dt.name)));
                }
                let dependents: Vec<&str> = schema
                    .indexes
                    .values()
                    .filter(|ci| ci.table == dt.name)
                    .map(|ci| ci.name.as_str())
                    .collect();
                if !dependents.is_empty() {
                    return Err(DbError::FailedPrecondition(format!(
                        "table {} has indexes that must be dropped first: {}",
                        dt.name,
                        dependents.join(", ")
                    )));
                }
                schema.tables.remove(&dt.name);
            }
            DdlStmt::DropIndex(di) => {
                if schema.indexes.remove(&di.name).is_none() {
                    return Err(DbError::NotFound(format!("no index named {}", di.name)));
                }
            }
            DdlStmt::AlterTable(at) => {
                let table = schema
                    .tables
                    .get(&at.name)
                    .cloned()
                    .ok_or_else(|| DbError::NotFound(format!("no table named {}", at.name)))?;
                let mut t = table.lock();
                match &at.alteration {
                    TableAlteration::AddColumn(cd) => t.add_column(cd, false)?,
                    TableAlteration::DropColumn(col) => {
                        let indexed = schema.indexes.values().any(|ci| {
                            ci.table == at.name
                                && (ci.columns.iter().any(|kp| kp.column == *col)
                                    || ci.storing.contains(col))
                        });
                        if indexed {
                            return Err(DbError::InvalidArgument(format!(
                                "can't drop indexed column {:?}",
                                col
                            )));
                        }
                        t.drop_column(col)?
                    }
                    TableAlteration::AlterColumn { name, alteration } => {
                        t.alter_column(name, alteration, &at.alteration.to_string())?
                    }
                    other => {
                        return Err(DbError::Unimplemented(format!(
                            "unsupported ALTER TABLE alteration: {}",
                            other
                        )))
                    }
                }
            }
        }
        tracing::debug!("Applied DDL: {}", stmt);
        Ok(())
    }

    /// Parse and apply a `;`-separated list of DDL statements, in order.
    /// Returns the number applied.
    pub fn apply_ddl_text(&self, text: &str) -> DbResult<usize> {
        let ddl = parse_ddl("-", text)?;
        for stmt in &ddl.list {
            self.apply_ddl(stmt)?;
        }
        Ok(ddl.list.len())
    }

    /// Regenerate the schema: tables, then indexes, each in name order
    pub fn get_ddl(&self) -> Vec<DdlStmt> {
        let schema = self.schema.read();
        let tables = schema
            .tables
            .iter()
            .map(|(name, table)| DdlStmt::CreateTable(table.lock().to_create_table(name)));
        let indexes = schema
            .indexes
            .values()
            .map(|ci| DdlStmt::CreateIndex(ci.clone()));
        tables.chain(indexes).collect()
    }

    // ==================== Mutations ====================

    /// Insert new rows. Fails if any row's primary key is already present.
    pub fn insert<S: AsRef<str>>(
        &self,
        tx: &Transaction,
        table: &str,
        cols: &[S],
        values: &[Vec<JsonValue>],
    ) -> DbResult<()> {
        self.write_values(tx, table, cols, values, WriteMode::Insert)
    }

    /// Update existing rows. Fails if any row's primary key is absent.
    pub fn update<S: AsRef<str>>(
        &self,
        tx: &Transaction,
        table: &str,
        cols: &[S],
        values: &[Vec<JsonValue>],
    ) -> DbResult<()> {
        self.write_values(tx, table, cols, values, WriteMode::Update)
    }

    /// Insert rows, or update the given columns where the key exists
    pub fn insert_or_update<S: AsRef<str>>(
        &self,
        tx: &Transaction,
        table: &str,
        cols: &[S],
        values: &[Vec<JsonValue>],
    ) -> DbResult<()> {
        self.write_values(tx, table, cols, values, WriteMode::InsertOrUpdate)
    }

    fn write_values<S: AsRef<str>>(
        &self,
        tx: &Transaction,
        table_name: &str,
        cols: &[S],
        values: &[Vec<JsonValue>],
        mode: WriteMode,
    ) -> DbResult<()> {
        tx.check_mutable()?;
        let table = self.table(table_name)?;
        let mut t = table.lock();

        let col_indexes = t.col_indexes(cols)?;
        let written: HashSet<usize> = col_indexes.iter().copied().collect();
        for pk in 0..t.pk_cols() {
            if !written.contains(&pk) {
                return Err(DbError::InvalidArgument(format!(
                    "primary key column {} not included in write",
                    t.cols()[pk].name
                )));
            }
        }

        for vs in values {
            if vs.len() != col_indexes.len() {
                return Err(DbError::InvalidArgument(format!(
                    "row of {} values can't be written to {} columns",
                    vs.len(),
                    col_indexes.len()
                )));
            }

            let mut row: Row = vec![Value::Null; t.cols().len()];
            for (v, &i) in vs.iter().zip(&col_indexes) {
                let col = &t.cols()[i];
                let x = match val_for_type(v, &col.ty)? {
                    WriteValue::Value(x) => x,
                    WriteValue::CommitTimestamp if col.allow_commit_timestamp => {
                        let ts = tx.commit_timestamp().ok_or_else(|| {
                            DbError::FailedPrecondition(
                                "transaction has no commit timestamp".to_string(),
                            )
                        })?;
                        Value::String(format_timestamp(&ts))
                    }
                    WriteValue::CommitTimestamp => {
                        return Err(DbError::FailedPrecondition(format!(
                            "cannot write commit timestamp to column {}: allow_commit_timestamp is not set",
                            col.name
                        )))
                    }
                };
                if x.is_null() && col.not_null {
                    return Err(not_null_violation(&col.name, table_name));
                }
                row[i] = x;
            }

            let (pos, found) = t.row_for_pk(&row[..t.pk_cols()]);
            match (mode, found) {
                (WriteMode::Insert, true) => {
                    return Err(DbError::AlreadyExists("row already in table".to_string()))
                }
                (WriteMode::Update, false) => {
                    return Err(DbError::NotFound("row not in table".to_string()))
                }
                (_, true) => t.update_row(pos, &row, &col_indexes),
                (_, false) => {
                    if let Some(col) = t
                        .cols()
                        .iter()
                        .enumerate()
                        .find(|(i, col)| col.not_null && !written.contains(i))
                        .map(|(_, col)| col)
                    {
                        return Err(not_null_violation(&col.name, table_name));
                    }
                    t.insert_row(pos, row)
                }
            }
        }

        tracing::debug!(
            "Transaction {} wrote {} rows to {} ({:?})",
            tx.id(),
            values.len(),
            table_name,
            mode
        );
        Ok(())
    }

    /// Delete rows by key. Missing keys and empty ranges are not errors.
    pub fn delete(&self, tx: &Transaction, table_name: &str, keys: &KeySet) -> DbResult<()> {
        tx.check_mutable()?;
        let table = self.table(table_name)?;
        let mut t = table.lock();

        if keys.all {
            t.clear();
            tracing::debug!("Transaction {} deleted all rows of {}", tx.id(), table_name);
            return Ok(());
        }

        for key in &keys.keys {
            let pk = t.primary_key(key)?;
            let (pos, found) = t.row_for_pk(&pk);
            if found {
                t.delete_rows(pos, pos + 1);
            }
        }
        for range in &keys.ranges {
            let resolved = resolve_range(&t, range)?;
            let (start, end) = t.find_range(&resolved);
            t.delete_rows(start, end);
        }
        tracing::debug!(
            "Transaction {} deleted {} keys and {} ranges from {}",
            tx.id(),
            keys.keys.len(),
            keys.ranges.len(),
            table_name
        );
        Ok(())
    }

    // ==================== Reads ====================

    /// Read the named columns of the rows in `keys`.
    ///
    /// Points come first, then ranges; each row appears at most once. A
    /// positive `limit` caps the number of rows.
    pub fn read<S: AsRef<str>>(
        &self,
        table_name: &str,
        cols: &[S],
        keys: &KeySet,
        limit: usize,
    ) -> DbResult<RawIter> {
        if keys.is_empty() {
            return Err(DbError::Unimplemented(
                "Cloud Spanner does not support reading no keys".to_string(),
            ));
        }
        let table = self.table(table_name)?;
        let t = table.lock();

        let col_indexes = t.col_indexes(cols)?;
        let mut out = RawIter::new(col_indexes.iter().map(|&i| t.cols()[i].clone()).collect());
        let full = |out: &RawIter| limit > 0 && out.len() >= limit;

        if keys.all {
            for row in t.rows() {
                if full(&out) {
                    break;
                }
                out.add(row, Some(col_indexes.as_slice()));
            }
            return Ok(out);
        }

        let mut done = HashSet::new();
        for key in &keys.keys {
            let pk = t.primary_key(key)?;
            let (pos, found) = t.row_for_pk(&pk);
            if !found || !done.insert(pos) {
                continue;
            }
            out.add(&t.rows()[pos], Some(col_indexes.as_slice()));
            if full(&out) {
                return Ok(out);
            }
        }
        for range in &keys.ranges {
            let resolved = resolve_range(&t, range)?;
            let (start, end) = t.find_range(&resolved);
            for pos in start..end {
                if !done.insert(pos) {
                    continue;
                }
                out.add(&t.rows()[pos], Some(col_indexes.as_slice()));
                if full(&out) {
                    return Ok(out);
                }
            }
        }
        Ok(out)
    }

    /// Read the named columns of every row
    pub fn read_all<S: AsRef<str>>(
        &self,
        table_name: &str,
        cols: &[S],
        limit: usize,
    ) -> DbResult<RawIter> {
        self.read(table_name, cols, &KeySet::all(), limit)
    }
}

fn resolve_range(t: &Table, range: &super::keys::KeyRange) -> DbResult<ResolvedRange> {
    Ok(ResolvedRange {
        start: t.primary_key_prefix(&range.start)?,
        end: t.primary_key_prefix(&range.end)?,
        start_closed: range.start_closed,
        end_closed: range.end_closed,
    })
}

pub(crate) fn not_null_violation(col: &str, table: &str) -> DbError {
    DbError::FailedPrecondition(format!("{} must not be NULL in table {}", col, table))
}
