//! DELETE and UPDATE statements.

use spansql_core::ast::{Delete, Update};
use spansql_core::{parse_dml_stmt, DmlStmt, Type, TypeBase};
use std::collections::{HashMap, HashSet};

use super::eval::EvalContext;
use super::Params;
use crate::error::{DbError, DbResult};
use crate::storage::database::not_null_violation;
use crate::storage::{ColumnInfo, Database, Table};
use crate::transaction::Transaction;
use crate::value::{
    format_date, format_timestamp, parse_date, parse_timestamp, Value, COMMIT_TIMESTAMP,
};

impl Database {
    /// Execute a DML statement, returning the number of affected rows.
    pub fn execute(&self, tx: &Transaction, stmt: &DmlStmt, params: &Params) -> DbResult<usize> {
        tx.check_mutable()?;
        let n = match stmt {
            DmlStmt::Delete(del) => self.execute_delete(del, params)?,
            DmlStmt::Update(upd) => self.execute_update(tx, upd, params)?,
        };
        tracing::debug!("Transaction {} executed {}: {} rows", tx.id(), stmt, n);
        Ok(n)
    }

    /// Parse and execute a DML statement.
    pub fn execute_sql(&self, tx: &Transaction, sql: &str, params: &Params) -> DbResult<usize> {
        let stmt = parse_dml_stmt(sql)?;
        self.execute(tx, &stmt, params)
    }

    fn execute_delete(&self, del: &Delete, params: &Params) -> DbResult<usize> {
        let table = self.table(&del.table)?;
        let mut t = table.lock();
        let positions = matching_rows(&t, &del.table, &del.where_clause, params)?;
        t.remove_positions(&positions);
        Ok(positions.len())
    }

    fn execute_update(&self, tx: &Transaction, upd: &Update, params: &Params) -> DbResult<usize> {
        let table = self.table(&upd.table)?;
        let mut t = table.lock();

        let mut targets = Vec::with_capacity(upd.items.len());
        let mut seen = HashSet::new();
        for item in &upd.items {
            let ci = t.column_index(&item.column).ok_or_else(|| {
                DbError::InvalidArgument(format!("column {} not in table", item.column))
            })?;
            if ci < t.pk_cols() {
                return Err(DbError::InvalidArgument(format!(
                    "cannot update primary key {}",
                    item.column
                )));
            }
            if !seen.insert(ci) {
                return Err(DbError::InvalidArgument(format!(
                    "column {} is assigned more than once",
                    item.column
                )));
            }
            targets.push(ci);
        }

        let positions = matching_rows(&t, &upd.table, &upd.where_clause, params)?;

        // Every new value is computed before any row changes.
        let cols = qualified_cols(&t, &upd.table);
        let aliases = HashMap::new();
        let mut changes = Vec::with_capacity(positions.len() * targets.len());
        for &pos in &positions {
            let row = &t.rows()[pos];
            let ctx = EvalContext::new(&cols, row, params, &aliases);
            for (item, &ci) in upd.items.iter().zip(&targets) {
                let value = match &item.value {
                    Some(e) => ctx.eval_expr(e)?,
                    None => Value::Null,
                };
                let value = coerce_for_column(value, &cols[ci], &upd.table, tx)?;
                changes.push((pos, ci, value));
            }
        }

        for (pos, ci, value) in changes {
            t.set_cell(pos, ci, value);
        }
        Ok(positions.len())
    }
}

fn qualified_cols(t: &Table, table_name: &str) -> Vec<ColumnInfo> {
    t.cols()
        .iter()
        .map(|c| ColumnInfo {
            alias: vec![table_name.to_string(), c.name.clone()],
            ..c.clone()
        })
        .collect()
}

/// Positions, in ascending order, of rows where `cond` is TRUE.
fn matching_rows(
    t: &Table,
    table_name: &str,
    cond: &spansql_core::Expr,
    params: &Params,
) -> DbResult<Vec<usize>> {
    let cols = qualified_cols(t, table_name);
    let aliases = HashMap::new();
    let mut positions = Vec::new();
    for (pos, row) in t.rows().iter().enumerate() {
        let ctx = EvalContext::new(&cols, row, params, &aliases);
        if ctx.eval_bool_expr(cond)? == Some(true) {
            positions.push(pos);
        }
    }
    Ok(positions)
}

/// Fit an evaluated value to a column's type.
fn coerce_for_column(
    value: Value,
    col: &ColumnInfo,
    table_name: &str,
    tx: &Transaction,
) -> DbResult<Value> {
    let ty: &Type = &col.ty;
    let mismatch = |v: &Value| {
        DbError::InvalidArgument(format!(
            "cannot assign {} value to column {} of type {}",
            v.kind(),
            col.name,
            ty
        ))
    };

    if value.is_null() {
        if col.not_null {
            return Err(not_null_violation(&col.name, table_name));
        }
        return Ok(Value::Null);
    }
    if ty.array {
        return match value {
            Value::Array(_) => Ok(value),
            other => Err(mismatch(&other)),
        };
    }

    Ok(match (ty.base, value) {
        (TypeBase::Bool, v @ Value::Bool(_)) => v,
        (TypeBase::Int64, v @ Value::Int64(_)) => v,
        (TypeBase::Float64, v @ Value::Float64(_)) => v,
        (TypeBase::Float64, Value::Int64(i)) => Value::Float64(i as f64),
        (TypeBase::String, v @ Value::String(_)) => v,
        (TypeBase::Bytes, v @ Value::Bytes(_)) => v,
        (TypeBase::Date, Value::String(s)) => match parse_date(&s) {
            Some(d) => Value::String(format_date(&d)),
            None => {
                return Err(DbError::InvalidArgument(format!(
                    "couldn't convert {:?} to DATE",
                    s
                )))
            }
        },
        (TypeBase::Timestamp, Value::String(s)) => {
            if s.eq_ignore_ascii_case(COMMIT_TIMESTAMP) {
                let ts = match tx.commit_timestamp() {
                    Some(ts) if col.allow_commit_timestamp => ts,
                    _ => {
                        return Err(DbError::FailedPrecondition(format!(
                            "column {} does not allow commit timestamps",
                            col.name
                        )))
                    }
                };
                Value::String(format_timestamp(&ts))
            } else {
                match parse_timestamp(&s) {
                    Some(ts) => Value::String(format_timestamp(&ts)),
                    None => {
                        return Err(DbError::InvalidArgument(format!(
                            "couldn't convert {:?} to TIMESTAMP",
                            s
                        )))
                    }
                }
            }
        }
        (_, other) => return Err(mismatch(&other)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::KeySet;
    use serde_json::json;

    fn db_with_players() -> Database {
        let db = Database::new();
        db.apply_ddl_text(
            "CREATE TABLE Players (
                ID INT64 NOT NULL,
                Name STRING(MAX) NOT NULL,
                Score FLOAT64,
                Joined DATE,
                Seen TIMESTAMP OPTIONS (allow_commit_timestamp = true)
            ) PRIMARY KEY (ID)",
        )
        .unwrap();
        let mut tx = db.new_transaction();
        tx.start().unwrap();
        db.insert(
            &tx,
            "Players",
            &["ID", "Name", "Score"],
            &[
                vec![json!("1"), json!("ann"), json!(10.0)],
                vec![json!("2"), json!("bob"), json!(20.0)],
                vec![json!("3"), json!("cat"), json!(null)],
            ],
        )
        .unwrap();
        tx.commit().unwrap();
        db
    }

    fn run(db: &Database, sql: &str) -> DbResult<usize> {
        let mut tx = db.new_transaction();
        tx.start()?;
        let n = db.execute_sql(&tx, sql, &Params::new())?;
        tx.commit()?;
        Ok(n)
    }

    fn column(db: &Database, col: &str) -> Vec<Value> {
        db.read_all("Players", &[col], 0)
            .unwrap()
            .into_rows()
            .into_iter()
            .map(|mut r| r.remove(0))
            .collect()
    }

    // ==================== DELETE ====================

    #[test]
    fn test_delete_where() {
        let db = db_with_players();
        assert_eq!(run(&db, "DELETE FROM Players WHERE Score > 15").unwrap(), 1);
        assert_eq!(column(&db, "ID"), vec![Value::Int64(1), Value::Int64(3)]);

        // NULL comparisons never match.
        assert_eq!(run(&db, "DELETE FROM Players WHERE Score < 100").unwrap(), 1);
        assert_eq!(column(&db, "ID"), vec![Value::Int64(3)]);

        assert_eq!(run(&db, "DELETE FROM Players WHERE TRUE").unwrap(), 1);
        assert!(column(&db, "ID").is_empty());
    }

    #[test]
    fn test_delete_with_param() {
        let db = db_with_players();
        let mut params = Params::new();
        params.insert("name".to_string(), Value::String("bob".to_string()));
        let mut tx = db.new_transaction();
        tx.start().unwrap();
        let n = db
            .execute_sql(&tx, "DELETE FROM Players WHERE Name = @name", &params)
            .unwrap();
        tx.commit().unwrap();
        assert_eq!(n, 1);
        assert_eq!(column(&db, "ID"), vec![Value::Int64(1), Value::Int64(3)]);
    }

    // ==================== UPDATE ====================

    #[test]
    fn test_update_values() {
        let db = db_with_players();
        let n = run(
            &db,
            "UPDATE Players SET Score = Score * 2, Joined = '2019-03-04' WHERE Score IS NOT NULL",
        )
        .unwrap();
        assert_eq!(n, 2);
        assert_eq!(
            column(&db, "Score"),
            vec![Value::Float64(20.0), Value::Float64(40.0), Value::Null]
        );
        assert_eq!(
            column(&db, "Joined")[0],
            Value::String("2019-03-04".to_string())
        );

        // INT64 widens into a FLOAT64 column; DEFAULT clears.
        run(&db, "UPDATE Players SET Score = 7 WHERE ID = 3").unwrap();
        run(&db, "UPDATE Players SET Score = DEFAULT WHERE ID = 1").unwrap();
        assert_eq!(
            column(&db, "Score"),
            vec![Value::Null, Value::Float64(40.0), Value::Float64(7.0)]
        );
    }

    #[test]
    fn test_update_errors() {
        let db = db_with_players();
        let err = run(&db, "UPDATE Players SET ID = 9 WHERE TRUE").unwrap_err();
        assert_eq!(err.to_string(), "cannot update primary key ID");

        let err = run(&db, "UPDATE Players SET Nope = 1 WHERE TRUE").unwrap_err();
        assert_eq!(err.to_string(), "column Nope not in table");

        let err = run(&db, "UPDATE Players SET Name = NULL WHERE ID = 1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Name must not be NULL in table Players"
        );

        let err = run(&db, "UPDATE Players SET Score = 'high' WHERE ID = 1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot assign STRING value to column Score of type FLOAT64"
        );

        let err = run(&db, "UPDATE Nope SET A = 1 WHERE TRUE").unwrap_err();
        assert_eq!(err.to_string(), "no table named Nope");
    }

    #[test]
    fn test_failed_update_changes_nothing() {
        let db = db_with_players();
        // Row 2 divides by zero after row 1 was already evaluated.
        let err = run(
            &db,
            "UPDATE Players SET Score = 1000 / (Score - 20) WHERE TRUE",
        );
        assert!(matches!(err, Err(DbError::DivideByZero)));
        assert_eq!(
            column(&db, "Score"),
            vec![Value::Float64(10.0), Value::Float64(20.0), Value::Null]
        );
    }

    #[test]
    fn test_update_commit_timestamp() {
        let db = db_with_players();
        let mut tx = db.new_transaction();
        tx.start().unwrap();
        db.execute_sql(
            &tx,
            "UPDATE Players SET Seen = 'spanner.commit_timestamp()' WHERE ID = 2",
            &Params::new(),
        )
        .unwrap();
        let ts = tx.commit().unwrap().unwrap();
        assert_eq!(
            column(&db, "Seen")[1],
            Value::String(format_timestamp(&ts))
        );
    }

    #[test]
    fn test_execute_requires_writable_transaction() {
        let db = db_with_players();
        let mut ro = db.new_read_only_transaction();
        ro.start().unwrap();
        let err = db
            .execute_sql(&ro, "DELETE FROM Players WHERE TRUE", &Params::new())
            .unwrap_err();
        assert!(matches!(err, DbError::ReadOnlyTransaction));

        let idle = db.new_transaction();
        let err = db
            .execute_sql(&idle, "DELETE FROM Players WHERE TRUE", &Params::new())
            .unwrap_err();
        assert_eq!(err.code(), crate::error::StatusCode::FailedPrecondition);

        let mut tx = db.new_transaction();
        tx.start().unwrap();
        db.delete(&tx, "Players", &KeySet::all()).unwrap();
        tx.commit().unwrap();
        assert_eq!(run(&db, "DELETE FROM Players WHERE TRUE").unwrap(), 0);
    }
}
