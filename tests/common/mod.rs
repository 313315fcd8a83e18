//! Shared setup for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value as JsonValue;
use spanmem::{collect_rows, Database, DbResult, FixedClock, Params, Row, Transaction, Value};
use std::sync::Arc;

pub const SINGERS_DDL: &str = "CREATE TABLE Singers (
    SingerId INT64 NOT NULL,
    FirstName STRING(1024),
    LastName STRING(1024),
    Age INT64,
    Height FLOAT64,
    Updated TIMESTAMP OPTIONS (allow_commit_timestamp = true)
) PRIMARY KEY (SingerId)";

pub fn create_db(ddl: &str) -> Database {
    let db = Database::new();
    db.apply_ddl_text(ddl).expect("Failed to apply DDL");
    db
}

pub fn fixed_clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap(),
    ))
}

/// Run `f` in a started read-write transaction and commit it.
pub fn write<F>(db: &Database, f: F) -> DateTime<Utc>
where
    F: FnOnce(&Transaction) -> DbResult<()>,
{
    let mut tx = db.new_transaction();
    tx.start().expect("Failed to start transaction");
    f(&tx).expect("Write failed");
    tx.commit()
        .expect("Commit failed")
        .expect("Read-write commit has a timestamp")
}

pub fn insert(db: &Database, table: &str, cols: &[&str], rows: Vec<Vec<JsonValue>>) {
    write(db, |tx| db.insert(tx, table, cols, &rows));
}

pub fn singers_db() -> Database {
    let db = create_db(SINGERS_DDL);
    insert(
        &db,
        "Singers",
        &["SingerId", "FirstName", "LastName", "Age", "Height"],
        vec![
            vec![1.into(), "Marc".into(), "Richards".into(), 31.into(), 1.8.into()],
            vec![2.into(), "Catalina".into(), "Smith".into(), 25.into(), 1.65.into()],
            vec![3.into(), "Alice".into(), "Trentor".into(), 40.into(), JsonValue::Null],
            vec![4.into(), "Lea".into(), "Martin".into(), 25.into(), 1.7.into()],
            vec![5.into(), "David".into(), "Lomond".into(), JsonValue::Null, 1.9.into()],
        ],
    );
    db
}

pub fn query_with(db: &Database, sql: &str, params: &Params) -> Vec<Row> {
    let mut iter = db
        .query_sql(sql, params)
        .unwrap_or_else(|e| panic!("Query failed: {}: {}", sql, e));
    collect_rows(iter.as_mut()).unwrap_or_else(|e| panic!("Query failed: {}: {}", sql, e))
}

pub fn query(db: &Database, sql: &str) -> Vec<Row> {
    query_with(db, sql, &Params::new())
}

pub fn query_err(db: &Database, sql: &str) -> spanmem::DbError {
    match db.query_sql(sql, &Params::new()) {
        Err(e) => e,
        Ok(mut iter) => match collect_rows(iter.as_mut()) {
            Err(e) => e,
            Ok(rows) => panic!("Query {} unexpectedly returned {:?}", sql, rows),
        },
    }
}

pub fn int(i: i64) -> Value {
    Value::Int64(i)
}

pub fn s(v: &str) -> Value {
    Value::String(v.to_string())
}

/// First cell of each row.
pub fn first_col(rows: Vec<Row>) -> Vec<Value> {
    rows.into_iter()
        .map(|mut r| r.remove(0))
        .collect()
}
