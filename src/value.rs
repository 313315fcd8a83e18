//! Cell values, their ordering, and conversion from the JSON wire form.
//!
//! DATE and TIMESTAMP cells are stored as fixed-width strings
//! (`YYYY-MM-DD` and `YYYY-MM-DDTHH:MM:SS.nnnnnnnnnZ`) so that plain string
//! comparison orders them chronologically.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value as JsonValue;
use spansql_core::ast::MAX_LEN;
use spansql_core::{Type, TypeBase};
use std::cmp::Ordering;
use std::fmt;

use crate::error::{DbError, DbResult};

/// Wire spelling of the commit timestamp placeholder (case-insensitive).
pub const COMMIT_TIMESTAMP: &str = "spanner.commit_timestamp()";

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    /// Also holds DATE and TIMESTAMP cells.
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
}

/// A row of cells, positionally aligned with its column list.
pub type Row = Vec<Value>;

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Best-effort type of a value that did not come from a typed column.
    pub fn sql_type(&self) -> Type {
        match self {
            Value::Null | Value::Int64(_) => Type::scalar(TypeBase::Int64),
            Value::Bool(_) => Type::scalar(TypeBase::Bool),
            Value::Float64(_) => Type::scalar(TypeBase::Float64),
            Value::String(_) => Type::sized(TypeBase::String, MAX_LEN),
            Value::Bytes(_) => Type::sized(TypeBase::Bytes, MAX_LEN),
            Value::Array(items) => {
                let elem = items
                    .iter()
                    .find(|v| !v.is_null())
                    .map(|v| v.sql_type())
                    .unwrap_or_else(|| Type::scalar(TypeBase::Int64));
                Type::array_of(elem)
            }
        }
    }

    /// Name of the runtime kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::Int64(_) => "INT64",
            Value::Float64(_) => "FLOAT64",
            Value::String(_) => "STRING",
            Value::Bytes(_) => "BYTES",
            Value::Array(_) => "ARRAY",
        }
    }

    /// Untyped conversion, used for query parameters.
    pub fn from_json(v: &JsonValue) -> Value {
        match v {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Value::Int64(i),
                None => Value::Float64(n.as_f64().unwrap_or(f64::NAN)),
            },
            JsonValue::String(s) => Value::String(s.clone()),
            JsonValue::Array(items) => Value::Array(items.iter().map(Value::from_json).collect()),
            JsonValue::Object(_) => Value::String(v.to_string()),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int64(i) => JsonValue::from(*i),
            Value::Float64(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or_else(|| JsonValue::String(format_float(*f))),
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Bytes(b) => JsonValue::String(STANDARD.encode(b)),
            Value::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int64(i) => write!(f, "{}", i),
            Value::Float64(x) => f.write_str(&format_float(*x)),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&STANDARD.encode(b)),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

fn format_float(x: f64) -> String {
    if x.is_nan() {
        "NaN".to_string()
    } else if x.is_infinite() {
        if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        x.to_string()
    }
}

// ==================== Ordering ====================

/// Total order over cells. NULL sorts first; INT64 and FLOAT64 compare
/// numerically with each other.
pub fn compare_values(x: &Value, y: &Value) -> Ordering {
    use Value::*;
    match (x, y) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Less,
        (_, Null) => Ordering::Greater,
        (Bool(a), Bool(b)) => a.cmp(b),
        (Int64(a), Int64(b)) => a.cmp(b),
        (Int64(a), Float64(b)) => compare_floats(*a as f64, *b),
        (Float64(a), Int64(b)) => compare_floats(*a, *b as f64),
        (Float64(a), Float64(b)) => compare_floats(*a, *b),
        // INT64 parameters may arrive in their decimal string form.
        (Int64(a), String(s)) => match s.parse::<i64>() {
            Ok(b) => a.cmp(&b),
            Err(_) => kind_rank(x).cmp(&kind_rank(y)),
        },
        (String(s), Int64(b)) => match s.parse::<i64>() {
            Ok(a) => a.cmp(b),
            Err(_) => kind_rank(x).cmp(&kind_rank(y)),
        },
        (String(a), String(b)) => a.cmp(b),
        (Bytes(a), Bytes(b)) => a.cmp(b),
        (Array(a), Array(b)) => {
            for (p, q) in a.iter().zip(b.iter()) {
                let cmp = compare_values(p, q);
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            a.len().cmp(&b.len())
        }
        _ => kind_rank(x).cmp(&kind_rank(y)),
    }
}

fn compare_floats(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn kind_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int64(_) | Value::Float64(_) => 2,
        Value::String(_) => 3,
        Value::Bytes(_) => 4,
        Value::Array(_) => 5,
    }
}

/// Compare pair-wise over the length of `a`, which may be a prefix of `b`.
/// `desc[i]` reverses the i-th comparison.
pub fn compare_value_lists(a: &[Value], b: &[Value], desc: Option<&[bool]>) -> Ordering {
    for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let cmp = compare_values(x, y);
        if cmp == Ordering::Equal {
            continue;
        }
        let reversed = desc.and_then(|d| d.get(i).copied()).unwrap_or(false);
        return if reversed { cmp.reverse() } else { cmp };
    }
    Ordering::Equal
}

/// Whether every cell of `a` equals the corresponding cell of `b`.
pub fn rows_equal(a: &[Value], b: &[Value]) -> bool {
    compare_value_lists(a, b, None) == Ordering::Equal
}

// ==================== DATE / TIMESTAMP ====================

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.9fZ").to_string()
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

pub fn format_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

// ==================== Wire conversion ====================

/// A converted wire value destined for a column.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteValue {
    Value(Value),
    /// Replaced by the writing transaction's commit timestamp.
    CommitTimestamp,
}

/// Convert a JSON wire value into the cell representation for `ty`.
pub fn val_for_type(v: &JsonValue, ty: &Type) -> DbResult<WriteValue> {
    if v.is_null() {
        return Ok(WriteValue::Value(Value::Null));
    }

    if ty.array {
        let JsonValue::Array(list) = v else {
            return Err(unsupported(v, ty));
        };
        let elem = ty.element();
        let mut arr = Vec::with_capacity(list.len());
        for item in list {
            match val_for_type(item, &elem)? {
                WriteValue::Value(x) => arr.push(x),
                WriteValue::CommitTimestamp => return Err(unsupported(item, &elem)),
            }
        }
        return Ok(WriteValue::Value(Value::Array(arr)));
    }

    let value = match (ty.base, v) {
        (TypeBase::Bool, JsonValue::Bool(b)) => Value::Bool(*b),
        (TypeBase::Int64, JsonValue::String(s)) => s.parse::<i64>().map(Value::Int64).map_err(|e| {
            DbError::InvalidArgument(format!("bad int64 string {:?}: {}", s, e))
        })?,
        (TypeBase::Int64, JsonValue::Number(n)) => match n.as_i64() {
            Some(i) => Value::Int64(i),
            None => return Err(unsupported(v, ty)),
        },
        (TypeBase::Float64, JsonValue::Number(n)) => match n.as_f64() {
            Some(x) => Value::Float64(x),
            None => return Err(unsupported(v, ty)),
        },
        (TypeBase::Float64, JsonValue::String(s)) => match s.as_str() {
            "NaN" => Value::Float64(f64::NAN),
            "Infinity" => Value::Float64(f64::INFINITY),
            "-Infinity" => Value::Float64(f64::NEG_INFINITY),
            _ => {
                return Err(DbError::InvalidArgument(format!(
                    "bad FLOAT64 string {:?}",
                    s
                )))
            }
        },
        (TypeBase::String, JsonValue::String(s)) => Value::String(s.clone()),
        (TypeBase::Bytes, JsonValue::String(s)) => STANDARD
            .decode(s)
            .map(Value::Bytes)
            .map_err(|e| DbError::InvalidArgument(format!("bad BYTES string {:?}: {}", s, e)))?,
        (TypeBase::Date, JsonValue::String(s)) => match parse_date(s) {
            Some(d) => Value::String(format_date(&d)),
            None => return Err(DbError::InvalidArgument(format!("bad DATE string {:?}", s))),
        },
        (TypeBase::Timestamp, JsonValue::String(s)) => {
            if s.eq_ignore_ascii_case(COMMIT_TIMESTAMP) {
                return Ok(WriteValue::CommitTimestamp);
            }
            match parse_timestamp(s) {
                Some(ts) => Value::String(format_timestamp(&ts)),
                None => {
                    return Err(DbError::InvalidArgument(format!(
                        "bad TIMESTAMP string {:?}",
                        s
                    )))
                }
            }
        }
        _ => return Err(unsupported(v, ty)),
    };
    Ok(WriteValue::Value(value))
}

fn unsupported(v: &JsonValue, ty: &Type) -> DbError {
    DbError::InvalidArgument(format!(
        "unsupported inserting value {} into column of type {}",
        v, ty
    ))
}
