//! Scalar and aggregate functions.

use spansql_core::ast::MAX_LEN;
use spansql_core::{Type, TypeBase};
use std::cmp::Ordering;

use crate::error::{DbError, DbResult};
use crate::value::{compare_values, Value};

fn no_signature(name: &str) -> DbError {
    DbError::InvalidArgument(format!(
        "No matching signature for function {} for the given argument types",
        name
    ))
}

// ==================== Scalar functions ====================

pub(crate) fn eval_scalar(name: &str, args: &[Value]) -> DbResult<Value> {
    match name {
        "STARTS_WITH" => {
            if args.len() != 2 {
                return Err(no_signature(name));
            }
            match (&args[0], &args[1]) {
                (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                (Value::String(s), Value::String(prefix)) => {
                    Ok(Value::Bool(s.starts_with(prefix.as_str())))
                }
                (Value::Bytes(b), Value::Bytes(prefix)) => {
                    Ok(Value::Bool(b.starts_with(prefix)))
                }
                _ => Err(no_signature(name)),
            }
        }
        "LOWER" | "UPPER" => {
            let [arg] = args else {
                return Err(no_signature(name));
            };
            let lower = name == "LOWER";
            match arg {
                Value::Null => Ok(Value::Null),
                Value::String(s) if lower => Ok(Value::String(s.to_lowercase())),
                Value::String(s) => Ok(Value::String(s.to_uppercase())),
                Value::Bytes(b) if lower => Ok(Value::Bytes(b.to_ascii_lowercase())),
                Value::Bytes(b) => Ok(Value::Bytes(b.to_ascii_uppercase())),
                _ => Err(no_signature(name)),
            }
        }
        "CHAR_LENGTH" => {
            let [arg] = args else {
                return Err(no_signature(name));
            };
            match arg {
                Value::Null => Ok(Value::Null),
                Value::String(s) => Ok(Value::Int64(s.chars().count() as i64)),
                _ => Err(no_signature(name)),
            }
        }
        "CONCAT" => {
            if args.is_empty() {
                return Err(no_signature(name));
            }
            if args.iter().any(Value::is_null) {
                return Ok(Value::Null);
            }
            match &args[0] {
                Value::String(_) => {
                    let mut out = String::new();
                    for arg in args {
                        let Value::String(s) = arg else {
                            return Err(no_signature(name));
                        };
                        out.push_str(s);
                    }
                    Ok(Value::String(out))
                }
                Value::Bytes(_) => {
                    let mut out = Vec::new();
                    for arg in args {
                        let Value::Bytes(b) = arg else {
                            return Err(no_signature(name));
                        };
                        out.extend_from_slice(b);
                    }
                    Ok(Value::Bytes(out))
                }
                _ => Err(no_signature(name)),
            }
        }
        _ => Err(DbError::Unimplemented(format!(
            "function {} is not implemented",
            name
        ))),
    }
}

pub(crate) fn scalar_result_type(name: &str, arg_types: &[Type]) -> DbResult<Type> {
    let string = Type::sized(TypeBase::String, MAX_LEN);
    match name {
        "STARTS_WITH" => Ok(Type::scalar(TypeBase::Bool)),
        "CHAR_LENGTH" => Ok(Type::scalar(TypeBase::Int64)),
        "LOWER" | "UPPER" | "CONCAT" => Ok(match arg_types.first() {
            Some(t) if t.base == TypeBase::Bytes && !t.array => Type::sized(TypeBase::Bytes, MAX_LEN),
            _ => string,
        }),
        _ => Err(DbError::Unimplemented(format!(
            "function {} is not implemented",
            name
        ))),
    }
}

// ==================== Aggregates ====================

/// An aggregate function over the values of one group.
pub(crate) struct Aggregate {
    pub name: &'static str,
    /// Whether `*` is allowed as the argument.
    pub accept_star: bool,
    eval: fn(&[Value]) -> DbResult<Value>,
    result: fn(Type) -> DbResult<Type>,
}

impl Aggregate {
    pub fn eval(&self, values: &[Value]) -> DbResult<Value> {
        (self.eval)(values)
    }

    /// Result type given the argument type (`None` for `*`).
    pub fn result_type(&self, arg: Option<Type>) -> DbResult<Type> {
        (self.result)(arg.unwrap_or_else(|| Type::scalar(TypeBase::Int64)))
    }
}

static AGGREGATES: [Aggregate; 7] = [
    Aggregate {
        name: "ANY_VALUE",
        accept_star: false,
        eval: |values| {
            Ok(values
                .iter()
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or(Value::Null))
        },
        result: Ok,
    },
    Aggregate {
        name: "ARRAY_AGG",
        accept_star: false,
        eval: |values| {
            if values.iter().any(|v| matches!(v, Value::Array(_))) {
                return Err(DbError::InvalidArgument(
                    "ARRAY_AGG unsupported on values of type ARRAY".to_string(),
                ));
            }
            if values.is_empty() {
                return Ok(Value::Null);
            }
            Ok(Value::Array(values.to_vec()))
        },
        result: |arg| {
            if arg.array {
                return Err(DbError::InvalidArgument(format!(
                    "ARRAY_AGG unsupported on values of type {}",
                    arg
                )));
            }
            Ok(Type::array_of(arg))
        },
    },
    Aggregate {
        name: "AVG",
        accept_star: false,
        eval: |values| {
            let mut sum = 0.0;
            let mut n = 0usize;
            for v in values {
                match v {
                    Value::Null => continue,
                    Value::Int64(i) => sum += *i as f64,
                    Value::Float64(x) => sum += x,
                    other => return Err(numeric_only("AVG", other.kind())),
                }
                n += 1;
            }
            if n == 0 {
                return Ok(Value::Null);
            }
            Ok(Value::Float64(sum / n as f64))
        },
        result: |arg| {
            check_numeric("AVG", &arg)?;
            Ok(Type::scalar(TypeBase::Float64))
        },
    },
    Aggregate {
        name: "COUNT",
        accept_star: true,
        eval: |values| Ok(Value::Int64(values.iter().filter(|v| !v.is_null()).count() as i64)),
        result: |_| Ok(Type::scalar(TypeBase::Int64)),
    },
    Aggregate {
        name: "MAX",
        accept_star: false,
        eval: |values| Ok(extreme(values, Ordering::Greater)),
        result: Ok,
    },
    Aggregate {
        name: "MIN",
        accept_star: false,
        eval: |values| Ok(extreme(values, Ordering::Less)),
        result: Ok,
    },
    Aggregate {
        name: "SUM",
        accept_star: false,
        eval: |values| {
            let mut int_sum: Option<i64> = None;
            let mut float_sum: Option<f64> = None;
            for v in values {
                match v {
                    Value::Null => {}
                    Value::Int64(i) => {
                        let total = int_sum.unwrap_or(0).checked_add(*i).ok_or_else(|| {
                            DbError::InvalidArgument("int64 overflow in SUM".to_string())
                        })?;
                        int_sum = Some(total);
                    }
                    Value::Float64(x) => *float_sum.get_or_insert(0.0) += x,
                    other => return Err(numeric_only("SUM", other.kind())),
                }
            }
            Ok(match (int_sum, float_sum) {
                (None, None) => Value::Null,
                (Some(i), None) => Value::Int64(i),
                (i, Some(x)) => Value::Float64(x + i.unwrap_or(0) as f64),
            })
        },
        result: |arg| {
            check_numeric("SUM", &arg)?;
            Ok(arg)
        },
    },
];

pub(crate) fn aggregate(name: &str) -> Option<&'static Aggregate> {
    AGGREGATES.iter().find(|agg| agg.name == name)
}

fn numeric_only(name: &str, kind: &str) -> DbError {
    DbError::InvalidArgument(format!(
        "{} only supports arguments of INT64 or FLOAT64 type, not {}",
        name, kind
    ))
}

fn check_numeric(name: &str, ty: &Type) -> DbResult<()> {
    if ty.array || !matches!(ty.base, TypeBase::Int64 | TypeBase::Float64) {
        return Err(numeric_only(name, &ty.to_string()));
    }
    Ok(())
}

/// MIN or MAX over the non-NULL values. NaN wins over everything.
fn extreme(values: &[Value], want: Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for v in values {
        match v {
            Value::Null => continue,
            Value::Float64(x) if x.is_nan() => return Value::Float64(f64::NAN),
            _ => {}
        }
        if best.map_or(true, |b| compare_values(v, b) == want) {
            best = Some(v);
        }
    }
    best.cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    fn ints(values: &[Option<i64>]) -> Vec<Value> {
        values
            .iter()
            .map(|v| v.map(Value::Int64).unwrap_or(Value::Null))
            .collect()
    }

    fn agg(name: &str, values: &[Value]) -> DbResult<Value> {
        aggregate(name).unwrap().eval(values)
    }

    #[test]
    fn test_starts_with() {
        assert_eq!(
            eval_scalar("STARTS_WITH", &[s("hello"), s("he")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eval_scalar("STARTS_WITH", &[s("hello"), Value::Null]).unwrap(),
            Value::Null
        );
        let err = eval_scalar("STARTS_WITH", &[s("hello"), Value::Int64(1)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No matching signature for function STARTS_WITH for the given argument types"
        );
        assert!(eval_scalar("STARTS_WITH", &[s("hello")]).is_err());
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(eval_scalar("LOWER", &[s("HeLLo")]).unwrap(), s("hello"));
        assert_eq!(eval_scalar("UPPER", &[s("HeLLo")]).unwrap(), s("HELLO"));
        assert_eq!(eval_scalar("LOWER", &[Value::Null]).unwrap(), Value::Null);
        assert_eq!(
            eval_scalar("CHAR_LENGTH", &[s("héllo")]).unwrap(),
            Value::Int64(5)
        );
        assert_eq!(
            eval_scalar("CONCAT", &[s("a"), s("b"), s("c")]).unwrap(),
            s("abc")
        );
        assert_eq!(
            eval_scalar("CONCAT", &[s("a"), Value::Null]).unwrap(),
            Value::Null
        );
        assert!(eval_scalar("CONCAT", &[s("a"), Value::Int64(1)]).is_err());

        let err = eval_scalar("SOUNDEX", &[s("a")]).unwrap_err();
        assert_eq!(err.code(), crate::error::StatusCode::Unimplemented);
    }

    #[test]
    fn test_count_and_any_value() {
        let values = ints(&[None, Some(3), Some(4)]);
        assert_eq!(agg("COUNT", &values).unwrap(), Value::Int64(2));
        assert_eq!(agg("COUNT", &[]).unwrap(), Value::Int64(0));
        assert_eq!(agg("ANY_VALUE", &values).unwrap(), Value::Int64(3));
        assert_eq!(agg("ANY_VALUE", &[]).unwrap(), Value::Null);
        assert!(aggregate("COUNT").unwrap().accept_star);
        assert!(!aggregate("SUM").unwrap().accept_star);
    }

    #[test]
    fn test_sum_and_avg() {
        assert_eq!(
            agg("SUM", &ints(&[Some(1), None, Some(5)])).unwrap(),
            Value::Int64(6)
        );
        assert_eq!(agg("SUM", &ints(&[None, None])).unwrap(), Value::Null);
        assert_eq!(
            agg("SUM", &[Value::Int64(1), Value::Float64(0.5)]).unwrap(),
            Value::Float64(1.5)
        );
        assert_eq!(
            agg("AVG", &ints(&[Some(1), None, Some(4)])).unwrap(),
            Value::Float64(2.5)
        );
        assert_eq!(agg("AVG", &[]).unwrap(), Value::Null);

        let err = aggregate("SUM")
            .unwrap()
            .result_type(Some(Type::sized(TypeBase::String, MAX_LEN)))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "SUM only supports arguments of INT64 or FLOAT64 type, not STRING(MAX)"
        );
        assert!(agg("SUM", &[Value::Int64(i64::MAX), Value::Int64(1)]).is_err());
    }

    #[test]
    fn test_min_max() {
        let values = ints(&[Some(3), None, Some(-2), Some(7)]);
        assert_eq!(agg("MIN", &values).unwrap(), Value::Int64(-2));
        assert_eq!(agg("MAX", &values).unwrap(), Value::Int64(7));
        assert_eq!(agg("MAX", &ints(&[None])).unwrap(), Value::Null);

        let with_nan = [Value::Float64(1.0), Value::Float64(f64::NAN)];
        let Value::Float64(x) = agg("MIN", &with_nan).unwrap() else {
            panic!("expected FLOAT64");
        };
        assert!(x.is_nan());
    }

    #[test]
    fn test_array_agg() {
        assert_eq!(
            agg("ARRAY_AGG", &[s("a"), s("b")]).unwrap(),
            Value::Array(vec![s("a"), s("b")])
        );
        assert_eq!(agg("ARRAY_AGG", &[]).unwrap(), Value::Null);
        assert!(agg("ARRAY_AGG", &[Value::Array(vec![])]).is_err());

        let string = Type::sized(TypeBase::String, MAX_LEN);
        let result = aggregate("ARRAY_AGG").unwrap().result_type(Some(string));
        assert_eq!(result.unwrap(), Type::array_of(string));
    }
}
