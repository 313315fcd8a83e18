//! Expression evaluation against a single row.
//!
//! Boolean results are tri-state: `None` is SQL NULL.

use regex::Regex;
use spansql_core::ast::{
    ArithOperator, ComparisonOperator, IsTarget, LogicalOperator, UnaryOperator, MAX_LEN,
};
use spansql_core::{Expr, Type, TypeBase};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::funcs;
use super::Params;
use crate::error::{DbError, DbResult};
use crate::storage::ColumnInfo;
use crate::value::{compare_values, format_date, format_timestamp, parse_date, parse_timestamp, Value};

pub(crate) struct EvalContext<'a> {
    cols: &'a [ColumnInfo],
    row: &'a [Value],
    params: &'a Params,
    aliases: &'a HashMap<String, Expr>,
    /// Aliases currently being expanded; an alias can't refer to itself.
    resolving: Vec<&'a str>,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        cols: &'a [ColumnInfo],
        row: &'a [Value],
        params: &'a Params,
        aliases: &'a HashMap<String, Expr>,
    ) -> Self {
        Self {
            cols,
            row,
            params,
            aliases,
            resolving: Vec::new(),
        }
    }

    /// A context over the same row with `name` expanded to its expression.
    fn alias_scope(&self, name: &str) -> Option<(EvalContext<'a>, &'a Expr)> {
        let aliases: &'a HashMap<String, Expr> = self.aliases;
        let (key, expr) = aliases.get_key_value(name)?;
        if self.resolving.contains(&key.as_str()) {
            return None;
        }
        let mut resolving = self.resolving.clone();
        resolving.push(key.as_str());
        let ctx = EvalContext {
            cols: self.cols,
            row: self.row,
            params: self.params,
            aliases,
            resolving,
        };
        Some((ctx, expr))
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.cols.iter().position(|c| c.name == name)
    }

    fn cell(&self, i: usize) -> Value {
        self.row.get(i).cloned().unwrap_or(Value::Null)
    }

    // ==================== Booleans ====================

    pub fn eval_bool_expr(&self, e: &Expr) -> DbResult<Option<bool>> {
        match e {
            Expr::Paren(inner) => self.eval_bool_expr(inner),
            Expr::Not(inner) => Ok(self.eval_bool_expr(inner)?.map(|b| !b)),
            Expr::Logical { op, lhs, rhs } => {
                let lhs = self.eval_bool_expr(lhs)?;
                match (op, lhs) {
                    (LogicalOperator::And, Some(false)) => return Ok(Some(false)),
                    (LogicalOperator::Or, Some(true)) => return Ok(Some(true)),
                    _ => {}
                }
                let rhs = self.eval_bool_expr(rhs)?;
                Ok(match op {
                    LogicalOperator::And => match (lhs, rhs) {
                        (Some(false), _) | (_, Some(false)) => Some(false),
                        (Some(true), Some(true)) => Some(true),
                        _ => None,
                    },
                    LogicalOperator::Or => match (lhs, rhs) {
                        (Some(true), _) | (_, Some(true)) => Some(true),
                        (Some(false), Some(false)) => Some(false),
                        _ => None,
                    },
                })
            }
            Expr::Comparison { op, lhs, rhs, rhs2 } => {
                self.eval_comparison(*op, lhs, rhs, rhs2.as_deref())
            }
            Expr::In {
                lhs,
                neg,
                unnest,
                rhs,
            } => self.eval_in(lhs, *neg, *unnest, rhs),
            Expr::Is { lhs, neg, rhs } => {
                let value = self.eval_expr(lhs)?;
                let b = match (rhs, value) {
                    (IsTarget::Null, v) => v.is_null(),
                    (_, Value::Null) => false,
                    (IsTarget::True, Value::Bool(b)) => b,
                    (IsTarget::False, Value::Bool(b)) => !b,
                    (_, other) => {
                        return Err(DbError::InvalidArgument(format!(
                            "non-bool value {} on LHS for {}",
                            other.kind(),
                            e
                        )))
                    }
                };
                Ok(Some(b != *neg))
            }
            _ => match self.eval_expr(e)? {
                Value::Null => Ok(None),
                Value::Bool(b) => Ok(Some(b)),
                other => Err(DbError::InvalidArgument(format!(
                    "got {} from {}, want BOOL",
                    other.kind(),
                    e
                ))),
            },
        }
    }

    fn eval_comparison(
        &self,
        op: ComparisonOperator,
        lhs_expr: &Expr,
        rhs_expr: &Expr,
        rhs2_expr: Option<&Expr>,
    ) -> DbResult<Option<bool>> {
        let mut lhs = self.eval_expr(lhs_expr)?;
        let mut rhs = self.eval_expr(rhs_expr)?;
        // String literals compared against DATE/TIMESTAMP take that type.
        if rhs2_expr.is_none() {
            lhs = self.coerce_literal(lhs_expr, rhs_expr, lhs)?;
            rhs = self.coerce_literal(rhs_expr, lhs_expr, rhs)?;
        }
        let rhs2 = rhs2_expr.map(|e| self.eval_expr(e)).transpose()?;

        if lhs.is_null() || rhs.is_null() || rhs2.as_ref().is_some_and(Value::is_null) {
            return Ok(None);
        }

        let b = match op {
            ComparisonOperator::Lt => compare_values(&lhs, &rhs) == Ordering::Less,
            ComparisonOperator::Le => compare_values(&lhs, &rhs) != Ordering::Greater,
            ComparisonOperator::Gt => compare_values(&lhs, &rhs) == Ordering::Greater,
            ComparisonOperator::Ge => compare_values(&lhs, &rhs) != Ordering::Less,
            ComparisonOperator::Eq => compare_values(&lhs, &rhs) == Ordering::Equal,
            ComparisonOperator::Ne => compare_values(&lhs, &rhs) != Ordering::Equal,
            ComparisonOperator::Like | ComparisonOperator::NotLike => {
                let Value::String(text) = &lhs else {
                    return Err(DbError::InvalidArgument(format!(
                        "LHS of LIKE is {}, not string",
                        lhs.kind()
                    )));
                };
                let Value::String(pattern) = &rhs else {
                    return Err(DbError::InvalidArgument(format!(
                        "RHS of LIKE is {}, not string",
                        rhs.kind()
                    )));
                };
                let matched = like_regex(pattern)?.is_match(text);
                matched == (op == ComparisonOperator::Like)
            }
            ComparisonOperator::Between | ComparisonOperator::NotBetween => {
                let Some(upper) = rhs2 else {
                    return Err(DbError::InvalidArgument(format!(
                        "{} is missing its upper bound",
                        op.symbol()
                    )));
                };
                let inside = compare_values(&rhs, &lhs) != Ordering::Greater
                    && compare_values(&lhs, &upper) != Ordering::Greater;
                inside == (op == ComparisonOperator::Between)
            }
        };
        Ok(Some(b))
    }

    fn coerce_literal(&self, lit: &Expr, other: &Expr, value: Value) -> DbResult<Value> {
        let Expr::String(s) = lit.unparen() else {
            return Ok(value);
        };
        let Ok(ci) = self.col_info(other) else {
            return Ok(value);
        };
        if ci.ty.array {
            return Ok(value);
        }
        match ci.ty.base {
            TypeBase::Date => parse_date(s)
                .map(|d| Value::String(format_date(&d)))
                .ok_or_else(|| {
                    DbError::InvalidArgument(format!("couldn't convert {:?} to DATE", s))
                }),
            TypeBase::Timestamp => parse_timestamp(s)
                .map(|ts| Value::String(format_timestamp(&ts)))
                .ok_or_else(|| {
                    DbError::InvalidArgument(format!("couldn't convert {:?} to TIMESTAMP", s))
                }),
            _ => Ok(value),
        }
    }

    fn eval_in(&self, lhs: &Expr, neg: bool, unnest: bool, rhs: &[Expr]) -> DbResult<Option<bool>> {
        // IN with an empty list is FALSE, even for a NULL LHS.
        if rhs.is_empty() {
            return Ok(Some(neg));
        }
        let value = self.eval_expr(lhs)?;
        if value.is_null() {
            return Ok(None);
        }

        if unnest {
            if rhs.len() != 1 {
                return Err(DbError::Unimplemented(format!(
                    "IN UNNEST with {} expressions",
                    rhs.len()
                )));
            }
            let items = match self.eval_expr(&rhs[0])? {
                Value::Null => return Ok(Some(neg)),
                Value::Array(items) => items,
                other => {
                    return Err(DbError::InvalidArgument(format!(
                        "UNNEST argument evaluated as {}, want ARRAY",
                        other.kind()
                    )))
                }
            };
            let found = items
                .iter()
                .any(|item| compare_values(&value, item) == Ordering::Equal);
            return Ok(Some(found != neg));
        }

        for e in rhs {
            let candidate = self.eval_expr(e)?;
            if !candidate.is_null() && compare_values(&value, &candidate) == Ordering::Equal {
                return Ok(Some(!neg));
            }
        }
        Ok(Some(neg))
    }

    // ==================== Values ====================

    pub fn eval_expr_list(&self, list: &[Expr]) -> DbResult<Vec<Value>> {
        list.iter().map(|e| self.eval_expr(e)).collect()
    }

    pub fn eval_expr(&self, e: &Expr) -> DbResult<Value> {
        match e {
            Expr::Paren(inner) => self.eval_expr(inner),
            Expr::Null => Ok(Value::Null),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Integer(i) => Ok(Value::Int64(*i)),
            Expr::Float(x) => Ok(Value::Float64(*x)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Bytes(b) => Ok(Value::Bytes(b.clone())),
            Expr::Array(items) => Ok(Value::Array(self.eval_expr_list(items)?)),
            Expr::Ident(name) => self.eval_ident(name),
            Expr::Path(parts) => self.eval_path(parts),
            Expr::Param(name) => self
                .params
                .get(name)
                .cloned()
                .ok_or_else(|| DbError::InvalidArgument(format!("unbound param @{}", name))),
            Expr::Unary { op, operand } => self.eval_unary(*op, operand),
            Expr::Arith { op, lhs, rhs } => self.eval_arith(*op, lhs, rhs),
            Expr::Func { name, args } => {
                if funcs::aggregate(name).is_some() {
                    return Err(DbError::InvalidArgument(format!(
                        "aggregate function {} can't be used in {}",
                        name, e
                    )));
                }
                funcs::eval_scalar(name, &self.eval_expr_list(args)?)
            }
            Expr::Star => Err(DbError::InvalidArgument(
                "can't evaluate * as a value".to_string(),
            )),
            Expr::Logical { .. }
            | Expr::Not(_)
            | Expr::Comparison { .. }
            | Expr::In { .. }
            | Expr::Is { .. } => Ok(match self.eval_bool_expr(e)? {
                Some(b) => Value::Bool(b),
                None => Value::Null,
            }),
        }
    }

    fn eval_ident(&self, name: &str) -> DbResult<Value> {
        if let Some(i) = self.column_index(name) {
            return Ok(self.cell(i));
        }
        if let Some((ctx, expr)) = self.alias_scope(name) {
            return ctx.eval_expr(expr);
        }
        Err(DbError::InvalidArgument(format!(
            "couldn't resolve identifier {}",
            name
        )))
    }

    fn eval_path(&self, parts: &[String]) -> DbResult<Value> {
        if let Some(i) = self.cols.iter().position(|c| c.alias == parts) {
            return Ok(self.cell(i));
        }
        Err(DbError::InvalidArgument(format!(
            "couldn't resolve path {}",
            parts.join(".")
        )))
    }

    fn eval_unary(&self, op: UnaryOperator, operand: &Expr) -> DbResult<Value> {
        let value = self.eval_expr(operand)?;
        match (op, value) {
            (_, Value::Null) => Ok(Value::Null),
            (UnaryOperator::Plus, v @ (Value::Int64(_) | Value::Float64(_))) => Ok(v),
            (UnaryOperator::Neg, Value::Int64(i)) => i
                .checked_neg()
                .map(Value::Int64)
                .ok_or_else(|| overflow(&format!("-{}", i))),
            (UnaryOperator::Neg, Value::Float64(x)) => Ok(Value::Float64(-x)),
            (UnaryOperator::BitNot, Value::Int64(i)) => Ok(Value::Int64(!i)),
            (UnaryOperator::BitNot, Value::Bytes(b)) => {
                Ok(Value::Bytes(b.into_iter().map(|x| !x).collect()))
            }
            (UnaryOperator::BitNot, v) => Err(DbError::InvalidArgument(format!(
                "RHS of ~ evaluates to {}, want INT64 or BYTES",
                v.kind()
            ))),
            (op, v) => Err(DbError::InvalidArgument(format!(
                "RHS of {} evaluates to {}, want FLOAT64 or INT64",
                if op == UnaryOperator::Neg { "-" } else { "+" },
                v.kind()
            ))),
        }
    }

    fn eval_arith(&self, op: ArithOperator, lhs_expr: &Expr, rhs_expr: &Expr) -> DbResult<Value> {
        let lhs = self.eval_expr(lhs_expr)?;
        let rhs = self.eval_expr(rhs_expr)?;
        if lhs.is_null() || rhs.is_null() {
            return Ok(Value::Null);
        }

        let symbol = op.symbol();
        match op {
            ArithOperator::Div => {
                let x = as_float(&lhs, lhs_expr)?;
                let y = as_float(&rhs, rhs_expr)?;
                if y == 0.0 {
                    return Err(DbError::DivideByZero);
                }
                Ok(Value::Float64(x / y))
            }
            ArithOperator::Add | ArithOperator::Sub | ArithOperator::Mul => {
                if let (Value::Int64(x), Value::Int64(y)) = (&lhs, &rhs) {
                    let result = match op {
                        ArithOperator::Add => x.checked_add(*y),
                        ArithOperator::Sub => x.checked_sub(*y),
                        _ => x.checked_mul(*y),
                    };
                    return result
                        .map(Value::Int64)
                        .ok_or_else(|| overflow(&format!("{} {} {}", x, symbol, y)));
                }
                let x = as_float(&lhs, lhs_expr)?;
                let y = as_float(&rhs, rhs_expr)?;
                Ok(Value::Float64(match op {
                    ArithOperator::Add => x + y,
                    ArithOperator::Sub => x - y,
                    _ => x * y,
                }))
            }
            ArithOperator::Concat => match (lhs, rhs) {
                (Value::String(x), Value::String(y)) => Ok(Value::String(x + &y)),
                (Value::Bytes(mut x), Value::Bytes(y)) => {
                    x.extend(y);
                    Ok(Value::Bytes(x))
                }
                (Value::Array(mut x), Value::Array(y)) => {
                    x.extend(y);
                    Ok(Value::Array(x))
                }
                (x, y) => Err(DbError::InvalidArgument(format!(
                    "operands of || evaluate to {} and {}, want matching STRING or BYTES",
                    x.kind(),
                    y.kind()
                ))),
            },
            ArithOperator::BitAnd | ArithOperator::BitXor | ArithOperator::BitOr => {
                let apply = |x: i64, y: i64| match op {
                    ArithOperator::BitAnd => x & y,
                    ArithOperator::BitXor => x ^ y,
                    _ => x | y,
                };
                match (lhs, rhs) {
                    (Value::Int64(x), Value::Int64(y)) => Ok(Value::Int64(apply(x, y))),
                    (Value::Bytes(x), Value::Bytes(y)) if x.len() == y.len() => Ok(Value::Bytes(
                        x.iter()
                            .zip(&y)
                            .map(|(a, b)| apply(i64::from(*a), i64::from(*b)) as u8)
                            .collect(),
                    )),
                    (Value::Bytes(x), Value::Bytes(y)) => Err(DbError::InvalidArgument(format!(
                        "operands of {} are BYTES of different lengths ({} and {})",
                        symbol,
                        x.len(),
                        y.len()
                    ))),
                    (x, y) => Err(DbError::InvalidArgument(format!(
                        "operands of {} evaluate to {} and {}, want INT64 or BYTES",
                        symbol,
                        x.kind(),
                        y.kind()
                    ))),
                }
            }
            ArithOperator::BitShl | ArithOperator::BitShr => match (lhs, rhs) {
                (Value::Int64(x), Value::Int64(n)) => {
                    if n < 0 {
                        return Err(DbError::InvalidArgument(format!(
                            "negative shift amount {} for {}",
                            n, symbol
                        )));
                    }
                    let bits = x as u64;
                    let shifted = match (op, u32::try_from(n)) {
                        (_, Ok(n)) if n >= 64 => 0,
                        (ArithOperator::BitShl, Ok(n)) => bits << n,
                        (_, Ok(n)) => bits >> n,
                        (_, Err(_)) => 0,
                    };
                    Ok(Value::Int64(shifted as i64))
                }
                (x, y) => Err(DbError::InvalidArgument(format!(
                    "operands of {} evaluate to {} and {}, want INT64",
                    symbol,
                    x.kind(),
                    y.kind()
                ))),
            },
        }
    }

    // ==================== Types ====================

    /// Static description of the column an expression produces.
    pub fn col_info(&self, e: &Expr) -> DbResult<ColumnInfo> {
        let ty = match e {
            Expr::Paren(inner) => return self.col_info(inner),
            Expr::Ident(name) => {
                if let Some(i) = self.column_index(name) {
                    return Ok(self.cols[i].clone());
                }
                if let Some((ctx, expr)) = self.alias_scope(name) {
                    return ctx.col_info(expr);
                }
                return Err(DbError::InvalidArgument(format!(
                    "couldn't resolve identifier {}",
                    name
                )));
            }
            Expr::Path(parts) => {
                return self
                    .cols
                    .iter()
                    .find(|c| c.alias == *parts)
                    .cloned()
                    .ok_or_else(|| {
                        DbError::InvalidArgument(format!(
                            "couldn't resolve path {}",
                            parts.join(".")
                        ))
                    });
            }
            Expr::Null | Expr::Integer(_) => Type::scalar(TypeBase::Int64),
            Expr::Bool(_) => Type::scalar(TypeBase::Bool),
            Expr::Float(_) => Type::scalar(TypeBase::Float64),
            Expr::String(_) => Type::sized(TypeBase::String, MAX_LEN),
            Expr::Bytes(_) => Type::sized(TypeBase::Bytes, MAX_LEN),
            Expr::Param(name) => self
                .params
                .get(name)
                .map(Value::sql_type)
                .ok_or_else(|| DbError::InvalidArgument(format!("unbound param @{}", name)))?,
            Expr::Array(items) => match items.first() {
                Some(first) => Type::array_of(self.col_info(first)?.ty),
                None => Type::array_of(Type::scalar(TypeBase::Int64)),
            },
            Expr::Unary { operand, .. } => self.col_info(operand)?.ty,
            Expr::Arith { op, lhs, rhs } => match op {
                ArithOperator::Add | ArithOperator::Sub | ArithOperator::Mul => {
                    let int64 = Type::scalar(TypeBase::Int64);
                    if self.col_info(lhs)?.ty == int64 && self.col_info(rhs)?.ty == int64 {
                        int64
                    } else {
                        Type::scalar(TypeBase::Float64)
                    }
                }
                ArithOperator::Div => Type::scalar(TypeBase::Float64),
                ArithOperator::Concat
                | ArithOperator::BitShl
                | ArithOperator::BitShr
                | ArithOperator::BitAnd
                | ArithOperator::BitXor
                | ArithOperator::BitOr => self.col_info(lhs)?.ty,
            },
            Expr::Logical { .. }
            | Expr::Not(_)
            | Expr::Comparison { .. }
            | Expr::In { .. }
            | Expr::Is { .. } => Type::scalar(TypeBase::Bool),
            Expr::Func { name, args } => {
                let arg_types = args
                    .iter()
                    .map(|a| match a {
                        Expr::Star => Ok(Type::scalar(TypeBase::Int64)),
                        a => self.col_info(a).map(|ci| ci.ty),
                    })
                    .collect::<DbResult<Vec<_>>>()?;
                match funcs::aggregate(name) {
                    Some(agg) => agg.result_type(arg_types.first().copied())?,
                    None => funcs::scalar_result_type(name, &arg_types)?,
                }
            }
            Expr::Star => {
                return Err(DbError::InvalidArgument(
                    "* has no single column type".to_string(),
                ))
            }
        };
        Ok(ColumnInfo::new(String::new(), ty))
    }
}

/// LIKE pattern as an anchored regex: `%` matches any run of characters,
/// `_` any single character, and `\` escapes the next character.
pub(crate) fn like_regex(pattern: &str) -> DbResult<Regex> {
    let mut re = String::from("(?s)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            '\\' => {
                if let Some(next) = chars.next() {
                    re.push_str(&regex::escape(next.encode_utf8(&mut [0; 4])));
                }
            }
            c => re.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    re.push('$');
    Regex::new(&re)
        .map_err(|e| DbError::InvalidArgument(format!("bad LIKE pattern {:?}: {}", pattern, e)))
}

fn as_float(v: &Value, e: &Expr) -> DbResult<f64> {
    match v {
        Value::Int64(i) => Ok(*i as f64),
        Value::Float64(x) => Ok(*x),
        other => Err(DbError::InvalidArgument(format!(
            "expression {} evaluates to {}, want FLOAT64 or INT64",
            e,
            other.kind()
        ))),
    }
}

fn overflow(what: &str) -> DbError {
    DbError::InvalidArgument(format!("int64 overflow: {}", what))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spansql_core::parse_expr;

    struct Fixture {
        cols: Vec<ColumnInfo>,
        row: Vec<Value>,
        params: Params,
        aliases: HashMap<String, Expr>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut tags = ColumnInfo::new(
                "Tags",
                Type::array_of(Type::sized(TypeBase::String, MAX_LEN)),
            );
            tags.alias = vec!["Staff".to_string(), "Tags".to_string()];
            let cols = vec![
                ColumnInfo::new("Name", Type::sized(TypeBase::String, MAX_LEN)),
                ColumnInfo::new("Age", Type::scalar(TypeBase::Int64)),
                ColumnInfo::new("Height", Type::scalar(TypeBase::Float64)),
                ColumnInfo::new("Born", Type::scalar(TypeBase::Date)),
                tags,
                ColumnInfo::new("Missing", Type::scalar(TypeBase::Int64)),
            ];
            let row = vec![
                Value::String("Dave".to_string()),
                Value::Int64(30),
                Value::Float64(1.5),
                Value::String("2000-01-02".to_string()),
                Value::Array(vec![
                    Value::String("x".to_string()),
                    Value::String("y".to_string()),
                ]),
                Value::Null,
            ];
            let mut params = Params::new();
            params.insert("age".to_string(), Value::Int64(30));
            params.insert("none".to_string(), Value::Null);
            let mut aliases = HashMap::new();
            aliases.insert("Older".to_string(), parse_expr("Age + 1").unwrap());
            aliases.insert("Loop".to_string(), Expr::ident("Loop"));
            Self {
                cols,
                row,
                params,
                aliases,
            }
        }

        fn ctx(&self) -> EvalContext<'_> {
            EvalContext::new(&self.cols, &self.row, &self.params, &self.aliases)
        }

        fn eval(&self, sql: &str) -> DbResult<Value> {
            self.ctx().eval_expr(&parse_expr(sql).unwrap())
        }

        fn eval_bool(&self, sql: &str) -> Option<bool> {
            self.ctx()
                .eval_bool_expr(&parse_expr(sql).unwrap())
                .unwrap_or_else(|e| panic!("{}: {}", sql, e))
        }

        fn ty(&self, sql: &str) -> Type {
            self.ctx().col_info(&parse_expr(sql).unwrap()).unwrap().ty
        }
    }

    #[test]
    fn test_arithmetic() {
        let f = Fixture::new();
        assert_eq!(f.eval("Age + 1").unwrap(), Value::Int64(31));
        assert_eq!(f.eval("Age - 40").unwrap(), Value::Int64(-10));
        assert_eq!(f.eval("Age / 4").unwrap(), Value::Float64(7.5));
        assert_eq!(f.eval("Height * 2").unwrap(), Value::Float64(3.0));
        assert_eq!(f.eval("Age + Height").unwrap(), Value::Float64(31.5));
        assert_eq!(f.eval("-Age").unwrap(), Value::Int64(-30));
        assert_eq!(f.eval("~5").unwrap(), Value::Int64(-6));
        assert_eq!(f.eval("5 & 3").unwrap(), Value::Int64(1));
        assert_eq!(f.eval("5 | 3").unwrap(), Value::Int64(7));
        assert_eq!(f.eval("5 ^ 3").unwrap(), Value::Int64(6));
        assert_eq!(f.eval("1 << 4").unwrap(), Value::Int64(16));
        assert_eq!(f.eval("'a' || Name").unwrap(), Value::String("aDave".to_string()));
        assert_eq!(f.eval("Missing + 1").unwrap(), Value::Null);
    }

    #[test]
    fn test_arithmetic_errors() {
        let f = Fixture::new();
        assert!(matches!(f.eval("Age / 0"), Err(DbError::DivideByZero)));
        let err = f.eval("Name + 1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expression Name evaluates to STRING, want FLOAT64 or INT64"
        );
        assert!(f.eval("9223372036854775807 + 1").is_err());
    }

    #[test]
    fn test_null_logic() {
        let f = Fixture::new();
        assert_eq!(f.eval_bool("NULL AND FALSE"), Some(false));
        assert_eq!(f.eval_bool("NULL AND TRUE"), None);
        assert_eq!(f.eval_bool("NULL OR TRUE"), Some(true));
        assert_eq!(f.eval_bool("NULL OR FALSE"), None);
        assert_eq!(f.eval_bool("NOT Missing = 1"), None);
        assert_eq!(f.eval_bool("Missing = 1"), None);
        assert_eq!(f.eval_bool("Missing IS NULL"), Some(true));
        assert_eq!(f.eval_bool("Age IS NOT NULL"), Some(true));
        assert_eq!(f.eval_bool("NULL IS TRUE"), Some(false));
        assert_eq!(f.eval_bool("NULL IS NOT TRUE"), Some(true));
        assert_eq!(f.eval_bool("Age > 1 IS TRUE"), Some(true));

        let err = f.ctx().eval_bool_expr(&parse_expr("Age IS TRUE").unwrap()).unwrap_err();
        assert!(err.to_string().starts_with("non-bool value INT64 on LHS for"));
    }

    #[test]
    fn test_logical_operators_short_circuit() {
        let f = Fixture::new();
        assert_eq!(f.eval_bool("FALSE AND 1/0 = 1"), Some(false));
        assert_eq!(f.eval_bool("TRUE OR 1/0 = 1"), Some(true));
        assert_eq!(f.eval_bool("Age < 0 AND Name + 1 = 2"), Some(false));

        // The right side still runs when the left can't decide.
        let rhs_err = |sql: &str| f.ctx().eval_bool_expr(&parse_expr(sql).unwrap()).unwrap_err();
        assert!(matches!(rhs_err("TRUE AND 1/0 = 1"), DbError::DivideByZero));
        assert!(matches!(rhs_err("NULL AND 1/0 = 1"), DbError::DivideByZero));
        assert!(matches!(rhs_err("FALSE OR 1/0 = 1"), DbError::DivideByZero));
    }

    #[test]
    fn test_comparisons() {
        let f = Fixture::new();
        assert_eq!(f.eval_bool("Age >= 30"), Some(true));
        assert_eq!(f.eval_bool("Age != 30"), Some(false));
        assert_eq!(f.eval_bool("Age < Height"), Some(false));
        assert_eq!(f.eval_bool("Age BETWEEN 20 AND 40"), Some(true));
        assert_eq!(f.eval_bool("Age NOT BETWEEN 20 AND 40"), Some(false));
        assert_eq!(f.eval_bool("Age BETWEEN 31 AND 40"), Some(false));
        assert_eq!(f.eval_bool("Age BETWEEN 20 AND Missing"), None);
    }

    #[test]
    fn test_like() {
        let f = Fixture::new();
        assert_eq!(f.eval_bool("Name LIKE 'Da%'"), Some(true));
        assert_eq!(f.eval_bool("Name LIKE '_ave'"), Some(true));
        assert_eq!(f.eval_bool("Name LIKE 'a'"), Some(false));
        assert_eq!(f.eval_bool("Name NOT LIKE 'D%'"), Some(false));
        assert_eq!(f.eval_bool("Name LIKE 'D.*'"), Some(false));

        let err = f.ctx().eval_bool_expr(&parse_expr("Age LIKE 'x'").unwrap()).unwrap_err();
        assert_eq!(err.to_string(), "LHS of LIKE is INT64, not string");
    }

    #[test]
    fn test_date_literal_coercion() {
        let f = Fixture::new();
        assert_eq!(f.eval_bool("Born = '2000-01-02'"), Some(true));
        assert_eq!(f.eval_bool("'1999-12-31' < Born"), Some(true));
        assert!(f
            .ctx()
            .eval_bool_expr(&parse_expr("Born = 'junk'").unwrap())
            .is_err());
    }

    #[test]
    fn test_in() {
        let f = Fixture::new();
        assert_eq!(f.eval_bool("Age IN (1, 30)"), Some(true));
        assert_eq!(f.eval_bool("Age NOT IN (1, 2)"), Some(true));
        assert_eq!(f.eval_bool("Missing IN (1)"), None);
        assert_eq!(f.eval_bool("'x' IN UNNEST(Tags)"), Some(true));
        assert_eq!(f.eval_bool("'z' NOT IN UNNEST(Tags)"), Some(true));
        assert_eq!(f.eval_bool("'z' IN UNNEST(@none)"), Some(false));
    }

    #[test]
    fn test_identifiers_and_params() {
        let f = Fixture::new();
        assert_eq!(f.eval("@age * 2").unwrap(), Value::Int64(60));
        assert_eq!(f.eval("Older * 2").unwrap(), Value::Int64(62));
        assert_eq!(f.eval("Staff.Tags").unwrap(), f.row[4]);

        let err = f.eval("@nope").unwrap_err();
        assert_eq!(err.to_string(), "unbound param @nope");
        let err = f.eval("Loop").unwrap_err();
        assert_eq!(err.to_string(), "couldn't resolve identifier Loop");
        let err = f.eval("Nobody").unwrap_err();
        assert_eq!(err.to_string(), "couldn't resolve identifier Nobody");
    }

    #[test]
    fn test_col_info_types() {
        let f = Fixture::new();
        let int64 = Type::scalar(TypeBase::Int64);
        let float64 = Type::scalar(TypeBase::Float64);
        assert_eq!(f.ty("Age + 1"), int64);
        assert_eq!(f.ty("Age + Height"), float64);
        assert_eq!(f.ty("Age / 2"), float64);
        assert_eq!(f.ty("Age > 1"), Type::scalar(TypeBase::Bool));
        assert_eq!(f.ty("Name"), Type::sized(TypeBase::String, MAX_LEN));
        assert_eq!(f.ty("[1, 2]"), Type::array_of(int64));
        assert_eq!(f.ty("NULL"), int64);
        assert_eq!(f.ty("COUNT(*)"), int64);
        assert_eq!(f.ty("AVG(Age)"), float64);
        assert_eq!(f.ty("Older"), int64);
        assert_eq!(
            f.ctx().col_info(&Expr::Array(Vec::new())).unwrap().ty,
            Type::array_of(int64)
        );
        assert_eq!(f.ctx().col_info(&Expr::ident("Age")).unwrap().name, "Age");
    }

    #[test]
    fn test_like_regex_escapes() {
        assert!(like_regex("100\\%").unwrap().is_match("100%"));
        assert!(!like_regex("100\\%").unwrap().is_match("1000"));
        assert!(like_regex("a.c").unwrap().is_match("a.c"));
        assert!(!like_regex("a.c").unwrap().is_match("abc"));
        assert!(like_regex("%\nx").unwrap().is_match("line\nx"));
    }
}
