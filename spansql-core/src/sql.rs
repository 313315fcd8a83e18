//! Rendering of AST nodes back to SQL text.
//!
//! Every node implements [`fmt::Display`]; the output re-parses to an equal
//! node. Operands of unary and binary arithmetic operators are always
//! parenthesized. Boolean and comparison operands are parenthesized only
//! where precedence requires it.

use std::fmt::{self, Display, Formatter, Write};

use crate::ast::{
    AlterTable, Check, ColumnAlteration, ColumnDef, ColumnOptions, Constraint, CreateIndex,
    CreateTable, Ddl, DdlStmt, Delete, DmlStmt, DropIndex, DropTable, Expr, ForeignKey, IsTarget,
    JoinType, KeyPart, LiteralOrParam, LogicalOperator, OnDelete, Order, Query, Select,
    SelectFrom, TableAlteration, TableConstraint, TableSample, TableSampleMethod,
    TableSampleSizeType, Type, TypeBase, UnaryOperator, Update, MAX_LEN,
};
use crate::keywords::is_keyword;

/// Quote `name` with backticks when it is a reserved keyword or not a
/// plain identifier.
pub fn quote_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain && !is_keyword(name) {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len() + 2);
    out.push('`');
    for c in name.chars() {
        escape_char(&mut out, c, '`');
    }
    out.push('`');
    out
}

/// Render a STRING literal.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        escape_char(&mut out, c, '"');
    }
    out.push('"');
    out
}

/// Render a BYTES literal.
pub fn quote_bytes(b: &[u8]) -> String {
    let mut out = String::with_capacity(b.len() + 3);
    out.push_str("B\"");
    for &byte in b {
        match byte {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            0x20..=0x7e => out.push(byte as char),
            _ => {
                let _ = write!(out, "\\x{:02x}", byte);
            }
        }
    }
    out.push('"');
    out
}

fn escape_char(out: &mut String, c: char, quote: char) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        c if c == quote => {
            out.push('\\');
            out.push(c);
        }
        c if (c as u32) < 0x20 || c == '\u{7f}' => {
            let _ = write!(out, "\\x{:02x}", c as u32);
        }
        c => out.push(c),
    }
}

/// Write `items` separated by `", "`.
fn comma_list<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn name_list(f: &mut Formatter<'_>, names: &[String]) -> fmt::Result {
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&quote_identifier(name))?;
    }
    Ok(())
}

// ==================== DDL ====================

impl Display for Ddl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for stmt in &self.list {
            writeln!(f, "{};", stmt)?;
        }
        Ok(())
    }
}

impl Display for DdlStmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DdlStmt::CreateTable(ct) => ct.fmt(f),
            DdlStmt::CreateIndex(ci) => ci.fmt(f),
            DdlStmt::DropTable(dt) => dt.fmt(f),
            DdlStmt::DropIndex(di) => di.fmt(f),
            DdlStmt::AlterTable(at) => at.fmt(f),
        }
    }
}

impl Display for CreateTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "CREATE TABLE {} (", quote_identifier(&self.name))?;
        for column in &self.columns {
            writeln!(f, "  {},", column)?;
        }
        for constraint in &self.constraints {
            writeln!(f, "  {},", constraint)?;
        }
        f.write_str(") PRIMARY KEY(")?;
        comma_list(f, &self.primary_key)?;
        f.write_str(")")?;
        if let Some(interleave) = &self.interleave {
            write!(
                f,
                ",\n  INTERLEAVE IN PARENT {} ON DELETE {}",
                quote_identifier(&interleave.parent),
                interleave.on_delete
            )?;
        }
        Ok(())
    }
}

impl Display for OnDelete {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OnDelete::NoAction => "NO ACTION",
            OnDelete::Cascade => "CASCADE",
        })
    }
}

impl Display for CreateIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE ")?;
        if self.unique {
            f.write_str("UNIQUE ")?;
        }
        if self.null_filtered {
            f.write_str("NULL_FILTERED ")?;
        }
        write!(
            f,
            "INDEX {} ON {}(",
            quote_identifier(&self.name),
            quote_identifier(&self.table)
        )?;
        comma_list(f, &self.columns)?;
        f.write_str(")")?;
        if !self.storing.is_empty() {
            f.write_str(" STORING (")?;
            name_list(f, &self.storing)?;
            f.write_str(")")?;
        }
        if let Some(parent) = &self.interleave {
            write!(f, ", INTERLEAVE IN {}", quote_identifier(parent))?;
        }
        Ok(())
    }
}

impl Display for DropTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "DROP TABLE {}", quote_identifier(&self.name))
    }
}

impl Display for DropIndex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "DROP INDEX {}", quote_identifier(&self.name))
    }
}

impl Display for AlterTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ALTER TABLE {} {}", quote_identifier(&self.name), self.alteration)
    }
}

impl Display for TableAlteration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TableAlteration::AddColumn(column) => write!(f, "ADD COLUMN {}", column),
            TableAlteration::DropColumn(name) => {
                write!(f, "DROP COLUMN {}", quote_identifier(name))
            }
            TableAlteration::AddConstraint(constraint) => write!(f, "ADD {}", constraint),
            TableAlteration::DropConstraint(name) => {
                write!(f, "DROP CONSTRAINT {}", quote_identifier(name))
            }
            TableAlteration::SetOnDelete(on_delete) => write!(f, "SET ON DELETE {}", on_delete),
            TableAlteration::AlterColumn { name, alteration } => {
                write!(f, "ALTER COLUMN {} {}", quote_identifier(name), alteration)
            }
        }
    }
}

impl Display for ColumnAlteration {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ColumnAlteration::SetType { ty, not_null } => {
                write!(f, "{}", ty)?;
                if *not_null {
                    f.write_str(" NOT NULL")?;
                }
                Ok(())
            }
            ColumnAlteration::SetOptions(options) => write!(f, "SET {}", options),
        }
    }
}

impl Display for ColumnDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", quote_identifier(&self.name), self.ty)?;
        if self.not_null {
            f.write_str(" NOT NULL")?;
        }
        if let Some(expr) = &self.generated {
            write!(f, " AS ({}) STORED", expr)?;
        }
        if self.options.allow_commit_timestamp.is_some() {
            write!(f, " {}", self.options)?;
        }
        Ok(())
    }
}

impl Display for ColumnOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("OPTIONS (")?;
        match self.allow_commit_timestamp {
            Some(true) => f.write_str("allow_commit_timestamp = true")?,
            Some(false) => f.write_str("allow_commit_timestamp = null")?,
            None => {}
        }
        f.write_str(")")
    }
}

impl Display for TableConstraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.name.is_empty() {
            write!(f, "CONSTRAINT {} ", quote_identifier(&self.name))?;
        }
        self.constraint.fmt(f)
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::ForeignKey(fk) => fk.fmt(f),
            Constraint::Check(check) => check.fmt(f),
        }
    }
}

impl Display for ForeignKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("FOREIGN KEY (")?;
        name_list(f, &self.columns)?;
        write!(f, ") REFERENCES {} (", quote_identifier(&self.ref_table))?;
        name_list(f, &self.ref_columns)?;
        f.write_str(")")
    }
}

impl Display for Check {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "CHECK ({})", self.expr)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.array {
            f.write_str("ARRAY<")?;
        }
        self.base.fmt(f)?;
        if matches!(self.base, TypeBase::String | TypeBase::Bytes) {
            if self.len == MAX_LEN {
                f.write_str("(MAX)")?;
            } else {
                write!(f, "({})", self.len)?;
            }
        }
        if self.array {
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl Display for TypeBase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypeBase::Bool => "BOOL",
            TypeBase::Int64 => "INT64",
            TypeBase::Float64 => "FLOAT64",
            TypeBase::Numeric => "NUMERIC",
            TypeBase::String => "STRING",
            TypeBase::Bytes => "BYTES",
            TypeBase::Date => "DATE",
            TypeBase::Timestamp => "TIMESTAMP",
        })
    }
}

impl Display for KeyPart {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&quote_identifier(&self.column))?;
        if self.desc {
            f.write_str(" DESC")?;
        }
        Ok(())
    }
}

// ==================== DML ====================

impl Display for DmlStmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DmlStmt::Delete(d) => d.fmt(f),
            DmlStmt::Update(u) => u.fmt(f),
        }
    }
}

impl Display for Delete {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DELETE FROM {} WHERE {}",
            quote_identifier(&self.table),
            self.where_clause
        )
    }
}

impl Display for Update {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "UPDATE {} SET ", quote_identifier(&self.table))?;
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} = ", quote_identifier(&item.column))?;
            match &item.value {
                Some(expr) => expr.fmt(f)?,
                None => f.write_str("DEFAULT")?,
            }
        }
        write!(f, " WHERE {}", self.where_clause)
    }
}

// ==================== Queries ====================

impl Display for Query {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.select.fmt(f)?;
        if !self.order.is_empty() {
            f.write_str(" ORDER BY ")?;
            comma_list(f, &self.order)?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " LIMIT {}", limit)?;
            if let Some(offset) = &self.offset {
                write!(f, " OFFSET {}", offset)?;
            }
        }
        Ok(())
    }
}

impl Display for Select {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        for (i, expr) in self.list.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            expr.fmt(f)?;
            match self.list_aliases.get(i) {
                Some(alias) if !alias.is_empty() => {
                    write!(f, " AS {}", quote_identifier(alias))?
                }
                _ => {}
            }
        }
        if !self.from.is_empty() {
            f.write_str(" FROM ")?;
            for (i, from) in self.from.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                from.fmt(f)?;
                if let Some(Some(ts)) = self.table_samples.get(i) {
                    write!(f, " {}", ts)?;
                }
            }
        }
        if let Some(expr) = &self.where_clause {
            write!(f, " WHERE {}", expr)?;
        }
        if !self.group_by.is_empty() {
            f.write_str(" GROUP BY ")?;
            comma_list(f, &self.group_by)?;
        }
        Ok(())
    }
}

impl Display for SelectFrom {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let alias = match self {
            SelectFrom::Table(t) => {
                f.write_str(&quote_identifier(&t.table))?;
                &t.alias
            }
            SelectFrom::Unnest(u) => {
                write!(f, "UNNEST({})", u.expr)?;
                &u.alias
            }
            SelectFrom::Join(join) => {
                write!(f, "{} {} JOIN ", join.lhs, join.join_type)?;
                if !join.hints.is_empty() {
                    f.write_str("@{")?;
                    for (i, (key, value)) in join.hints.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}={}", quote_identifier(key), quote_identifier(value))?;
                    }
                    f.write_str("} ")?;
                }
                join.rhs.fmt(f)?;
                if let Some(on) = &join.on {
                    write!(f, " ON {}", on)?;
                }
                if !join.using.is_empty() {
                    f.write_str(" USING (")?;
                    name_list(f, &join.using)?;
                    f.write_str(")")?;
                }
                return Ok(());
            }
        };
        if let Some(alias) = alias {
            write!(f, " AS {}", quote_identifier(alias))?;
        }
        Ok(())
    }
}

impl Display for TableSample {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let method = match self.method {
            TableSampleMethod::Bernoulli => "BERNOULLI",
            TableSampleMethod::Reservoir => "RESERVOIR",
        };
        let unit = match self.size_type {
            TableSampleSizeType::Percent => "PERCENT",
            TableSampleSizeType::Rows => "ROWS",
        };
        write!(f, "TABLESAMPLE {} ({} {})", method, self.size, unit)
    }
}

impl Display for JoinType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinType::Inner => "INNER",
            JoinType::Cross => "CROSS",
            JoinType::Full => "FULL",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
        })
    }
}

impl Display for Order {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.expr.fmt(f)?;
        if self.desc {
            f.write_str(" DESC")?;
        }
        Ok(())
    }
}

impl Display for LiteralOrParam {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LiteralOrParam::Integer(n) => write!(f, "{}", n),
            LiteralOrParam::Param(name) => write!(f, "@{}", name),
        }
    }
}

// ==================== Expressions ====================

/// Binding strength of the production that yields `expr`; higher binds
/// tighter.
fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Logical {
            op: LogicalOperator::Or,
            ..
        } => 1,
        Expr::Logical {
            op: LogicalOperator::And,
            ..
        } => 2,
        Expr::Not(_) => 3,
        Expr::Is { .. } => 4,
        Expr::In { .. } => 5,
        Expr::Comparison { .. } => 6,
        Expr::Arith { .. } => 7,
        Expr::Unary { .. } => 8,
        _ => 9,
    }
}

/// Write `expr`, wrapped in parentheses if it binds looser than `min`.
fn write_expr(f: &mut Formatter<'_>, expr: &Expr, min: u8) -> fmt::Result {
    if precedence(expr) < min {
        f.write_str("(")?;
        write_expr(f, expr, 0)?;
        return f.write_str(")");
    }

    match expr {
        Expr::Unary { op, operand } => {
            f.write_str(match op {
                UnaryOperator::Neg => "-",
                UnaryOperator::Plus => "+",
                UnaryOperator::BitNot => "~",
            })?;
            write_parenthesized(f, operand)
        }
        Expr::Arith { op, lhs, rhs } => {
            write_parenthesized(f, lhs)?;
            write!(f, " {} ", op.symbol())?;
            write_parenthesized(f, rhs)
        }
        Expr::Logical { op, lhs, rhs } => {
            let (word, level) = match op {
                LogicalOperator::Or => ("OR", 1),
                LogicalOperator::And => ("AND", 2),
            };
            write_expr(f, lhs, level)?;
            write!(f, " {} ", word)?;
            write_expr(f, rhs, level + 1)
        }
        Expr::Not(operand) => {
            f.write_str("NOT ")?;
            write_expr(f, operand, 3)
        }
        Expr::Comparison { op, lhs, rhs, rhs2 } => {
            write_expr(f, lhs, 6)?;
            write!(f, " {} ", op.symbol())?;
            write_expr(f, rhs, 7)?;
            if let Some(rhs2) = rhs2 {
                f.write_str(" AND ")?;
                write_expr(f, rhs2, 7)?;
            }
            Ok(())
        }
        Expr::In {
            lhs,
            neg,
            unnest,
            rhs,
        } => {
            write_expr(f, lhs, 6)?;
            f.write_str(if *neg { " NOT IN " } else { " IN " })?;
            if *unnest {
                f.write_str("UNNEST ")?;
            }
            f.write_str("(")?;
            comma_list(f, rhs)?;
            f.write_str(")")
        }
        Expr::Is { lhs, neg, rhs } => {
            write_expr(f, lhs, 5)?;
            f.write_str(if *neg { " IS NOT " } else { " IS " })?;
            f.write_str(match rhs {
                IsTarget::Null => "NULL",
                IsTarget::True => "TRUE",
                IsTarget::False => "FALSE",
            })
        }
        Expr::Func { name, args } => {
            write!(f, "{}(", name)?;
            comma_list(f, args)?;
            f.write_str(")")
        }
        Expr::Paren(inner) => {
            f.write_str("(")?;
            write_expr(f, inner, 0)?;
            f.write_str(")")
        }
        Expr::Array(items) => {
            f.write_str("[")?;
            comma_list(f, items)?;
            f.write_str("]")
        }
        Expr::Path(parts) => {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    f.write_str(".")?;
                }
                f.write_str(&quote_identifier(part))?;
            }
            Ok(())
        }
        Expr::Ident(name) => f.write_str(&quote_identifier(name)),
        Expr::Param(name) => write!(f, "@{}", name),
        Expr::Bool(true) => f.write_str("TRUE"),
        Expr::Bool(false) => f.write_str("FALSE"),
        Expr::Null => f.write_str("NULL"),
        Expr::Integer(n) => write!(f, "{}", n),
        Expr::Float(x) => write!(f, "{:?}", x),
        Expr::String(s) => f.write_str(&quote_string(s)),
        Expr::Bytes(b) => f.write_str(&quote_bytes(b)),
        Expr::Star => f.write_str("*"),
    }
}

/// Arithmetic operands always get their own parentheses.
fn write_parenthesized(f: &mut Formatter<'_>, expr: &Expr) -> fmt::Result {
    if let Expr::Paren(_) = expr {
        return write_expr(f, expr, 0);
    }
    f.write_str("(")?;
    write_expr(f, expr, 0)?;
    f.write_str(")")
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write_expr(f, self, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ArithOperator, ComparisonOperator};

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("Singers"), "Singers");
        assert_eq!(quote_identifier("_x1"), "_x1");
        assert_eq!(quote_identifier("Order"), "`Order`");
        assert_eq!(quote_identifier("select"), "`select`");
        assert_eq!(quote_identifier("has space"), "`has space`");
        assert_eq!(quote_identifier("1st"), "`1st`");
        assert_eq!(quote_identifier("a`b"), "`a\\`b`");
    }

    #[test]
    fn test_quote_string_and_bytes() {
        assert_eq!(quote_string("it's"), "\"it's\"");
        assert_eq!(quote_string("say \"hi\"\n"), "\"say \\\"hi\\\"\\n\"");
        assert_eq!(quote_string("\u{1}"), "\"\\x01\"");
        assert_eq!(quote_string("naïve"), "\"naïve\"");
        assert_eq!(quote_bytes(b"ab\x00\xff"), "B\"ab\\x00\\xff\"");
    }

    #[test]
    fn test_arith_operands_are_parenthesized() {
        let expr = Expr::arith(
            ArithOperator::Add,
            Expr::ident("a"),
            Expr::arith(ArithOperator::Mul, Expr::Integer(2), Expr::ident("b")),
        );
        assert_eq!(expr.to_string(), "(a) + ((2) * (b))");

        let neg = Expr::Unary {
            op: UnaryOperator::Neg,
            operand: Box::new(Expr::Integer(5)),
        };
        assert_eq!(neg.to_string(), "-(5)");
    }

    #[test]
    fn test_logical_parenthesized_only_when_needed() {
        let a_or_b = Expr::logical(LogicalOperator::Or, Expr::ident("a"), Expr::ident("b"));
        let expr = Expr::logical(LogicalOperator::And, a_or_b.clone(), Expr::ident("c"));
        assert_eq!(expr.to_string(), "(a OR b) AND c");

        let expr = Expr::logical(LogicalOperator::Or, a_or_b, Expr::ident("c"));
        assert_eq!(expr.to_string(), "a OR b OR c");

        let cmp = Expr::compare(ComparisonOperator::Lt, Expr::ident("x"), Expr::Integer(3));
        let not = Expr::Not(Box::new(cmp));
        assert_eq!(not.to_string(), "NOT x < 3");
    }

    #[test]
    fn test_type_rendering() {
        assert_eq!(Type::sized(TypeBase::String, MAX_LEN).to_string(), "STRING(MAX)");
        assert_eq!(Type::sized(TypeBase::Bytes, 16).to_string(), "BYTES(16)");
        assert_eq!(
            Type::array_of(Type::scalar(TypeBase::Int64)).to_string(),
            "ARRAY<INT64>"
        );
    }

    #[test]
    fn test_create_table_rendering() {
        let mut id = ColumnDef::new("Id", Type::scalar(TypeBase::Int64));
        id.not_null = true;
        let mut ts = ColumnDef::new("Updated", Type::scalar(TypeBase::Timestamp));
        ts.options.allow_commit_timestamp = Some(true);
        let ct = CreateTable {
            name: "Albums".to_string(),
            columns: vec![id, ts],
            constraints: vec![],
            primary_key: vec![KeyPart::asc("Id"), KeyPart::desc("Updated")],
            interleave: Some(crate::ast::Interleave {
                parent: "Singers".to_string(),
                on_delete: OnDelete::Cascade,
            }),
            position: Default::default(),
        };
        assert_eq!(
            ct.to_string(),
            "CREATE TABLE Albums (\n  Id INT64 NOT NULL,\n  \
             Updated TIMESTAMP OPTIONS (allow_commit_timestamp = true),\n) \
             PRIMARY KEY(Id, Updated DESC),\n  INTERLEAVE IN PARENT Singers ON DELETE CASCADE"
        );
    }
}
