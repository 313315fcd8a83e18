//! Abstract syntax tree for the Spanner SQL dialect.
//!
//! Statements and expressions are closed enums; every consumer (renderer,
//! evaluator, storage engine) matches on them exhaustively. DDL nodes carry
//! a [`Position`] pointing at their leading keyword, which is diagnostic
//! metadata only: positions never take part in node equality.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Length sentinel for `STRING(MAX)` and `BYTES(MAX)`.
pub const MAX_LEN: i64 = i64::MAX;

/// Source location of a node.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Position {
    /// 1-based line number; 0 means unknown.
    pub line: usize,
    /// 0-based byte offset.
    pub offset: usize,
}

impl Position {
    pub fn new(line: usize, offset: usize) -> Self {
        Self { line, offset }
    }

    pub fn is_valid(&self) -> bool {
        self.line > 0
    }
}

impl PartialEq for Position {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for Position {}

/// Anything in a DDL file that has a source position.
pub trait Node {
    fn position(&self) -> Position;
}

// ==================== DDL ====================

/// A parsed DDL file: `;`-separated statements plus their comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ddl {
    pub list: Vec<DdlStmt>,
    pub filename: String,
    pub comments: Vec<Comment>,
}

impl Ddl {
    /// The isolated comment ending on the line just before `node`, if any.
    pub fn leading_comment(&self, node: &dyn Node) -> Option<&Comment> {
        let line = node.position().line;
        if line < 2 {
            return None;
        }
        let line_end = line - 1;
        let idx = self.comments.partition_point(|c| c.end.line < line_end);
        let comment = self.comments.get(idx)?;
        if comment.end.line != line_end || !comment.isolated {
            return None;
        }
        Some(comment)
    }

    /// A single-line comment starting on the same line as `node`, if any.
    pub fn inline_comment(&self, node: &dyn Node) -> Option<&Comment> {
        let line = node.position().line;
        let idx = self.comments.partition_point(|c| c.start.line < line);
        let comment = self.comments.get(idx)?;
        if comment.start.line != line {
            return None;
        }
        if comment.start.line != comment.end.line || comment.text.len() != 1 {
            return None;
        }
        Some(comment)
    }
}

/// A comment in a DDL file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Opening marker; one of `#`, `--`, `/*`.
    pub marker: String,
    /// Whether the comment is on its own line.
    pub isolated: bool,
    pub start: Position,
    pub end: Position,
    pub text: Vec<String>,
}

impl Node for Comment {
    fn position(&self) -> Position {
        self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DdlStmt {
    CreateTable(CreateTable),
    CreateIndex(CreateIndex),
    DropTable(DropTable),
    DropIndex(DropIndex),
    AlterTable(AlterTable),
}

impl Node for DdlStmt {
    fn position(&self) -> Position {
        match self {
            DdlStmt::CreateTable(ct) => ct.position,
            DdlStmt::CreateIndex(ci) => ci.position,
            DdlStmt::DropTable(dt) => dt.position,
            DdlStmt::DropIndex(di) => di.position,
            DdlStmt::AlterTable(at) => at.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTable {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
    pub primary_key: Vec<KeyPart>,
    pub interleave: Option<Interleave>,
    pub position: Position,
}

impl Node for CreateTable {
    fn position(&self) -> Position {
        self.position
    }
}

/// `INTERLEAVE IN PARENT` clause of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interleave {
    pub parent: String,
    pub on_delete: OnDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OnDelete {
    #[default]
    NoAction,
    Cascade,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateIndex {
    pub name: String,
    pub table: String,
    pub columns: Vec<KeyPart>,
    pub unique: bool,
    pub null_filtered: bool,
    pub storing: Vec<String>,
    pub interleave: Option<String>,
    pub position: Position,
}

impl Node for CreateIndex {
    fn position(&self) -> Position {
        self.position
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTable {
    pub name: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropIndex {
    pub name: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterTable {
    pub name: String,
    pub alteration: TableAlteration,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableAlteration {
    AddColumn(ColumnDef),
    DropColumn(String),
    AddConstraint(TableConstraint),
    DropConstraint(String),
    SetOnDelete(OnDelete),
    AlterColumn {
        name: String,
        alteration: ColumnAlteration,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnAlteration {
    SetType { ty: Type, not_null: bool },
    SetOptions(ColumnOptions),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub ty: Type,
    pub not_null: bool,
    /// Expression of a generated (`AS (...) STORED`) column.
    pub generated: Option<Expr>,
    pub options: ColumnOptions,
    pub position: Position,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            not_null: false,
            generated: None,
            options: ColumnOptions::default(),
            position: Position::default(),
        }
    }
}

impl Node for ColumnDef {
    fn position(&self) -> Position {
        self.position
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnOptions {
    /// `Some(true)` for `allow_commit_timestamp = true`, `Some(false)` for `= null`.
    pub allow_commit_timestamp: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConstraint {
    /// Empty for unnamed constraints.
    pub name: String,
    pub constraint: Constraint,
    pub position: Position,
}

impl Node for TableConstraint {
    fn position(&self) -> Position {
        self.position
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    ForeignKey(ForeignKey),
    Check(Check),
}

impl Node for Constraint {
    fn position(&self) -> Position {
        match self {
            Constraint::ForeignKey(fk) => fk.position,
            Constraint::Check(c) => c.position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Check {
    pub expr: Expr,
    pub position: Position,
}

/// A column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Type {
    pub array: bool,
    pub base: TypeBase,
    /// Only meaningful for STRING and BYTES.
    pub len: i64,
}

impl Type {
    pub fn scalar(base: TypeBase) -> Self {
        Self {
            array: false,
            base,
            len: 0,
        }
    }

    pub fn sized(base: TypeBase, len: i64) -> Self {
        Self {
            array: false,
            base,
            len,
        }
    }

    pub fn array_of(elem: Type) -> Self {
        Self {
            array: true,
            ..elem
        }
    }

    /// The element type of an array type, or the type itself.
    pub fn element(&self) -> Type {
        Type {
            array: false,
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeBase {
    Bool,
    Int64,
    Float64,
    Numeric,
    String,
    Bytes,
    Date,
    Timestamp,
}

impl TypeBase {
    pub fn from_keyword(word: &str) -> Option<TypeBase> {
        let base = match word.to_ascii_uppercase().as_str() {
            "BOOL" => TypeBase::Bool,
            "INT64" => TypeBase::Int64,
            "FLOAT64" => TypeBase::Float64,
            "NUMERIC" => TypeBase::Numeric,
            "STRING" => TypeBase::String,
            "BYTES" => TypeBase::Bytes,
            "DATE" => TypeBase::Date,
            "TIMESTAMP" => TypeBase::Timestamp,
            _ => return None,
        };
        Some(base)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPart {
    pub column: String,
    pub desc: bool,
}

impl KeyPart {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            desc: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            desc: true,
        }
    }
}

// ==================== DML ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DmlStmt {
    Delete(Delete),
    Update(Update),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delete {
    pub table: String,
    pub where_clause: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    pub table: String,
    pub items: Vec<UpdateItem>,
    pub where_clause: Expr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateItem {
    pub column: String,
    /// `None` means `DEFAULT`.
    pub value: Option<Expr>,
}

// ==================== Queries ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub select: Select,
    pub order: Vec<Order>,
    pub limit: Option<LiteralOrParam>,
    pub offset: Option<LiteralOrParam>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Select {
    pub distinct: bool,
    pub list: Vec<Expr>,
    pub from: Vec<SelectFrom>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    /// Populated 1:1 with `list` only when some item has an alias;
    /// items without one hold an empty string.
    pub list_aliases: Vec<String>,
    /// Populated 1:1 with `from` only when some item has a TABLESAMPLE.
    pub table_samples: Vec<Option<TableSample>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectFrom {
    Table(SelectFromTable),
    Join(Box<SelectFromJoin>),
    Unnest(SelectFromUnnest),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectFromTable {
    pub table: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectFromJoin {
    pub join_type: JoinType,
    pub lhs: SelectFrom,
    pub rhs: SelectFrom,
    pub on: Option<Expr>,
    pub using: Vec<String>,
    pub hints: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectFromUnnest {
    pub expr: Expr,
    pub alias: Option<String>,
}

/// `TABLESAMPLE method (size unit)` on a FROM item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSample {
    pub method: TableSampleMethod,
    pub size: Expr,
    pub size_type: TableSampleSizeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableSampleMethod {
    Bernoulli,
    Reservoir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableSampleSizeType {
    Percent,
    Rows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Cross,
    Full,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub expr: Expr,
    pub desc: bool,
}

/// Operand of LIMIT and OFFSET.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiteralOrParam {
    Integer(i64),
    Param(String),
}

// ==================== Expressions ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    Neg,
    Plus,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOperator {
    Mul,
    Div,
    Concat,
    Add,
    Sub,
    BitShl,
    BitShr,
    BitAnd,
    BitXor,
    BitOr,
}

impl ArithOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOperator::Mul => "*",
            ArithOperator::Div => "/",
            ArithOperator::Concat => "||",
            ArithOperator::Add => "+",
            ArithOperator::Sub => "-",
            ArithOperator::BitShl => "<<",
            ArithOperator::BitShr => ">>",
            ArithOperator::BitAnd => "&",
            ArithOperator::BitXor => "^",
            ArithOperator::BitOr => "|",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Like,
    NotLike,
    Between,
    NotBetween,
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Like => "LIKE",
            ComparisonOperator::NotLike => "NOT LIKE",
            ComparisonOperator::Between => "BETWEEN",
            ComparisonOperator::NotBetween => "NOT BETWEEN",
        }
    }

    pub fn is_between(&self) -> bool {
        matches!(
            self,
            ComparisonOperator::Between | ComparisonOperator::NotBetween
        )
    }
}

/// Right-hand side of `IS [NOT]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IsTarget {
    Null,
    True,
    False,
}

/// A scalar or boolean expression.
///
/// `Paren` records explicit grouping from the source text. It is
/// transparent to equality: `(a)` compares equal to `a`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    Unary {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Arith {
        op: ArithOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Logical {
        op: LogicalOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Not(Box<Expr>),
    Comparison {
        op: ComparisonOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        /// Upper bound of BETWEEN.
        rhs2: Option<Box<Expr>>,
    },
    In {
        lhs: Box<Expr>,
        neg: bool,
        unnest: bool,
        rhs: Vec<Expr>,
    },
    Is {
        lhs: Box<Expr>,
        neg: bool,
        rhs: IsTarget,
    },
    Func {
        name: String,
        args: Vec<Expr>,
    },
    Paren(Box<Expr>),
    Array(Vec<Expr>),
    Path(Vec<String>),
    Ident(String),
    Param(String),
    Bool(bool),
    Null,
    Integer(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Star,
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Expr {
        Expr::Ident(name.into())
    }

    pub fn arith(op: ArithOperator, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Arith {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn logical(op: LogicalOperator, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Logical {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn compare(op: ComparisonOperator, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Comparison {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            rhs2: None,
        }
    }

    /// Strip any number of enclosing parentheses.
    pub fn unparen(&self) -> &Expr {
        let mut expr = self;
        while let Expr::Paren(inner) = expr {
            expr = inner;
        }
        expr
    }

    /// Whether the expression can appear where a boolean is required.
    pub fn is_bool_expr(&self) -> bool {
        matches!(
            self,
            Expr::Logical { .. }
                | Expr::Not(_)
                | Expr::Comparison { .. }
                | Expr::In { .. }
                | Expr::Is { .. }
                | Expr::Func { .. }
                | Expr::Paren(_)
                | Expr::Path(_)
                | Expr::Ident(_)
                | Expr::Param(_)
                | Expr::Bool(_)
                | Expr::Null
        )
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        use Expr::*;
        match (self.unparen(), other.unparen()) {
            (Unary { op: a, operand: x }, Unary { op: b, operand: y }) => a == b && x == y,
            (
                Arith {
                    op: a,
                    lhs: l1,
                    rhs: r1,
                },
                Arith {
                    op: b,
                    lhs: l2,
                    rhs: r2,
                },
            ) => a == b && l1 == l2 && r1 == r2,
            (
                Logical {
                    op: a,
                    lhs: l1,
                    rhs: r1,
                },
                Logical {
                    op: b,
                    lhs: l2,
                    rhs: r2,
                },
            ) => a == b && l1 == l2 && r1 == r2,
            (Not(a), Not(b)) => a == b,
            (
                Comparison {
                    op: a,
                    lhs: l1,
                    rhs: r1,
                    rhs2: s1,
                },
                Comparison {
                    op: b,
                    lhs: l2,
                    rhs: r2,
                    rhs2: s2,
                },
            ) => a == b && l1 == l2 && r1 == r2 && s1 == s2,
            (
                In {
                    lhs: l1,
                    neg: n1,
                    unnest: u1,
                    rhs: r1,
                },
                In {
                    lhs: l2,
                    neg: n2,
                    unnest: u2,
                    rhs: r2,
                },
            ) => n1 == n2 && u1 == u2 && l1 == l2 && r1 == r2,
            (
                Is {
                    lhs: l1,
                    neg: n1,
                    rhs: r1,
                },
                Is {
                    lhs: l2,
                    neg: n2,
                    rhs: r2,
                },
            ) => n1 == n2 && r1 == r2 && l1 == l2,
            (Func { name: n1, args: a1 }, Func { name: n2, args: a2 }) => n1 == n2 && a1 == a2,
            (Array(a), Array(b)) => a == b,
            (Path(a), Path(b)) => a == b,
            (Ident(a), Ident(b)) => a == b,
            (Param(a), Param(b)) => a == b,
            (Bool(a), Bool(b)) => a == b,
            (Null, Null) => true,
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Star, Star) => true,
            _ => false,
        }
    }
}
