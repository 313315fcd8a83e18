//! spansql-core - Lexer, parser, AST and renderer for the Cloud Spanner SQL
//! dialect.
//!
//! This crate has no storage dependencies. It turns SQL text into typed
//! syntax trees and renders those trees back into SQL that parses to an
//! equal tree.
//!
//! # Main Components
//!
//! - **Lexer**: Tokenizes SQL text and collects comments
//! - **Parser**: Recursive-descent parser for DDL, DML, queries and expressions
//! - **AST**: Closed enums for every statement and expression kind
//! - **Renderer**: `Display` implementations producing canonical SQL
//!
//! # Example
//!
//! ```rust
//! use spansql_core::parse_query;
//!
//! let query = parse_query("SELECT 1 AS one").unwrap();
//! let sql = query.to_string();
//! assert_eq!(parse_query(&sql).unwrap(), query);
//! ```

pub mod ast;
pub mod error;
pub mod keywords;
pub mod lexer;
pub mod parser;
pub mod sql;

// Re-export main types for convenience
pub use ast::{
    ColumnDef, CreateTable, Ddl, DdlStmt, DmlStmt, Expr, KeyPart, Node, Position, Query, Select,
    Type, TypeBase,
};
pub use error::{ParseError, ParseResult};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{parse_ddl, parse_ddl_stmt, parse_dml_stmt, parse_expr, parse_query, Parser};
pub use sql::{quote_bytes, quote_identifier, quote_string};
