//! Error types for spansql-core.
//!
//! Every lexing and parsing failure is a positioned [`ParseError`]; nothing
//! in this crate recovers from one internally.

use thiserror::Error;

/// A positioned parse failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{filename}:{line}.{offset}: {message}")]
pub struct ParseError {
    pub filename: String,
    /// 1-based line number.
    pub line: usize,
    /// 0-based byte offset into the input.
    pub offset: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(
        filename: impl Into<String>,
        line: usize,
        offset: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            line,
            offset,
            message: message.into(),
        }
    }
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

impl serde::Serialize for ParseError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
