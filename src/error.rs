use spansql_core::ParseError;
use std::fmt;
use thiserror::Error;

/// Categorical status code attached to every engine error.
///
/// A transport layer maps these onto its own status representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    NotFound,
    AlreadyExists,
    InvalidArgument,
    Unimplemented,
    FailedPrecondition,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::AlreadyExists => "ALREADY_EXISTS",
            StatusCode::InvalidArgument => "INVALID_ARGUMENT",
            StatusCode::Unimplemented => "UNIMPLEMENTED",
            StatusCode::FailedPrecondition => "FAILED_PRECONDITION",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Unimplemented(String),

    #[error("{0}")]
    FailedPrecondition(String),

    #[error("divide by zero")]
    DivideByZero,

    #[error("transaction is read-only")]
    ReadOnlyTransaction,

    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub fn code(&self) -> StatusCode {
        match self {
            DbError::NotFound(_) => StatusCode::NotFound,
            DbError::AlreadyExists(_) => StatusCode::AlreadyExists,
            DbError::Unimplemented(_) => StatusCode::Unimplemented,
            DbError::FailedPrecondition(_) => StatusCode::FailedPrecondition,
            DbError::InvalidArgument(_)
            | DbError::DivideByZero
            | DbError::ReadOnlyTransaction
            | DbError::Parse(_) => StatusCode::InvalidArgument,
        }
    }
}

impl serde::Serialize for DbError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
