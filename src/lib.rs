pub mod config;
pub mod error;
pub mod query;
pub mod shell;
pub mod storage;
pub mod transaction;
pub mod value;

pub use error::{DbError, DbResult, StatusCode};
pub use query::iter::RawIter;
pub use query::{collect_rows, Params, RowIter};
pub use storage::{ColumnInfo, Database, KeyRange, KeySet, Table};
pub use transaction::clock::{Clock, FixedClock, SystemClock};
pub use transaction::{Transaction, TransactionId, TransactionState};
pub use value::{Row, Value, COMMIT_TIMESTAMP};

pub use spansql_core;
