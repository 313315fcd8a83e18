pub mod database;
pub mod keys;
pub mod table;

pub use database::Database;
pub use keys::{KeyRange, KeySet};
pub use table::{ColumnInfo, Table};
