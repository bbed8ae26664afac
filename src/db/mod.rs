mod backend;
mod postgres;
pub mod sanitize;
mod sqlite;

pub use backend::{
  ApplyReport, ColumnType, CommitMode, DatabaseBackend, SqlDialect, StoredRow, UpdateTarget,
};
pub use postgres::PostgresBackend;
pub use sanitize::{quote_identifier, validate_identifier, SqlSanitizeError};
pub use sqlite::SqliteBackend;
