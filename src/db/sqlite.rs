use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, OpenFlags, OptionalExtension};
use tokio_rusqlite::Connection;

use super::backend::{
  ApplyReport, CommitMode, DatabaseBackend, SqlDialect, StoredRow, UpdateTarget,
};
use crate::error::SyncError;
use crate::types::PendingUpdate;

// Connection-scoped only. The journal mode is a property of the database
// file and is left as the owner configured it.
const PRAGMAS: &str = r#"
PRAGMA foreign_keys = ON;
PRAGMA busy_timeout = 5000;
"#;

pub struct SqliteBackend {
  conn: Connection,
}

impl SqliteBackend {
  /// Opens an existing database file. A missing file is a connection error,
  /// not a fresh empty database.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self, SyncError> {
    let path = path.as_ref();
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
      | OpenFlags::SQLITE_OPEN_URI
      | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)
      .await
      .map_err(|e| SyncError::connection(format!("cannot open {}", path.display()), e))?;
    Self::with_connection(conn).await
  }

  /// Opens a database file, creating it if needed.
  pub async fn create(path: impl AsRef<Path>) -> Result<Self, SyncError> {
    let path = path.as_ref();
    let conn = Connection::open(path)
      .await
      .map_err(|e| SyncError::connection(format!("cannot create {}", path.display()), e))?;
    Self::with_connection(conn).await
  }

  pub async fn in_memory() -> Result<Self, SyncError> {
    let conn = Connection::open_in_memory()
      .await
      .map_err(|e| SyncError::connection("cannot open in-memory database", e))?;
    Self::with_connection(conn).await
  }

  async fn with_connection(conn: Connection) -> Result<Self, SyncError> {
    conn
      .call(|conn| conn.execute_batch(PRAGMAS).map_err(|e| e.into()))
      .await
      .map_err(|e| SyncError::connection("cannot configure SQLite connection", e))?;
    Ok(Self { conn })
  }

  /// Runs a batch of statements outside of any update run, e.g. to create
  /// and seed the products table.
  pub async fn execute_batch(&self, sql: &str) -> Result<(), SyncError> {
    let sql = sql.to_string();
    self
      .conn
      .call(move |conn| conn.execute_batch(&sql).map_err(|e| e.into()))
      .await
      .map_err(|e| SyncError::connection("batch execution failed", e))
  }
}

#[async_trait]
impl DatabaseBackend for SqliteBackend {
  fn dialect(&self) -> SqlDialect {
    SqlDialect::Sqlite
  }

  async fn ping(&self) -> Result<(), SyncError> {
    self
      .conn
      .call(|conn| {
        conn
          .query_row("SELECT 1", [], |r| r.get::<_, i64>(0))
          .map_err(|e| e.into())
      })
      .await
      .map_err(|e| SyncError::connection("SQLite ping failed", e))?;
    Ok(())
  }

  async fn apply_updates(
    &self,
    target: &UpdateTarget,
    updates: &[PendingUpdate],
    mode: CommitMode,
  ) -> Result<ApplyReport, SyncError> {
    let sql = self.dialect().update_statement(target)?;
    if updates.is_empty() {
      return Ok(ApplyReport::default());
    }
    let updates = updates.to_vec();

    // The inner result carries per-record failures; the outer one only fails
    // when the connection thread is gone.
    self
      .conn
      .call(move |conn| Ok(apply_on_connection(conn, &sql, &updates, mode)))
      .await
      .map_err(|e| SyncError::connection("SQLite connection closed", e))?
  }

  async fn fetch_row(
    &self,
    target: &UpdateTarget,
    product_id: i64,
  ) -> Result<Option<StoredRow>, SyncError> {
    let sql = self.dialect().select_statement(target)?;
    self
      .conn
      .call(move |conn| {
        conn
          .query_row(&sql, params![product_id], |r| {
            Ok(StoredRow {
              product_id: r.get(0)?,
              characteristics: r.get(1)?,
            })
          })
          .optional()
          .map_err(|e| e.into())
      })
      .await
      .map_err(|e| SyncError::connection("cannot read back product row", e))
  }
}

fn apply_on_connection(
  conn: &mut rusqlite::Connection,
  sql: &str,
  updates: &[PendingUpdate],
  mode: CommitMode,
) -> Result<ApplyReport, SyncError> {
  let mut report = ApplyReport::default();
  // `updates` is never empty here.
  let first_id = updates[0].product_id;

  match mode {
    CommitMode::Single => {
      let tx = conn
        .transaction()
        .map_err(|e| SyncError::connection("cannot begin transaction", e))?;
      {
        let mut stmt = tx
          .prepare_cached(sql)
          .map_err(|e| SyncError::update(first_id, e))?;
        for update in updates {
          // An early return drops `tx`, which rolls the run back.
          let rows = stmt
            .execute(params![update.payload, update.product_id])
            .map_err(|e| SyncError::update(update.product_id, e))?;
          report.record(update.product_id, rows as u64);
        }
      }
      tx.commit().map_err(SyncError::commit)?;
      report.commits = 1;
    }
    CommitMode::PerRecord => {
      let mut stmt = conn
        .prepare_cached(sql)
        .map_err(|e| SyncError::update(first_id, e))?;
      for update in updates {
        let rows = stmt
          .execute(params![update.payload, update.product_id])
          .map_err(|e| SyncError::update(update.product_id, e))?;
        report.record(update.product_id, rows as u64);
        report.commits += 1;
      }
    }
  }
  Ok(report)
}
