use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::sanitize::{quote_identifier, validate_identifier, SqlSanitizeError};
use crate::error::SyncError;
use crate::types::PendingUpdate;

/// How the bound JSON text is stored in the target column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
  #[default]
  Text,
  Json,
  Jsonb,
}

impl FromStr for ColumnType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "text" => Ok(Self::Text),
      "json" => Ok(Self::Json),
      "jsonb" => Ok(Self::Jsonb),
      other => Err(format!(
        "unknown column type '{}' (expected text, json or jsonb)",
        other
      )),
    }
  }
}

/// When updates are committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
  /// One transaction for the whole run; any failure rolls everything back.
  #[default]
  Single,
  /// Every update is committed on its own.
  PerRecord,
}

impl FromStr for CommitMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "single" => Ok(Self::Single),
      "per-record" | "per_record" => Ok(Self::PerRecord),
      other => Err(format!(
        "unknown commit mode '{}' (expected single or per-record)",
        other
      )),
    }
  }
}

impl fmt::Display for CommitMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Single => write!(f, "single"),
      Self::PerRecord => write!(f, "per-record"),
    }
  }
}

/// Table and columns the characteristics are written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTarget {
  #[serde(default = "default_table")]
  pub table: String,
  #[serde(default = "default_id_column")]
  pub id_column: String,
  #[serde(default = "default_column")]
  pub column: String,
  #[serde(default)]
  pub column_type: ColumnType,
}

fn default_table() -> String {
  "products".into()
}
fn default_id_column() -> String {
  "product_id".into()
}
fn default_column() -> String {
  "caracteristicas_json".into()
}

impl Default for UpdateTarget {
  fn default() -> Self {
    Self {
      table: default_table(),
      id_column: default_id_column(),
      column: default_column(),
      column_type: ColumnType::default(),
    }
  }
}

impl UpdateTarget {
  pub fn validate(&self) -> Result<(), SqlSanitizeError> {
    validate_identifier(&self.table)?;
    validate_identifier(&self.id_column)?;
    validate_identifier(&self.column)?;
    Ok(())
  }
}

/// SQL dialect for statement rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
  Postgres,
  Sqlite,
}

impl SqlDialect {
  /// `UPDATE` statement binding the payload as the first parameter and the
  /// product id as the second.
  pub fn update_statement(&self, target: &UpdateTarget) -> Result<String, SqlSanitizeError> {
    let table = quote_identifier(&target.table)?;
    let column = quote_identifier(&target.column)?;
    let id = quote_identifier(&target.id_column)?;
    Ok(match self {
      // The bigint cast lets smallint/integer id columns compare against an i64.
      Self::Postgres => format!(
        "UPDATE {} SET {} = {} WHERE {} = $2::bigint",
        table,
        column,
        self.payload_param(target.column_type),
        id
      ),
      Self::Sqlite => format!("UPDATE {} SET {} = ?1 WHERE {} = ?2", table, column, id),
    })
  }

  /// `SELECT` of the id and the stored characteristics as text.
  pub fn select_statement(&self, target: &UpdateTarget) -> Result<String, SqlSanitizeError> {
    let table = quote_identifier(&target.table)?;
    let column = quote_identifier(&target.column)?;
    let id = quote_identifier(&target.id_column)?;
    Ok(match self {
      Self::Postgres => {
        format!("SELECT {id}::bigint, {column}::text FROM {table} WHERE {id} = $1::bigint")
      }
      Self::Sqlite => format!("SELECT {id}, {column} FROM {table} WHERE {id} = ?1"),
    })
  }

  fn payload_param(&self, column_type: ColumnType) -> &'static str {
    match (self, column_type) {
      (Self::Postgres, ColumnType::Text) => "$1::text",
      (Self::Postgres, ColumnType::Json) => "$1::text::json",
      (Self::Postgres, ColumnType::Jsonb) => "$1::text::jsonb",
      (Self::Sqlite, _) => "?1",
    }
  }
}

/// Outcome of applying a list of pending updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
  /// Update statements executed.
  pub statements: usize,
  pub rows_affected: u64,
  /// Product ids whose update matched no row.
  pub unmatched: Vec<i64>,
  /// Transactions committed.
  pub commits: usize,
}

impl ApplyReport {
  pub(crate) fn record(&mut self, product_id: i64, rows: u64) {
    self.statements += 1;
    self.rows_affected += rows;
    if rows == 0 {
      tracing::warn!(product_id, "No row matched product id");
      self.unmatched.push(product_id);
    } else {
      tracing::debug!(product_id, rows, "Updated characteristics");
    }
  }
}

/// A row of the target table as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
  pub product_id: i64,
  pub characteristics: Option<String>,
}

/// Abstract store backend
#[async_trait]
pub trait DatabaseBackend: Send + Sync {
  fn dialect(&self) -> SqlDialect;

  /// Round-trip to the store to check the connection.
  async fn ping(&self) -> Result<(), SyncError>;

  /// Executes one update per pending update, in order, and commits according
  /// to `mode`. An error rolls back whatever is not committed yet.
  async fn apply_updates(
    &self,
    target: &UpdateTarget,
    updates: &[PendingUpdate],
    mode: CommitMode,
  ) -> Result<ApplyReport, SyncError>;

  async fn fetch_row(
    &self,
    target: &UpdateTarget,
    product_id: i64,
  ) -> Result<Option<StoredRow>, SyncError>;
}
