use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Object, Pool, PoolConfig, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

use super::backend::{
  ApplyReport, CommitMode, DatabaseBackend, SqlDialect, StoredRow, UpdateTarget,
};
use crate::config::PostgresSection;
use crate::error::SyncError;
use crate::types::PendingUpdate;

const APPLICATION_NAME: &str = "product-sync";

pub struct PostgresBackend {
  pool: Pool,
}

impl PostgresBackend {
  pub fn new(url: &str, max_connections: usize) -> Result<Self, SyncError> {
    let mut cfg = Config::new();
    cfg.url = Some(url.into());
    Self::with_config(cfg, max_connections)
  }

  /// Builds the pool from the `postgres` config section. A URL, when set,
  /// takes precedence over the discrete connection fields.
  pub fn from_config(section: &PostgresSection) -> Result<Self, SyncError> {
    let mut cfg = Config::new();
    if let Some(url) = &section.url {
      cfg.url = Some(url.clone());
    } else {
      cfg.host = Some(section.host.clone());
      cfg.port = Some(section.port);
      cfg.dbname = Some(section.dbname.clone());
      cfg.user = Some(section.user.clone());
      cfg.password = section.password.clone();
    }
    if section.connect_timeout_secs > 0 {
      cfg.connect_timeout = Some(Duration::from_secs(section.connect_timeout_secs));
    }
    Self::with_config(cfg, section.max_connections)
  }

  fn with_config(mut cfg: Config, max_connections: usize) -> Result<Self, SyncError> {
    cfg.application_name = Some(APPLICATION_NAME.into());
    cfg.manager = Some(ManagerConfig {
      recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(max_connections.max(1)));
    let pool = cfg
      .create_pool(Some(Runtime::Tokio1), NoTls)
      .map_err(|e| SyncError::connection("invalid PostgreSQL configuration", e))?;
    Ok(Self { pool })
  }

  async fn client(&self) -> Result<Object, SyncError> {
    self
      .pool
      .get()
      .await
      .map_err(|e| SyncError::connection("cannot reach PostgreSQL", e))
  }
}

impl Drop for PostgresBackend {
  fn drop(&mut self) {
    self.pool.close();
  }
}

#[async_trait]
impl DatabaseBackend for PostgresBackend {
  fn dialect(&self) -> SqlDialect {
    SqlDialect::Postgres
  }

  async fn ping(&self) -> Result<(), SyncError> {
    self
      .client()
      .await?
      .simple_query("SELECT 1")
      .await
      .map_err(|e| SyncError::connection("PostgreSQL ping failed", e))?;
    Ok(())
  }

  async fn apply_updates(
    &self,
    target: &UpdateTarget,
    updates: &[PendingUpdate],
    mode: CommitMode,
  ) -> Result<ApplyReport, SyncError> {
    let sql = self.dialect().update_statement(target)?;
    let Some(first) = updates.first() else {
      return Ok(ApplyReport::default());
    };

    // One pooled connection for the whole run; it goes back to the pool on
    // every exit path.
    let mut client = self.client().await?;
    let stmt = client
      .prepare_cached(&sql)
      .await
      .map_err(|e| SyncError::update(first.product_id, e))?;

    let mut report = ApplyReport::default();
    match mode {
      CommitMode::Single => {
        let tx = client
          .transaction()
          .await
          .map_err(|e| SyncError::connection("cannot begin transaction", e))?;
        for update in updates {
          // Dropping `tx` on error rolls the whole run back.
          let rows = tx
            .execute(&stmt, &[&update.payload, &update.product_id])
            .await
            .map_err(|e| SyncError::update(update.product_id, e))?;
          report.record(update.product_id, rows);
        }
        tx.commit().await.map_err(SyncError::commit)?;
        report.commits = 1;
      }
      CommitMode::PerRecord => {
        for update in updates {
          let rows = client
            .execute(&stmt, &[&update.payload, &update.product_id])
            .await
            .map_err(|e| SyncError::update(update.product_id, e))?;
          report.record(update.product_id, rows);
          report.commits += 1;
        }
      }
    }
    Ok(report)
  }

  async fn fetch_row(
    &self,
    target: &UpdateTarget,
    product_id: i64,
  ) -> Result<Option<StoredRow>, SyncError> {
    let sql = self.dialect().select_statement(target)?;
    let row = self
      .client()
      .await?
      .query_opt(&sql, &[&product_id])
      .await
      .map_err(|e| SyncError::connection("cannot read back product row", e))?;
    Ok(row.map(|r| StoredRow {
      product_id: r.get(0),
      characteristics: r.get(1),
    }))
  }
}
