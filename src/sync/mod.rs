//! The synchronization run: catalog in, one `UPDATE` per product out.

mod report;

use std::sync::Arc;
use std::time::Instant;

use crate::config::{BackendType, SyncConfig};
use crate::db::{CommitMode, DatabaseBackend, PostgresBackend, SqliteBackend, UpdateTarget};
use crate::error::SyncError;
use crate::types::{PendingUpdate, ProductCatalog};

pub use report::SyncReport;

/// Writes the characteristics of every catalog record into the target
/// column of the row with the same product id.
pub struct Synchronizer {
  backend: Arc<dyn DatabaseBackend>,
  target: UpdateTarget,
  commit_mode: CommitMode,
}

impl Synchronizer {
  pub fn new(
    backend: Arc<dyn DatabaseBackend>,
    target: UpdateTarget,
    commit_mode: CommitMode,
  ) -> Self {
    Self {
      backend,
      target,
      commit_mode,
    }
  }

  /// Serializes every payload, in document order. Touches no store.
  pub fn prepare(catalog: &ProductCatalog) -> Result<Vec<PendingUpdate>, SyncError> {
    catalog
      .products
      .iter()
      .map(PendingUpdate::from_record)
      .collect()
  }

  /// Applies the whole catalog. The first failure aborts the run; with
  /// [`CommitMode::Single`] nothing of the run is persisted in that case.
  pub async fn run(&self, catalog: &ProductCatalog) -> Result<SyncReport, SyncError> {
    let updates = Self::prepare(catalog)?;
    self.run_prepared(&updates).await
  }

  /// Applies updates already produced by [`Synchronizer::prepare`].
  pub async fn run_prepared(&self, updates: &[PendingUpdate]) -> Result<SyncReport, SyncError> {
    let started = Instant::now();
    self.target.validate()?;

    tracing::info!(
      records = updates.len(),
      table = %self.target.table,
      column = %self.target.column,
      commit = %self.commit_mode,
      "Applying product characteristics"
    );

    let applied = self
      .backend
      .apply_updates(&self.target, updates, self.commit_mode)
      .await
      .inspect_err(|e| tracing::error!(kind = e.kind(), error = %e, "Synchronization aborted"))?;

    let report =
      SyncReport::from_apply(updates.len(), applied, self.commit_mode, started.elapsed());
    tracing::info!(
      statements = report.statements,
      rows = report.rows_affected,
      unmatched = report.unmatched.len(),
      elapsed_ms = report.elapsed.as_millis() as u64,
      "Synchronization complete"
    );
    Ok(report)
  }
}

/// Opens the store selected by the configuration and checks that it answers.
pub async fn connect(config: &SyncConfig) -> Result<Arc<dyn DatabaseBackend>, SyncError> {
  let backend: Arc<dyn DatabaseBackend> = match config.backend {
    BackendType::Postgres => Arc::new(PostgresBackend::from_config(&config.postgres)?),
    BackendType::Sqlite => Arc::new(SqliteBackend::open(&config.sqlite.path).await?),
  };
  backend.ping().await?;
  tracing::info!(store = %config.store_description(), "Connected to store");
  Ok(backend)
}

/// Loads the configured catalog, then connects and runs. The catalog is
/// parsed before any connection is opened, so bad input never reaches the
/// store. The connection is released when this returns, on every path.
pub async fn sync_catalog_file(config: &SyncConfig) -> Result<SyncReport, SyncError> {
  config.validate()?;
  let catalog = ProductCatalog::load(&config.input.path).await?;
  // Serialization failures surface here, still before connecting.
  let updates = Synchronizer::prepare(&catalog)?;
  drop(catalog);

  let backend = connect(config).await?;
  let synchronizer = Synchronizer::new(backend, config.target.clone(), config.commit);
  synchronizer.run_prepared(&updates).await
}

/// Loads and serializes the configured catalog without connecting.
pub async fn dry_run(config: &SyncConfig) -> Result<SyncReport, SyncError> {
  let started = Instant::now();
  config.validate()?;
  let catalog = ProductCatalog::load(&config.input.path).await?;
  let updates = Synchronizer::prepare(&catalog)?;
  for update in &updates {
    tracing::debug!(product_id = update.product_id, payload = %update.payload, "Would update");
  }
  Ok(SyncReport::dry_run(updates.len(), config.commit, started.elapsed()))
}
