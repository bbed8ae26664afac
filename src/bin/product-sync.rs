use std::path::PathBuf;

use clap::Parser;
use productsync::config::{BackendType, SyncConfig};
use productsync::db::{ColumnType, CommitMode};
use productsync::sync;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
  name = "product-sync",
  about = "Write product characteristics from a JSON catalog into the products table",
  version
)]
struct Args {
  #[arg(short, long)]
  config: Option<PathBuf>,
  /// Catalog document ({"products": [...]})
  #[arg(short, long)]
  input: Option<PathBuf>,
  #[arg(long, env = "PRODUCTSYNC_PG_URL")]
  pg_url: Option<String>,
  #[arg(long, env = "PGHOST")]
  pg_host: Option<String>,
  #[arg(long, env = "PGPORT")]
  pg_port: Option<u16>,
  #[arg(long, env = "PGDATABASE")]
  pg_database: Option<String>,
  #[arg(long, env = "PGUSER")]
  pg_user: Option<String>,
  #[arg(long, env = "PGPASSWORD", hide_env_values = true)]
  pg_password: Option<String>,
  #[arg(long, env = "PRODUCTSYNC_SQLITE_PATH")]
  sqlite: Option<PathBuf>,
  #[arg(long)]
  table: Option<String>,
  #[arg(long)]
  id_column: Option<String>,
  #[arg(long)]
  column: Option<String>,
  /// text, json or jsonb
  #[arg(long)]
  column_type: Option<ColumnType>,
  /// single or per-record
  #[arg(long)]
  commit: Option<CommitMode>,
  /// Parse and serialize the catalog without touching the store
  #[arg(long)]
  dry_run: bool,
  #[arg(long)]
  log_level: Option<String>,
}

impl Args {
  /// CLI args override config file
  fn apply(self, config: &mut SyncConfig) {
    if let Some(path) = self.input {
      config.input.path = path;
    }
    if let Some(url) = self.pg_url {
      config.postgres.url = Some(url);
      config.backend = BackendType::Postgres;
    }
    if let Some(host) = self.pg_host {
      config.postgres.host = host;
    }
    if let Some(port) = self.pg_port {
      config.postgres.port = port;
    }
    if let Some(dbname) = self.pg_database {
      config.postgres.dbname = dbname;
    }
    if let Some(user) = self.pg_user {
      config.postgres.user = user;
    }
    if let Some(password) = self.pg_password {
      config.postgres.password = Some(password);
    }
    if let Some(path) = self.sqlite {
      config.sqlite.path = path;
      config.backend = BackendType::Sqlite;
    }
    if let Some(table) = self.table {
      config.target.table = table;
    }
    if let Some(id_column) = self.id_column {
      config.target.id_column = id_column;
    }
    if let Some(column) = self.column {
      config.target.column = column;
    }
    if let Some(column_type) = self.column_type {
      config.target.column_type = column_type;
    }
    if let Some(commit) = self.commit {
      config.commit = commit;
    }
    if let Some(level) = self.log_level {
      config.logging.level = level;
    }
  }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
  let args = Args::parse();
  let dry_run = args.dry_run;

  // Load config: explicit path > auto-detect > defaults
  let config_path = args.config.clone().or_else(SyncConfig::find_path);
  let mut config = match &config_path {
    Some(path) => SyncConfig::from_file(path)?,
    None => SyncConfig::default(),
  };
  args.apply(&mut config);

  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into()),
    )
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();

  match &config_path {
    Some(path) => tracing::info!("Loaded config from {}", path.display()),
    None => tracing::debug!("No config file found, using defaults"),
  }

  let report = if dry_run {
    sync::dry_run(&config).await?
  } else {
    sync::sync_catalog_file(&config).await?
  };

  println!("{}", report);
  Ok(())
}
