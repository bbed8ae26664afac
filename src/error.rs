use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by a synchronization run.
///
/// Nothing inside the run catches these: the first one aborts the remaining
/// updates and is returned to the caller.
#[derive(Debug, Error)]
pub enum SyncError {
  /// The input document is unreadable, not JSON, or not shaped like a catalog.
  #[error("invalid input: {message}")]
  Input {
    message: String,
    #[source]
    source: Option<BoxError>,
  },

  /// The store could not be reached or rejected the credentials.
  #[error("cannot connect to store: {message}")]
  Connection {
    message: String,
    #[source]
    source: Option<BoxError>,
  },

  /// A single update statement was rejected by the store.
  #[error("update of product {product_id} rejected: {message}")]
  Update {
    product_id: i64,
    message: String,
    #[source]
    source: Option<BoxError>,
  },

  #[error("commit failed: {message}")]
  Commit {
    message: String,
    #[source]
    source: Option<BoxError>,
  },

  #[error("invalid configuration: {0}")]
  Config(String),
}

impl SyncError {
  pub fn input(message: impl Into<String>) -> Self {
    Self::Input {
      message: message.into(),
      source: None,
    }
  }

  pub fn input_from<E>(message: impl Into<String>, err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Input {
      message: message.into(),
      source: Some(Box::new(err)),
    }
  }

  pub fn connection<E>(message: impl Into<String>, err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Connection {
      message: message.into(),
      source: Some(Box::new(err)),
    }
  }

  pub fn update<E>(product_id: i64, err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Update {
      product_id,
      message: err.to_string(),
      source: Some(Box::new(err)),
    }
  }

  pub fn commit<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Commit {
      message: err.to_string(),
      source: Some(Box::new(err)),
    }
  }

  /// Short stable name of the error class, used in logs.
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Input { .. } => "input",
      Self::Connection { .. } => "connection",
      Self::Update { .. } => "update",
      Self::Commit { .. } => "commit",
      Self::Config(_) => "config",
    }
  }
}

impl From<crate::db::SqlSanitizeError> for SyncError {
  fn from(err: crate::db::SqlSanitizeError) -> Self {
    Self::Config(err.to_string())
  }
}
