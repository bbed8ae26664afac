use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// One product entry of the input catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
  pub product_id: i64,
  /// Arbitrary characteristics payload, written to the store as JSON text.
  pub caracteristicas: serde_json::Value,
}

/// The input document: `{ "products": [ ... ] }`.
///
/// Any other top-level key is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductCatalog {
  pub products: Vec<ProductRecord>,
}

impl ProductCatalog {
  pub fn from_json(text: &str) -> Result<Self, SyncError> {
    serde_json::from_str(text).map_err(|e| SyncError::input_from(e.to_string(), e))
  }

  /// Reads and parses a catalog file.
  pub async fn load(path: impl AsRef<Path>) -> Result<Self, SyncError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
      .await
      .map_err(|e| SyncError::input_from(format!("cannot read {}", path.display()), e))?;
    let catalog = Self::from_json(&text)?;
    tracing::info!(
      path = %path.display(),
      records = catalog.len(),
      "Loaded product catalog"
    );
    Ok(catalog)
  }

  pub fn len(&self) -> usize {
    self.products.len()
  }

  pub fn is_empty(&self) -> bool {
    self.products.is_empty()
  }
}

/// A record whose payload has already been serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpdate {
  pub product_id: i64,
  pub payload: String,
}

impl PendingUpdate {
  pub fn from_record(record: &ProductRecord) -> Result<Self, SyncError> {
    let payload = serde_json::to_string(&record.caracteristicas).map_err(|e| {
      SyncError::input_from(
        format!("cannot serialize characteristics of product {}", record.product_id),
        e,
      )
    })?;
    Ok(Self {
      product_id: record.product_id,
      payload,
    })
  }
}
