pub mod config;
pub mod db;
pub mod error;
pub mod sync;
pub mod types;

pub use error::SyncError;
