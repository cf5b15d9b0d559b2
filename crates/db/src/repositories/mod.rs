use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vlog_core::domain::activity::ActivityRow;

pub mod activity;
pub mod memory;

pub use activity::SqlActivityStore;
pub use memory::InMemoryActivityStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// A persisted row together with the sequence position the store assigned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredActivity {
    pub position: i64,
    pub row: ActivityRow,
}

/// Append-only tabular store for finished activity records.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Appends one row and returns its sequence position (1-based,
    /// strictly increasing).
    async fn append(&self, row: &ActivityRow) -> Result<i64, RepositoryError>;

    /// Most recent rows first.
    async fn recent(&self, limit: u32) -> Result<Vec<StoredActivity>, RepositoryError>;
}
