use tokio::sync::RwLock;

use vlog_core::domain::activity::ActivityRow;

use super::{ActivityStore, RepositoryError, StoredActivity};

/// Store used by tests and dry runs; positions start at 1.
#[derive(Default)]
pub struct InMemoryActivityStore {
    rows: RwLock<Vec<ActivityRow>>,
}

impl InMemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl ActivityStore for InMemoryActivityStore {
    async fn append(&self, row: &ActivityRow) -> Result<i64, RepositoryError> {
        let mut rows = self.rows.write().await;
        rows.push(row.clone());
        i64::try_from(rows.len()).map_err(|e| RepositoryError::Decode(e.to_string()))
    }

    async fn recent(&self, limit: u32) -> Result<Vec<StoredActivity>, RepositoryError> {
        let rows = self.rows.read().await;
        rows.iter()
            .enumerate()
            .rev()
            .take(limit as usize)
            .map(|(index, row)| {
                let position =
                    i64::try_from(index + 1).map_err(|e| RepositoryError::Decode(e.to_string()))?;
                Ok(StoredActivity { position, row: row.clone() })
            })
            .collect()
    }
}
