use sqlx::Row;
use tracing::info;

use vlog_core::domain::activity::ActivityRow;

use super::{ActivityStore, RepositoryError, StoredActivity};
use crate::DbPool;

pub struct SqlActivityStore {
    pool: DbPool,
}

impl SqlActivityStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn decode<T>(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<T, RepositoryError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn row_to_stored(row: &sqlx::sqlite::SqliteRow) -> Result<StoredActivity, RepositoryError> {
    Ok(StoredActivity {
        position: decode(row, "id")?,
        row: ActivityRow {
            name: decode(row, "name")?,
            date: decode(row, "date")?,
            activity_type: decode(row, "activity_type")?,
            location: decode(row, "location")?,
            number_of_kids: decode(row, "number_of_kids")?,
            youth_house: decode(row, "youth_house")?,
            logged_at: decode(row, "logged_at")?,
        },
    })
}

#[async_trait::async_trait]
impl ActivityStore for SqlActivityStore {
    async fn append(&self, row: &ActivityRow) -> Result<i64, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO activity_log (name, date, activity_type, location, number_of_kids,
                                       youth_house, logged_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.name)
        .bind(&row.date)
        .bind(&row.activity_type)
        .bind(&row.location)
        .bind(&row.number_of_kids)
        .bind(&row.youth_house)
        .bind(&row.logged_at)
        .execute(&self.pool)
        .await?;

        let position = result.last_insert_rowid();
        info!(
            event_name = "activity.persisted",
            position,
            activity_type = %row.activity_type,
            "activity row appended"
        );
        Ok(position)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<StoredActivity>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, date, activity_type, location, number_of_kids, youth_house, logged_at
             FROM activity_log
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_stored).collect()
    }
}
