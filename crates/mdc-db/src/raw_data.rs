//! Database operations for `raw_data`.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// Source id every request-triggered payload is stored against. Seeded by
/// the initial migration.
pub const DEFAULT_DATA_SOURCE_ID: i64 = 1;

/// A row from the `raw_data` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RawDataRow {
    pub id: i64,
    pub data_source_id: i64,
    pub data: Value,
    pub collected_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Stores one JSON payload and returns its generated id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn save_raw_data(pool: &PgPool, data: &Value) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO raw_data (data_source_id, data) VALUES ($1, $2) RETURNING id",
    )
    .bind(DEFAULT_DATA_SOURCE_ID)
    .bind(data)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Fetches one stored payload by id, or `None` if no such row exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_raw_data(pool: &PgPool, id: i64) -> Result<Option<RawDataRow>, DbError> {
    let row = sqlx::query_as::<_, RawDataRow>(
        "SELECT id, data_source_id, data, collected_at, created_at \
         FROM raw_data WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
