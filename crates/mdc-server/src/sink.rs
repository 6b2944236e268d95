//! Where request-triggered payloads go once fetched.

use std::future::Future;
use std::sync::Arc;

use mdc_db::DbError;
use mdc_queue::{AmqpClient, QueueError};
use serde_json::Value;
use sqlx::PgPool;

/// Persists a fetched payload and forwards it downstream.
pub trait RawDataSink: Send + Sync + 'static {
    /// Stores the payload and returns its id.
    fn save(&self, data: &Value) -> impl Future<Output = Result<i64, DbError>> + Send;

    /// Forwards the payload to the raw-data queue.
    fn publish(&self, data: &Value) -> impl Future<Output = Result<(), QueueError>> + Send;

    /// Checks that the backing store is reachable.
    fn health(&self) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// Production sink: Postgres `raw_data` table, then RabbitMQ.
pub struct PgRabbitSink {
    pool: PgPool,
    client: Arc<AmqpClient>,
    queue: String,
}

impl PgRabbitSink {
    pub fn new(pool: PgPool, client: Arc<AmqpClient>, queue: impl Into<String>) -> Self {
        Self {
            pool,
            client,
            queue: queue.into(),
        }
    }
}

impl RawDataSink for PgRabbitSink {
    async fn save(&self, data: &Value) -> Result<i64, DbError> {
        mdc_db::save_raw_data(&self.pool, data).await
    }

    async fn publish(&self, data: &Value) -> Result<(), QueueError> {
        let payload = serde_json::to_vec(data)?;
        self.client.publish_json(&self.queue, &payload).await
    }

    async fn health(&self) -> Result<(), DbError> {
        mdc_db::health_check(&self.pool).await
    }
}
