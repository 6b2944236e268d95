//! RabbitMQ transport built on `lapin`.

use std::sync::Arc;

use lapin::options::{BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use mdc_core::ProductRecord;

use crate::error::QueueError;
use crate::publisher::Publisher;

const CONTENT_TYPE_JSON: &str = "application/json";

/// A broker connection with a single channel.
///
/// The channel is shared by every publish. Callers that drive it from one
/// task at a time (the scheduler, one HTTP request) need no extra locking;
/// `lapin` serializes frames on the channel internally.
pub struct AmqpClient {
    connection: Connection,
    channel: Channel,
}

impl AmqpClient {
    /// Opens a connection and a channel.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Connect`] if the broker is unreachable or refuses
    /// the credentials, and [`QueueError::Channel`] if no channel can be opened.
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(QueueError::Connect)?;
        let channel = match connection.create_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                if let Err(close_err) = connection.close(0, "channel setup failed").await {
                    tracing::warn!(error = %close_err, "failed to close connection after channel error");
                }
                return Err(QueueError::Channel(e));
            }
        };

        tracing::info!("connected to RabbitMQ");
        Ok(Self {
            connection,
            channel,
        })
    }

    /// Declares a durable queue, creating it if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Declare`] if the broker rejects the declaration
    /// (for example when the queue exists with different arguments).
    pub async fn declare_queue(&self, queue: &str) -> Result<(), QueueError> {
        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                    nowait: false,
                    passive: false,
                },
                FieldTable::default(),
            )
            .await
            .map_err(|source| QueueError::Declare {
                queue: queue.to_owned(),
                source,
            })?;

        tracing::info!(queue, "declared queue");
        Ok(())
    }

    /// Publishes a JSON payload to `queue` through the default exchange.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Publish`] if the frame cannot be sent.
    pub async fn publish_json(&self, queue: &str, payload: &[u8]) -> Result<(), QueueError> {
        let publish_err = |source: lapin::Error| QueueError::Publish {
            queue: queue.to_owned(),
            source,
        };

        self.channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_content_type(CONTENT_TYPE_JSON.into()),
            )
            .await
            .map_err(publish_err)?
            .await
            .map_err(publish_err)?;

        tracing::debug!(queue, bytes = payload.len(), "published message");
        Ok(())
    }

    /// Closes the channel, then the connection.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Channel`] or [`QueueError::Connect`] if the
    /// broker does not acknowledge the close.
    pub async fn close(&self) -> Result<(), QueueError> {
        self.channel
            .close(200, "bye")
            .await
            .map_err(QueueError::Channel)?;
        self.connection
            .close(200, "bye")
            .await
            .map_err(QueueError::Connect)?;
        Ok(())
    }
}

/// Publishes [`ProductRecord`]s as JSON to one named queue.
#[derive(Clone)]
pub struct RecordPublisher {
    client: Arc<AmqpClient>,
    queue: String,
}

impl RecordPublisher {
    #[must_use]
    pub fn new(client: Arc<AmqpClient>, queue: impl Into<String>) -> Self {
        Self {
            client,
            queue: queue.into(),
        }
    }

    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }
}

impl Publisher for RecordPublisher {
    async fn publish(&self, record: &ProductRecord) -> Result<(), QueueError> {
        let payload = serde_json::to_vec(record)?;
        self.client.publish_json(&self.queue, &payload).await
    }
}
