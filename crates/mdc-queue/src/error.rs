use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("failed to connect to broker: {0}")]
    Connect(#[source] lapin::Error),

    #[error("failed to open channel: {0}")]
    Channel(#[source] lapin::Error),

    #[error("failed to declare queue {queue}: {source}")]
    Declare {
        queue: String,
        #[source]
        source: lapin::Error,
    },

    #[error("failed to publish message to {queue}: {source}")]
    Publish {
        queue: String,
        #[source]
        source: lapin::Error,
    },

    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Raised by non-AMQP publishers (tests, alternate transports).
    #[error("publish rejected: {0}")]
    Rejected(String),
}
