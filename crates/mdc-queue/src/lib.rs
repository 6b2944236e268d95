pub mod amqp;
pub mod error;
pub mod publisher;

pub use amqp::{AmqpClient, RecordPublisher};
pub use error::QueueError;
pub use publisher::{BatchResult, PublishFailure, Publisher};
