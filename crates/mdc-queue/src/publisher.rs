//! Best-effort record publishing.

use std::future::Future;

use mdc_core::ProductRecord;

use crate::error::QueueError;

/// Sends product records to a downstream queue.
///
/// Implementations only need [`Publisher::publish`]; [`Publisher::publish_batch`]
/// drives it once per record and never stops early.
pub trait Publisher: Send + Sync {
    /// Publishes a single record.
    ///
    /// # Errors
    ///
    /// Returns a [`QueueError`] if the record could not be serialized or the
    /// broker rejected the send.
    fn publish(&self, record: &ProductRecord)
        -> impl Future<Output = Result<(), QueueError>> + Send;

    /// Publishes every record in order, continuing past individual failures.
    ///
    /// Failures are logged and collected in the returned [`BatchResult`],
    /// never propagated.
    fn publish_batch<'a>(
        &'a self,
        records: &'a [ProductRecord],
    ) -> impl Future<Output = BatchResult> + Send + 'a {
        async move {
            tracing::info!(count = records.len(), "publishing batch");

            let mut result = BatchResult::default();
            for (index, record) in records.iter().enumerate() {
                result.attempted += 1;
                match self.publish(record).await {
                    Ok(()) => result.succeeded += 1,
                    Err(e) => {
                        tracing::error!(
                            index,
                            product = %record.name,
                            error = %e,
                            "failed to publish record"
                        );
                        result.failures.push(PublishFailure {
                            index,
                            reason: e.to_string(),
                        });
                    }
                }
            }

            tracing::info!(
                attempted = result.attempted,
                succeeded = result.succeeded,
                failed = result.failed(),
                "batch publishing completed"
            );
            result
        }
    }
}

/// Outcome of one [`Publisher::publish_batch`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<PublishFailure>,
}

impl BatchResult {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// `true` when every attempted record was published.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A record that could not be published, by its position in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishFailure {
    pub index: usize,
    pub reason: String,
}

#[cfg(test)]
#[path = "publisher_test.rs"]
mod tests;
