//! One collection pass: read the whole dataset, publish every record.

use std::sync::Arc;

use mdc_dataset::{DatasetError, RecordSource};
use mdc_queue::{BatchResult, Publisher};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PassError {
    /// The source could not be read; nothing was published in this pass.
    #[error("failed to read data: {0}")]
    ReadFailed(#[source] DatasetError),

    /// The blocking read task panicked or was cancelled.
    #[error("read task failed: {0}")]
    ReadTask(#[source] tokio::task::JoinError),
}

/// Runs collection passes against an injected source and publisher.
///
/// Holds no state between passes: every call re-reads the source from
/// scratch and re-publishes everything it returns.
pub struct BatchCoordinator<S, P> {
    source: Arc<S>,
    publisher: P,
}

impl<S, P> BatchCoordinator<S, P>
where
    S: RecordSource + 'static,
    P: Publisher,
{
    pub fn new(source: S, publisher: P) -> Self {
        Self {
            source: Arc::new(source),
            publisher,
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Runs one pass.
    ///
    /// Per-record publish failures are counted in the returned
    /// [`BatchResult`]; they never fail the pass.
    ///
    /// # Errors
    ///
    /// Returns [`PassError::ReadFailed`] if the source cannot be read, or
    /// [`PassError::ReadTask`] if the blocking read task panicked.
    pub async fn run_once(&self) -> Result<BatchResult, PassError> {
        tracing::info!("starting data processing");

        // `RecordSource::read` does file I/O; keep it off the async workers.
        let source = Arc::clone(&self.source);
        let records = tokio::task::spawn_blocking(move || source.read())
            .await
            .map_err(PassError::ReadTask)?
            .map_err(PassError::ReadFailed)?;
        tracing::info!(count = records.len(), "processing products");

        let result = self.publisher.publish_batch(&records).await;

        if result.is_complete() {
            tracing::info!(
                attempted = result.attempted,
                "data processing completed successfully"
            );
        } else {
            tracing::warn!(
                attempted = result.attempted,
                succeeded = result.succeeded,
                failed = result.failed(),
                "data processing completed with publish failures"
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;
