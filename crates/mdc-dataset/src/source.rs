//! Record sources backed by static datasets.

use std::fs::File;
use std::path::{Path, PathBuf};

use mdc_core::ProductRecord;

use crate::error::DatasetError;
use crate::parse::parse_record;

/// Produces the full, ordered sequence of records for one collection pass.
pub trait RecordSource: Send + Sync {
    /// Reads every record, in dataset order.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::SourceUnavailable`] if the underlying storage
    /// cannot be opened. Malformed rows are skipped, never returned as errors.
    fn read(&self) -> Result<Vec<ProductRecord>, DatasetError>;
}

/// A CSV dataset on the local filesystem with one header row.
#[derive(Debug, Clone)]
pub struct CsvDataset {
    path: PathBuf,
}

impl CsvDataset {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for CsvDataset {
    fn read(&self) -> Result<Vec<ProductRecord>, DatasetError> {
        tracing::info!(path = %self.path.display(), "reading dataset");

        let file = File::open(&self.path).map_err(|source| DatasetError::SourceUnavailable {
            path: self.path.clone(),
            source,
        })?;

        // Flexible so that short and wide rows are skipped one at a time
        // instead of failing inside the decoder.
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);
        let header_width = reader.headers()?.len();

        let mut products = Vec::new();
        let mut skipped: usize = 0;

        for result in reader.records() {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    if is_io_failure(&e) {
                        return Err(DatasetError::Csv(e));
                    }
                    tracing::warn!(error = %e, "error reading CSV record, skipping");
                    skipped += 1;
                    continue;
                }
            };

            let line = row.position().map_or(0, csv::Position::line);
            if row.len() > header_width {
                tracing::warn!(
                    line,
                    fields = row.len(),
                    header_width,
                    "record is wider than the header, skipping"
                );
                skipped += 1;
                continue;
            }
            match parse_record(&row, line) {
                Ok(product) => products.push(product),
                Err(e) => {
                    tracing::warn!(error = %e, "error parsing record, skipping");
                    skipped += 1;
                }
            }
        }

        tracing::info!(
            path = %self.path.display(),
            records = products.len(),
            skipped,
            "read dataset"
        );
        Ok(products)
    }
}

/// Decoder errors are per-row; an I/O error means the file itself went away
/// mid-read and nothing after it can be trusted.
fn is_io_failure(error: &csv::Error) -> bool {
    matches!(error.kind(), csv::ErrorKind::Io(_))
}
