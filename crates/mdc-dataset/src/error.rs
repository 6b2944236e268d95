use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset {path} cannot be opened: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single row that could not be turned into a record. Readers log and
    /// skip these; they never abort a read.
    #[error("malformed record at line {line}: {reason}")]
    RecordMalformed { line: u64, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
