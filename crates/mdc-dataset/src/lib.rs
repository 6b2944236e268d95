pub mod error;
pub mod parse;
pub mod source;

pub use error::DatasetError;
pub use parse::{parse_record, EXPECTED_COLUMNS};
pub use source::{CsvDataset, RecordSource};
