//! Row-to-record conversion for the marketplace sales dataset.
//!
//! Column order is fixed:
//!
//! | idx | column                | idx | column           |
//! |-----|-----------------------|-----|------------------|
//! | 0   | `product_name`        | 8   | `region`         |
//! | 1   | `brand`               | 9   | `category`       |
//! | 2   | `date`                | 10  | `customer_rating`|
//! | 3   | `sales_quantity`      | 11  | `review_count`   |
//! | 4   | `price`               | 12  | `delivery_days`  |
//! | 5   | `original_price`      | 13  | `seller`         |
//! | 6   | `discount_percentage` | 14  | `is_weekend`     |
//! | 7   | `stock_level`         | 15  | `is_holiday`     |

use std::fmt::Display;
use std::str::FromStr;

use csv::StringRecord;
use mdc_core::ProductRecord;

use crate::error::DatasetError;

/// Number of columns a row must carry to be parsed. Extra trailing columns
/// are ignored here; [`crate::CsvDataset`] rejects rows wider than the header.
pub const EXPECTED_COLUMNS: usize = 16;

/// Converts one CSV row into a [`ProductRecord`].
///
/// `line` is the 1-based line number of the row in the file and is only used
/// for error reporting.
///
/// # Errors
///
/// Returns [`DatasetError::RecordMalformed`] when the row has fewer than
/// [`EXPECTED_COLUMNS`] fields. Numeric cells that do not parse become zero.
pub fn parse_record(record: &StringRecord, line: u64) -> Result<ProductRecord, DatasetError> {
    if record.len() < EXPECTED_COLUMNS {
        return Err(DatasetError::RecordMalformed {
            line,
            reason: format!(
                "record has insufficient fields: {} (expected {EXPECTED_COLUMNS})",
                record.len()
            ),
        });
    }

    let field = |idx: usize| record.get(idx).unwrap_or_default();

    Ok(ProductRecord {
        name: field(0).to_string(),
        brand: field(1).to_string(),
        date: field(2).to_string(),
        sales_quantity: parse_number(field(3), "sales_quantity", line),
        price: parse_number(field(4), "price", line),
        original_price: parse_number(field(5), "original_price", line),
        discount_percentage: parse_number(field(6), "discount_percentage", line),
        stock_level: parse_number(field(7), "stock_level", line),
        region: field(8).to_string(),
        category: field(9).to_string(),
        customer_rating: parse_number(field(10), "customer_rating", line),
        review_count: parse_number(field(11), "review_count", line),
        delivery_days: parse_number(field(12), "delivery_days", line),
        seller: field(13).to_string(),
        is_weekend: parse_flag(field(14)),
        is_holiday: parse_flag(field(15)),
    })
}

/// Parses a numeric cell. Blank cells are zero; unparseable cells are
/// logged and also become zero.
fn parse_number<T>(raw: &str, column: &str, line: u64) -> T
where
    T: FromStr + Default,
    T::Err: Display,
{
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return T::default();
    }
    trimmed.parse::<T>().unwrap_or_else(|e| {
        tracing::warn!(line, column, value = trimmed, error = %e, "invalid numeric cell, using 0");
        T::default()
    })
}

/// `1` and `true` (any case) are set; everything else is unset.
fn parse_flag(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed == "1" || trimmed.eq_ignore_ascii_case("true")
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
