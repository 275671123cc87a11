//! Parses the transaction CSV files users upload.
//!
//! A file needs a header row with the columns `transaction_date`, `description`
//! and `amount`. The columns `currency` and `category` are optional, and any
//! other columns are ignored. Header names are matched ignoring case and
//! surrounding whitespace.

use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use time::Date;

use crate::{Error, currency::CurrencyCode, date::parse_date};

/// A row with a usable date, description and amount.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvTransaction {
    pub transaction_date: Date,
    pub description: String,
    pub amount: f64,
    /// The currency of the row, `None` means the user's currency.
    pub currency: Option<CurrencyCode>,
    /// The name of the category to file the row under.
    pub category: Option<String>,
    /// Identifies the row across imports of the same file.
    pub import_id: String,
}

/// The usable rows of a CSV file and the number of rows that were skipped.
#[derive(Debug, Default, PartialEq)]
pub struct ParsedCsv {
    pub transactions: Vec<CsvTransaction>,
    pub skipped: usize,
}

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default)]
    transaction_date: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

/// Parse the rows of a CSV file.
///
/// Rows missing a date, description or amount, or with a value that cannot be
/// parsed, are skipped.
///
/// # Errors
///
/// Returns [Error::InvalidCSV] if the data is not valid CSV, e.g. because it is
/// not UTF-8.
pub fn parse_csv(data: &[u8]) -> Result<ParsedCsv, Error> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(data);

    let headers: StringRecord = reader
        .headers()
        .map_err(|error| Error::InvalidCSV(error.to_string()))?
        .iter()
        .map(|header| header.trim().to_lowercase())
        .collect();

    let mut parsed = ParsedCsv::default();
    let mut occurrences: HashMap<String, usize> = HashMap::new();

    for record in reader.records() {
        let record = record.map_err(|error| Error::InvalidCSV(error.to_string()))?;

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        let raw_row: RawRow = record
            .deserialize(Some(&headers))
            .map_err(|error| Error::InvalidCSV(error.to_string()))?;

        match parse_row(raw_row) {
            Some(mut transaction) => {
                let occurrence = occurrences
                    .entry(transaction.import_id.clone())
                    .and_modify(|count| *count += 1)
                    .or_insert(0);
                transaction.import_id = create_import_id(&transaction.import_id, *occurrence);
                parsed.transactions.push(transaction);
            }
            None => parsed.skipped += 1,
        }
    }

    Ok(parsed)
}

/// Convert a raw row, its import ID is set to the normalized row text.
fn parse_row(raw_row: RawRow) -> Option<CsvTransaction> {
    let raw_date = non_empty(raw_row.transaction_date)?;
    let description = non_empty(raw_row.description)?;
    let raw_amount = non_empty(raw_row.amount)?;

    let transaction_date = parse_date(&raw_date).ok()?;
    let amount = match raw_amount.parse::<f64>() {
        Ok(amount) if amount.is_finite() => amount,
        _ => {
            tracing::debug!("skipping CSV row with amount {raw_amount:?}");
            return None;
        }
    };
    let currency = match non_empty(raw_row.currency) {
        Some(code) => Some(CurrencyCode::new(&code).ok()?),
        None => None,
    };

    let normalized = format!(
        "{transaction_date}|{description}|{amount}|{}",
        currency.as_ref().map(CurrencyCode::as_str).unwrap_or_default()
    );

    Some(CsvTransaction {
        transaction_date,
        description,
        amount,
        currency,
        category: non_empty(raw_row.category),
        import_id: normalized,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Hash a normalized row and the number of identical rows before it in the file.
///
/// Counting repeats keeps two identical purchases on the same day apart while
/// still matching them up when the file is imported again.
pub fn create_import_id(normalized_row: &str, occurrence: usize) -> String {
    let digest = Sha256::digest(format!("{normalized_row}#{occurrence}"));

    format!("{digest:x}")
}
