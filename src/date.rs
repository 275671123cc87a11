//! Calendar dates in the `YYYY-MM-DD` form used throughout the API.

use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::Error;

/// The date format used by the API, e.g. "2025-01-31".
pub const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` date.
///
/// A trailing time, as in "2025-01-31T09:30:00Z" or "2025-01-31 09:30", is ignored.
///
/// # Errors
///
/// Returns [Error::InvalidDate] if `text` does not start with a valid date.
pub fn parse_date(text: &str) -> Result<Date, Error> {
    let text = text.trim();
    let date_part = match text.get(10..11) {
        Some("T") | Some(" ") => &text[..10],
        _ => text,
    };

    Date::parse(date_part, DATE_FORMAT).map_err(|error| {
        tracing::debug!("could not parse date {text:?}: {error}");
        Error::InvalidDate(text.to_owned())
    })
}

/// Format `date` as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Serialize a [Date] as a `YYYY-MM-DD` string.
///
/// The default serde implementation of [Date] writes a `[year, ordinal]` tuple,
/// which the client cannot read.
pub mod iso_date {
    use serde::Serializer;
    use time::Date;

    use super::format_date;

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_date(*date))
    }
}
