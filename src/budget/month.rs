//! The calendar month a budget applies to.

use std::fmt::Display;

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{
    Error,
    date::{format_date, parse_date},
};

/// The first day of a calendar month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BudgetMonth(Date);

impl BudgetMonth {
    /// Parse a month written as `YYYY-MM` or as any date in the month,
    /// `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidMonth] if `text` is neither.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let text = text.trim();
        let date = if text.len() == 7 {
            parse_date(&format!("{text}-01"))
        } else {
            parse_date(text)
        }
        .map_err(|_| Error::InvalidMonth(text.to_owned()))?;

        Ok(Self::containing(date))
    }

    /// The month that `date` falls in.
    pub fn containing(date: Date) -> Self {
        Self(date.replace_day(1).unwrap_or(date))
    }

    /// The first day of the month.
    pub fn first_day(&self) -> Date {
        self.0
    }

    /// The first day of the following month.
    pub fn next_month(&self) -> Date {
        let (year, month) = match self.0.month() {
            Month::December => (self.0.year() + 1, Month::January),
            month => (self.0.year(), month.next()),
        };

        Date::from_calendar_date(year, month, 1).unwrap_or(Date::MAX)
    }
}

impl Display for BudgetMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format_date(self.0))
    }
}

impl TryFrom<String> for BudgetMonth {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BudgetMonth> for String {
    fn from(value: BudgetMonth) -> Self {
        value.to_string()
    }
}

impl ToSql for BudgetMonth {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for BudgetMonth {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Date::column_result(value).map(Self::containing)
    }
}
