//! Database query helpers for listing and summarising an account's transactions.

use rusqlite::{Connection, ToSql, params_from_iter};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    category::CategoryId,
    currency::CurrencyCode,
    database_id::{AccountId, TransactionId},
    date::parse_date,
};

/// The raw query string of the transaction list, e.g.
/// `?search=coffee&minAmount=-50&startDate=2025-01-01`.
///
/// Empty values are treated as if they were not given.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    search: Option<String>,
    min_amount: Option<String>,
    max_amount: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

/// Parsed filters for the transaction list. All bounds are inclusive.
#[derive(Debug, Default, PartialEq)]
pub struct TransactionFilter {
    /// Case-insensitive substring of the description.
    pub search: Option<String>,
    /// Lower bound on the amount in the transaction's own currency.
    pub min_amount: Option<f64>,
    /// Upper bound on the amount in the transaction's own currency.
    pub max_amount: Option<f64>,
    /// The earliest transaction date.
    pub start_date: Option<Date>,
    /// The latest transaction date.
    pub end_date: Option<Date>,
}

impl TryFrom<TransactionQuery> for TransactionFilter {
    type Error = Error;

    fn try_from(query: TransactionQuery) -> Result<Self, Self::Error> {
        Ok(Self {
            search: non_empty(query.search),
            min_amount: non_empty(query.min_amount)
                .map(|value| parse_amount("minAmount", &value))
                .transpose()?,
            max_amount: non_empty(query.max_amount)
                .map(|value| parse_amount("maxAmount", &value))
                .transpose()?,
            start_date: non_empty(query.start_date)
                .map(|value| parse_date(&value))
                .transpose()?,
            end_date: non_empty(query.end_date)
                .map(|value| parse_date(&value))
                .transpose()?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_amount(name: &str, value: &str) -> Result<f64, Error> {
    value
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .ok_or_else(|| Error::InvalidFilter(format!("{name} must be a number, got {value:?}")))
}

/// A transaction as shown in the transaction list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRow {
    pub id: TransactionId,
    #[serde(with = "crate::date::iso_date")]
    pub transaction_date: Date,
    pub description: String,
    pub amount: f64,
    pub currency: CurrencyCode,
    pub amount_usd: f64,
    pub category_id: Option<CategoryId>,
    pub category_name: Option<String>,
}

/// Get the transactions of `account_id` that match `filter`, newest first.
///
/// Transactions on the same date are ordered by descending ID so that the
/// order is stable.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_transactions(
    account_id: AccountId,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<TransactionRow>, Error> {
    let mut conditions = vec!["t.account_id = ?".to_owned()];
    let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(account_id)];

    if let Some(search) = &filter.search {
        conditions.push("t.description LIKE ? ESCAPE '\\'".to_owned());
        params.push(Box::new(format!("%{}%", escape_like(search))));
    }
    if let Some(min_amount) = filter.min_amount {
        conditions.push("t.amount >= ?".to_owned());
        params.push(Box::new(min_amount));
    }
    if let Some(max_amount) = filter.max_amount {
        conditions.push("t.amount <= ?".to_owned());
        params.push(Box::new(max_amount));
    }
    if let Some(start_date) = filter.start_date {
        conditions.push("t.transaction_date >= ?".to_owned());
        params.push(Box::new(start_date));
    }
    if let Some(end_date) = filter.end_date {
        conditions.push("t.transaction_date <= ?".to_owned());
        params.push(Box::new(end_date));
    }

    let query = format!(
        "SELECT t.id, t.transaction_date, t.description, t.amount, t.currency, t.amount_usd, \
         t.category_id, c.name \
         FROM \"transaction\" t \
         LEFT JOIN category c ON t.category_id = c.id \
         WHERE {} \
         ORDER BY t.transaction_date DESC, t.id DESC",
        conditions.join(" AND ")
    );

    connection
        .prepare(&query)?
        .query_map(params_from_iter(params.iter()), |row| {
            let raw_currency: String = row.get(4)?;

            Ok(TransactionRow {
                id: row.get(0)?,
                transaction_date: row.get(1)?,
                description: row.get(2)?,
                amount: row.get(3)?,
                currency: CurrencyCode::new_unchecked(&raw_currency),
                amount_usd: row.get(5)?,
                category_id: row.get(6)?,
                category_name: row.get(7)?,
            })
        })?
        .map(|transaction_result| transaction_result.map_err(|error| error.into()))
        .collect()
}

fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Income and expenses of an account in US dollars.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// The sum of all positive amounts.
    pub total_income: f64,
    /// The sum of all negative amounts, zero or less.
    pub total_expenses: f64,
    /// Income plus expenses.
    pub net_savings: f64,
}

/// Sum the income and expenses of `account_id`.
///
/// # Errors
/// Returns [Error::SqlError] if the query fails.
pub fn get_summary(account_id: AccountId, connection: &Connection) -> Result<Summary, Error> {
    let (total_income, total_expenses): (f64, f64) = connection.query_row(
        "SELECT
            COALESCE(SUM(CASE WHEN amount_usd > 0 THEN amount_usd ELSE 0 END), 0.0),
            COALESCE(SUM(CASE WHEN amount_usd < 0 THEN amount_usd ELSE 0 END), 0.0)
         FROM \"transaction\" WHERE account_id = ?1",
        [account_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(Summary {
        total_income,
        total_expenses,
        net_savings: total_income + total_expenses,
    })
}
