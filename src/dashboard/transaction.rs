//! Database queries for retrieving dashboard transaction data.
//!
//! Dashboards only need the date, USD amount and category name of each
//! transaction, so this view is separate from the main transaction model.

use rusqlite::Connection;
use time::Date;

use crate::{Error, database_id::AccountId};

pub(super) const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// A simplified transaction view for dashboard aggregations.
#[derive(Debug)]
pub(super) struct Transaction {
    pub amount_usd: f64,
    pub date: Date,
    pub category: String,
}

/// Gets every transaction in `account_id` with its category name.
///
/// # Errors
/// Returns [Error::SqlError] if the SQL query fails.
pub(super) fn get_account_transactions(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT t.amount_usd, t.transaction_date, COALESCE(c.name, '{UNCATEGORIZED_LABEL}')
             FROM \"transaction\" t
             LEFT JOIN category c ON c.id = t.category_id
             WHERE t.account_id = ?1
             ORDER BY t.transaction_date ASC"
        ))?
        .query_map([account_id], |row| {
            Ok(Transaction {
                amount_usd: row.get(0)?,
                date: row.get(1)?,
                category: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<Transaction>, rusqlite::Error>>()
        .map_err(|error| error.into())
}
