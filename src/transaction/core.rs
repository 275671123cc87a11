//! Defines the core data models and database queries for transactions.

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    category::CategoryId,
    currency::CurrencyCode,
    database_id::{AccountId, TransactionId},
};

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account the transaction is recorded in.
    pub account_id: AccountId,
    /// When the transaction happened.
    #[serde(with = "crate::date::iso_date")]
    pub transaction_date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The amount of money spent (negative) or earned (positive) in `currency`.
    pub amount: f64,
    /// The currency `amount` is in.
    pub currency: CurrencyCode,
    /// `amount` converted to US dollars when the transaction was recorded.
    pub amount_usd: f64,
    /// The ID of the category the transaction belongs to.
    pub category_id: Option<CategoryId>,
    /// The hash identifying a transaction imported from a CSV file.
    pub import_id: Option<String>,
}

impl Transaction {
    /// Create a new transaction in US dollars.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: f64, transaction_date: Date, description: &str) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            transaction_date,
            description: description.to_owned(),
            currency: CurrencyCode::usd(),
            amount_usd: amount,
            category_id: None,
            import_id: None,
        }
    }
}

/// A builder for creating [Transaction] instances.
///
/// # Examples
///
/// ```ignore
/// use time::macros::date;
///
/// use crate::{currency::CurrencyCode, transaction::Transaction};
///
/// // 45.99 NZD at 1.65 NZD per USD.
/// let builder = Transaction::build(-45.99, date!(2025 - 01 - 15), "Coffee shop purchase")
///     .currency(CurrencyCode::new("NZD").unwrap(), -27.87)
///     .category_id(Some(3));
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// The monetary amount of the transaction.
    ///
    /// Positive values represent income, negative values represent expenses.
    pub amount: f64,

    /// The date when the transaction occurred.
    pub transaction_date: Date,

    /// A human-readable description of the transaction.
    pub description: String,

    /// The currency of `amount`, US dollars unless set with [TransactionBuilder::currency].
    pub currency: CurrencyCode,

    /// `amount` in US dollars.
    pub amount_usd: f64,

    /// The category of the transaction, e.g. "Groceries", "Transport", "Rent".
    pub category_id: Option<CategoryId>,

    /// Optional unique identifier for imported transactions.
    ///
    /// Re-importing a CSV file produces the same IDs, and the database only
    /// allows each ID once per account.
    pub import_id: Option<String>,
}

impl TransactionBuilder {
    /// Set the currency of the amount together with its value in US dollars.
    pub fn currency(mut self, currency: CurrencyCode, amount_usd: f64) -> Self {
        self.currency = currency;
        self.amount_usd = amount_usd;
        self
    }

    /// Set the category id for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the import ID for the transaction.
    pub fn import_id(mut self, import_id: Option<String>) -> Self {
        self.import_id = import_id;
        self
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const SELECT_COLUMNS: &str = "id, account_id, transaction_date, description, amount, currency, \
                              amount_usd, category_id, import_id";

/// Create a new transaction in `account_id` from a builder.
///
/// The caller is responsible for checking that the category belongs to the
/// owner of the account.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidCategory] if the category ID does not refer to a real category,
/// - or [Error::DuplicateImportId] if the account already has a transaction with the import ID,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    account_id: AccountId,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\"
                (account_id, transaction_date, description, amount, currency, amount_usd,
                 category_id, import_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING {SELECT_COLUMNS}"
        ))?
        .query_row(
            (
                account_id,
                builder.transaction_date,
                &builder.description,
                builder.amount,
                builder.currency.as_str(),
                builder.amount_usd,
                builder.category_id,
                &builder.import_id,
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(builder.category_id),
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateImportId,
            error => error.into(),
        })?;

    Ok(transaction)
}

/// Retrieve a transaction in `account_id` by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::TransactionNotFound] if `id` does not refer to a transaction in the account,
/// - or [Error::SqlError] there is some other SQL error.
#[cfg(test)]
pub fn get_transaction(
    id: TransactionId,
    account_id: AccountId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {SELECT_COLUMNS} FROM \"transaction\" WHERE id = ?1 AND account_id = ?2"
        ))?
        .query_row((id, account_id), map_transaction_row)
        .map_err(map_missing_transaction)
}

/// Move a transaction to another category, or uncategorize it with `None`.
///
/// The caller is responsible for checking that the category belongs to the
/// owner of the account.
///
/// # Errors
/// Returns [Error::TransactionNotFound] if `id` does not refer to a transaction
/// in the account, or [Error::InvalidCategory] if the category does not exist.
pub fn update_transaction_category(
    id: TransactionId,
    account_id: AccountId,
    category_id: Option<CategoryId>,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "UPDATE \"transaction\" SET category_id = ?1 WHERE id = ?2 AND account_id = ?3
             RETURNING {SELECT_COLUMNS}"
        ))?
        .query_row((category_id, id, account_id), map_transaction_row)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(category_id),
            error => map_missing_transaction(error),
        })
}

/// Delete a transaction in `account_id`.
///
/// # Errors
/// Returns [Error::TransactionNotFound] if `id` does not refer to a transaction
/// in the account.
pub fn delete_transaction(
    id: TransactionId,
    account_id: AccountId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND account_id = ?2",
        (id, account_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::TransactionNotFound);
    }

    Ok(())
}

/// Get the number of transactions in an account.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn count_transactions(account_id: AccountId, connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE account_id = ?1",
            [account_id],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id INTEGER NOT NULL,
                transaction_date TEXT NOT NULL,
                description TEXT NOT NULL,
                amount REAL NOT NULL,
                currency TEXT NOT NULL DEFAULT 'USD',
                amount_usd REAL NOT NULL,
                category_id INTEGER,
                import_id TEXT,
                UNIQUE(account_id, import_id),
                FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE CASCADE,
                FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL
                )",
        (),
    )?;

    // Add composite index used by the list, dashboard and budget queries.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_account_date
         ON \"transaction\"(account_id, transaction_date);",
        (),
    )?;

    Ok(())
}

/// Map a database row selected with the standard column order to a Transaction.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let raw_currency: String = row.get(5)?;

    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        transaction_date: row.get(2)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        currency: CurrencyCode::new_unchecked(&raw_currency),
        amount_usd: row.get(6)?,
        category_id: row.get(7)?,
        import_id: row.get(8)?,
    })
}

fn map_missing_transaction(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::QueryReturnedNoRows => Error::TransactionNotFound,
        error => error.into(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
