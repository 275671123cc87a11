//! Database operations for accounts.

use rusqlite::{Connection, Row};

use crate::{Error, auth::UserID, database_id::AccountId};

/// The name of the account created for every new user.
pub const DEFAULT_ACCOUNT_NAME: &str = "Checking";
/// The type of the account created for every new user.
pub const DEFAULT_ACCOUNT_TYPE: &str = "Checking";

/// A user's ledger. Each user owns exactly one.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The user that owns the account.
    pub user_id: UserID,
    /// The display name of the account.
    pub name: String,
    /// The kind of account, e.g. "Checking".
    pub account_type: String,
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            account_type TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_account_user ON account(user_id);",
        (),
    )?;

    Ok(())
}

/// Insert an account for `user_id`.
///
/// # Errors
/// Returns [Error::SqlError] if the user does not exist or the query fails.
pub fn create_account(
    user_id: UserID,
    name: &str,
    account_type: &str,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(
            "INSERT INTO account (user_id, name, account_type) VALUES (?1, ?2, ?3)
             RETURNING id, user_id, name, account_type",
        )?
        .query_row((user_id.as_i64(), name, account_type), map_row_to_account)
        .map_err(|error| error.into())
}

/// Get the account owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no account.
pub fn get_account_for_user(user_id: UserID, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, account_type FROM account
             WHERE user_id = :user_id ORDER BY id ASC LIMIT 1",
        )?
        .query_row(&[(":user_id", &user_id.as_i64())], map_row_to_account)
        .map_err(|error| error.into())
}

fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        account_type: row.get(3)?,
    })
}
