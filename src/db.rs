//! Database initialization.

use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::{
    Error, account::create_account_table, auth::create_user_table,
    budget::create_budget_table, category::create_category_table,
    transaction::create_transaction_table,
};

/// Enable foreign keys and create every table the application uses.
///
/// Tables are created in one SQL transaction and only if they do not exist yet,
/// so calling this on an existing database is safe.
///
/// # Errors
/// Returns an [Error::SqlError] if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = connection.unchecked_transaction()?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_budget_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Acquire the lock on the shared database connection.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the lock is poisoned.
pub fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}
