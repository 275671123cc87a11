//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{Account, DEFAULT_ACCOUNT_NAME, DEFAULT_ACCOUNT_TYPE, create_account},
    auth::PasswordHash,
    currency::CurrencyCode,
};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name shown in the client.
    pub username: String,
    /// The email used to log in.
    pub email: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The currency the client displays amounts in.
    pub currency: CurrencyCode,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE COLLATE NOCASE,
                email TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                currency TEXT NOT NULL DEFAULT 'USD'
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// New users display amounts in USD until they pick another currency.
///
/// # Errors
///
/// Returns a [Error::DuplicateUser] if the username or email is taken, or
/// [Error::SqlError] if another SQL related error occurred.
pub fn create_user(
    username: &str,
    email: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (username, email, password_hash) VALUES (?1, ?2, ?3)",
        (username, email, password_hash.as_ref()),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username: username.to_owned(),
        email: email.to_owned(),
        password_hash,
        currency: CurrencyCode::usd(),
    })
}

/// Create a user together with their default "Checking" account.
///
/// Both rows are written in one SQL transaction, so a failure leaves no
/// partially registered user behind.
///
/// # Errors
///
/// Returns a [Error::DuplicateUser] if the username or email is taken, or
/// [Error::SqlError] if another SQL related error occurred.
pub fn create_user_with_account(
    username: &str,
    email: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<(User, Account), Error> {
    let tx = connection.unchecked_transaction()?;

    let user = create_user(username, email, password_hash, &tx)?;
    let account = create_account(user.id, DEFAULT_ACCOUNT_NAME, DEFAULT_ACCOUNT_TYPE, &tx)?;

    tx.commit()?;

    Ok((user, account))
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user ([Error::NotFound]).
/// - there was an error trying to access the database.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, username, email, password_hash, currency FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user registered with `email`, ignoring ASCII case.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that email.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, username, email, password_hash, currency FROM user WHERE email = :email",
        )?
        .query_row(&[(":email", &email)], map_user_row)
        .map_err(|error| error.into())
}

/// Set the display currency of a user.
///
/// # Errors
///
/// Returns [Error::UserNotFound] if the user does not exist.
pub fn update_currency(
    user_id: UserID,
    currency: &CurrencyCode,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET currency = ?1 WHERE id = ?2",
        (currency.as_str(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UserNotFound);
    }

    Ok(())
}

/// Replace the password hash of a user.
///
/// # Errors
///
/// Returns [Error::UserNotFound] if the user does not exist.
pub fn update_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password_hash = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::UserNotFound);
    }

    Ok(())
}

/// Delete a user. Their account, transactions, categories and budgets are
/// removed by the foreign key cascades.
///
/// # Errors
///
/// Returns [Error::UserNotFound] if the user does not exist.
pub fn delete_user(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM user WHERE id = ?1", [user_id.as_i64()])?;

    if rows_affected == 0 {
        return Err(Error::UserNotFound);
    }

    Ok(())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(3)?;
    let raw_currency: String = row.get(4)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        currency: CurrencyCode::new_unchecked(&raw_currency),
    })
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        account::get_account_for_user,
        auth::{
            PasswordHash, UserID,
            user::{
                create_user, create_user_with_account, delete_user, get_user_by_email,
                get_user_by_id, update_currency,
            },
        },
        currency::CurrencyCode,
        db::initialize,
    };

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        initialize(&conn).expect("Could not initialize database");

        conn
    }

    #[test]
    fn insert_user_succeeds() {
        let conn = get_db_connection();
        let password_hash = PasswordHash::new_unchecked("hunter2");

        let inserted_user =
            create_user("alice", "alice@example.com", password_hash.clone(), &conn).unwrap();

        assert!(inserted_user.id.as_i64() > 0);
        assert_eq!(inserted_user.password_hash, password_hash);
        assert_eq!(inserted_user.currency, CurrencyCode::usd());
    }

    #[test]
    fn insert_fails_on_duplicate_email() {
        let conn = get_db_connection();
        create_user("alice", "alice@example.com", PasswordHash::new_unchecked("a"), &conn)
            .unwrap();

        let result = create_user("bob", "ALICE@example.com", PasswordHash::new_unchecked("b"), &conn);

        assert_eq!(result, Err(Error::DuplicateUser));
    }

    #[test]
    fn insert_fails_on_duplicate_username() {
        let conn = get_db_connection();
        create_user("alice", "alice@example.com", PasswordHash::new_unchecked("a"), &conn)
            .unwrap();

        let result = create_user("alice", "bob@example.com", PasswordHash::new_unchecked("b"), &conn);

        assert_eq!(result, Err(Error::DuplicateUser));
    }

    #[test]
    fn insert_fails_on_username_differing_only_in_case() {
        let conn = get_db_connection();
        create_user("alice", "alice@example.com", PasswordHash::new_unchecked("a"), &conn)
            .unwrap();

        let result = create_user("Alice", "bob@example.com", PasswordHash::new_unchecked("b"), &conn);

        assert_eq!(result, Err(Error::DuplicateUser));
    }

    #[test]
    fn ids_of_deleted_users_are_not_reused() {
        let conn = get_db_connection();
        let (alice, alice_account) = create_user_with_account(
            "alice",
            "alice@example.com",
            PasswordHash::new_unchecked("a"),
            &conn,
        )
        .unwrap();
        delete_user(alice.id, &conn).unwrap();

        let (bob, bob_account) = create_user_with_account(
            "bob",
            "bob@example.com",
            PasswordHash::new_unchecked("b"),
            &conn,
        )
        .unwrap();

        assert_ne!(bob.id, alice.id);
        assert_ne!(bob_account.id, alice_account.id);
    }

    #[test]
    fn create_with_account_adds_checking_account() {
        let conn = get_db_connection();

        let (user, account) = create_user_with_account(
            "alice",
            "alice@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        assert_eq!(account.user_id, user.id);
        assert_eq!(account.name, "Checking");
        assert_eq!(get_account_for_user(user.id, &conn), Ok(account));
    }

    #[test]
    fn create_with_account_rolls_back_on_duplicate() {
        let conn = get_db_connection();
        create_user_with_account(
            "alice",
            "alice@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        let result = create_user_with_account(
            "alice",
            "other@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        );

        assert!(matches!(result, Err(Error::DuplicateUser)));
        let account_count: i64 = conn
            .query_row("SELECT COUNT(id) FROM account", [], |row| row.get(0))
            .unwrap();
        assert_eq!(account_count, 1);
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let conn = get_db_connection();

        assert_eq!(get_user_by_id(UserID::new(42), &conn), Err(Error::NotFound));
    }

    #[test]
    fn get_user_by_email_ignores_case() {
        let conn = get_db_connection();
        let user = create_user(
            "alice",
            "alice@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        let retrieved_user = get_user_by_email("Alice@Example.com", &conn).unwrap();

        assert_eq!(retrieved_user, user);
    }

    #[test]
    fn update_currency_persists() {
        let conn = get_db_connection();
        let user = create_user(
            "alice",
            "alice@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();
        let euro = CurrencyCode::new("eur").unwrap();

        update_currency(user.id, &euro, &conn).unwrap();

        assert_eq!(get_user_by_id(user.id, &conn).unwrap().currency, euro);
    }

    #[test]
    fn delete_missing_user_fails() {
        let conn = get_db_connection();

        assert_eq!(delete_user(UserID::new(7), &conn), Err(Error::UserNotFound));
    }
}
