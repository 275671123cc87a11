//! Database operations for categories.
//!
//! Every query takes the ID of the user that owns the categories, a category of
//! another user behaves as if it does not exist.

use rusqlite::{Connection, Row};

use crate::{
    Error,
    auth::UserID,
    category::{Category, CategoryId, CategoryName, CategoryWithSpending},
};

/// Initialize the category table and indexes.
///
/// Names are unique per user, ignoring ASCII case. Deleting a user deletes
/// their categories.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL COLLATE NOCASE,
            UNIQUE(user_id, name),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_user ON category(user_id);",
    )?;

    Ok(())
}

/// Create a category for `user_id` and return it with its generated ID.
///
/// # Errors
/// Returns [Error::DuplicateCategoryName] if the user already has a category
/// with this name, or [Error::UserNotFound] if the user does not exist.
pub fn create_category(
    name: CategoryName,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "INSERT INTO category (user_id, name) VALUES (?1, ?2)
             RETURNING id, name, user_id",
        )?
        .query_row((user_id.as_i64(), name.as_ref()), map_row)
        .map_err(|error| map_write_error(error, &name))
}

/// Retrieve a single category owned by `user_id`.
///
/// # Errors
/// Returns [Error::CategoryNotFound] if the category does not exist or belongs
/// to another user.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name, user_id FROM category WHERE id = ?1 AND user_id = ?2")?
        .query_row((category_id, user_id.as_i64()), map_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::CategoryNotFound,
            error => error.into(),
        })
}

/// Retrieve the categories of `user_id` ordered alphabetically by name.
pub fn get_categories(user_id: UserID, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name, user_id FROM category WHERE user_id = ?1 ORDER BY name ASC")?
        .query_map([user_id.as_i64()], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the categories of `user_id` with the sum of the USD amounts of
/// their transactions, ordered alphabetically by name.
///
/// Categories without transactions have a total of zero.
pub fn get_categories_with_spending(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<CategoryWithSpending>, Error> {
    connection
        .prepare(
            "SELECT c.id, c.name, COALESCE(SUM(t.amount_usd), 0.0)
             FROM category c
             LEFT JOIN \"transaction\" t ON t.category_id = c.id
             WHERE c.user_id = ?1
             GROUP BY c.id, c.name
             ORDER BY c.name ASC",
        )?
        .query_map([user_id.as_i64()], |row| {
            let raw_name: String = row.get(1)?;

            Ok(CategoryWithSpending {
                id: row.get(0)?,
                name: CategoryName::new_unchecked(&raw_name),
                total_spending: row.get(2)?,
            })
        })?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Rename a category owned by `user_id`.
///
/// # Errors
/// Returns [Error::CategoryNotFound] if the category does not exist or belongs
/// to another user, or [Error::DuplicateCategoryName] if the new name is taken.
pub fn update_category(
    category_id: CategoryId,
    user_id: UserID,
    new_name: CategoryName,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "UPDATE category SET name = ?1 WHERE id = ?2 AND user_id = ?3
             RETURNING id, name, user_id",
        )?
        .query_row(
            (new_name.as_ref(), category_id, user_id.as_i64()),
            map_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::CategoryNotFound,
            error => map_write_error(error, &new_name),
        })
}

/// Delete a category owned by `user_id`.
///
/// Transactions in the category become uncategorized and the budgets for the
/// category are deleted.
///
/// # Errors
/// Returns [Error::CategoryNotFound] if the category does not exist or belongs
/// to another user.
pub fn delete_category(
    category_id: CategoryId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
        (category_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::CategoryNotFound);
    }

    Ok(())
}

/// Check that `category_id`, if given, refers to a category owned by `user_id`.
///
/// # Errors
/// Returns [Error::InvalidCategory] if the category does not exist or belongs
/// to another user.
pub fn ensure_category_belongs_to_user(
    category_id: Option<CategoryId>,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let Some(id) = category_id else {
        return Ok(());
    };

    match get_category(id, user_id, connection) {
        Ok(_) => Ok(()),
        Err(Error::CategoryNotFound) => Err(Error::InvalidCategory(category_id)),
        Err(error) => Err(error),
    }
}

fn map_write_error(error: rusqlite::Error, name: &CategoryName) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateCategoryName(name.to_string()),
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::UserNotFound,
        error => error.into(),
    }
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let user_id = UserID::new(row.get(2)?);

    Ok(Category {
        id,
        name: CategoryName::new_unchecked(&raw_name),
        user_id,
    })
}
