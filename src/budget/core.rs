//! Storing monthly budgets.

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{
    Error,
    auth::UserID,
    budget::BudgetMonth,
    category::CategoryId,
    currency::CurrencyCode,
    database_id::DatabaseId,
};

/// A spending target for one category in one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: DatabaseId,
    pub category_id: CategoryId,
    pub month: BudgetMonth,
    /// The target in `currency`.
    pub amount: f64,
    pub currency: CurrencyCode,
    #[serde(rename = "amountUSD")]
    pub amount_usd: f64,
}

pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            category_id INTEGER NOT NULL,
            month TEXT NOT NULL,
            amount REAL NOT NULL,
            currency TEXT NOT NULL DEFAULT 'USD',
            amount_usd REAL NOT NULL,
            UNIQUE(user_id, category_id, month),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Set the budget of `category_id` for `month`, replacing any existing budget.
///
/// The caller is responsible for checking that the category belongs to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAmount] if `amount` or `amount_usd` is negative or not a finite number,
/// - [Error::InvalidCategory] if the category does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn upsert_budget(
    user_id: UserID,
    category_id: CategoryId,
    month: BudgetMonth,
    amount: f64,
    currency: &CurrencyCode,
    amount_usd: f64,
    connection: &Connection,
) -> Result<Budget, Error> {
    validate_amount(amount)?;
    validate_amount(amount_usd)?;

    connection
        .prepare(
            "INSERT INTO budget (user_id, category_id, month, amount, currency, amount_usd)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id, category_id, month)
             DO UPDATE SET amount = excluded.amount,
                           currency = excluded.currency,
                           amount_usd = excluded.amount_usd
             RETURNING id, category_id, month, amount, currency, amount_usd",
        )?
        .query_row(
            (
                user_id.as_i64(),
                category_id,
                month,
                amount,
                currency.as_str(),
                amount_usd,
            ),
            map_budget_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(Some(category_id)),
            error => error.into(),
        })
}

/// Get the budgets `user_id` has set for `month`.
#[cfg(test)]
pub fn get_budgets(
    user_id: UserID,
    month: BudgetMonth,
    connection: &Connection,
) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, category_id, month, amount, currency, amount_usd
             FROM budget WHERE user_id = ?1 AND month = ?2
             ORDER BY category_id",
        )?
        .query_map((user_id.as_i64(), month), map_budget_row)?
        .map(|maybe_budget| maybe_budget.map_err(Error::from))
        .collect()
}

/// Check that a budget amount is a non-negative number.
pub fn validate_amount(amount: f64) -> Result<(), Error> {
    if !amount.is_finite() {
        Err(Error::InvalidAmount(format!("{amount} is not a number")))
    } else if amount < 0.0 {
        Err(Error::InvalidAmount(format!(
            "budgets cannot be negative, got {amount}"
        )))
    } else {
        Ok(())
    }
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    let raw_currency: String = row.get(4)?;

    Ok(Budget {
        id: row.get(0)?,
        category_id: row.get(1)?,
        month: row.get(2)?,
        amount: row.get(3)?,
        currency: CurrencyCode::new_unchecked(&raw_currency),
        amount_usd: row.get(5)?,
    })
}

#[cfg(test)]
mod budget_db_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        auth::{PasswordHash, User, create_user_with_account},
        budget::{BudgetMonth, get_budgets, upsert_budget},
        category::{Category, CategoryName, create_category, delete_category},
        currency::CurrencyCode,
        db::initialize,
    };

    fn get_test_connection() -> (Connection, User, Category) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let (user, _) = create_user_with_account(
            "alice",
            "alice@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();
        let category = create_category(CategoryName::new_unchecked("Food"), user.id, &conn).unwrap();

        (conn, user, category)
    }

    fn march() -> BudgetMonth {
        BudgetMonth::parse("2025-03").unwrap()
    }

    #[test]
    fn upsert_inserts_then_replaces() {
        let (conn, user, category) = get_test_connection();
        let nzd = CurrencyCode::new("NZD").unwrap();

        let first = upsert_budget(user.id, category.id, march(), 200.0, &nzd, 100.0, &conn).unwrap();
        let second = upsert_budget(
            user.id,
            category.id,
            march(),
            50.0,
            &CurrencyCode::usd(),
            50.0,
            &conn,
        )
        .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.amount, 50.0);
        assert_eq!(second.currency, CurrencyCode::usd());
        assert_eq!(get_budgets(user.id, march(), &conn).unwrap(), vec![second]);
    }

    #[test]
    fn months_are_kept_apart() {
        let (conn, user, category) = get_test_connection();
        let usd = CurrencyCode::usd();
        let april = BudgetMonth::parse("2025-04-15").unwrap();

        upsert_budget(user.id, category.id, march(), 10.0, &usd, 10.0, &conn).unwrap();
        upsert_budget(user.id, category.id, april, 20.0, &usd, 20.0, &conn).unwrap();

        let budgets = get_budgets(user.id, april, &conn).unwrap();
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].amount, 20.0);
        assert_eq!(budgets[0].month, april);
    }

    #[test]
    fn rejects_negative_and_non_finite_amounts() {
        let (conn, user, category) = get_test_connection();
        let usd = CurrencyCode::usd();

        for amount in [-1.0, f64::NAN, f64::INFINITY] {
            let result = upsert_budget(user.id, category.id, march(), amount, &usd, amount, &conn);

            assert!(matches!(result, Err(Error::InvalidAmount(_))), "{amount}");
        }
    }

    #[test]
    fn rejects_missing_category() {
        let (conn, user, category) = get_test_connection();

        let result = upsert_budget(
            user.id,
            category.id + 99,
            march(),
            10.0,
            &CurrencyCode::usd(),
            10.0,
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCategory(Some(category.id + 99))));
    }

    #[test]
    fn deleting_category_deletes_its_budgets() {
        let (conn, user, category) = get_test_connection();
        upsert_budget(
            user.id,
            category.id,
            march(),
            10.0,
            &CurrencyCode::usd(),
            10.0,
            &conn,
        )
        .unwrap();

        delete_category(category.id, user.id, &conn).unwrap();

        assert!(get_budgets(user.id, march(), &conn).unwrap().is_empty());
    }
}
