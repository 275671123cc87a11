//! Budgeted versus spent per category for a month.

use rusqlite::{Connection, Row};
use serde::Serialize;

use crate::{
    Error,
    auth::UserID,
    budget::BudgetMonth,
    category::{CategoryId, CategoryName},
    currency::{CurrencyCode, Rates},
};

/// One category's budget and spending for a month.
///
/// Amounts ending in `usd` are in US dollars. The display amounts are in the
/// user's currency and are `None` when no exchange rate is available.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLine {
    pub category_id: CategoryId,
    pub category_name: CategoryName,
    pub budget_amount_original: f64,
    pub budget_currency: CurrencyCode,
    #[serde(rename = "budgetAmountUSD")]
    pub budget_amount_usd: f64,
    #[serde(rename = "spentAmountUSD")]
    pub spent_amount_usd: f64,
    #[serde(rename = "remainingAmountUSD")]
    pub remaining_amount_usd: f64,
    pub display_currency: CurrencyCode,
    pub budget_amount_display: Option<f64>,
    pub spent_amount_display: Option<f64>,
}

/// Get one line per category of `user_id`, ordered by category name.
///
/// Categories without a budget for `month` have a budget of 0 USD. Spending is
/// the magnitude of the user's expenses in the category during `month`. The
/// display amounts are left empty, see [BudgetLine::convert_for_display].
pub fn get_budget_report(
    user_id: UserID,
    month: BudgetMonth,
    display_currency: &CurrencyCode,
    connection: &Connection,
) -> Result<Vec<BudgetLine>, Error> {
    connection
        .prepare(
            "SELECT c.id, c.name,
                    COALESCE(b.amount, 0), COALESCE(b.currency, 'USD'), COALESCE(b.amount_usd, 0),
                    (SELECT COALESCE(SUM(ABS(t.amount_usd)), 0)
                     FROM \"transaction\" t
                     INNER JOIN account a ON a.id = t.account_id
                     WHERE a.user_id = ?1
                       AND t.category_id = c.id
                       AND t.amount < 0
                       AND t.transaction_date >= ?2
                       AND t.transaction_date < ?3)
             FROM category c
             LEFT JOIN budget b ON b.category_id = c.id AND b.user_id = ?1 AND b.month = ?2
             WHERE c.user_id = ?1
             ORDER BY c.name ASC",
        )?
        .query_map(
            (user_id.as_i64(), month, month.next_month()),
            |row| map_report_row(row, display_currency),
        )?
        .map(|maybe_line| maybe_line.map_err(Error::from))
        .collect()
}

fn map_report_row(row: &Row, display_currency: &CurrencyCode) -> Result<BudgetLine, rusqlite::Error> {
    let raw_name: String = row.get(1)?;
    let raw_currency: String = row.get(3)?;
    let budget_amount_usd: f64 = row.get(4)?;
    let spent_amount_usd: f64 = row.get(5)?;

    Ok(BudgetLine {
        category_id: row.get(0)?,
        category_name: CategoryName::new_unchecked(&raw_name),
        budget_amount_original: row.get(2)?,
        budget_currency: CurrencyCode::new_unchecked(&raw_currency),
        budget_amount_usd,
        spent_amount_usd,
        remaining_amount_usd: budget_amount_usd - spent_amount_usd,
        display_currency: display_currency.clone(),
        budget_amount_display: None,
        spent_amount_display: None,
    })
}

impl BudgetLine {
    /// Fill in the display amounts.
    ///
    /// USD needs no rates. For other currencies the display amounts stay `None`
    /// if `rates` is `None` or has no rate for the display currency.
    pub fn convert_for_display(&mut self, rates: Option<&Rates>) {
        let currency = self.display_currency.clone();
        let convert = |amount_usd: f64| {
            if currency.is_usd() {
                Some(amount_usd)
            } else {
                rates.and_then(|rates| rates.from_usd(amount_usd, &currency).ok())
            }
        };

        self.budget_amount_display = convert(self.budget_amount_usd);
        self.spent_amount_display = convert(self.spent_amount_usd);
    }
}

#[cfg(test)]
mod budget_report_tests {
    use std::collections::BTreeMap;

    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        account::Account,
        auth::{PasswordHash, User, create_user_with_account},
        budget::{BudgetMonth, get_budget_report, upsert_budget},
        category::{Category, CategoryName, create_category},
        currency::{CurrencyCode, Rates},
        db::initialize,
        transaction::{Transaction, create_transaction},
    };

    fn get_test_connection() -> (Connection, User, Account) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let (user, account) = create_user_with_account(
            "alice",
            "alice@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();

        (conn, user, account)
    }

    fn category(name: &str, user: &User, conn: &Connection) -> Category {
        create_category(CategoryName::new_unchecked(name), user.id, conn).unwrap()
    }

    fn march() -> BudgetMonth {
        BudgetMonth::parse("2025-03").unwrap()
    }

    #[test]
    fn one_line_per_category_ordered_by_name() {
        let (conn, user, _) = get_test_connection();
        let rent = category("Rent", &user, &conn);
        let food = category("Food", &user, &conn);
        upsert_budget(
            user.id,
            rent.id,
            march(),
            1000.0,
            &CurrencyCode::usd(),
            1000.0,
            &conn,
        )
        .unwrap();

        let report = get_budget_report(user.id, march(), &CurrencyCode::usd(), &conn).unwrap();

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].category_id, food.id);
        assert_eq!(report[0].budget_amount_original, 0.0);
        assert_eq!(report[0].budget_currency, CurrencyCode::usd());
        assert_eq!(report[1].category_id, rent.id);
        assert_eq!(report[1].budget_amount_usd, 1000.0);
        assert_eq!(report[1].remaining_amount_usd, 1000.0);
    }

    #[test]
    fn spending_counts_expenses_in_month_only() {
        let (conn, user, account) = get_test_connection();
        let food = category("Food", &user, &conn);
        let nzd = CurrencyCode::new("NZD").unwrap();
        upsert_budget(user.id, food.id, march(), 200.0, &nzd, 100.0, &conn).unwrap();
        for (amount, amount_usd, date) in [
            (-20.0, -10.0, date!(2025 - 03 - 01)),
            (-40.0, -20.0, date!(2025 - 03 - 31)),
            (10.0, 5.0, date!(2025 - 03 - 10)),
            (-100.0, -50.0, date!(2025 - 04 - 01)),
            (-100.0, -50.0, date!(2025 - 02 - 28)),
        ] {
            create_transaction(
                account.id,
                Transaction::build(amount, date, "Groceries")
                    .currency(nzd.clone(), amount_usd)
                    .category_id(Some(food.id)),
                &conn,
            )
            .unwrap();
        }

        let report = get_budget_report(user.id, march(), &nzd, &conn).unwrap();

        assert_eq!(report[0].budget_amount_original, 200.0);
        assert_eq!(report[0].budget_currency, nzd);
        assert_eq!(report[0].spent_amount_usd, 30.0);
        assert_eq!(report[0].remaining_amount_usd, 70.0);
        assert_eq!(report[0].display_currency, nzd);
    }

    #[test]
    fn other_users_data_is_excluded() {
        let (conn, alice, _) = get_test_connection();
        let (bob, bobs_account) = create_user_with_account(
            "bob",
            "bob@example.com",
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap();
        category("Food", &alice, &conn);
        let bobs_food = category("Food", &bob, &conn);
        create_transaction(
            bobs_account.id,
            Transaction::build(-10.0, date!(2025 - 03 - 05), "Lunch").category_id(Some(bobs_food.id)),
            &conn,
        )
        .unwrap();

        let report = get_budget_report(alice.id, march(), &CurrencyCode::usd(), &conn).unwrap();

        assert_eq!(report.len(), 1);
        assert_eq!(report[0].spent_amount_usd, 0.0);
    }

    #[test]
    fn converts_for_display() {
        let (conn, user, _) = get_test_connection();
        let food = category("Food", &user, &conn);
        let nzd = CurrencyCode::new("NZD").unwrap();
        upsert_budget(user.id, food.id, march(), 200.0, &nzd, 100.0, &conn).unwrap();
        let rates = Rates::new(BTreeMap::from([("NZD".to_owned(), 2.0)]));
        let mut report = get_budget_report(user.id, march(), &nzd, &conn).unwrap();
        let mut without_rates = report.clone();

        report[0].convert_for_display(Some(&rates));
        without_rates[0].convert_for_display(None);

        assert_eq!(report[0].budget_amount_display, Some(200.0));
        assert_eq!(report[0].spent_amount_display, Some(0.0));
        assert_eq!(without_rates[0].budget_amount_display, None);
        assert_eq!(without_rates[0].budget_amount_usd, 100.0);
    }
}
