//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/categories/{category_id}', use [format_endpoint].

/// The route for registering a new user.
pub const REGISTER: &str = "/api/auth/register";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/auth/login";
/// The route for the profile of the logged in user.
pub const ME: &str = "/api/auth/me";
/// The route for changing the display currency of the logged in user.
pub const ME_CURRENCY: &str = "/api/auth/me/currency";
/// The route for the latest exchange rates.
pub const RATES: &str = "/api/rates";
/// The route to list and create categories.
pub const CATEGORIES: &str = "/api/categories";
/// The route to list categories with their total spending.
pub const CATEGORIES_WITH_SPENDING: &str = "/api/categories/with-spending";
/// The route to update or delete a category.
pub const CATEGORY: &str = "/api/categories/{category_id}";
/// The route to create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to list the transactions in the user's account.
pub const ACCOUNT_TRANSACTIONS: &str = "/api/transactions/account";
/// The route for the income and expense totals.
pub const TRANSACTION_SUMMARY: &str = "/api/transactions/summary";
/// The route to upload CSV files for importing transactions.
pub const IMPORT: &str = "/api/transactions/upload";
/// The route to update or delete a transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to save a single budget.
pub const BUDGETS: &str = "/api/budgets";
/// The route to save the budgets of several categories at once.
pub const BUDGETS_BULK_UPDATE: &str = "/api/budgets/bulk-update";
/// The route for the budgets of a month.
pub const BUDGETS_FOR_MONTH: &str = "/api/budgets/{month}";
/// The route for the expenses per category chart.
pub const EXPENSES_BY_CATEGORY_CHART: &str = "/api/charts/expenses-by-category";
/// The route for the income versus expenses chart.
pub const MONTHLY_SUMMARY_CHART: &str = "/api/charts/monthly-summary";
/// The route for the spending forecast.
pub const FORECASTS: &str = "/api/forecasts";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
