//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;

use crate::{
    AppState, Error,
    auth::{auth_guard, delete_profile, get_profile, log_in, register, update_currency_endpoint},
    budget::{bulk_update_budgets_endpoint, get_budgets_endpoint, upsert_budget_endpoint},
    category::{
        create_category_endpoint, delete_category_endpoint, get_categories_endpoint,
        get_categories_with_spending_endpoint, update_category_endpoint,
    },
    csv_import::import_transactions,
    currency::get_rates,
    dashboard::{get_expenses_by_category, get_monthly_summary},
    endpoints,
    forecast::get_forecast,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_summary_endpoint,
        get_transactions_endpoint, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
///
/// Every route except registration, log-in and the exchange rates requires a
/// bearer token.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::REGISTER, post(register))
        .route(endpoints::LOG_IN, post(log_in))
        .route(endpoints::RATES, get(get_rates));

    let protected_routes = Router::new()
        .route(endpoints::ME, get(get_profile).delete(delete_profile))
        .route(endpoints::ME_CURRENCY, put(update_currency_endpoint))
        .route(
            endpoints::CATEGORIES,
            get(get_categories_endpoint).post(create_category_endpoint),
        )
        .route(
            endpoints::CATEGORIES_WITH_SPENDING,
            get(get_categories_with_spending_endpoint),
        )
        .route(
            endpoints::CATEGORY,
            put(update_category_endpoint).delete(delete_category_endpoint),
        )
        .route(endpoints::TRANSACTIONS, post(create_transaction_endpoint))
        .route(
            endpoints::ACCOUNT_TRANSACTIONS,
            get(get_transactions_endpoint),
        )
        .route(endpoints::TRANSACTION_SUMMARY, get(get_summary_endpoint))
        .route(endpoints::IMPORT, post(import_transactions))
        .route(
            endpoints::TRANSACTION,
            put(update_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(endpoints::BUDGETS, post(upsert_budget_endpoint))
        .route(
            endpoints::BUDGETS_BULK_UPDATE,
            post(bulk_update_budgets_endpoint),
        )
        .route(endpoints::BUDGETS_FOR_MONTH, get(get_budgets_endpoint))
        .route(
            endpoints::EXPENSES_BY_CATEGORY_CHART,
            get(get_expenses_by_category),
        )
        .route(endpoints::MONTHLY_SUMMARY_CHART, get(get_monthly_summary))
        .route(endpoints::FORECASTS, get(get_forecast))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn get_404_not_found() -> Error {
    Error::NotFound
}
