//! Dashboard chart endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::AuthUser,
    dashboard::{
        aggregation::{
            CategoryExpense, PeriodSummary, PeriodView, expenses_by_category, summarize_by_period,
        },
        transaction::get_account_transactions,
    },
    db::lock_connection,
};

/// The state needed for the dashboard charts.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Query parameters for the monthly summary chart.
#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    view: Option<String>,
}

/// Expenses per category for the pie chart.
pub async fn get_expenses_by_category(
    State(state): State<DashboardState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<CategoryExpense>>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let transactions = get_account_transactions(user.account_id, &connection)?;

    Ok(Json(expenses_by_category(&transactions)))
}

/// Income and expenses per month, or per year with `?view=year`, for the bar chart.
pub async fn get_monthly_summary(
    State(state): State<DashboardState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<Vec<PeriodSummary>>, Error> {
    let view = PeriodView::from_query(query.view.as_deref());
    let connection = lock_connection(&state.db_connection)?;
    let transactions = get_account_transactions(user.account_id, &connection)?;

    Ok(Json(summarize_by_period(&transactions, view)))
}
