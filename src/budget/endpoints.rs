//! Budget endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State, rejection::JsonRejection},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    auth::{AuthUser, get_user_by_id},
    budget::{Budget, BudgetLine, BudgetMonth, get_budget_report, upsert_budget, validate_amount},
    category::{CategoryId, ensure_category_belongs_to_user},
    currency::{CurrencyCode, ExchangeRateClient},
    db::lock_connection,
};

/// The state needed for the budget endpoints.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The client for converting amounts between currencies.
    pub rates_client: ExchangeRateClient,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            rates_client: state.rates_client.clone(),
        }
    }
}

/// A budget amount in the user's currency.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetEntry {
    category_id: CategoryId,
    amount: f64,
}

/// The body of a request to save the budgets of several categories.
#[derive(Debug, Deserialize)]
pub struct BulkBudgetForm {
    budgets: Vec<BudgetEntry>,
    month: String,
}

/// The body of a request to save the budget of one category.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetForm {
    category_id: CategoryId,
    amount: f64,
    month: String,
}

/// Budgeted versus spent for each of the user's categories in `month`.
///
/// Display amounts are omitted if the live rates cannot be fetched.
pub async fn get_budgets_endpoint(
    Path(month): Path<String>,
    State(state): State<BudgetState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<BudgetLine>>, Error> {
    let month = BudgetMonth::parse(&month)?;

    let mut lines = {
        let connection = lock_connection(&state.db_connection)?;
        let currency = get_user_by_id(user.user_id, &connection)?.currency;

        get_budget_report(user.user_id, month, &currency, &connection)?
    };

    let needs_rates = lines.iter().any(|line| !line.display_currency.is_usd());
    let rates = if needs_rates {
        state
            .rates_client
            .latest()
            .await
            .inspect_err(|error| {
                tracing::warn!("showing budgets in USD only, could not get rates: {error}");
            })
            .ok()
    } else {
        None
    };

    for line in &mut lines {
        line.convert_for_display(rates.as_ref());
    }

    Ok(Json(lines))
}

/// Save the budgets of several categories at once.
///
/// Amounts are in the user's currency. Either every budget is saved or none are.
pub async fn bulk_update_budgets_endpoint(
    State(state): State<BudgetState>,
    Extension(user): Extension<AuthUser>,
    form: Result<Json<BulkBudgetForm>, JsonRejection>,
) -> Result<Json<Value>, Error> {
    let Json(form) = form.map_err(|rejection| {
        tracing::debug!("invalid budget data: {rejection}");
        Error::InvalidBudgetData
    })?;
    let month = BudgetMonth::parse(&form.month)?;

    save_budgets(&state, user, month, &form.budgets).await?;

    Ok(Json(json!({ "message": "Budgets saved" })))
}

/// Save the budget of one category.
pub async fn upsert_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user): Extension<AuthUser>,
    form: Result<Json<BudgetForm>, JsonRejection>,
) -> Result<Json<Budget>, Error> {
    let Json(form) = form.map_err(|rejection| {
        tracing::debug!("invalid budget data: {rejection}");
        Error::InvalidBudgetData
    })?;
    let month = BudgetMonth::parse(&form.month)?;
    let entry = BudgetEntry {
        category_id: form.category_id,
        amount: form.amount,
    };

    let mut saved = save_budgets(&state, user, month, &[entry]).await?;

    saved.pop().map(Json).ok_or(Error::InvalidBudgetData)
}

async fn save_budgets(
    state: &BudgetState,
    user: AuthUser,
    month: BudgetMonth,
    entries: &[BudgetEntry],
) -> Result<Vec<Budget>, Error> {
    for entry in entries {
        validate_amount(entry.amount)?;
    }

    let currency = {
        let connection = lock_connection(&state.db_connection)?;
        for entry in entries {
            ensure_category_belongs_to_user(Some(entry.category_id), user.user_id, &connection)?;
        }

        get_user_by_id(user.user_id, &connection)?.currency
    };

    let rate = usd_rate(&state.rates_client, &currency).await?;

    let connection = lock_connection(&state.db_connection)?;
    let tx = connection.unchecked_transaction()?;
    let budgets = entries
        .iter()
        .map(|entry| {
            upsert_budget(
                user.user_id,
                entry.category_id,
                month,
                entry.amount,
                &currency,
                entry.amount / rate,
                &tx,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    tx.commit()?;

    Ok(budgets)
}

/// Units of `currency` per US dollar.
async fn usd_rate(client: &ExchangeRateClient, currency: &CurrencyCode) -> Result<f64, Error> {
    if currency.is_usd() {
        return Ok(1.0);
    }

    client
        .latest()
        .await?
        .get(currency)
        .ok_or_else(|| Error::UnknownCurrency(currency.to_string()))
}
