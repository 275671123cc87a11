//! Transaction endpoints.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State, rejection::JsonRejection},
    http::{HeaderName, StatusCode, header::LOCATION},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{AuthUser, get_user_by_id},
    category::{CategoryId, deserialize_optional_category_id, ensure_category_belongs_to_user},
    currency::{CurrencyCode, ExchangeRateClient, convert_to_usd},
    database_id::TransactionId,
    date::parse_date,
    db::lock_connection,
    endpoints::{self, format_endpoint},
    transaction::{
        Summary, Transaction, TransactionFilter, TransactionQuery, TransactionRow,
        create_transaction, delete_transaction, get_summary, get_transactions,
        update_transaction_category,
    },
};

/// The state needed for the transaction endpoints.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The client for converting amounts to US dollars.
    pub rates_client: ExchangeRateClient,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            rates_client: state.rates_client.clone(),
        }
    }
}

/// The body of a request to create a transaction.
#[derive(Debug, Deserialize)]
pub struct NewTransactionForm {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    amount: Option<f64>,
    #[serde(default)]
    transaction_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_category_id")]
    category_id: Option<CategoryId>,
    #[serde(default)]
    currency: Option<String>,
}

/// The body of a request to change the category of a transaction.
#[derive(Debug, Deserialize)]
pub struct CategoryUpdateForm {
    #[serde(
        rename = "categoryId",
        default,
        deserialize_with = "deserialize_optional_category_id"
    )]
    category_id: Option<CategoryId>,
}

/// List the transactions in the user's account, optionally filtered.
pub async fn get_transactions_endpoint(
    State(state): State<TransactionState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<Vec<TransactionRow>>, Error> {
    let filter = TransactionFilter::try_from(query)?;
    let connection = lock_connection(&state.db_connection)?;

    get_transactions(user.account_id, &filter, &connection).map(Json)
}

/// Record a transaction.
///
/// The amount is in `currency`, or the user's display currency if none is
/// given, and is converted to US dollars with the live rates.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user): Extension<AuthUser>,
    form: Result<Json<NewTransactionForm>, JsonRejection>,
) -> Result<(StatusCode, [(HeaderName, String); 1], Json<Transaction>), Error> {
    let Json(form) = form?;
    let description = form
        .description
        .map(|description| description.trim().to_owned())
        .filter(|description| !description.is_empty());
    let (description, amount, raw_date) = match (description, form.amount, form.transaction_date) {
        (Some(description), Some(amount), Some(raw_date)) => (description, amount, raw_date),
        _ => return Err(Error::MissingTransactionFields),
    };
    if !amount.is_finite() {
        return Err(Error::InvalidAmount(format!("{amount} is not a number")));
    }
    let transaction_date = parse_date(&raw_date)?;
    let currency = form
        .currency
        .as_deref()
        .map(CurrencyCode::new)
        .transpose()?;

    let currency = {
        let connection = lock_connection(&state.db_connection)?;
        ensure_category_belongs_to_user(form.category_id, user.user_id, &connection)?;

        match currency {
            Some(currency) => currency,
            None => get_user_by_id(user.user_id, &connection)?.currency,
        }
    };

    let amount_usd = convert_to_usd(&state.rates_client, amount, &currency).await?;

    let connection = lock_connection(&state.db_connection)?;
    let transaction = create_transaction(
        user.account_id,
        Transaction::build(amount, transaction_date, &description)
            .currency(currency, amount_usd)
            .category_id(form.category_id),
        &connection,
    )?;
    let location = format_endpoint(endpoints::TRANSACTION, transaction.id);

    Ok((StatusCode::CREATED, [(LOCATION, location)], Json(transaction)))
}

/// Move a transaction to another category, `null` uncategorizes it.
pub async fn update_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<TransactionState>,
    Extension(user): Extension<AuthUser>,
    form: Result<Json<CategoryUpdateForm>, JsonRejection>,
) -> Result<Json<Transaction>, Error> {
    let Json(form) = form?;
    let connection = lock_connection(&state.db_connection)?;

    ensure_category_belongs_to_user(form.category_id, user.user_id, &connection)?;

    update_transaction_category(
        transaction_id,
        user.account_id,
        form.category_id,
        &connection,
    )
    .map(Json)
}

/// Delete a transaction.
pub async fn delete_transaction_endpoint(
    Path(transaction_id): Path<TransactionId>,
    State(state): State<TransactionState>,
    Extension(user): Extension<AuthUser>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_transaction(transaction_id, user.account_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Total income, expenses and net savings of the user's account.
pub async fn get_summary_endpoint(
    State(state): State<TransactionState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Summary>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_summary(user.account_id, &connection).map(Json)
}
