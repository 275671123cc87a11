//! A personal finance tracker.
//!
//! This library provides the REST API used by the browser client: user
//! accounts with JWT authentication, transactions, categories, monthly
//! budgets, CSV import, dashboard aggregations and spending forecasts. Money
//! is stored next to a USD-normalised value so that it can be shown in each
//! user's display currency using live exchange rates.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod account;
mod app_state;
mod auth;
mod budget;
mod category;
mod config;
mod csv_import;
mod currency;
mod dashboard;
mod database_id;
mod date;
mod db;
mod endpoints;
mod forecast;
mod logging;
mod routing;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{
    PasswordHash, User, UserID, ValidatedPassword, create_user_with_account, get_user_by_email,
    update_password,
};
pub use budget::{BudgetMonth, upsert_budget};
pub use category::{CategoryName, create_category};
pub use config::Args;
pub use currency::{CurrencyCode, ExchangeRateClient};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use transaction::{Transaction, count_transactions, create_transaction};

use crate::category::CategoryId;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The email does not belong to a user or the password did not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// One of username, email or password was missing from a registration request.
    #[error("all fields are required")]
    MissingRegistrationFields,

    /// The email or password was missing from a log-in request.
    #[error("email and password are required")]
    MissingCredentials,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The email or username is already used by another user.
    #[error("the email or username is already taken")]
    DuplicateUser,

    /// The JSON web token could not be signed.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// The request did not carry a bearer token.
    #[error("no token, authorization denied")]
    MissingToken,

    /// The bearer token could not be verified or has expired.
    #[error("token is not valid")]
    InvalidToken,

    /// The authenticated user no longer exists.
    #[error("user not found")]
    UserNotFound,

    /// A currency code was not three ASCII letters.
    #[error("\"{0}\" is not a valid 3-letter currency code")]
    InvalidCurrency(String),

    /// The live rates did not include the requested currency.
    #[error("no exchange rate is available for {0}")]
    UnknownCurrency(String),

    /// No API key was configured for the currency rate provider.
    #[error("API key for currency conversion is not configured")]
    RatesNotConfigured,

    /// The currency rate provider could not be reached or returned an error.
    #[error("could not fetch exchange rates: {0}")]
    RatesUnavailable(String),

    /// An empty string was used to create a category name.
    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    /// The user already has a category with this name.
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// The category does not exist or belongs to another user.
    #[error("category not found or permission denied")]
    CategoryNotFound,

    /// A category ID used to create or update a row did not refer to one of the
    /// user's categories.
    #[error("the category ID {0:?} does not refer to a valid category")]
    InvalidCategory(Option<CategoryId>),

    /// The description, amount or date was missing from a new transaction.
    #[error("description, amount and transaction date are required")]
    MissingTransactionFields,

    /// The transaction does not exist or belongs to another account.
    #[error("transaction not found")]
    TransactionNotFound,

    /// A transaction with the same import ID already exists in the account.
    #[error("the transaction has already been imported")]
    DuplicateImportId,

    /// A query string filter could not be parsed.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// A date could not be parsed.
    #[error("invalid date \"{0}\", expected YYYY-MM-DD")]
    InvalidDate(String),

    /// A monetary amount was negative where not allowed, or not a finite number.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A budget month could not be parsed.
    #[error("invalid month \"{0}\", expected YYYY-MM or YYYY-MM-DD")]
    InvalidMonth(String),

    /// A JSON request body was missing, malformed or had the wrong shape.
    #[error("invalid request body: {0}")]
    InvalidJson(String),

    /// The budget request body did not have the expected shape.
    #[error("invalid data format")]
    InvalidBudgetData,

    /// The multipart form did not contain a CSV file.
    #[error("no file uploaded")]
    NoFileUploaded,

    /// The multipart form could not be read.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The CSV had issues that prevented it from being parsed.
    #[error("could not parse the CSV file: {0}")]
    InvalidCSV(String),

    /// The CSV file did not contain a single usable row.
    #[error("CSV file is empty or has invalid format")]
    EmptyCSV,

    /// There are not enough days of spending to fit a forecast.
    #[error("not enough historical data to make a prediction")]
    InsufficientHistory,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    && (desc.ends_with("user.email") || desc.ends_with("user.username")) =>
            {
                Error::DuplicateUser
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected JSON body: {rejection}");
        Error::InvalidJson(rejection.body_text())
    }
}

impl Error {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Error::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials.".into()),
            Error::MissingRegistrationFields => {
                (StatusCode::BAD_REQUEST, "All fields are required.".into())
            }
            Error::MissingCredentials => (
                StatusCode::BAD_REQUEST,
                "Email and password are required.".into(),
            ),
            Error::TooWeak(feedback) => (
                StatusCode::BAD_REQUEST,
                format!("Password is too weak: {feedback}"),
            ),
            Error::DuplicateUser => (
                StatusCode::CONFLICT,
                "Registration failed. The email or username may already be taken.".into(),
            ),
            Error::MissingToken => (
                StatusCode::UNAUTHORIZED,
                "No token, authorization denied".into(),
            ),
            Error::InvalidToken => (StatusCode::UNAUTHORIZED, "Token is not valid".into()),
            Error::UserNotFound => (StatusCode::NOT_FOUND, "User not found.".into()),
            Error::InvalidCurrency(_) => (
                StatusCode::BAD_REQUEST,
                "A valid 3-letter currency code is required.".into(),
            ),
            Error::UnknownCurrency(code) => (
                StatusCode::BAD_REQUEST,
                format!("No exchange rate is available for {code}."),
            ),
            Error::RatesNotConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "API key for currency conversion is not configured.".into(),
            ),
            Error::RatesUnavailable(_) => (
                StatusCode::BAD_GATEWAY,
                "Failed to retrieve rates from the currency provider.".into(),
            ),
            Error::EmptyCategoryName => {
                (StatusCode::BAD_REQUEST, "Category name is required.".into())
            }
            Error::DuplicateCategoryName(_) => (
                StatusCode::CONFLICT,
                "Failed to create category. It may already exist.".into(),
            ),
            Error::CategoryNotFound => (
                StatusCode::NOT_FOUND,
                "Category not found or permission denied.".into(),
            ),
            Error::InvalidCategory(_) => (
                StatusCode::BAD_REQUEST,
                "The category does not exist or belongs to another user.".into(),
            ),
            Error::TransactionNotFound => {
                (StatusCode::NOT_FOUND, "Transaction not found.".into())
            }
            Error::MissingTransactionFields => (
                StatusCode::BAD_REQUEST,
                "Description, amount and transaction date are required.".into(),
            ),
            Error::DuplicateImportId => (
                StatusCode::CONFLICT,
                "The transaction has already been imported.".into(),
            ),
            Error::InvalidFilter(_)
            | Error::InvalidDate(_)
            | Error::InvalidAmount(_)
            | Error::InvalidMonth(_)
            | Error::MultipartError(_) => (StatusCode::BAD_REQUEST, capitalise(&self.to_string())),
            Error::InvalidJson(detail) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid request body: {detail}"),
            ),
            Error::InvalidBudgetData => (StatusCode::BAD_REQUEST, "Invalid data format".into()),
            Error::NoFileUploaded => (StatusCode::BAD_REQUEST, "No file uploaded.".into()),
            Error::InvalidCSV(_) => (StatusCode::BAD_REQUEST, "Error parsing CSV file.".into()),
            Error::EmptyCSV => (
                StatusCode::BAD_REQUEST,
                "CSV file is empty or has invalid format.".into(),
            ),
            Error::InsufficientHistory => (
                StatusCode::BAD_REQUEST,
                "Not enough historical data to make a prediction.".into(),
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                "The requested resource could not be found.".into(),
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            Error::HashingError(_)
            | Error::TokenCreation(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An unexpected error occurred, check the server logs for more details.".into(),
            ),
        }
    }
}

fn capitalise(text: &str) -> String {
    let mut chars = text.chars();

    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        if status.is_server_error() {
            tracing::error!("An unexpected error occurred: {}", self);
        }

        (status, Json(json!({ "message": message }))).into_response()
    }
}
