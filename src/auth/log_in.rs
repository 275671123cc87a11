//! Exchanging an email and password for a bearer token.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    account::get_account_for_user,
    auth::{JwtKeys, UserID, create_token, get_user_by_email},
    currency::CurrencyCode,
    database_id::AccountId,
    db::lock_connection,
};

/// The state needed for logging in.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The keys for signing tokens.
    pub jwt_keys: JwtKeys,
    /// How long issued tokens are valid for.
    pub token_duration: Duration,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            jwt_keys: state.jwt_keys.clone(),
            token_duration: state.token_duration,
        }
    }
}

/// The body of a log-in request.
#[derive(Debug, Deserialize)]
pub struct LogInForm {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// The token and the details the client needs right after logging in.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogInResponse {
    token: String,
    user_id: UserID,
    account_id: AccountId,
    currency: CurrencyCode,
}

/// Handler for log-in requests.
///
/// # Errors
///
/// This function will return an error in a few situations.
/// - The email or password is missing ([Error::MissingCredentials]).
/// - The email does not belong to a registered user or the password is not
///   correct ([Error::InvalidCredentials]).
/// - An internal error occurred when verifying the password or signing the token.
pub async fn log_in(
    State(state): State<LogInState>,
    form: Result<Json<LogInForm>, JsonRejection>,
) -> Result<Json<LogInResponse>, Error> {
    let Json(form) = form?;
    let (email, password) = match (
        form.email.map(|email| email.trim().to_owned()),
        form.password,
    ) {
        (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
            (email, password)
        }
        _ => return Err(Error::MissingCredentials),
    };

    let (user, account) = {
        let connection = lock_connection(&state.db_connection)?;

        let user = get_user_by_email(&email, &connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        })?;
        let account = get_account_for_user(user.id, &connection)?;

        (user, account)
    };

    let is_password_correct = user.password_hash.verify(&password).map_err(|error| {
        tracing::error!("Error verifying password: {error}");
        Error::HashingError(error.to_string())
    })?;

    if !is_password_correct {
        return Err(Error::InvalidCredentials);
    }

    let token = create_token(user.id, account.id, state.token_duration, &state.jwt_keys)?;

    Ok(Json(LogInResponse {
        token,
        user_id: user.id,
        account_id: account.id,
        currency: user.currency,
    }))
}
