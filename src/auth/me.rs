//! The logged in user's profile: reading it, changing the display currency
//! and deleting the user.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    auth::{AuthUser, UserID, delete_user, get_user_by_id, update_currency},
    currency::CurrencyCode,
    database_id::AccountId,
    db::lock_connection,
};

/// The state needed for the profile endpoints.
#[derive(Debug, Clone)]
pub struct ProfileState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The public details of a user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    user_id: UserID,
    account_id: AccountId,
    username: String,
    email: String,
    currency: CurrencyCode,
}

/// The body of a request to change the display currency.
#[derive(Debug, Deserialize)]
pub struct CurrencyForm {
    #[serde(default)]
    currency: Option<String>,
}

/// Get the profile of the logged in user.
pub async fn get_profile(
    State(state): State<ProfileState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<Profile>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let user = get_user_by_id(auth_user.user_id, &connection).map_err(|error| match error {
        Error::NotFound => Error::UserNotFound,
        error => error,
    })?;

    Ok(Json(Profile {
        user_id: user.id,
        account_id: auth_user.account_id,
        username: user.username,
        email: user.email,
        currency: user.currency,
    }))
}

/// Change the currency amounts are displayed in.
pub async fn update_currency_endpoint(
    State(state): State<ProfileState>,
    Extension(auth_user): Extension<AuthUser>,
    form: Result<Json<CurrencyForm>, JsonRejection>,
) -> Result<Json<Value>, Error> {
    let Json(form) = form?;
    let currency = CurrencyCode::new(form.currency.as_deref().unwrap_or_default())?;

    let connection = lock_connection(&state.db_connection)?;
    update_currency(auth_user.user_id, &currency, &connection)?;

    Ok(Json(json!({ "message": "Currency updated successfully." })))
}

/// Delete the logged in user together with everything they own.
pub async fn delete_profile(
    State(state): State<ProfileState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<Value>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    delete_user(auth_user.user_id, &connection)?;

    tracing::info!("Deleted user {}", auth_user.user_id);

    Ok(Json(json!({ "message": "User account deleted successfully." })))
}
