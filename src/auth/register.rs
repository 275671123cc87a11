//! Registration of new users.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State, rejection::JsonRejection},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState, Error,
    auth::{PasswordHash, ValidatedPassword, create_user_with_account},
    db::lock_connection,
};

/// The state needed for registering a user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost for the new password hash.
    pub password_hash_cost: u32,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            password_hash_cost: state.password_hash_cost,
        }
    }
}

/// The body of a registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Create a user and their default account.
///
/// # Errors
///
/// Returns [Error::MissingRegistrationFields] if a field is missing or blank,
/// [Error::TooWeak] if the password is easy to guess and
/// [Error::DuplicateUser] if the username or email is taken.
pub async fn register(
    State(state): State<RegistrationState>,
    form: Result<Json<RegisterForm>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let Json(form) = form?;
    let (username, email, password) = match (
        non_blank(form.username),
        non_blank(form.email),
        form.password.filter(|password| !password.is_empty()),
    ) {
        (Some(username), Some(email), Some(password)) => (username, email, password),
        _ => return Err(Error::MissingRegistrationFields),
    };

    let password = ValidatedPassword::new(&password, &[&username, &email])?;
    let password_hash = PasswordHash::new(password, state.password_hash_cost)?;

    let connection = lock_connection(&state.db_connection)?;
    let (user, account) = create_user_with_account(&username, &email, password_hash, &connection)?;

    tracing::info!("Registered user {} with account {}", user.id, account.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully!" })),
    ))
}

fn non_blank(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
