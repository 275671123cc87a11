//! Authentication middleware that validates bearer tokens.

use std::sync::{Arc, Mutex};

use axum::{
    RequestPartsExt,
    extract::{FromRef, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejectionReason,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::get_account_for_user,
    auth::{JwtKeys, UserID, decode_token},
    database_id::AccountId,
    db::lock_connection,
};

/// The user a request was authenticated as.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthUser {
    /// The logged in user.
    pub user_id: UserID,
    /// The account the user's transactions are stored in.
    pub account_id: AccountId,
}

/// The state needed to authenticate requests.
#[derive(Debug, Clone)]
pub struct AuthState {
    /// The keys used to verify JSON web tokens.
    pub jwt_keys: JwtKeys,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            jwt_keys: state.jwt_keys.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Middleware function that checks for a valid `Authorization: Bearer <token>` header.
///
/// The [AuthUser] is placed into the request extensions and the request executed
/// normally if the token is valid and its user still owns the token's account,
/// otherwise a 401 response is returned.
///
/// **Note**: Route handlers can use the function argument
/// `Extension(user): Extension<AuthUser>` to receive the user.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();

    let bearer = match parts.extract::<TypedHeader<Authorization<Bearer>>>().await {
        Ok(TypedHeader(Authorization(bearer))) => bearer,
        Err(rejection) => {
            return match rejection.reason() {
                TypedHeaderRejectionReason::Missing => Error::MissingToken.into_response(),
                _ => Error::InvalidToken.into_response(),
            };
        }
    };

    let claims = match decode_token(bearer.token(), &state.jwt_keys) {
        Ok(claims) => claims,
        Err(error) => return error.into_response(),
    };

    let user = AuthUser {
        user_id: claims.sub,
        account_id: claims.account_id,
    };

    if let Err(error) = ensure_account_is_current(user, &state.db_connection) {
        return error.into_response();
    }

    parts.extensions.insert(user);

    next.run(Request::from_parts(parts, body)).await
}

/// Check that the token's user still exists and owns the token's account.
fn ensure_account_is_current(
    user: AuthUser,
    db_connection: &Mutex<Connection>,
) -> Result<(), Error> {
    let connection = lock_connection(db_connection)?;

    match get_account_for_user(user.user_id, &connection) {
        Ok(account) if account.id == user.account_id => Ok(()),
        Ok(_) | Err(Error::NotFound) => {
            tracing::debug!("rejected token for user {} with stale account", user.user_id);
            Err(Error::InvalidToken)
        }
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod auth_guard_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Router, http::StatusCode, middleware, routing::get};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::Value;
    use time::Duration;

    use crate::{
        account::Account,
        auth::{
            AuthUser, JwtKeys, PasswordHash, User, UserID, auth_guard, create_token,
            create_user_with_account, delete_user,
        },
        db::initialize,
    };

    use super::AuthState;

    async fn whoami(Extension(user): Extension<AuthUser>) -> String {
        format!("{}:{}", user.user_id, user.account_id)
    }

    fn get_test_state(secret: &str) -> AuthState {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        AuthState {
            jwt_keys: JwtKeys::new(secret),
            db_connection: Arc::new(Mutex::new(conn)),
        }
    }

    fn create_test_user(state: &AuthState, username: &str) -> (User, Account) {
        let conn = state.db_connection.lock().unwrap();

        create_user_with_account(
            username,
            &format!("{username}@example.com"),
            PasswordHash::new_unchecked("hunter2"),
            &conn,
        )
        .unwrap()
    }

    fn get_test_server(state: AuthState) -> TestServer {
        let app = Router::new()
            .route("/protected", get(whoami))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard))
            .with_state(state);

        TestServer::new(app)
    }

    #[tokio::test]
    async fn valid_token_passes_user_to_handler() {
        let state = get_test_state("foobar");
        let (user, account) = create_test_user(&state, "alice");
        let token = create_token(user.id, account.id, Duration::hours(1), &state.jwt_keys).unwrap();
        let server = get_test_server(state);

        let response = server
            .get("/protected")
            .authorization_bearer(token)
            .await;

        response.assert_status_ok();
        response.assert_text(format!("{}:{}", user.id, account.id));
    }

    #[tokio::test]
    async fn missing_token_is_rejected() {
        let server = get_test_server(get_test_state("foobar"));

        let response = server.get("/protected").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["message"], "No token, authorization denied");
    }

    #[tokio::test]
    async fn invalid_token_is_rejected() {
        let server = get_test_server(get_test_state("foobar"));

        let response = server
            .get("/protected")
            .authorization_bearer("definitely-not-a-jwt")
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["message"], "Token is not valid");
    }

    #[tokio::test]
    async fn token_from_other_secret_is_rejected() {
        let state = get_test_state("foobar");
        let (user, account) = create_test_user(&state, "alice");
        let token =
            create_token(user.id, account.id, Duration::hours(1), &JwtKeys::new("other")).unwrap();
        let server = get_test_server(state);

        let response = server
            .get("/protected")
            .authorization_bearer(token)
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_of_deleted_user_is_rejected() {
        let state = get_test_state("foobar");
        let (user, account) = create_test_user(&state, "alice");
        let token = create_token(user.id, account.id, Duration::hours(1), &state.jwt_keys).unwrap();
        delete_user(user.id, &state.db_connection.lock().unwrap()).unwrap();
        let server = get_test_server(state);

        let response = server
            .get("/protected")
            .authorization_bearer(token)
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["message"], "Token is not valid");
    }

    #[tokio::test]
    async fn token_with_another_users_account_is_rejected() {
        let state = get_test_state("foobar");
        let (alice, _) = create_test_user(&state, "alice");
        let (_, bobs_account) = create_test_user(&state, "bob");
        let token =
            create_token(alice.id, bobs_account.id, Duration::hours(1), &state.jwt_keys).unwrap();
        let server = get_test_server(state);

        let response = server
            .get("/protected")
            .authorization_bearer(token)
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn token_for_unknown_user_is_rejected() {
        let state = get_test_state("foobar");
        let token =
            create_token(UserID::new(5), 9, Duration::hours(1), &state.jwt_keys).unwrap();
        let server = get_test_server(state);

        let response = server
            .get("/protected")
            .authorization_bearer(token)
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}
