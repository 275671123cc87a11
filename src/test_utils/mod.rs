#![allow(missing_docs)]

//! Helpers for tests that go through the HTTP API.

use std::time::Duration;

use axum::{Json, Router, routing::get};
use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::{AppState, build_router, currency::ExchangeRateClient};

/// A password that passes the strength check.
pub(crate) const TEST_PASSWORD: &str = "averystrongandsecurepassword";

/// The units of each currency per US dollar served by [spawn_rates_provider].
pub(crate) const TEST_RATES: [(&str, f64); 4] =
    [("USD", 1.0), ("NZD", 2.0), ("EUR", 0.5), ("JPY", 100.0)];

/// A logged in user.
#[derive(Debug, Clone)]
pub(crate) struct TestUser {
    pub token: String,
    pub user_id: i64,
    pub account_id: i64,
}

/// App state with an in-memory database and a rates client without an API key.
pub(crate) fn get_test_state() -> AppState {
    build_test_state(ExchangeRateClient::new("http://127.0.0.1:9", None, Duration::ZERO))
}

/// App state whose rates client talks to the provider at `base_url`.
pub(crate) fn get_test_state_with_rates(base_url: &str) -> AppState {
    build_test_state(ExchangeRateClient::new(
        base_url,
        Some("test-key".to_owned()),
        Duration::ZERO,
    ))
}

fn build_test_state(rates_client: ExchangeRateClient) -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open database in memory.");

    AppState::new(connection, "foobar", rates_client)
        .expect("Could not create app state.")
        .with_password_hash_cost(4)
}

/// A test server for the full application router.
pub(crate) fn get_test_server(state: AppState) -> TestServer {
    TestServer::new(build_router(state))
}

/// Register `username` with the email `{username}@example.com` and [TEST_PASSWORD].
pub(crate) async fn register_user(server: &TestServer, username: &str) {
    server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": TEST_PASSWORD,
        }))
        .await
        .assert_status(axum::http::StatusCode::CREATED);
}

/// Register `username` and log them in.
pub(crate) async fn register_and_log_in(server: &TestServer, username: &str) -> TestUser {
    register_user(server, username).await;

    let response = server
        .post("/api/auth/login")
        .json(&json!({
            "email": format!("{username}@example.com"),
            "password": TEST_PASSWORD,
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();

    TestUser {
        token: body["token"].as_str().expect("token").to_owned(),
        user_id: body["userId"].as_i64().expect("userId"),
        account_id: body["accountId"].as_i64().expect("accountId"),
    }
}

/// Serve `app` on a random local port and return its base URL.
pub(crate) async fn spawn_router(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Could not bind test listener.");
    let address = listener
        .local_addr()
        .expect("Could not get test listener address.");

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Test server stopped unexpectedly.");
    });

    format!("http://{address}")
}

/// Serve a fake exchange rate provider that returns [TEST_RATES] for any key.
pub(crate) async fn spawn_rates_provider() -> String {
    let app = Router::new().route(
        "/{key}/latest/USD",
        get(|| async {
            let rates: serde_json::Map<String, Value> = TEST_RATES
                .iter()
                .map(|(code, rate)| (code.to_string(), json!(rate)))
                .collect();

            Json(json!({ "result": "success", "conversion_rates": rates }))
        }),
    );

    spawn_router(app).await
}
