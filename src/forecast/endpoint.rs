use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    auth::AuthUser,
    database_id::AccountId,
    db::lock_connection,
    forecast::model::{ForecastPoint, forecast},
};

/// The state needed for forecasting spending.
#[derive(Debug, Clone)]
pub struct ForecastState {
    /// The database connection for reading transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ForecastState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Route handler for the spending forecast chart.
pub async fn get_forecast(
    State(state): State<ForecastState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ForecastPoint>>, Error> {
    let daily_totals = {
        let connection = lock_connection(&state.db_connection)?;
        get_daily_expenses(user.account_id, &connection)?
    };

    forecast(&daily_totals)
        .inspect_err(|_| {
            tracing::debug!(
                "only {} days of spending in account {}, not enough for a forecast",
                daily_totals.len(),
                user.account_id
            )
        })
        .map(Json)
}

/// The magnitude of the expenses on each day with any, oldest first.
fn get_daily_expenses(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<(Date, f64)>, Error> {
    connection
        .prepare(
            "SELECT transaction_date, SUM(ABS(amount_usd))
             FROM \"transaction\"
             WHERE account_id = ?1 AND amount < 0
             GROUP BY transaction_date
             ORDER BY transaction_date ASC",
        )?
        .query_map([account_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, rusqlite::Error>>()
        .map_err(Error::from)
}

#[cfg(test)]
mod forecast_endpoint_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::{Value, json};

    use crate::test_utils::{TestUser, get_test_server, get_test_state, register_and_log_in};

    async fn spend(server: &TestServer, user: &TestUser, amount: f64, date: &str) {
        server
            .post("/api/transactions")
            .authorization_bearer(&user.token)
            .json(&json!({ "description": "Spend", "amount": amount, "transaction_date": date }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn forecasts_from_daily_expenses() {
        let server = get_test_server(get_test_state());
        let user = register_and_log_in(&server, "alice").await;
        spend(&server, &user, -6.0, "2025-01-01").await;
        spend(&server, &user, -4.0, "2025-01-01").await;
        spend(&server, &user, 500.0, "2025-01-02").await;
        spend(&server, &user, -30.0, "2025-01-03").await;

        let response = server
            .get("/api/forecasts")
            .authorization_bearer(&user.token)
            .await;

        response.assert_status_ok();
        let points: Value = response.json();
        let points = points.as_array().unwrap();
        assert_eq!(points.len(), 33);
        assert_eq!(
            points[0],
            json!({ "date": "2025-01-01", "actual": 10.0, "predicted": null })
        );
        assert_eq!(points[1]["actual"], 0.0);
        assert_eq!(points[3]["date"], "2025-01-04");
        assert_eq!(points[3]["actual"], Value::Null);
        assert!(points[3]["predicted"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn single_day_is_bad_request() {
        let server = get_test_server(get_test_state());
        let user = register_and_log_in(&server, "alice").await;
        spend(&server, &user, -6.0, "2025-01-01").await;

        let response = server
            .get("/api/forecasts")
            .authorization_bearer(&user.token)
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["message"],
            "Not enough historical data to make a prediction."
        );
    }
}
