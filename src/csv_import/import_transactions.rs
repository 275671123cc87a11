use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    Extension, Json,
    extract::{FromRef, Multipart, State, multipart::Field},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Serialize;

use crate::{
    AppState, Error,
    auth::{AuthUser, get_user_by_id},
    category::{CategoryId, get_categories},
    csv_import::csv::{CsvTransaction, parse_csv},
    currency::{CurrencyCode, ExchangeRateClient, Rates},
    database_id::AccountId,
    db::lock_connection,
};

/// The name of the multipart form field that holds the CSV file.
const CSV_FIELD_NAME: &str = "csvFile";

/// The state needed for importing transactions.
#[derive(Debug, Clone)]
pub struct ImportState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The client for converting amounts to US dollars.
    pub rates_client: ExchangeRateClient,
}

impl FromRef<AppState> for ImportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            rates_client: state.rates_client.clone(),
        }
    }
}

/// The outcome of an import.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    message: String,
    imported: usize,
    duplicates: usize,
}

/// Route handler for importing transactions from a CSV file.
///
/// Rows without a currency are in the user's currency. Rows that were imported
/// before are counted as duplicates and left alone.
pub async fn import_transactions(
    State(state): State<ImportState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ImportResponse>), Error> {
    let start_time = std::time::Instant::now();
    let mut csv_data = None;

    while let Some(field) = multipart.next_field().await.map_err(|error| {
        tracing::debug!("could not read multipart form: {error}");
        Error::MultipartError(error.body_text())
    })? {
        if field.name() == Some(CSV_FIELD_NAME) {
            csv_data = Some(read_field(field).await?);
        }
    }

    let csv_data = csv_data.ok_or(Error::NoFileUploaded)?;
    let parsed = parse_csv(&csv_data).inspect_err(|error| {
        tracing::debug!("Failed to parse CSV: {error}");
    })?;

    if parsed.transactions.is_empty() {
        return Err(Error::EmptyCSV);
    }

    let (user_currency, category_ids) = {
        let connection = lock_connection(&state.db_connection)?;
        let user_currency = get_user_by_id(user.user_id, &connection)?.currency;
        let category_ids: HashMap<String, CategoryId> = get_categories(user.user_id, &connection)?
            .into_iter()
            .map(|category| (category.name.as_ref().to_lowercase(), category.id))
            .collect();

        (user_currency, category_ids)
    };

    let needs_rates = parsed.transactions.iter().any(|transaction| {
        !transaction
            .currency
            .as_ref()
            .unwrap_or(&user_currency)
            .is_usd()
    });
    let rates = if needs_rates {
        Some(state.rates_client.latest().await?)
    } else {
        None
    };

    let rows = parsed
        .transactions
        .into_iter()
        .map(|transaction| {
            to_import_row(transaction, &user_currency, rates.as_ref(), &category_ids)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let connection = lock_connection(&state.db_connection)?;
    let imported = import_rows(user.account_id, &rows, &connection)?;
    let duplicates = rows.len() - imported;

    tracing::info!(
        "Imported {imported} transactions ({duplicates} duplicates, {} skipped rows) in {}ms",
        parsed.skipped,
        start_time.elapsed().as_millis()
    );

    Ok((
        StatusCode::CREATED,
        Json(ImportResponse {
            message: format!("{imported} transactions uploaded successfully!"),
            imported,
            duplicates,
        }),
    ))
}

async fn read_field(field: Field<'_>) -> Result<Vec<u8>, Error> {
    match field.bytes().await {
        Ok(data) => Ok(data.to_vec()),
        Err(error) => {
            tracing::error!("Could not read data from multipart form field: {error}");
            Err(Error::MultipartError(
                "could not read data from multipart form field".to_owned(),
            ))
        }
    }
}

/// A CSV row ready to insert.
#[derive(Debug)]
struct ImportRow {
    transaction: CsvTransaction,
    currency: CurrencyCode,
    amount_usd: f64,
    category_id: Option<CategoryId>,
}

fn to_import_row(
    transaction: CsvTransaction,
    user_currency: &CurrencyCode,
    rates: Option<&Rates>,
    category_ids: &HashMap<String, CategoryId>,
) -> Result<ImportRow, Error> {
    let currency = transaction
        .currency
        .clone()
        .unwrap_or_else(|| user_currency.clone());
    let amount_usd = match rates {
        _ if currency.is_usd() => transaction.amount,
        Some(rates) => rates.to_usd(transaction.amount, &currency)?,
        None => return Err(Error::RatesNotConfigured),
    };
    let category_id = transaction
        .category
        .as_ref()
        .and_then(|name| category_ids.get(&name.to_lowercase()).copied());

    Ok(ImportRow {
        transaction,
        currency,
        amount_usd,
        category_id,
    })
}

/// Insert `rows` in one SQL transaction, skipping rows whose import ID is
/// already in the account.
///
/// Returns the number of rows inserted.
fn import_rows(
    account_id: AccountId,
    rows: &[ImportRow],
    connection: &Connection,
) -> Result<usize, Error> {
    let tx = connection.unchecked_transaction()?;
    let mut imported = 0;

    {
        let mut statement = tx.prepare(
            "INSERT INTO \"transaction\"
                (account_id, transaction_date, description, amount, currency, amount_usd,
                 category_id, import_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(account_id, import_id) DO NOTHING
             RETURNING id",
        )?;

        for row in rows {
            let mut inserted = statement.query((
                account_id,
                row.transaction.transaction_date,
                &row.transaction.description,
                row.transaction.amount,
                row.currency.as_str(),
                row.amount_usd,
                row.category_id,
                &row.transaction.import_id,
            ))?;

            if inserted.next()?.is_some() {
                imported += 1;
            }
        }
    }

    tx.commit()?;

    Ok(imported)
}

#[cfg(test)]
mod import_transactions_tests {
    use axum::http::StatusCode;
    use axum_test::{
        TestServer,
        multipart::{MultipartForm, Part},
    };
    use serde_json::{Value, json};

    use crate::test_utils::{
        TestUser, get_test_server, get_test_state, get_test_state_with_rates,
        register_and_log_in, spawn_rates_provider,
    };

    fn csv_form(csv: &str) -> MultipartForm {
        MultipartForm::new().add_part(
            "csvFile",
            Part::bytes(csv.as_bytes().to_vec())
                .file_name("transactions.csv")
                .mime_type("text/csv"),
        )
    }

    async fn upload(server: &TestServer, user: &TestUser, csv: &str) -> axum_test::TestResponse {
        server
            .post("/api/transactions/upload")
            .authorization_bearer(&user.token)
            .multipart(csv_form(csv))
            .await
    }

    async fn list(server: &TestServer, user: &TestUser) -> Vec<Value> {
        let transactions: Value = server
            .get("/api/transactions/account")
            .authorization_bearer(&user.token)
            .await
            .json();

        transactions.as_array().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn imports_rows_into_callers_account() {
        let server = get_test_server(get_test_state());
        let user = register_and_log_in(&server, "alice").await;
        let csv = "transaction_date,description,amount\n\
                   2025-01-05,Coffee,-4.50\n\
                   2025-01-06,Salary,2000\n\
                   2025-01-07,,12";

        let response = upload(&server, &user, csv).await;

        response.assert_status(StatusCode::CREATED);
        let body: Value = response.json();
        assert_eq!(
            body,
            json!({
                "message": "2 transactions uploaded successfully!",
                "imported": 2,
                "duplicates": 0,
            })
        );
        let transactions = list(&server, &user).await;
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0]["description"], "Salary");
        assert_eq!(transactions[0]["account_id"], user.account_id);
    }

    #[tokio::test]
    async fn reimporting_same_file_counts_duplicates() {
        let server = get_test_server(get_test_state());
        let user = register_and_log_in(&server, "alice").await;
        let csv = "transaction_date,description,amount\n\
                   2025-01-05,Coffee,-4.50\n\
                   2025-01-05,Coffee,-4.50";

        upload(&server, &user, csv)
            .await
            .assert_status(StatusCode::CREATED);
        let response = upload(&server, &user, csv).await;

        let body: Value = response.json();
        assert_eq!(body["imported"], 0);
        assert_eq!(body["duplicates"], 2);
        assert_eq!(list(&server, &user).await.len(), 2);
    }

    #[tokio::test]
    async fn matches_category_names_ignoring_case() {
        let server = get_test_server(get_test_state());
        let user = register_and_log_in(&server, "alice").await;
        let food: Value = server
            .post("/api/categories")
            .authorization_bearer(&user.token)
            .json(&json!({ "name": "Food" }))
            .await
            .json();
        let csv = "transaction_date,description,amount,category\n\
                   2025-01-05,Coffee,-4.50,food\n\
                   2025-01-04,Parking,-3,Transport";

        upload(&server, &user, csv)
            .await
            .assert_status(StatusCode::CREATED);

        let transactions = list(&server, &user).await;
        assert_eq!(transactions[0]["category_id"], food["id"]);
        assert_eq!(transactions[1]["category_id"], Value::Null);
    }

    #[tokio::test]
    async fn converts_foreign_rows_with_live_rates() {
        let base_url = spawn_rates_provider().await;
        let server = get_test_server(get_test_state_with_rates(&base_url));
        let user = register_and_log_in(&server, "alice").await;
        let csv = "transaction_date,description,amount,currency\n\
                   2025-01-05,Groceries,-30,NZD";

        upload(&server, &user, csv)
            .await
            .assert_status(StatusCode::CREATED);

        let transactions = list(&server, &user).await;
        assert_eq!(transactions[0]["currency"], "NZD");
        assert_eq!(transactions[0]["amount_usd"], -15.0);
    }

    #[tokio::test]
    async fn unknown_currency_rejects_whole_file() {
        let base_url = spawn_rates_provider().await;
        let server = get_test_server(get_test_state_with_rates(&base_url));
        let user = register_and_log_in(&server, "alice").await;
        let csv = "transaction_date,description,amount,currency\n\
                   2025-01-05,Coffee,-4.50,USD\n\
                   2025-01-05,Tea,-4.50,GBP";

        upload(&server, &user, csv)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        assert!(list(&server, &user).await.is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_bad_request() {
        let server = get_test_server(get_test_state());
        let user = register_and_log_in(&server, "alice").await;

        let response = server
            .post("/api/transactions/upload")
            .authorization_bearer(&user.token)
            .multipart(MultipartForm::new().add_text("note", "no file here"))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "No file uploaded.");
    }

    #[tokio::test]
    async fn file_without_valid_rows_is_bad_request() {
        let server = get_test_server(get_test_state());
        let user = register_and_log_in(&server, "alice").await;

        let response = upload(&server, &user, "date,memo\n2025-01-05,Coffee").await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["message"], "CSV file is empty or has invalid format.");
    }

    #[tokio::test]
    async fn upload_requires_token() {
        let server = get_test_server(get_test_state());

        server
            .post("/api/transactions/upload")
            .multipart(csv_form("transaction_date,description,amount"))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
}
