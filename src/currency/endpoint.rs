//! Proxies the live exchange rates to the client.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::{
    Error,
    currency::{ExchangeRateClient, Rates},
};

/// The body sent back for a successful rates request.
#[derive(Debug, Serialize)]
pub struct RatesResponse {
    result: &'static str,
    rates: Rates,
}

/// Route handler for the latest USD based exchange rates.
pub async fn get_rates(State(client): State<ExchangeRateClient>) -> Result<Json<RatesResponse>, Error> {
    let rates = client.latest().await?;

    Ok(Json(RatesResponse {
        result: "success",
        rates,
    }))
}
