//! A client for the exchange rate provider with a short lived cache.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};

use crate::{Error, currency::CurrencyCode};

/// The default location of the exchange rate provider's API.
pub const DEFAULT_RATES_URL: &str = "https://v6.exchangerate-api.com/v6";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Units of each currency that one US dollar buys, e.g. `{"NZD": 1.65}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rates(BTreeMap<String, f64>);

impl Rates {
    /// Create rates from a map of currency code to rate.
    pub fn new(rates: BTreeMap<String, f64>) -> Self {
        Self(rates)
    }

    /// Get the rate for `currency`. USD is always 1.
    pub fn get(&self, currency: &CurrencyCode) -> Option<f64> {
        if currency.is_usd() {
            return Some(1.0);
        }

        self.0
            .get(currency.as_str())
            .copied()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
    }

    /// Convert `amount` in `currency` to USD.
    ///
    /// # Errors
    ///
    /// Returns [Error::UnknownCurrency] if there is no usable rate for `currency`.
    pub fn to_usd(&self, amount: f64, currency: &CurrencyCode) -> Result<f64, Error> {
        self.get(currency)
            .map(|rate| amount / rate)
            .ok_or_else(|| Error::UnknownCurrency(currency.to_string()))
    }

    /// Convert `amount_usd` to `currency`.
    ///
    /// # Errors
    ///
    /// Returns [Error::UnknownCurrency] if there is no usable rate for `currency`.
    pub fn from_usd(&self, amount_usd: f64, currency: &CurrencyCode) -> Result<f64, Error> {
        self.get(currency)
            .map(|rate| amount_usd * rate)
            .ok_or_else(|| Error::UnknownCurrency(currency.to_string()))
    }
}

/// The body returned by the provider for `/{api_key}/latest/USD`.
#[derive(Debug, Deserialize)]
struct ProviderResponse {
    result: String,
    #[serde(default)]
    conversion_rates: Option<BTreeMap<String, f64>>,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
}

#[derive(Debug)]
struct CachedRates {
    fetched_at: Instant,
    rates: Rates,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cache_duration: Duration,
    cache: Mutex<Option<CachedRates>>,
}

/// Fetches USD based exchange rates from the provider.
///
/// Cloning is cheap, clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct ExchangeRateClient {
    inner: Arc<ClientInner>,
}

// The API key is part of the request path, keep it out of debug output.
impl std::fmt::Debug for ExchangeRateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRateClient")
            .field("base_url", &self.inner.base_url)
            .field("configured", &self.inner.api_key.is_some())
            .field("cache_duration", &self.inner.cache_duration)
            .finish()
    }
}

impl ExchangeRateClient {
    /// Create a client for the provider at `base_url`.
    ///
    /// Without an `api_key` every request for rates fails with
    /// [Error::RatesNotConfigured]. Fetched rates are reused for `cache_duration`.
    pub fn new(base_url: &str, api_key: Option<String>, cache_duration: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!("could not configure HTTP client, using defaults: {error}");
                reqwest::Client::new()
            });

        Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: base_url.trim_end_matches('/').to_owned(),
                api_key: api_key.filter(|key| !key.trim().is_empty()),
                cache_duration,
                cache: Mutex::new(None),
            }),
        }
    }

    /// Whether an API key was configured.
    pub fn is_configured(&self) -> bool {
        self.inner.api_key.is_some()
    }

    /// Get the latest rates, from the cache if they are fresh enough.
    ///
    /// # Errors
    ///
    /// Returns [Error::RatesNotConfigured] if no API key was given, or
    /// [Error::RatesUnavailable] if the provider could not be reached or reported an error.
    pub async fn latest(&self) -> Result<Rates, Error> {
        let api_key = self
            .inner
            .api_key
            .as_deref()
            .ok_or(Error::RatesNotConfigured)?;

        if let Some(rates) = self.cached() {
            return Ok(rates);
        }

        let url = format!("{}/{}/latest/USD", self.inner.base_url, api_key);
        let response = self
            .inner
            .http
            .get(&url)
            .send()
            .await
            .map_err(|error| {
                let error = error.without_url();
                tracing::error!("Error calling the currency exchange API: {error}");
                Error::RatesUnavailable(error.to_string())
            })?;

        let body: ProviderResponse = response.json().await.map_err(|error| {
            let error = error.without_url();
            tracing::error!("Could not decode the currency exchange API response: {error}");
            Error::RatesUnavailable(error.to_string())
        })?;

        let rates = match (body.result.as_str(), body.conversion_rates) {
            ("success", Some(conversion_rates)) => Rates::new(conversion_rates),
            _ => {
                let error_type = body.error_type.unwrap_or_else(|| "unknown".to_owned());
                tracing::error!("ExchangeRate-API returned an error: {error_type}");
                return Err(Error::RatesUnavailable(error_type));
            }
        };

        self.store(rates.clone());

        Ok(rates)
    }

    fn cached(&self) -> Option<Rates> {
        let cache = self.inner.cache.lock().ok()?;

        cache
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.inner.cache_duration)
            .map(|cached| cached.rates.clone())
    }

    fn store(&self, rates: Rates) {
        match self.inner.cache.lock() {
            Ok(mut cache) => {
                *cache = Some(CachedRates {
                    fetched_at: Instant::now(),
                    rates,
                })
            }
            Err(error) => tracing::warn!("could not cache exchange rates: {error}"),
        }
    }
}

/// Convert `amount` in `currency` to USD, only asking the provider for rates
/// when `currency` is not USD.
///
/// # Errors
///
/// Returns the errors of [ExchangeRateClient::latest] and [Rates::to_usd].
pub async fn convert_to_usd(
    client: &ExchangeRateClient,
    amount: f64,
    currency: &CurrencyCode,
) -> Result<f64, Error> {
    if currency.is_usd() {
        return Ok(amount);
    }

    client.latest().await?.to_usd(amount, currency)
}


#[cfg(test)]
mod client_tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::Duration,
    };

    use axum::{Json, Router, extract::Path, routing::get};
    use serde_json::{Value, json};

    use crate::{
        Error,
        currency::{CurrencyCode, ExchangeRateClient, convert_to_usd},
        test_utils::spawn_rates_provider,
    };

    #[tokio::test]
    async fn fetches_rates_from_provider() {
        let base_url = spawn_rates_provider().await;
        let client = ExchangeRateClient::new(&base_url, Some("key".to_owned()), Duration::ZERO);

        let rates = client.latest().await.unwrap();

        assert_eq!(rates.get(&CurrencyCode::new("NZD").unwrap()), Some(2.0));
    }

    #[tokio::test]
    async fn missing_key_is_not_configured() {
        let client = ExchangeRateClient::new("http://127.0.0.1:9", None, Duration::ZERO);

        assert!(!client.is_configured());
        assert_eq!(client.latest().await, Err(Error::RatesNotConfigured));
    }

    #[tokio::test]
    async fn provider_error_is_unavailable() {
        let app = Router::new().route(
            "/{key}/latest/USD",
            get(|| async { Json(json!({"result": "error", "error-type": "invalid-key"})) }),
        );
        let base_url = crate::test_utils::spawn_router(app).await;
        let client = ExchangeRateClient::new(&base_url, Some("bad".to_owned()), Duration::ZERO);

        assert_eq!(
            client.latest().await,
            Err(Error::RatesUnavailable("invalid-key".to_owned()))
        );
    }

    #[tokio::test]
    async fn unreachable_provider_is_unavailable() {
        let client = ExchangeRateClient::new(
            "http://127.0.0.1:9",
            Some("key".to_owned()),
            Duration::ZERO,
        );

        assert!(matches!(
            client.latest().await,
            Err(Error::RatesUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn caches_rates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/{key}/latest/USD",
            get(move |Path(_key): Path<String>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json::<Value>(json!({"result": "success", "conversion_rates": {"USD": 1.0}}))
                }
            }),
        );
        let base_url = crate::test_utils::spawn_router(app).await;
        let client =
            ExchangeRateClient::new(&base_url, Some("key".to_owned()), Duration::from_secs(60));

        client.latest().await.unwrap();
        client.clone().latest().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn usd_conversion_skips_provider() {
        let client = ExchangeRateClient::new("http://127.0.0.1:9", None, Duration::ZERO);

        let amount = convert_to_usd(&client, -42.0, &CurrencyCode::usd()).await;

        assert_eq!(amount, Ok(-42.0));
    }
}
