//! Command line and environment configuration for the server.

use std::time::Duration;

use clap::Parser;

use crate::currency::DEFAULT_RATES_URL;

/// The REST API server for the finance tracker.
///
/// Every option can also be set with the environment variable named in its help.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DB_PATH")]
    pub db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// The secret used to sign JSON web tokens.
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// The API key for ExchangeRate-API. Without it only USD amounts can be recorded.
    #[arg(long, env = "EXCHANGERATE_API_KEY", hide_env_values = true)]
    pub exchange_rate_api_key: Option<String>,

    /// The base URL of ExchangeRate-API.
    #[arg(long, env = "EXCHANGERATE_API_URL", default_value = DEFAULT_RATES_URL)]
    pub exchange_rate_url: String,

    /// How long to reuse fetched exchange rates for, in seconds.
    #[arg(long, env = "RATES_CACHE_SECONDS", default_value_t = 3600)]
    pub rates_cache_seconds: u64,

    /// How long log-in tokens stay valid for, in hours.
    #[arg(long, env = "TOKEN_HOURS", default_value_t = 3)]
    pub token_hours: u16,

    /// File path to write debug logs to.
    #[arg(long, env = "LOG_PATH", default_value = "debug.log")]
    pub log_path: String,
}

impl Args {
    /// How long to cache exchange rates for.
    pub fn rates_cache_duration(&self) -> Duration {
        Duration::from_secs(self.rates_cache_seconds)
    }

    /// How long log-in tokens stay valid for.
    pub fn token_duration(&self) -> time::Duration {
        time::Duration::hours(self.token_hours.into())
    }
}
