//! Currency codes, live exchange rates and conversion to and from USD.

mod client;
mod code;
mod endpoint;

pub use client::{DEFAULT_RATES_URL, ExchangeRateClient, Rates, convert_to_usd};
pub use code::CurrencyCode;
pub use endpoint::get_rates;
