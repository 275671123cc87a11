//! ISO 4217 style currency codes.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A three letter currency code such as "USD" or "NZD", always upper-case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a currency code, upper-casing `code`.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidCurrency] unless `code` is exactly three ASCII letters
    /// after trimming whitespace.
    pub fn new(code: &str) -> Result<Self, Error> {
        let code = code.trim();

        if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Ok(Self(code.to_ascii_uppercase()))
        } else {
            Err(Error::InvalidCurrency(code.to_owned()))
        }
    }

    /// Wrap a code read back from the database without validation.
    pub fn new_unchecked(code: &str) -> Self {
        Self(code.to_owned())
    }

    /// The base currency that every stored amount is normalised to.
    pub fn usd() -> Self {
        Self("USD".to_owned())
    }

    /// Whether this is the base currency.
    pub fn is_usd(&self) -> bool {
        self.0 == "USD"
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self::usd()
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
