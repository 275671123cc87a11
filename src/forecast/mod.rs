//! Predicting the next month of daily spending from past expenses.

mod endpoint;
mod model;

pub use endpoint::get_forecast;
