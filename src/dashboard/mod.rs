//! Dashboard module
//!
//! Provides the data behind the dashboard charts: expenses per category and
//! income versus expenses over time.

mod aggregation;
mod handlers;
mod transaction;

pub use handlers::{get_expenses_by_category, get_monthly_summary};
