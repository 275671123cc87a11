//! Importing transactions from uploaded CSV files.

mod csv;
mod import_transactions;

pub use import_transactions::import_transactions;
