//! Transactions: recording, listing, categorising and summarising them.

mod core;
mod endpoints;
mod query;

pub use self::core::{
    Transaction, count_transactions, create_transaction, create_transaction_table,
    delete_transaction, update_transaction_category,
};
pub use endpoints::{
    create_transaction_endpoint, delete_transaction_endpoint, get_summary_endpoint,
    get_transactions_endpoint, update_transaction_endpoint,
};
pub use query::{
    Summary, TransactionFilter, TransactionQuery, TransactionRow, get_summary, get_transactions,
};

#[cfg(test)]
pub use self::core::get_transaction;
