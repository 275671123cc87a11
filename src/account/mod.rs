//! The ledger container that holds a user's transactions.

mod db;

pub use db::{
    Account, DEFAULT_ACCOUNT_NAME, DEFAULT_ACCOUNT_TYPE, create_account, create_account_table,
    get_account_for_user,
};
