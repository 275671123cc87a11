//! User defined categories that transactions and budgets are grouped by.

mod db;
mod domain;
mod endpoints;

pub use db::{
    create_category, create_category_table, delete_category, ensure_category_belongs_to_user,
    get_categories, get_categories_with_spending, update_category,
};
pub use domain::{
    Category, CategoryId, CategoryName, CategoryWithSpending, deserialize_optional_category_id,
};
pub use endpoints::{
    create_category_endpoint, delete_category_endpoint, get_categories_endpoint,
    get_categories_with_spending_endpoint, update_category_endpoint,
};

#[cfg(test)]
pub use db::get_category;
