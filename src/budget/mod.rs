//! Monthly spending targets per category and how spending compares to them.

mod core;
mod endpoints;
mod month;
mod report;

pub use self::core::{Budget, create_budget_table, upsert_budget, validate_amount};
pub use endpoints::{bulk_update_budgets_endpoint, get_budgets_endpoint, upsert_budget_endpoint};
pub use month::BudgetMonth;
pub use report::{BudgetLine, get_budget_report};

#[cfg(test)]
pub use self::core::get_budgets;
