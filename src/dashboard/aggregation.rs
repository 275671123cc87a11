//! Transaction data aggregation for charts.
//!
//! Groups expenses by category and sums income and expenses per month or year.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::dashboard::transaction::Transaction;

/// Groups whose expenses are at most this many dollars are left off charts.
const MIN_CHART_VALUE: f64 = 0.01;

/// The total spent in a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryExpense {
    pub name: String,
    pub value: f64,
}

/// The income and expenses of one month or year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodSummary {
    /// "YYYY-MM" for months, "YYYY" for years.
    pub month: String,
    pub income: f64,
    /// The magnitude of the expenses.
    pub expenses: f64,
}

/// How to group transactions over time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PeriodView {
    #[default]
    Month,
    Year,
}

impl PeriodView {
    /// Parse the `view` query parameter, anything but "year" means months.
    pub fn from_query(view: Option<&str>) -> Self {
        match view.map(str::trim) {
            Some(view) if view.eq_ignore_ascii_case("year") => Self::Year,
            _ => Self::Month,
        }
    }

    fn label(self, transaction: &Transaction) -> String {
        let date = transaction.date;

        match self {
            PeriodView::Month => format!("{:04}-{:02}", date.year(), u8::from(date.month())),
            PeriodView::Year => format!("{:04}", date.year()),
        }
    }
}

/// Sums the magnitude of expenses per category.
///
/// # Returns
/// Categories with more than [MIN_CHART_VALUE] in expenses, largest first.
pub(super) fn expenses_by_category(transactions: &[Transaction]) -> Vec<CategoryExpense> {
    let mut totals: HashMap<&str, f64> = HashMap::new();

    for transaction in transactions.iter().filter(|t| t.amount_usd < 0.0) {
        *totals.entry(transaction.category.as_str()).or_insert(0.0) += transaction.amount_usd.abs();
    }

    let mut expenses: Vec<CategoryExpense> = totals
        .into_iter()
        .filter(|(_, value)| *value > MIN_CHART_VALUE)
        .map(|(name, value)| CategoryExpense {
            name: name.to_owned(),
            value,
        })
        .collect();

    expenses.sort_by(|a, b| b.value.total_cmp(&a.value).then_with(|| a.name.cmp(&b.name)));
    expenses
}

/// Sums income and expenses per month or year, oldest first.
pub(super) fn summarize_by_period(transactions: &[Transaction], view: PeriodView) -> Vec<PeriodSummary> {
    let mut totals: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for transaction in transactions {
        let (income, expenses) = totals.entry(view.label(transaction)).or_insert((0.0, 0.0));

        if transaction.amount_usd > 0.0 {
            *income += transaction.amount_usd;
        } else {
            *expenses += transaction.amount_usd.abs();
        }
    }

    totals
        .into_iter()
        .map(|(month, (income, expenses))| PeriodSummary {
            month,
            income,
            expenses,
        })
        .collect()
}
