//! Transport-layer types and small helpers shared by the compute layer and
//! the HTTP handlers: month arithmetic, money formatting, and the report
//! payloads the API returns.

mod dates;
mod money;
mod reports;

pub use dates::{
    current_month_year, month_date_range, month_date_range_exclusive, month_name, previous_month, today,
};
pub use money::{calculate_percentage, format_currency, percentage_1dp};
pub use reports::{
    BalanceSummary, BudgetOverview, BudgetProgress, BudgetStatus, CategoryShare, Dashboard, MonthlyBudgetSummary,
    Page, RecentTransaction, SavingProgress, SavingsOverview, SavingsSummary, TransactionKind,
};
