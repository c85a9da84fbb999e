use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where a budget stands against its alert threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Ok,
    Warning,
    Over,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Ok => "ok",
            BudgetStatus::Warning => "warning",
            BudgetStatus::Over => "over",
        }
    }
}

/// A budget together with its spending for the period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BudgetProgress {
    pub id: i32,
    pub category_id: i32,
    pub category_name: String,
    pub category_icon: String,
    pub category_color: String,
    pub month: u32,
    pub year: i32,
    pub period: String,
    pub amount: Decimal,
    pub alert_threshold: i32,
    pub notes: String,
    pub spent: Decimal,
    pub remaining: Decimal,
    /// Spent share of the budget, one decimal.
    pub percentage: Decimal,
    pub status: BudgetStatus,
}

/// Totals over every budget of one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyBudgetSummary {
    pub month: u32,
    pub year: i32,
    pub total_budgeted: Decimal,
    pub total_spent: Decimal,
    pub total_remaining: Decimal,
    pub overall_percentage: Decimal,
    pub budget_count: usize,
    pub over_count: usize,
    pub warning_count: usize,
}

/// Totals over the user's active savings goals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SavingsSummary {
    pub total_target: Decimal,
    pub total_current: Decimal,
    /// Never negative.
    pub total_remaining: Decimal,
    /// One decimal, capped at 100.
    pub overall_progress: Decimal,
    pub active_count: usize,
    pub completed_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SavingProgress {
    pub id: i32,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub currency: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub progress: Decimal,
    pub target_date: Option<NaiveDate>,
}

/// Income against expenses for a month, compared with the month before.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BalanceSummary {
    pub month: u32,
    pub year: i32,
    pub month_name: String,
    pub previous_month_name: String,
    pub income_total: Decimal,
    pub expense_total: Decimal,
    pub balance: Decimal,
    pub balance_is_positive: bool,
    /// Expenses as a share of income, zero without income.
    pub expense_percentage: Decimal,
    /// Month-over-month change, zero when the previous month had nothing.
    pub expense_variation: Decimal,
    pub income_variation: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BudgetOverview {
    pub budget_count: usize,
    pub over_count: usize,
    pub warning_count: usize,
    pub ok_count: usize,
    pub total_budgeted: Decimal,
    pub total_spent: Decimal,
    pub overall_percentage: Decimal,
    pub top_budgets: Vec<BudgetProgress>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SavingsOverview {
    pub active_count: usize,
    pub total_target: Decimal,
    pub total_current: Decimal,
    pub overall_progress: Decimal,
    pub completed_this_month: usize,
    pub top_savings: Vec<SavingProgress>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Expense,
    Income,
}

/// One row of the merged expense/income feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecentTransaction {
    pub kind: TransactionKind,
    pub id: i32,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub description: String,
    pub amount_ars: Decimal,
    pub formatted_amount: String,
    pub category_name: String,
    pub category_icon: String,
    pub category_color: String,
}

/// Spending of one category within a month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CategoryShare {
    pub category_id: i32,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Dashboard {
    pub today: NaiveDate,
    pub balance: BalanceSummary,
    pub budgets: BudgetOverview,
    pub savings: SavingsOverview,
    pub recent_transactions: Vec<RecentTransaction>,
    pub expense_distribution: Vec<CategoryShare>,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based.
    pub page: u64,
    pub per_page: u64,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        }
    }
}
