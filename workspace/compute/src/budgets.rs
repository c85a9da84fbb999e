//! Budget progress: what each budget has spent in its period and how the
//! month adds up.

use std::collections::{HashMap, HashSet};

use common::{percentage_1dp, BudgetProgress, BudgetStatus, MonthlyBudgetSummary};
use model::entities::budget::{self, BudgetFilter};
use model::entities::category;
use model::entities::expense::{self, ExpenseFilter};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, EntityTrait, QuerySelect};
use tracing::{debug, instrument};

use crate::error::{ComputeError, Result};

/// Expenses listed on a budget's detail view.
pub const DETAIL_RECENT_EXPENSES: u64 = 10;

/// Status of a budget given what was spent against it.
pub fn status_of(budget: &budget::Model, spent: Decimal) -> BudgetStatus {
    if budget.is_over_budget(spent) {
        BudgetStatus::Over
    } else if budget.is_near_limit(spent) {
        BudgetStatus::Warning
    } else {
        BudgetStatus::Ok
    }
}

pub fn progress(budget: &budget::Model, category: Option<&category::Model>, spent: Decimal) -> BudgetProgress {
    BudgetProgress {
        id: budget.id,
        category_id: budget.category_id,
        category_name: category.map(|c| c.name.clone()).unwrap_or_default(),
        category_icon: category.map(|c| c.icon.clone()).unwrap_or_default(),
        category_color: category.map(|c| c.color.clone()).unwrap_or_default(),
        month: budget.month as u32,
        year: budget.year,
        period: budget.period_label(),
        amount: budget.amount,
        alert_threshold: budget.alert_threshold,
        notes: budget.notes.clone(),
        spent,
        remaining: budget.remaining_amount(spent),
        percentage: budget.spent_percentage(spent),
        status: status_of(budget, spent),
    }
}

/// Spending per (category, month, year) for the given periods.
async fn spent_by_period<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    periods: &HashSet<(u32, i32)>,
) -> Result<HashMap<(i32, u32, i32), Decimal>> {
    let mut spent = HashMap::new();
    for &(month, year) in periods {
        let expenses = expense::for_user(
            user_id,
            ExpenseFilter {
                month: Some(month),
                year: Some(year),
                category_id: None,
            },
        )
        .all(db)
        .await?;
        for expense in expenses {
            *spent.entry((expense.category_id, month, year)).or_insert(Decimal::ZERO) += expense.amount_ars;
        }
    }
    Ok(spent)
}

/// The user's budgets matching the filter, each with its spending.
///
/// Expenses are loaded once per month involved rather than once per budget.
#[instrument(skip(db))]
pub async fn budgets_with_progress<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    filter: BudgetFilter,
) -> Result<Vec<BudgetProgress>> {
    let rows = budget::for_user(user_id, filter)
        .find_also_related(category::Entity)
        .all(db)
        .await?;

    let periods: HashSet<(u32, i32)> = rows.iter().map(|(b, _)| (b.month as u32, b.year)).collect();
    let spent = spent_by_period(db, user_id, &periods).await?;
    debug!("Loaded {} budgets across {} periods", rows.len(), periods.len());

    Ok(rows
        .iter()
        .map(|(budget, category)| {
            let key = (budget.category_id, budget.month as u32, budget.year);
            let amount = spent.get(&key).copied().unwrap_or(Decimal::ZERO).round_dp(2);
            progress(budget, category.as_ref(), amount)
        })
        .collect())
}

/// Folds budget progress rows into the month's totals.
pub fn summarize(month: u32, year: i32, budgets: &[BudgetProgress]) -> MonthlyBudgetSummary {
    let total_budgeted: Decimal = budgets.iter().map(|b| b.amount).sum();
    let total_spent: Decimal = budgets.iter().map(|b| b.spent).sum();

    MonthlyBudgetSummary {
        month,
        year,
        total_budgeted,
        total_spent,
        total_remaining: total_budgeted - total_spent,
        overall_percentage: percentage_1dp(total_spent, total_budgeted),
        budget_count: budgets.len(),
        over_count: budgets.iter().filter(|b| b.status == BudgetStatus::Over).count(),
        warning_count: budgets.iter().filter(|b| b.status == BudgetStatus::Warning).count(),
    }
}

/// Budget totals for one month.
pub async fn monthly_summary<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    month: u32,
    year: i32,
) -> Result<MonthlyBudgetSummary> {
    if !(1..=12).contains(&month) {
        return Err(ComputeError::Period(format!("month {} is not between 1 and 12", month)));
    }
    let budgets = budgets_with_progress(
        db,
        user_id,
        BudgetFilter {
            month: Some(month),
            year: Some(year),
            category_id: None,
        },
    )
    .await?;
    Ok(summarize(month, year, &budgets))
}

/// One budget with its progress and the latest expenses of its period.
pub struct BudgetDetail {
    pub progress: BudgetProgress,
    pub recent_expenses: Vec<expense::Model>,
}

pub async fn budget_detail<C: ConnectionTrait>(db: &C, user_id: i32, budget_id: i32) -> Result<BudgetDetail> {
    let budget = budget::find_for_user(db, user_id, budget_id).await?;
    let category = category::Entity::find_by_id(budget.category_id).one(db).await?;
    let spent = budget.spent_amount(db).await?;

    let recent_expenses = expense::for_user(
        user_id,
        ExpenseFilter {
            month: Some(budget.month as u32),
            year: Some(budget.year),
            category_id: Some(budget.category_id),
        },
    )
    .limit(DETAIL_RECENT_EXPENSES)
    .all(db)
    .await?;

    Ok(BudgetDetail {
        progress: progress(&budget, category.as_ref(), spent),
        recent_expenses,
    })
}
