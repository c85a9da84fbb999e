//! The dashboard: the month's balance, budgets, savings, latest activity
//! and where the money went.

use chrono::{Datelike, NaiveDate};
use common::{
    format_currency, month_date_range_exclusive, month_name, percentage_1dp, previous_month, BalanceSummary,
    BudgetOverview, BudgetStatus, CategoryShare, Dashboard, RecentTransaction, SavingsOverview, TransactionKind,
};
use model::entities::budget::BudgetFilter;
use model::entities::category;
use model::entities::expense::{self, ExpenseFilter};
use model::entities::income::{self, IncomeFilter};
use model::entities::saving::{self, SavingStatus};
use rust_decimal::Decimal;
use sea_orm::{ConnectionTrait, QuerySelect};
use tracing::{debug, info, instrument};

use crate::budgets::budgets_with_progress;
use crate::error::Result;
use crate::savings::saving_progress;

/// Rows in the merged expense/income feed.
pub const RECENT_TRANSACTIONS: usize = 8;
/// Categories shown in the expense distribution.
pub const DISTRIBUTION_CATEGORIES: usize = 6;
/// Budgets and savings highlighted on the dashboard.
pub const TOP_ITEMS: usize = 3;

const FALLBACK_COLOR: &str = "#6c757d";

/// Builds [`Dashboard`] payloads for a fixed "today".
#[derive(Debug, Clone)]
pub struct DashboardCalculator {
    today: NaiveDate,
    recent_limit: usize,
    distribution_limit: usize,
}

impl DashboardCalculator {
    pub fn new_with_today(today: NaiveDate) -> Self {
        Self {
            today,
            recent_limit: RECENT_TRANSACTIONS,
            distribution_limit: DISTRIBUTION_CATEGORIES,
        }
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    pub fn with_distribution_limit(mut self, limit: usize) -> Self {
        self.distribution_limit = limit;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    #[instrument(skip(self, db), fields(today = %self.today))]
    pub async fn compute<C: ConnectionTrait>(&self, db: &C, user_id: i32) -> Result<Dashboard> {
        let month = self.today.month();
        let year = self.today.year();

        let dashboard = Dashboard {
            today: self.today,
            balance: self.balance(db, user_id, month, year).await?,
            budgets: self.budgets(db, user_id, month, year).await?,
            savings: self.savings(db, user_id, month, year).await?,
            recent_transactions: self.recent_transactions(db, user_id).await?,
            expense_distribution: self.expense_distribution(db, user_id, month, year).await?,
        };
        info!("Computed dashboard for user {}", user_id);
        Ok(dashboard)
    }

    async fn balance<C: ConnectionTrait>(&self, db: &C, user_id: i32, month: u32, year: i32) -> Result<BalanceSummary> {
        let (prev_month, prev_year) = previous_month(month, year);

        let expense_total = expense::monthly_total(db, user_id, month, year).await?;
        let prev_expense_total = expense::monthly_total(db, user_id, prev_month, prev_year).await?;
        let income_total = income::monthly_total(db, user_id, month, year).await?;
        let prev_income_total = income::monthly_total(db, user_id, prev_month, prev_year).await?;

        let balance = income_total - expense_total;
        Ok(BalanceSummary {
            month,
            year,
            month_name: month_name(month).to_string(),
            previous_month_name: month_name(prev_month).to_string(),
            income_total,
            expense_total,
            balance,
            balance_is_positive: balance >= Decimal::ZERO,
            expense_percentage: percentage_1dp(expense_total, income_total),
            expense_variation: variation(expense_total, prev_expense_total),
            income_variation: variation(income_total, prev_income_total),
        })
    }

    async fn budgets<C: ConnectionTrait>(&self, db: &C, user_id: i32, month: u32, year: i32) -> Result<BudgetOverview> {
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

        let over_count = budgets.iter().filter(|b| b.status == BudgetStatus::Over).count();
        let warning_count = budgets.iter().filter(|b| b.status == BudgetStatus::Warning).count();
        let total_budgeted: Decimal = budgets.iter().map(|b| b.amount).sum();
        let total_spent: Decimal = budgets.iter().map(|b| b.spent).sum();

        let mut top_budgets: Vec<_> = budgets.iter().filter(|b| b.spent > Decimal::ZERO).cloned().collect();
        top_budgets.sort_by(|a, b| b.percentage.cmp(&a.percentage));
        top_budgets.truncate(TOP_ITEMS);

        Ok(BudgetOverview {
            budget_count: budgets.len(),
            over_count,
            warning_count,
            ok_count: budgets.len() - over_count - warning_count,
            total_budgeted,
            total_spent,
            overall_percentage: percentage_1dp(total_spent, total_budgeted),
            top_budgets,
        })
    }

    async fn savings<C: ConnectionTrait>(&self, db: &C, user_id: i32, month: u32, year: i32) -> Result<SavingsOverview> {
        let active = saving::for_user(user_id, Some(SavingStatus::Active)).all(db).await?;
        let completed = saving::for_user(user_id, Some(SavingStatus::Completed)).all(db).await?;

        let completed_this_month = match month_date_range_exclusive(month, year) {
            Some((start, end)) => completed
                .iter()
                .filter(|s| {
                    let updated = s.updated_at.date_naive();
                    updated >= start && updated < end
                })
                .count(),
            None => 0,
        };

        let summary = crate::savings::summarize(&active, completed.len());
        let mut top_savings: Vec<_> = active.iter().map(saving_progress).collect();
        top_savings.sort_by(|a, b| b.progress.cmp(&a.progress));
        top_savings.truncate(TOP_ITEMS);

        Ok(SavingsOverview {
            active_count: summary.active_count,
            total_target: summary.total_target,
            total_current: summary.total_current,
            overall_progress: summary.overall_progress,
            completed_this_month,
            top_savings,
        })
    }

    async fn recent_transactions<C: ConnectionTrait>(&self, db: &C, user_id: i32) -> Result<Vec<RecentTransaction>> {
        let limit = self.recent_limit as u64;
        let expenses = expense::for_user(user_id, ExpenseFilter::default())
            .limit(limit)
            .find_also_related(category::Entity)
            .all(db)
            .await?;
        let incomes = income::for_user(user_id, IncomeFilter::default())
            .limit(limit)
            .find_also_related(category::Entity)
            .all(db)
            .await?;

        let mut feed: Vec<RecentTransaction> = expenses
            .into_iter()
            .map(|(e, c)| RecentTransaction {
                kind: TransactionKind::Expense,
                id: e.id,
                date: e.date,
                created_at: e.created_at,
                formatted_amount: format_currency(e.amount, e.currency.code()),
                description: e.description,
                amount_ars: e.amount_ars,
                category_name: c.as_ref().map(|c| c.name.clone()).unwrap_or_default(),
                category_icon: c.as_ref().map(|c| c.icon.clone()).unwrap_or_default(),
                category_color: c.map(|c| c.color).unwrap_or_else(|| FALLBACK_COLOR.to_string()),
            })
            .chain(incomes.into_iter().map(|(i, c)| RecentTransaction {
                kind: TransactionKind::Income,
                id: i.id,
                date: i.date,
                created_at: i.created_at,
                formatted_amount: format_currency(i.amount, i.currency.code()),
                description: i.description,
                amount_ars: i.amount_ars,
                category_name: c.as_ref().map(|c| c.name.clone()).unwrap_or_default(),
                category_icon: c.as_ref().map(|c| c.icon.clone()).unwrap_or_default(),
                category_color: c.map(|c| c.color).unwrap_or_else(|| FALLBACK_COLOR.to_string()),
            }))
            .collect();

        feed.sort_by(|a, b| (b.date, b.created_at).cmp(&(a.date, a.created_at)));
        feed.truncate(self.recent_limit);
        debug!("Recent feed has {} rows", feed.len());
        Ok(feed)
    }

    async fn expense_distribution<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: i32,
        month: u32,
        year: i32,
    ) -> Result<Vec<CategoryShare>> {
        let totals = expense::totals_by_category(db, user_id, month, year).await?;
        Ok(totals
            .into_iter()
            .take(self.distribution_limit)
            .map(|t| CategoryShare {
                category_id: t.category_id,
                name: t.name,
                icon: t.icon,
                color: if t.color.is_empty() { FALLBACK_COLOR.to_string() } else { t.color },
                total: t.total,
            })
            .collect())
    }
}

/// Percentage change from `previous` to `current`, zero without a baseline.
fn variation(current: Decimal, previous: Decimal) -> Decimal {
    if previous <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    percentage_1dp(current - previous, previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{budget_input, create_user, date, expense_input, income_input, setup_db, system_category};
    use model::currency::Currency;
    use model::entities::{budget, saving::SavingInput};

    #[test]
    fn test_variation() {
        assert_eq!(variation(Decimal::new(150, 0), Decimal::new(100, 0)), Decimal::new(50, 0));
        assert_eq!(variation(Decimal::new(50, 0), Decimal::new(100, 0)), Decimal::new(-50, 0));
        assert_eq!(variation(Decimal::new(50, 0), Decimal::ZERO), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_dashboard() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let other = create_user(&db, "bob").await;
        let food = system_category(&db, "Alimentación").await;
        let transport = system_category(&db, "Transporte").await;
        let salary = system_category(&db, "Sueldo").await;
        let today = date(2025, 3, 20);

        income::create(&db, user.id, income_input(salary.id, Decimal::new(100000, 0), date(2025, 3, 1))).await.unwrap();
        income::create(&db, user.id, income_input(salary.id, Decimal::new(80000, 0), date(2025, 2, 1))).await.unwrap();
        expense::create(&db, user.id, expense_input(food.id, Decimal::new(30000, 0), date(2025, 3, 5))).await.unwrap();
        expense::create(&db, user.id, expense_input(transport.id, Decimal::new(10000, 0), date(2025, 3, 6))).await.unwrap();
        expense::create(&db, user.id, expense_input(food.id, Decimal::new(20000, 0), date(2025, 2, 10))).await.unwrap();
        expense::create(&db, other.id, expense_input(food.id, Decimal::new(99999, 0), date(2025, 3, 5))).await.unwrap();

        budget::create(&db, user.id, budget_input(food.id, 3, 2025, 25000)).await.unwrap();
        budget::create(&db, user.id, budget_input(transport.id, 3, 2025, 40000)).await.unwrap();

        let goal = saving::create(
            &db,
            user.id,
            SavingInput {
                name: "Vacaciones".to_string(),
                description: String::new(),
                target_amount: Decimal::new(1000, 0),
                currency: Currency::Ars,
                target_date: None,
                status: None,
                icon: None,
                color: None,
            },
        )
        .await
        .unwrap();
        goal.add_deposit(&db, Decimal::new(250, 0), "").await.unwrap();

        let dashboard = DashboardCalculator::new_with_today(today).compute(&db, user.id).await.unwrap();

        let balance = &dashboard.balance;
        assert_eq!(balance.month_name, "Marzo");
        assert_eq!(balance.previous_month_name, "Febrero");
        assert_eq!(balance.income_total, Decimal::new(100000, 0));
        assert_eq!(balance.expense_total, Decimal::new(40000, 0));
        assert_eq!(balance.balance, Decimal::new(60000, 0));
        assert!(balance.balance_is_positive);
        assert_eq!(balance.expense_percentage, Decimal::new(40, 0));
        assert_eq!(balance.expense_variation, Decimal::new(100, 0));
        assert_eq!(balance.income_variation, Decimal::new(25, 0));

        let budgets = &dashboard.budgets;
        assert_eq!(budgets.budget_count, 2);
        assert_eq!(budgets.over_count, 1);
        assert_eq!(budgets.ok_count, 1);
        assert_eq!(budgets.top_budgets[0].category_id, food.id);

        assert_eq!(dashboard.savings.active_count, 1);
        assert_eq!(dashboard.savings.overall_progress, Decimal::new(25, 0));

        // Two incomes and three expenses of the user, newest first
        let feed = &dashboard.recent_transactions;
        assert_eq!(feed.len(), 5);
        assert_eq!(feed[0].kind, TransactionKind::Expense);
        assert_eq!(feed[0].date, date(2025, 3, 6));
        assert_eq!(feed[0].formatted_amount, "$ 10.000,00");
        assert_eq!(feed[4].date, date(2025, 2, 1));

        let distribution = &dashboard.expense_distribution;
        assert_eq!(distribution.len(), 2);
        assert_eq!(distribution[0].name, "Alimentación");
        assert_eq!(distribution[0].total, Decimal::new(30000, 0));
    }

    #[tokio::test]
    async fn test_recent_feed_respects_limit() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let food = system_category(&db, "Alimentación").await;
        for day in 1..=10 {
            expense::create(&db, user.id, expense_input(food.id, Decimal::new(10, 0), date(2025, 3, day))).await.unwrap();
        }

        let dashboard = crate::default_dashboard(Some(date(2025, 3, 20))).compute(&db, user.id).await.unwrap();
        assert_eq!(dashboard.recent_transactions.len(), RECENT_TRANSACTIONS);
        assert_eq!(dashboard.recent_transactions[0].date, date(2025, 3, 10));
    }
}
