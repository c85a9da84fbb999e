use chrono::Utc;
use common::{month_name, previous_month};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{QueryOrder, Set, TransactionTrait};
use tracing::{debug, info, instrument};

use super::category::{self, CategoryType};
use super::expense::{self, ExpenseFilter};
use super::user::DEFAULT_ALERT_THRESHOLD;
use crate::active_value;
use crate::currency;
use crate::error::{ModelError, Result};
use crate::soft_delete::SoftDelete;

pub const MIN_YEAR: i32 = 2020;
pub const MAX_YEAR: i32 = 2100;

/// Monthly spending limit for one expense category.
///
/// Spent, remaining and percentage are not stored; they derive from the
/// active expenses of the same user, category, month and year.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub category_id: i32,
    pub month: i32,
    pub year: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    pub alert_threshold: i32,
    pub notes: String,
    pub is_active: bool,
    pub deleted_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Restrict"
    )]
    Category,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            alert_threshold: Set(DEFAULT_ALERT_THRESHOLD),
            notes: Set(String::new()),
            is_active: Set(true),
            ..ActiveModelTrait::default()
        }
    }

    async fn before_save<C>(mut self, _db: &C, insert: bool) -> std::result::Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();
        if insert && active_value(&self.created_at).is_none() {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}

impl Model {
    /// Sum of the active expenses this budget covers, in ARS.
    pub async fn spent_amount<C: ConnectionTrait>(&self, db: &C) -> Result<Decimal> {
        let expenses = expense::for_user(
            self.user_id,
            ExpenseFilter {
                month: Some(self.month as u32),
                year: Some(self.year),
                category_id: Some(self.category_id),
            },
        )
        .all(db)
        .await?;
        Ok(expenses.iter().map(|e| e.amount_ars).sum::<Decimal>().round_dp(2))
    }

    /// Budget minus spending; negative once the budget is exceeded.
    pub fn remaining_amount(&self, spent: Decimal) -> Decimal {
        self.amount - spent
    }

    /// Share of the budget already spent, one decimal.
    pub fn spent_percentage(&self, spent: Decimal) -> Decimal {
        if self.amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (spent / self.amount * Decimal::ONE_HUNDRED).round_dp(1)
    }

    pub fn is_over_budget(&self, spent: Decimal) -> bool {
        spent > self.amount
    }

    /// Reached the alert threshold without going over.
    pub fn is_near_limit(&self, spent: Decimal) -> bool {
        !self.is_over_budget(spent) && self.spent_percentage(spent) >= Decimal::from(self.alert_threshold)
    }

    /// "Marzo 2025" style label of the budget period.
    pub fn period_label(&self) -> String {
        format!("{} {}", month_name(self.month as u32), self.year)
    }
}

#[derive(Debug, Clone)]
pub struct BudgetInput {
    pub category_id: i32,
    pub month: u32,
    pub year: i32,
    pub amount: Decimal,
    pub alert_threshold: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub category_id: Option<i32>,
}

fn validate_period(month: u32, year: i32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(ModelError::validation("month", "Month must be between 1 and 12"));
    }
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(ModelError::validation(
            "year",
            format!("Year must be between {} and {}", MIN_YEAR, MAX_YEAR),
        ));
    }
    Ok(())
}

async fn validate_input<C: ConnectionTrait>(db: &C, user_id: i32, input: &BudgetInput) -> Result<()> {
    validate_period(input.month, input.year)?;
    currency::ensure_positive("amount", input.amount)?;
    if let Some(threshold) = input.alert_threshold {
        if !(1..=100).contains(&threshold) {
            return Err(ModelError::validation("alert_threshold", "Alert threshold must be between 1 and 100"));
        }
    }
    category::find_available_of_type(db, user_id, input.category_id, CategoryType::Expense).await?;
    Ok(())
}

/// Any row, deleted or not, for the user's budget period.
async fn find_period<C: ConnectionTrait>(db: &C, user_id: i32, category_id: i32, month: u32, year: i32) -> Result<Option<Model>> {
    Ok(Entity::find_all_with_deleted()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::CategoryId.eq(category_id))
        .filter(Column::Month.eq(month as i32))
        .filter(Column::Year.eq(year))
        .one(db)
        .await?)
}

/// Creates a budget. A soft-deleted budget for the same period is revived
/// with the new values, since the period is unique per user and category.
#[instrument(skip(db, input), fields(category_id = input.category_id, month = input.month, year = input.year))]
pub async fn create<C: ConnectionTrait>(db: &C, user_id: i32, input: BudgetInput) -> Result<Model> {
    validate_input(db, user_id, &input).await?;

    let budget = match find_period(db, user_id, input.category_id, input.month, input.year).await? {
        Some(existing) if existing.is_active => {
            return Err(ModelError::Conflict(format!(
                "A budget for this category already exists for {}",
                existing.period_label()
            )));
        }
        Some(deleted) => {
            debug!("Reviving soft-deleted budget {}", deleted.id);
            let mut active: ActiveModel = deleted.into();
            active.amount = Set(input.amount);
            active.alert_threshold = Set(input.alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD));
            active.notes = Set(input.notes.unwrap_or_default());
            active.is_active = Set(true);
            active.deleted_at = Set(None);
            active.update(db).await?
        }
        None => {
            ActiveModel {
                user_id: Set(user_id),
                category_id: Set(input.category_id),
                month: Set(input.month as i32),
                year: Set(input.year),
                amount: Set(input.amount),
                alert_threshold: Set(input.alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD)),
                notes: Set(input.notes.unwrap_or_default()),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };
    info!("Created budget {} for user {}", budget.id, user_id);
    Ok(budget)
}

/// Updates a budget. Moving it onto a period held by a soft-deleted budget
/// revives that row with the new values and soft-deletes the edited one, so
/// deleted rows stay in the table.
#[instrument(skip(db, input), fields(category_id = input.category_id, month = input.month, year = input.year))]
pub async fn update<D: TransactionTrait>(db: &D, user_id: i32, budget_id: i32, input: BudgetInput) -> Result<Model> {
    let txn = db.begin().await?;
    let budget = find_for_user(&txn, user_id, budget_id).await?;
    validate_input(&txn, user_id, &input).await?;

    let target = match find_period(&txn, user_id, input.category_id, input.month, input.year).await? {
        Some(other) if other.id != budget.id => {
            if other.is_active {
                return Err(ModelError::Conflict(format!(
                    "A budget for this category already exists for {}",
                    other.period_label()
                )));
            }
            debug!("Moving budget {} onto soft-deleted budget {}", budget.id, other.id);
            Entity::soft_delete_by_id(budget.id).exec(&txn).await?;
            let mut revived: ActiveModel = other.into();
            revived.alert_threshold = Set(budget.alert_threshold);
            revived.notes = Set(budget.notes);
            revived.is_active = Set(true);
            revived.deleted_at = Set(None);
            revived
        }
        _ => budget.into(),
    };

    let mut active = target;
    active.category_id = Set(input.category_id);
    active.month = Set(input.month as i32);
    active.year = Set(input.year);
    active.amount = Set(input.amount);
    if let Some(threshold) = input.alert_threshold {
        active.alert_threshold = Set(threshold);
    }
    if let Some(notes) = input.notes {
        active.notes = Set(notes);
    }
    let updated = active.update(&txn).await?;
    txn.commit().await?;
    info!("Updated budget {} for user {}", updated.id, user_id);
    Ok(updated)
}

pub async fn soft_delete<C: ConnectionTrait>(db: &C, user_id: i32, budget_id: i32) -> Result<()> {
    let budget = find_for_user(db, user_id, budget_id).await?;
    Entity::soft_delete_by_id(budget.id).exec(db).await?;
    info!("Soft deleted budget {} of user {}", budget.id, user_id);
    Ok(())
}

pub async fn find_for_user<C: ConnectionTrait>(db: &C, user_id: i32, budget_id: i32) -> Result<Model> {
    Entity::find_active()
        .filter(Column::Id.eq(budget_id))
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| ModelError::NotFound(format!("Budget {}", budget_id)))
}

/// Active budgets of a user, newest period first.
pub fn for_user(user_id: i32, filter: BudgetFilter) -> Select<Entity> {
    let mut query = Entity::find_active().filter(Column::UserId.eq(user_id));
    if let Some(month) = filter.month {
        query = query.filter(Column::Month.eq(month as i32));
    }
    if let Some(year) = filter.year {
        query = query.filter(Column::Year.eq(year));
    }
    if let Some(category_id) = filter.category_id {
        query = query.filter(Column::CategoryId.eq(category_id));
    }
    query
        .order_by_desc(Column::Year)
        .order_by_desc(Column::Month)
        .order_by_asc(Column::CategoryId)
}

/// Copies last month's budgets into the target month.
///
/// Categories that already have a budget in the target month are skipped.
/// Returns the budgets created.
#[instrument(skip(db))]
pub async fn copy_from_previous_month<D: TransactionTrait>(
    db: &D,
    user_id: i32,
    target_month: u32,
    target_year: i32,
) -> Result<Vec<Model>> {
    validate_period(target_month, target_year)?;
    let (source_month, source_year) = previous_month(target_month, target_year);

    let txn = db.begin().await?;
    let source = for_user(
        user_id,
        BudgetFilter {
            month: Some(source_month),
            year: Some(source_year),
            category_id: None,
        },
    )
    .all(&txn)
    .await?;

    let notes = format!("Copiado de {} {}", month_name(source_month), source_year);
    let mut created = Vec::new();
    for budget in source {
        let existing = find_period(&txn, user_id, budget.category_id, target_month, target_year).await?;
        let copied = match existing {
            Some(current) if current.is_active => {
                debug!("Budget for category {} already present, skipping", budget.category_id);
                continue;
            }
            Some(deleted) => {
                let mut active: ActiveModel = deleted.into();
                active.amount = Set(budget.amount);
                active.alert_threshold = Set(budget.alert_threshold);
                active.notes = Set(notes.clone());
                active.is_active = Set(true);
                active.deleted_at = Set(None);
                active.update(&txn).await?
            }
            None => {
                ActiveModel {
                    user_id: Set(user_id),
                    category_id: Set(budget.category_id),
                    month: Set(target_month as i32),
                    year: Set(target_year),
                    amount: Set(budget.amount),
                    alert_threshold: Set(budget.alert_threshold),
                    notes: Set(notes.clone()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };
        created.push(copied);
    }
    txn.commit().await?;

    info!(
        "Copied {} budgets from {}/{} to {}/{} for user {}",
        created.len(),
        source_month,
        source_year,
        target_month,
        target_year,
        user_id
    );
    Ok(created)
}
