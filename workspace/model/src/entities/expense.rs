use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, QueryOrder, Set, TransactionTrait};
use tracing::{debug, info, instrument};

use super::category::{self, CategoryType};
use crate::active_value;
use crate::currency::{self, Currency};
use crate::error::{ModelError, Result};
use crate::soft_delete::SoftDelete;
use crate::sync;

pub const MAX_DESCRIPTION_LENGTH: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "CASH")]
    Cash,
    #[sea_orm(string_value = "DEBIT")]
    Debit,
    #[sea_orm(string_value = "CREDIT")]
    Credit,
    #[sea_orm(string_value = "TRANSFER")]
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Debit => "DEBIT",
            PaymentMethod::Credit => "CREDIT",
            PaymentMethod::Transfer => "TRANSFER",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_uppercase().as_str() {
            "CASH" => Ok(PaymentMethod::Cash),
            "DEBIT" => Ok(PaymentMethod::Debit),
            "CREDIT" => Ok(PaymentMethod::Credit),
            "TRANSFER" => Ok(PaymentMethod::Transfer),
            other => Err(ModelError::validation(
                "payment_method",
                format!("Unknown payment method '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum ExpenseType {
    #[sea_orm(string_value = "FIXED")]
    Fixed,
    #[sea_orm(string_value = "VARIABLE")]
    Variable,
}

impl ExpenseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseType::Fixed => "FIXED",
            ExpenseType::Variable => "VARIABLE",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_uppercase().as_str() {
            "FIXED" => Ok(ExpenseType::Fixed),
            "VARIABLE" => Ok(ExpenseType::Variable),
            other => Err(ModelError::validation(
                "expense_type",
                format!("Unknown expense type '{}'", other),
            )),
        }
    }
}

/// A spending record. `amount_ars` is recomputed on every save.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub category_id: i32,
    /// Saving goal this expense feeds, see [`crate::sync`].
    pub saving_id: Option<i32>,
    pub date: NaiveDate,
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    pub currency: Currency,
    #[sea_orm(column_type = "Decimal(Some((10, 4)))")]
    pub exchange_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub amount_ars: Decimal,
    pub payment_method: Option<PaymentMethod>,
    pub expense_type: Option<ExpenseType>,
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
    #[sea_orm(
        belongs_to = "super::saving::Entity",
        from = "Column::SavingId",
        to = "super::saving::Column::Id",
        on_delete = "SetNull"
    )]
    Saving,
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
            currency: Set(Currency::Ars),
            exchange_rate: Set(currency::DEFAULT_EXCHANGE_RATE),
            is_active: Set(true),
            ..ActiveModelTrait::default()
        }
    }

    async fn before_save<C>(mut self, _db: &C, insert: bool) -> std::result::Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        normalize_active(&mut self.amount, &self.currency, &mut self.exchange_rate, &mut self.amount_ars)?;
        let now = Utc::now();
        if insert && active_value(&self.created_at).is_none() {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}

/// Recomputes exchange rate and ARS amount on an active model being saved.
pub(crate) fn normalize_active(
    amount: &mut ActiveValue<Decimal>,
    currency: &ActiveValue<Currency>,
    exchange_rate: &mut ActiveValue<Decimal>,
    amount_ars: &mut ActiveValue<Decimal>,
) -> std::result::Result<(), DbErr> {
    let (Some(value), Some(currency)) = (active_value(amount), active_value(currency)) else {
        return Ok(());
    };
    if value <= Decimal::ZERO {
        return Err(DbErr::Custom("amount must be greater than zero".to_string()));
    }
    let normalized = currency::normalize(value, currency, active_value(exchange_rate))
        .map_err(|err| DbErr::Custom(err.to_string()))?;
    *exchange_rate = Set(normalized.exchange_rate);
    *amount_ars = Set(normalized.amount_ars);
    // Keep the amount column in the set so the row is written consistently
    *amount = Set(value);
    Ok(())
}

/// Values accepted when recording or editing an expense.
#[derive(Debug, Clone)]
pub struct ExpenseInput {
    pub date: NaiveDate,
    pub category_id: i32,
    pub description: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub exchange_rate: Option<Decimal>,
    pub payment_method: Option<PaymentMethod>,
    pub expense_type: Option<ExpenseType>,
    pub saving_id: Option<i32>,
}

/// List filters. Month only applies together with a year.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpenseFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub category_id: Option<i32>,
}

/// Per-category spending for a month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    pub category_id: i32,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub total: Decimal,
}

async fn validate_input<C: ConnectionTrait>(db: &C, user_id: i32, input: &ExpenseInput) -> Result<(String, currency::Normalized)> {
    currency::ensure_positive("amount", input.amount)?;
    let description = input.description.trim();
    if description.is_empty() {
        return Err(ModelError::validation("description", "Description is required"));
    }
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ModelError::validation(
            "description",
            format!("Description cannot exceed {} characters", MAX_DESCRIPTION_LENGTH),
        ));
    }
    category::find_available_of_type(db, user_id, input.category_id, CategoryType::Expense).await?;
    let normalized = currency::normalize(input.amount, input.currency, input.exchange_rate)?;
    Ok((description.to_string(), normalized))
}

fn apply_input(active: &mut ActiveModel, description: String, normalized: currency::Normalized, input: &ExpenseInput) {
    active.date = Set(input.date);
    active.category_id = Set(input.category_id);
    active.description = Set(description);
    active.amount = Set(input.amount);
    active.currency = Set(input.currency);
    active.exchange_rate = Set(normalized.exchange_rate);
    active.amount_ars = Set(normalized.amount_ars);
    active.payment_method = Set(input.payment_method);
    active.expense_type = Set(input.expense_type);
    active.saving_id = Set(input.saving_id);
}

/// Records an expense and mirrors it on the linked saving, atomically.
#[instrument(skip(db, input), fields(category_id = input.category_id, amount = %input.amount))]
pub async fn create<D: TransactionTrait>(db: &D, user_id: i32, input: ExpenseInput) -> Result<Model> {
    let txn = db.begin().await?;

    let (description, normalized) = validate_input(&txn, user_id, &input).await?;
    let mut active = <ActiveModel as ActiveModelBehavior>::new();
    active.user_id = Set(user_id);
    apply_input(&mut active, description, normalized, &input);
    let expense = active.insert(&txn).await?;

    sync::sync_expense(&txn, None, Some(&expense)).await?;
    txn.commit().await?;

    info!("Created expense {} for user {}", expense.id, user_id);
    Ok(expense)
}

#[instrument(skip(db, input))]
pub async fn update<D: TransactionTrait>(db: &D, user_id: i32, expense_id: i32, input: ExpenseInput) -> Result<Model> {
    let txn = db.begin().await?;

    let previous = find_for_user(&txn, user_id, expense_id).await?;
    let (description, normalized) = validate_input(&txn, user_id, &input).await?;
    let mut active: ActiveModel = previous.clone().into();
    apply_input(&mut active, description, normalized, &input);
    let expense = active.update(&txn).await?;

    sync::sync_expense(&txn, Some(&previous), Some(&expense)).await?;
    txn.commit().await?;

    info!("Updated expense {} of user {}", expense.id, user_id);
    Ok(expense)
}

/// Hides the expense and takes back what it put into its saving.
#[instrument(skip(db))]
pub async fn soft_delete<D: TransactionTrait>(db: &D, user_id: i32, expense_id: i32) -> Result<()> {
    let txn = db.begin().await?;

    let expense = find_for_user(&txn, user_id, expense_id).await?;
    Entity::soft_delete_by_id(expense.id).exec(&txn).await?;
    sync::sync_expense(&txn, Some(&expense), None).await?;
    txn.commit().await?;

    info!("Soft deleted expense {} of user {}", expense_id, user_id);
    Ok(())
}

pub async fn find_for_user<C: ConnectionTrait>(db: &C, user_id: i32, expense_id: i32) -> Result<Model> {
    Entity::find_active()
        .filter(Column::Id.eq(expense_id))
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| ModelError::NotFound(format!("Expense {}", expense_id)))
}

/// Active expenses of a user, newest first, narrowed by the filter.
pub fn for_user(user_id: i32, filter: ExpenseFilter) -> Select<Entity> {
    let mut query = Entity::find_active().filter(Column::UserId.eq(user_id));

    match (filter.month, filter.year) {
        (Some(month), Some(year)) => {
            if let Some((first, last)) = common::month_date_range(month, year) {
                query = query.filter(Column::Date.between(first, last));
            }
        }
        (_, Some(year)) => {
            if let (Some(first), Some(last)) = (NaiveDate::from_ymd_opt(year, 1, 1), NaiveDate::from_ymd_opt(year, 12, 31)) {
                query = query.filter(Column::Date.between(first, last));
            }
        }
        _ => {}
    }
    if let Some(category_id) = filter.category_id {
        query = query.filter(Column::CategoryId.eq(category_id));
    }

    query
        .order_by_desc(Column::Date)
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
}

/// Sum of `amount_ars` for the user's active expenses in a month.
pub async fn monthly_total<C: ConnectionTrait>(db: &C, user_id: i32, month: u32, year: i32) -> Result<Decimal> {
    let expenses = for_user(
        user_id,
        ExpenseFilter {
            month: Some(month),
            year: Some(year),
            category_id: None,
        },
    )
    .all(db)
    .await?;
    Ok(expenses.iter().map(|e| e.amount_ars).sum::<Decimal>().round_dp(2))
}

/// Totals per category for a month, largest first.
pub async fn totals_by_category<C: ConnectionTrait>(db: &C, user_id: i32, month: u32, year: i32) -> Result<Vec<CategoryTotal>> {
    let rows = for_user(
        user_id,
        ExpenseFilter {
            month: Some(month),
            year: Some(year),
            category_id: None,
        },
    )
    .find_also_related(category::Entity)
    .all(db)
    .await?;

    let mut grouped: HashMap<i32, CategoryTotal> = HashMap::new();
    for (expense, category) in rows {
        let Some(category) = category else {
            continue;
        };
        grouped
            .entry(category.id)
            .or_insert_with(|| CategoryTotal {
                category_id: category.id,
                name: category.name.clone(),
                icon: category.icon.clone(),
                color: category.color.clone(),
                total: Decimal::ZERO,
            })
            .total += expense.amount_ars;
    }

    let mut totals: Vec<CategoryTotal> = grouped.into_values().collect();
    for total in totals.iter_mut() {
        total.total = total.total.round_dp(2);
    }
    totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    debug!("Computed {} category totals for user {}", totals.len(), user_id);
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::saving::{self, SavingStatus};
    use crate::entities::saving_movement::{self, MovementType};
    use crate::entities::testing::{create_user, date, expense_input, saving_input, setup_db, system_category};

    #[tokio::test]
    async fn test_create_normalizes_usd_amount() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let food = system_category(&db, "Alimentación").await;

        let mut input = expense_input(food.id, Decimal::new(50, 0), date(2025, 3, 10));
        input.currency = Currency::Usd;
        input.exchange_rate = Some(Decimal::new(1000, 0));
        let expense = create(&db, user.id, input).await.unwrap();

        assert_eq!(expense.exchange_rate, Decimal::new(1000, 0));
        assert_eq!(expense.amount_ars, Decimal::new(50000, 0));
    }

    #[tokio::test]
    async fn test_ars_ignores_supplied_rate() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let food = system_category(&db, "Alimentación").await;

        let mut input = expense_input(food.id, Decimal::new(1500, 0), date(2025, 3, 10));
        input.exchange_rate = Some(Decimal::new(999, 0));
        let expense = create(&db, user.id, input).await.unwrap();

        assert_eq!(expense.exchange_rate, Decimal::ONE);
        assert_eq!(expense.amount_ars, Decimal::new(1500, 0));
    }

    #[tokio::test]
    async fn test_income_category_rejected() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let salary = system_category(&db, "Sueldo").await;

        let result = create(&db, user.id, expense_input(salary.id, Decimal::new(10, 0), date(2025, 3, 10))).await;
        assert!(matches!(result, Err(ModelError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_monthly_total_and_category_breakdown() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let other = create_user(&db, "beto").await;
        let food = system_category(&db, "Alimentación").await;
        let transport = system_category(&db, "Transporte").await;

        create(&db, user.id, expense_input(food.id, Decimal::new(1000, 0), date(2025, 3, 1))).await.unwrap();
        create(&db, user.id, expense_input(food.id, Decimal::new(500, 0), date(2025, 3, 31))).await.unwrap();
        create(&db, user.id, expense_input(transport.id, Decimal::new(2000, 0), date(2025, 3, 15))).await.unwrap();
        create(&db, user.id, expense_input(food.id, Decimal::new(700, 0), date(2025, 4, 1))).await.unwrap();
        create(&db, other.id, expense_input(food.id, Decimal::new(9999, 0), date(2025, 3, 5))).await.unwrap();
        let removed = create(&db, user.id, expense_input(food.id, Decimal::new(300, 0), date(2025, 3, 5))).await.unwrap();
        soft_delete(&db, user.id, removed.id).await.unwrap();

        assert_eq!(monthly_total(&db, user.id, 3, 2025).await.unwrap(), Decimal::new(3500, 0));

        let totals = totals_by_category(&db, user.id, 3, 2025).await.unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].name, "Transporte");
        assert_eq!(totals[0].total, Decimal::new(2000, 0));
        assert_eq!(totals[1].name, "Alimentación");
        assert_eq!(totals[1].total, Decimal::new(1500, 0));
        assert_eq!(totals[1].color, "#28a745");
    }

    #[tokio::test]
    async fn test_listing_is_newest_first_and_scoped() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let food = system_category(&db, "Alimentación").await;

        create(&db, user.id, expense_input(food.id, Decimal::new(1, 0), date(2025, 1, 5))).await.unwrap();
        create(&db, user.id, expense_input(food.id, Decimal::new(2, 0), date(2025, 2, 5))).await.unwrap();

        let all = for_user(user.id, ExpenseFilter::default()).all(&db).await.unwrap();
        assert_eq!(all[0].date, date(2025, 2, 5));

        let january = for_user(
            user.id,
            ExpenseFilter {
                month: Some(1),
                year: Some(2025),
                category_id: None,
            },
        )
        .all(&db)
        .await
        .unwrap();
        assert_eq!(january.len(), 1);

        let other = create_user(&db, "beto").await;
        assert!(matches!(
            find_for_user(&db, other.id, all[0].id).await,
            Err(ModelError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_linked_expense_deposits_into_saving() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let food = system_category(&db, "Alimentación").await;
        let goal = saving::create(&db, user.id, saving_input("Viaje", Decimal::new(10000, 0))).await.unwrap();

        let mut input = expense_input(food.id, Decimal::new(1500, 0), date(2025, 3, 10));
        input.saving_id = Some(goal.id);
        let expense = create(&db, user.id, input).await.unwrap();

        let goal = saving::find_for_user(&db, user.id, goal.id).await.unwrap();
        assert_eq!(goal.current_amount, Decimal::new(1500, 0));

        let movements = saving_movement::for_saving(goal.id).all(&db).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Deposit);
        assert_eq!(movements[0].expense_id, Some(expense.id));
        assert_eq!(movements[0].description, "Gasto: Supermercado");
    }

    #[tokio::test]
    async fn test_update_amount_posts_delta() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let food = system_category(&db, "Alimentación").await;
        let goal = saving::create(&db, user.id, saving_input("Viaje", Decimal::new(10000, 0))).await.unwrap();

        let mut input = expense_input(food.id, Decimal::new(1500, 0), date(2025, 3, 10));
        input.saving_id = Some(goal.id);
        let expense = create(&db, user.id, input.clone()).await.unwrap();

        input.amount = Decimal::new(2000, 0);
        update(&db, user.id, expense.id, input.clone()).await.unwrap();
        let current = saving::find_for_user(&db, user.id, goal.id).await.unwrap().current_amount;
        assert_eq!(current, Decimal::new(2000, 0));

        input.amount = Decimal::new(1200, 0);
        update(&db, user.id, expense.id, input).await.unwrap();
        let current = saving::find_for_user(&db, user.id, goal.id).await.unwrap().current_amount;
        assert_eq!(current, Decimal::new(1200, 0));

        let movements = saving_movement::for_saving(goal.id).all(&db).await.unwrap();
        assert_eq!(movements.len(), 3);
        assert_eq!(sync::net_synced_amount(&db, expense.id, goal.id).await.unwrap(), Decimal::new(1200, 0));
    }

    #[tokio::test]
    async fn test_moving_expense_between_savings() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let food = system_category(&db, "Alimentación").await;
        let first = saving::create(&db, user.id, saving_input("Uno", Decimal::new(10000, 0))).await.unwrap();
        let second = saving::create(&db, user.id, saving_input("Dos", Decimal::new(10000, 0))).await.unwrap();

        let mut input = expense_input(food.id, Decimal::new(800, 0), date(2025, 3, 10));
        input.saving_id = Some(first.id);
        let expense = create(&db, user.id, input.clone()).await.unwrap();

        input.saving_id = Some(second.id);
        update(&db, user.id, expense.id, input.clone()).await.unwrap();

        let first = saving::find_for_user(&db, user.id, first.id).await.unwrap();
        let second_model = saving::find_for_user(&db, user.id, second.id).await.unwrap();
        assert_eq!(first.current_amount, Decimal::ZERO);
        assert_eq!(second_model.current_amount, Decimal::new(800, 0));

        // Unlinking takes the money back out
        input.saving_id = None;
        update(&db, user.id, expense.id, input).await.unwrap();
        let second_model = saving::find_for_user(&db, user.id, second.id).await.unwrap();
        assert_eq!(second_model.current_amount, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_soft_delete_reverses_with_clamp() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let food = system_category(&db, "Alimentación").await;
        let goal = saving::create(&db, user.id, saving_input("Viaje", Decimal::new(10000, 0))).await.unwrap();

        let mut input = expense_input(food.id, Decimal::new(1000, 0), date(2025, 3, 10));
        input.saving_id = Some(goal.id);
        let expense = create(&db, user.id, input).await.unwrap();

        // Part of the mirrored money is spent from the goal
        let goal = saving::find_for_user(&db, user.id, goal.id).await.unwrap();
        goal.add_withdrawal(&db, Decimal::new(600, 0), "Retiro").await.unwrap();

        soft_delete(&db, user.id, expense.id).await.unwrap();

        let goal = saving::find_for_user(&db, user.id, goal.id).await.unwrap();
        assert_eq!(goal.current_amount, Decimal::ZERO);
        assert!(find_for_user(&db, user.id, expense.id).await.is_err());
        let stored = Entity::find_all_with_deleted()
            .filter(Column::Id.eq(expense.id))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn test_linking_rules() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let other = create_user(&db, "beto").await;
        let food = system_category(&db, "Alimentación").await;

        let foreign = saving::create(&db, other.id, saving_input("Ajeno", Decimal::new(100, 0))).await.unwrap();
        let mut input = expense_input(food.id, Decimal::new(10, 0), date(2025, 3, 10));
        input.saving_id = Some(foreign.id);
        assert!(matches!(create(&db, user.id, input.clone()).await, Err(ModelError::Validation { .. })));

        let mut usd_goal = saving_input("Dólares", Decimal::new(100, 0));
        usd_goal.currency = Currency::Usd;
        let usd_goal = saving::create(&db, user.id, usd_goal).await.unwrap();
        input.saving_id = Some(usd_goal.id);
        assert!(matches!(create(&db, user.id, input.clone()).await, Err(ModelError::Validation { .. })));

        let mut cancelled = saving_input("Cancelado", Decimal::new(100, 0));
        cancelled.status = Some(SavingStatus::Cancelled);
        let cancelled = saving::create(&db, user.id, cancelled).await.unwrap();
        input.saving_id = Some(cancelled.id);
        assert!(matches!(create(&db, user.id, input).await, Err(ModelError::Validation { .. })));

        // Nothing was written for the rejected expenses
        assert!(for_user(user.id, ExpenseFilter::default()).all(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_usd_expense_into_ars_saving_uses_converted_amount() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let food = system_category(&db, "Alimentación").await;
        let goal = saving::create(&db, user.id, saving_input("Viaje", Decimal::new(1000000, 0))).await.unwrap();

        let mut input = expense_input(food.id, Decimal::new(20, 0), date(2025, 3, 10));
        input.currency = Currency::Usd;
        input.exchange_rate = Some(Decimal::new(1000, 0));
        input.saving_id = Some(goal.id);
        create(&db, user.id, input).await.unwrap();

        let goal = saving::find_for_user(&db, user.id, goal.id).await.unwrap();
        assert_eq!(goal.current_amount, Decimal::new(20000, 0));
    }
}
