use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{QueryOrder, Set};
use tracing::{info, instrument};

use super::category::{self, CategoryType};
use super::expense::normalize_active;
use crate::active_value;
use crate::currency::{self, Currency};
use crate::error::{ModelError, Result};
use crate::soft_delete::SoftDelete;

pub const MAX_DESCRIPTION_LENGTH: usize = 255;

/// An income record. `amount_ars` is recomputed on every save.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "incomes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub category_id: i32,
    pub date: NaiveDate,
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    pub currency: Currency,
    #[sea_orm(column_type = "Decimal(Some((10, 4)))")]
    pub exchange_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((14, 2)))")]
    pub amount_ars: Decimal,
    pub is_recurring: bool,
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
            currency: Set(Currency::Ars),
            exchange_rate: Set(currency::DEFAULT_EXCHANGE_RATE),
            is_recurring: Set(false),
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

#[derive(Debug, Clone)]
pub struct IncomeInput {
    pub date: NaiveDate,
    pub category_id: i32,
    pub description: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub exchange_rate: Option<Decimal>,
    pub is_recurring: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IncomeFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub category_id: Option<i32>,
}

async fn build<C: ConnectionTrait>(db: &C, user_id: i32, input: &IncomeInput, active: &mut ActiveModel) -> Result<()> {
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
    category::find_available_of_type(db, user_id, input.category_id, CategoryType::Income).await?;
    let normalized = currency::normalize(input.amount, input.currency, input.exchange_rate)?;

    active.date = Set(input.date);
    active.category_id = Set(input.category_id);
    active.description = Set(description.to_string());
    active.amount = Set(input.amount);
    active.currency = Set(input.currency);
    active.exchange_rate = Set(normalized.exchange_rate);
    active.amount_ars = Set(normalized.amount_ars);
    active.is_recurring = Set(input.is_recurring);
    Ok(())
}

#[instrument(skip(db, input), fields(category_id = input.category_id, amount = %input.amount))]
pub async fn create<C: ConnectionTrait>(db: &C, user_id: i32, input: IncomeInput) -> Result<Model> {
    let mut active = <ActiveModel as ActiveModelBehavior>::new();
    active.user_id = Set(user_id);
    build(db, user_id, &input, &mut active).await?;
    let income = active.insert(db).await?;
    info!("Created income {} for user {}", income.id, user_id);
    Ok(income)
}

pub async fn update<C: ConnectionTrait>(db: &C, user_id: i32, income_id: i32, input: IncomeInput) -> Result<Model> {
    let income = find_for_user(db, user_id, income_id).await?;
    let mut active: ActiveModel = income.into();
    build(db, user_id, &input, &mut active).await?;
    Ok(active.update(db).await?)
}

pub async fn soft_delete<C: ConnectionTrait>(db: &C, user_id: i32, income_id: i32) -> Result<()> {
    let income = find_for_user(db, user_id, income_id).await?;
    Entity::soft_delete_by_id(income.id).exec(db).await?;
    info!("Soft deleted income {} of user {}", income.id, user_id);
    Ok(())
}

pub async fn find_for_user<C: ConnectionTrait>(db: &C, user_id: i32, income_id: i32) -> Result<Model> {
    Entity::find_active()
        .filter(Column::Id.eq(income_id))
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| ModelError::NotFound(format!("Income {}", income_id)))
}

/// Active incomes of a user, newest first, narrowed by the filter.
pub fn for_user(user_id: i32, filter: IncomeFilter) -> Select<Entity> {
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

pub async fn monthly_total<C: ConnectionTrait>(db: &C, user_id: i32, month: u32, year: i32) -> Result<Decimal> {
    let incomes = for_user(
        user_id,
        IncomeFilter {
            month: Some(month),
            year: Some(year),
            category_id: None,
        },
    )
    .all(db)
    .await?;
    Ok(incomes.iter().map(|i| i.amount_ars).sum::<Decimal>().round_dp(2))
}
