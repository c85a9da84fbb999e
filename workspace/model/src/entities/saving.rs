use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{QueryOrder, Set};
use tracing::{debug, info, instrument, warn};

use super::saving_movement::{self, MovementType};
use crate::active_value;
use crate::currency::{self, Currency};
use crate::error::{ModelError, Result};
use crate::soft_delete::SoftDelete;

pub const DEFAULT_ICON: &str = "bi-piggy-bank";
pub const DEFAULT_COLOR: &str = "#17a2b8";
pub const MAX_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum SavingStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl SavingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SavingStatus::Active => "ACTIVE",
            SavingStatus::Completed => "COMPLETED",
            SavingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_uppercase().as_str() {
            "ACTIVE" => Ok(SavingStatus::Active),
            "COMPLETED" => Ok(SavingStatus::Completed),
            "CANCELLED" => Ok(SavingStatus::Cancelled),
            other => Err(ModelError::validation("status", format!("Unknown saving status '{}'", other))),
        }
    }
}

/// A savings goal.
///
/// `current_amount` is never written directly after creation: it moves only
/// through [`Model::add_deposit`] and [`Model::add_withdrawal`], which issue
/// a single `current_amount = current_amount ± x` update per movement.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "savings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub target_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub current_amount: Decimal,
    pub currency: Currency,
    pub target_date: Option<NaiveDate>,
    pub status: SavingStatus,
    pub icon: String,
    pub color: String,
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
    #[sea_orm(has_many = "super::saving_movement::Entity")]
    SavingMovement,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::saving_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SavingMovement.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            description: Set(String::new()),
            current_amount: Set(Decimal::ZERO),
            currency: Set(Currency::Ars),
            status: Set(SavingStatus::Active),
            icon: Set(DEFAULT_ICON.to_string()),
            color: Set(DEFAULT_COLOR.to_string()),
            is_active: Set(true),
            ..ActiveModelTrait::default()
        }
    }

    async fn before_save<C>(mut self, _db: &C, insert: bool) -> std::result::Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let Some(target) = active_value(&self.target_amount) {
            if target <= Decimal::ZERO {
                return Err(DbErr::Custom("target_amount must be greater than zero".to_string()));
            }
        }
        if let Some(current) = active_value(&self.current_amount) {
            if current < Decimal::ZERO {
                return Err(DbErr::Custom("current_amount cannot be negative".to_string()));
            }
        }
        let now = Utc::now();
        if insert && active_value(&self.created_at).is_none() {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}

/// Result of posting a movement: the refreshed goal and the new ledger row.
#[derive(Debug, Clone)]
pub struct MovementOutcome {
    pub saving: Model,
    pub movement: saving_movement::Model,
}

impl Model {
    /// Progress towards the target, one decimal, capped at 100.
    pub fn progress_percentage(&self) -> Decimal {
        if self.target_amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let progress = (self.current_amount / self.target_amount * Decimal::ONE_HUNDRED).round_dp(1);
        progress.min(Decimal::ONE_HUNDRED)
    }

    /// Amount still missing to reach the target, never negative.
    pub fn remaining_amount(&self) -> Decimal {
        (self.target_amount - self.current_amount).max(Decimal::ZERO)
    }

    pub fn is_completed(&self) -> bool {
        self.status == SavingStatus::Completed
    }

    /// An active goal whose target date has passed.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        match self.target_date {
            Some(target_date) => target_date < today && self.status == SavingStatus::Active,
            None => false,
        }
    }

    /// Adds money to the goal and completes it once the target is reached.
    pub async fn add_deposit<C: ConnectionTrait>(&self, db: &C, amount: Decimal, description: &str) -> Result<MovementOutcome> {
        post_movement(db, self.id, MovementType::Deposit, amount, description, None).await
    }

    /// Takes money out of the goal; fails when the balance is not enough.
    pub async fn add_withdrawal<C: ConnectionTrait>(
        &self,
        db: &C,
        amount: Decimal,
        description: &str,
    ) -> Result<MovementOutcome> {
        post_movement(db, self.id, MovementType::Withdrawal, amount, description, None).await
    }
}

/// Records a movement and applies it to `current_amount` atomically.
///
/// Withdrawals are guarded in the same statement (`current_amount >= x`), so
/// two concurrent withdrawals can never overdraw the goal.
#[instrument(skip(db, description))]
pub(crate) async fn post_movement<C: ConnectionTrait>(
    db: &C,
    saving_id: i32,
    movement_type: MovementType,
    amount: Decimal,
    description: &str,
    expense_id: Option<i32>,
) -> Result<MovementOutcome> {
    currency::ensure_positive("amount", amount)?;

    match movement_type {
        MovementType::Deposit => {
            let result = Entity::update_many()
                .col_expr(Column::CurrentAmount, Expr::col(Column::CurrentAmount).add(amount))
                .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(Column::Id.eq(saving_id))
                .exec(db)
                .await?;
            if result.rows_affected == 0 {
                return Err(ModelError::NotFound(format!("Saving {}", saving_id)));
            }

            let completed = Entity::update_many()
                .col_expr(Column::Status, Expr::value(SavingStatus::Completed.as_str()))
                .filter(Column::Id.eq(saving_id))
                .filter(Column::Status.eq(SavingStatus::Active))
                .filter(Expr::col(Column::CurrentAmount).gte(Expr::col(Column::TargetAmount)))
                .exec(db)
                .await?;
            if completed.rows_affected > 0 {
                info!("Saving {} reached its target and was completed", saving_id);
            }
        }
        MovementType::Withdrawal => {
            let result = Entity::update_many()
                .col_expr(Column::CurrentAmount, Expr::col(Column::CurrentAmount).sub(amount))
                .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(Column::Id.eq(saving_id))
                .filter(Column::CurrentAmount.gte(amount))
                .exec(db)
                .await?;
            if result.rows_affected == 0 {
                let saving = Entity::find_by_id(saving_id)
                    .one(db)
                    .await?
                    .ok_or_else(|| ModelError::NotFound(format!("Saving {}", saving_id)))?;
                warn!(
                    "Rejected withdrawal of {} from saving {} with balance {}",
                    amount, saving_id, saving.current_amount
                );
                return Err(ModelError::InsufficientFunds {
                    available: saving.current_amount,
                    requested: amount,
                });
            }
        }
    }

    let movement = saving_movement::ActiveModel {
        saving_id: Set(saving_id),
        expense_id: Set(expense_id),
        movement_type: Set(movement_type),
        amount: Set(amount),
        description: Set(description.to_string()),
        date: Set(Utc::now().date_naive()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let saving = Entity::find_by_id(saving_id)
        .one(db)
        .await?
        .ok_or_else(|| ModelError::NotFound(format!("Saving {}", saving_id)))?;
    debug!(
        "Posted {} of {} on saving {}, balance now {}",
        movement_type.as_str(),
        amount,
        saving_id,
        saving.current_amount
    );

    Ok(MovementOutcome { saving, movement })
}

/// Values accepted when creating or editing a saving goal.
#[derive(Debug, Clone)]
pub struct SavingInput {
    pub name: String,
    pub description: String,
    pub target_amount: Decimal,
    pub currency: Currency,
    pub target_date: Option<NaiveDate>,
    pub status: Option<SavingStatus>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

fn validate_input(input: &SavingInput, today: NaiveDate, is_new: bool) -> Result<String> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ModelError::validation("name", "Name is required"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ModelError::validation(
            "name",
            format!("Name cannot exceed {} characters", MAX_NAME_LENGTH),
        ));
    }
    currency::ensure_positive("target_amount", input.target_amount)?;
    if is_new {
        if let Some(target_date) = input.target_date {
            if target_date < today {
                return Err(ModelError::validation("target_date", "Target date cannot be in the past"));
            }
        }
    }
    Ok(name.to_string())
}

/// Savings of a user, optionally filtered by status, newest first.
pub fn for_user(user_id: i32, status: Option<SavingStatus>) -> Select<Entity> {
    let mut query = Entity::find_active().filter(Column::UserId.eq(user_id));
    if let Some(status) = status {
        query = query.filter(Column::Status.eq(status));
    }
    query.order_by_desc(Column::CreatedAt).order_by_desc(Column::Id)
}

pub async fn find_for_user<C: ConnectionTrait>(db: &C, user_id: i32, saving_id: i32) -> Result<Model> {
    Entity::find_active()
        .filter(Column::Id.eq(saving_id))
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| ModelError::NotFound(format!("Saving {}", saving_id)))
}

#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create<C: ConnectionTrait>(db: &C, user_id: i32, input: SavingInput) -> Result<Model> {
    let name = validate_input(&input, Utc::now().date_naive(), true)?;
    let saving = ActiveModel {
        user_id: Set(user_id),
        name: Set(name),
        description: Set(input.description.trim().to_string()),
        target_amount: Set(input.target_amount),
        currency: Set(input.currency),
        target_date: Set(input.target_date),
        status: Set(input.status.unwrap_or(SavingStatus::Active)),
        icon: Set(input.icon.unwrap_or_else(|| DEFAULT_ICON.to_string())),
        color: Set(input.color.unwrap_or_else(|| DEFAULT_COLOR.to_string())),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("Created saving {} for user {}", saving.id, user_id);
    Ok(saving)
}

/// Edits the descriptive fields of a goal. The balance is left untouched.
pub async fn update<C: ConnectionTrait>(db: &C, user_id: i32, saving_id: i32, input: SavingInput) -> Result<Model> {
    let saving = find_for_user(db, user_id, saving_id).await?;
    let is_new_date = input.target_date.is_some() && input.target_date != saving.target_date;
    let name = validate_input(&input, Utc::now().date_naive(), is_new_date)?;

    let mut active: ActiveModel = saving.into();
    active.name = Set(name);
    active.description = Set(input.description.trim().to_string());
    active.target_amount = Set(input.target_amount);
    active.currency = Set(input.currency);
    active.target_date = Set(input.target_date);
    if let Some(status) = input.status {
        active.status = Set(status);
    }
    if let Some(icon) = input.icon {
        active.icon = Set(icon);
    }
    if let Some(color) = input.color {
        active.color = Set(color);
    }
    Ok(active.update(db).await?)
}

/// Hides a goal. Its movements stay in the ledger.
pub async fn soft_delete<C: ConnectionTrait>(db: &C, user_id: i32, saving_id: i32) -> Result<()> {
    let saving = find_for_user(db, user_id, saving_id).await?;
    Entity::soft_delete_by_id(saving.id).exec(db).await?;
    info!("Soft deleted saving {} of user {}", saving.id, user_id);
    Ok(())
}

/// Sum of `current_amount` across the user's active goals.
pub async fn total_saved<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Decimal> {
    let savings = for_user(user_id, Some(SavingStatus::Active)).all(db).await?;
    Ok(savings.iter().map(|s| s.current_amount).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::{create_user, saving_input, setup_db};

    #[tokio::test]
    async fn test_deposit_increments_and_completes_goal() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let saving = create(&db, user.id, saving_input("Vacaciones", Decimal::new(1000, 0))).await.unwrap();

        let outcome = saving.add_deposit(&db, Decimal::new(400, 0), "Primer aporte").await.unwrap();
        assert_eq!(outcome.saving.current_amount, Decimal::new(400, 0));
        assert_eq!(outcome.saving.status, SavingStatus::Active);
        assert_eq!(outcome.movement.movement_type, MovementType::Deposit);
        assert_eq!(outcome.movement.description, "Primer aporte");

        let outcome = outcome.saving.add_deposit(&db, Decimal::new(600, 0), "").await.unwrap();
        assert_eq!(outcome.saving.current_amount, Decimal::new(1000, 0));
        assert_eq!(outcome.saving.status, SavingStatus::Completed);
        assert_eq!(outcome.saving.progress_percentage(), Decimal::ONE_HUNDRED);
    }

    #[tokio::test]
    async fn test_withdrawal_checks_balance() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let saving = create(&db, user.id, saving_input("Auto", Decimal::new(5000, 0))).await.unwrap();
        saving.add_deposit(&db, Decimal::new(300, 0), "").await.unwrap();

        let result = saving.add_withdrawal(&db, Decimal::new(500, 0), "").await;
        match result {
            Err(ModelError::InsufficientFunds { available, requested }) => {
                assert_eq!(available, Decimal::new(300, 0));
                assert_eq!(requested, Decimal::new(500, 0));
            }
            other => panic!("expected insufficient funds, got {:?}", other),
        }

        let outcome = saving.add_withdrawal(&db, Decimal::new(100, 0), "Imprevisto").await.unwrap();
        assert_eq!(outcome.saving.current_amount, Decimal::new(200, 0));

        let movements = saving_movement::for_saving(saving.id).all(&db).await.unwrap();
        assert_eq!(movements.len(), 2);
    }

    #[tokio::test]
    async fn test_non_positive_movements_rejected() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let saving = create(&db, user.id, saving_input("Auto", Decimal::new(5000, 0))).await.unwrap();

        assert!(matches!(
            saving.add_deposit(&db, Decimal::ZERO, "").await,
            Err(ModelError::Validation { .. })
        ));
        assert!(matches!(
            saving.add_withdrawal(&db, Decimal::new(-5, 0), "").await,
            Err(ModelError::Validation { .. })
        ));
        assert!(saving_movement::for_saving(saving.id).all(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_derived_values() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let mut input = saving_input("Casa", Decimal::new(3000, 0));
        input.target_date = Some(Utc::now().date_naive() + chrono::Duration::days(30));
        let saving = create(&db, user.id, input).await.unwrap();
        let saving = saving.add_deposit(&db, Decimal::new(1000, 0), "").await.unwrap().saving;

        assert_eq!(saving.progress_percentage(), Decimal::new(333, 1));
        assert_eq!(saving.remaining_amount(), Decimal::new(2000, 0));
        assert!(!saving.is_overdue(Utc::now().date_naive()));
        assert!(saving.is_overdue(Utc::now().date_naive() + chrono::Duration::days(31)));
    }

    #[tokio::test]
    async fn test_past_target_date_rejected_on_create() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let mut input = saving_input("Casa", Decimal::new(3000, 0));
        input.target_date = Some(Utc::now().date_naive() - chrono::Duration::days(1));

        assert!(matches!(create(&db, user.id, input).await, Err(ModelError::Validation { .. })));
    }

    #[tokio::test]
    async fn test_total_saved_counts_active_goals_only() {
        let db = setup_db().await;
        let user = create_user(&db, "ana").await;
        let first = create(&db, user.id, saving_input("Uno", Decimal::new(1000, 0))).await.unwrap();
        let second = create(&db, user.id, saving_input("Dos", Decimal::new(1000, 0))).await.unwrap();
        let third = create(&db, user.id, saving_input("Tres", Decimal::new(100, 0))).await.unwrap();
        first.add_deposit(&db, Decimal::new(250, 0), "").await.unwrap();
        second.add_deposit(&db, Decimal::new(150, 0), "").await.unwrap();
        // Completed goals are not part of the active total
        third.add_deposit(&db, Decimal::new(100, 0), "").await.unwrap();

        soft_delete(&db, user.id, second.id).await.unwrap();

        assert_eq!(total_saved(&db, user.id).await.unwrap(), Decimal::new(250, 0));
        // Movements survive the soft delete
        assert_eq!(saving_movement::for_saving(second.id).all(&db).await.unwrap().len(), 1);
    }
}
