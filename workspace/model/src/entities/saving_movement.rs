use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{QueryOrder, Set};

use crate::active_value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum MovementType {
    #[sea_orm(string_value = "DEPOSIT")]
    Deposit,
    #[sea_orm(string_value = "WITHDRAWAL")]
    Withdrawal,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Deposit => "DEPOSIT",
            MovementType::Withdrawal => "WITHDRAWAL",
        }
    }
}

/// Ledger entry of a saving goal. Rows are only ever inserted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "saving_movements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub saving_id: i32,
    /// Expense that generated this movement, when it was created by sync.
    pub expense_id: Option<i32>,
    pub movement_type: MovementType,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::saving::Entity",
        from = "Column::SavingId",
        to = "super::saving::Column::Id",
        on_delete = "Cascade"
    )]
    Saving,
    #[sea_orm(
        belongs_to = "super::expense::Entity",
        from = "Column::ExpenseId",
        to = "super::expense::Column::Id",
        on_delete = "SetNull"
    )]
    Expense,
}

impl Related<super::saving::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Saving.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if !insert {
            return Err(DbErr::Custom("Saving movements cannot be modified".to_string()));
        }
        if active_value(&self.created_at).is_none() {
            self.created_at = Set(Utc::now());
        }
        Ok(self)
    }

    async fn before_delete<C>(self, _db: &C) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        Err(DbErr::Custom("Saving movements cannot be deleted".to_string()))
    }
}

impl Model {
    /// Amount with sign: deposits add, withdrawals subtract.
    pub fn signed_amount(&self) -> Decimal {
        match self.movement_type {
            MovementType::Deposit => self.amount,
            MovementType::Withdrawal => -self.amount,
        }
    }
}

/// Movements of a saving, newest first.
pub fn for_saving(saving_id: i32) -> Select<Entity> {
    Entity::find()
        .filter(Column::SavingId.eq(saving_id))
        .order_by_desc(Column::Date)
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
}
