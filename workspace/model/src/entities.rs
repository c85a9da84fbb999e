//! Root for all SeaORM entity modules of the finance tracker.
//!
//! Every record belongs to a user. Categories may also be system wide
//! (no owner). Expenses, incomes, budgets and savings are soft deleted.

pub mod access_attempt;
pub mod budget;
pub mod category;
pub mod expense;
pub mod income;
pub mod saving;
pub mod saving_movement;
pub mod user;

use crate::soft_delete::impl_soft_delete;

impl_soft_delete!(category);
impl_soft_delete!(expense);
impl_soft_delete!(income);
impl_soft_delete!(budget);
impl_soft_delete!(saving);

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::access_attempt::Entity as AccessAttempt;
    pub use super::budget::Entity as Budget;
    pub use super::category::Entity as Category;
    pub use super::expense::Entity as Expense;
    pub use super::income::Entity as Income;
    pub use super::saving::Entity as Saving;
    pub use super::saving_movement::Entity as SavingMovement;
    pub use super::user::Entity as User;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for the entity tests.
    use chrono::NaiveDate;
    use migration::{Migrator, MigratorTrait};
    use rust_decimal::Decimal;
    use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};

    use super::*;
    use crate::currency::Currency;

    pub async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.execute_unprepared("PRAGMA foreign_keys = ON;").await.unwrap();
        Migrator::up(&db, None).await.expect("Migrations failed.");
        db
    }

    pub async fn create_user(db: &DatabaseConnection, username: &str) -> user::Model {
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{}@example.com", username)),
            password_hash: Set("not-a-real-hash".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    /// Looks up a seeded system category by name.
    pub async fn system_category(db: &DatabaseConnection, name: &str) -> category::Model {
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
        category::Entity::find()
            .filter(category::Column::Name.eq(name))
            .filter(category::Column::IsSystem.eq(true))
            .one(db)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("system category {} missing", name))
    }

    pub fn expense_input(category_id: i32, amount: Decimal, date: NaiveDate) -> expense::ExpenseInput {
        expense::ExpenseInput {
            date,
            category_id,
            description: "Supermercado".to_string(),
            amount,
            currency: Currency::Ars,
            exchange_rate: None,
            payment_method: None,
            expense_type: None,
            saving_id: None,
        }
    }

    pub fn saving_input(name: &str, target: Decimal) -> saving::SavingInput {
        saving::SavingInput {
            name: name.to_string(),
            description: String::new(),
            target_amount: target,
            currency: Currency::Ars,
            target_date: None,
            status: None,
            icon: None,
            color: None,
        }
    }

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }
}
