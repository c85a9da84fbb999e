//! Fixtures shared by the compute tests.

use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait};
use model::currency::Currency;
use model::entities::{budget, category, expense, income, user};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set};

pub async fn setup_db() -> DatabaseConnection {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
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

pub async fn system_category(db: &DatabaseConnection, name: &str) -> category::Model {
    category::Entity::find()
        .filter(category::Column::Name.eq(name))
        .filter(category::Column::IsSystem.eq(true))
        .one(db)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("system category {} missing", name))
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn expense_input(category_id: i32, amount: Decimal, on: NaiveDate) -> expense::ExpenseInput {
    expense::ExpenseInput {
        date: on,
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

pub fn income_input(category_id: i32, amount: Decimal, on: NaiveDate) -> income::IncomeInput {
    income::IncomeInput {
        date: on,
        category_id,
        description: "Sueldo".to_string(),
        amount,
        currency: Currency::Ars,
        exchange_rate: None,
        is_recurring: false,
    }
}

pub fn budget_input(category_id: i32, month: u32, year: i32, amount: i64) -> budget::BudgetInput {
    budget::BudgetInput {
        category_id,
        month,
        year,
        amount: Decimal::new(amount, 0),
        alert_threshold: None,
        notes: None,
    }
}
