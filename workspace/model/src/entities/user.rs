use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{Condition, Set};

use crate::active_value;
use crate::currency::Currency;
use crate::error::{ModelError, Result};

/// Default percentage of a budget at which the user wants to be warned.
pub const DEFAULT_ALERT_THRESHOLD: i32 = 80;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Represents a user of the system.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    /// Currency preselected when the user records a new amount.
    pub default_currency: Currency,
    /// Budget usage percentage (1-100) that triggers a warning.
    pub alert_threshold: i32,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub last_login: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::category::Entity")]
    Category,
    #[sea_orm(has_many = "super::expense::Entity")]
    Expense,
    #[sea_orm(has_many = "super::income::Entity")]
    Income,
    #[sea_orm(has_many = "super::budget::Entity")]
    Budget,
    #[sea_orm(has_many = "super::saving::Entity")]
    Saving,
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

impl Related<super::income::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Income.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            first_name: Set(String::new()),
            last_name: Set(String::new()),
            default_currency: Set(Currency::Ars),
            alert_threshold: Set(DEFAULT_ALERT_THRESHOLD),
            is_active: Set(true),
            is_staff: Set(false),
            is_superuser: Set(false),
            ..ActiveModelTrait::default()
        }
    }

    async fn before_save<C>(mut self, _db: &C, insert: bool) -> std::result::Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        if let Some(threshold) = active_value(&self.alert_threshold) {
            if !(1..=100).contains(&threshold) {
                return Err(DbErr::Custom(format!(
                    "alert_threshold must be between 1 and 100, got {}",
                    threshold
                )));
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

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub default_currency: Option<Currency>,
    pub alert_threshold: Option<i32>,
}

impl Model {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Finds a user by username or email, ignoring case.
pub async fn find_by_login<C: ConnectionTrait>(db: &C, login: &str) -> Result<Option<Model>> {
    let login = login.trim().to_lowercase();
    let user = Entity::find()
        .filter(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(Column::Username))).eq(login.clone()))
                .add(Expr::expr(Func::lower(Expr::col(Column::Email))).eq(login)),
        )
        .one(db)
        .await?;
    Ok(user)
}

/// Whether another user already uses this username (case-insensitive).
pub async fn username_taken<C: ConnectionTrait>(db: &C, username: &str, exclude_id: Option<i32>) -> Result<bool> {
    let mut query = Entity::find()
        .filter(Expr::expr(Func::lower(Expr::col(Column::Username))).eq(username.trim().to_lowercase()));
    if let Some(id) = exclude_id {
        query = query.filter(Column::Id.ne(id));
    }
    Ok(query.one(db).await?.is_some())
}

/// Whether another user already uses this email (case-insensitive).
pub async fn email_taken<C: ConnectionTrait>(db: &C, email: &str, exclude_id: Option<i32>) -> Result<bool> {
    let mut query = Entity::find()
        .filter(Expr::expr(Func::lower(Expr::col(Column::Email))).eq(email.trim().to_lowercase()));
    if let Some(id) = exclude_id {
        query = query.filter(Column::Id.ne(id));
    }
    Ok(query.one(db).await?.is_some())
}

/// Validates the shape of a new registration before any hashing happens.
pub fn validate_registration(username: &str, email: &str, password: &str, password_confirm: &str) -> Result<()> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > 150 {
        return Err(ModelError::validation("username", "Username must have between 1 and 150 characters"));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ModelError::validation(
            "username",
            "Username may only contain letters, digits and @/./+/-/_",
        ));
    }
    validate_email(email)?;
    validate_new_password(password, password_confirm)
}

pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    };
    if !valid {
        return Err(ModelError::validation("email", "Enter a valid email address"));
    }
    Ok(())
}

pub fn validate_new_password(password: &str, password_confirm: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ModelError::validation(
            "password",
            format!("Password must have at least {} characters", MIN_PASSWORD_LENGTH),
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(ModelError::validation("password", "Password cannot be entirely numeric"));
    }
    if password != password_confirm {
        return Err(ModelError::validation("password_confirm", "Passwords do not match"));
    }
    Ok(())
}

/// Applies a profile update, enforcing email uniqueness and threshold bounds.
pub async fn update_profile<C: ConnectionTrait>(db: &C, user: Model, update: ProfileUpdate) -> Result<Model> {
    let user_id = user.id;
    let mut active: ActiveModel = user.into();

    if let Some(first_name) = update.first_name {
        active.first_name = Set(first_name.trim().to_string());
    }
    if let Some(last_name) = update.last_name {
        active.last_name = Set(last_name.trim().to_string());
    }
    if let Some(email) = update.email {
        validate_email(&email)?;
        if email_taken(db, &email, Some(user_id)).await? {
            return Err(ModelError::Conflict("A user with this email already exists".to_string()));
        }
        active.email = Set(email.trim().to_lowercase());
    }
    if let Some(currency) = update.default_currency {
        active.default_currency = Set(currency);
    }
    if let Some(threshold) = update.alert_threshold {
        if !(1..=100).contains(&threshold) {
            return Err(ModelError::validation("alert_threshold", "Alert threshold must be between 1 and 100"));
        }
        active.alert_threshold = Set(threshold);
    }

    Ok(active.update(db).await?)
}
