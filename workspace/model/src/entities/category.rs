use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{Condition, QueryOrder, Set};
use tracing::{debug, info, instrument};

use crate::active_value;
use crate::error::{ModelError, Result};
use crate::soft_delete::SoftDelete;

pub const DEFAULT_ICON: &str = "bi-tag";
pub const DEFAULT_COLOR: &str = "#6c757d";
pub const MAX_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
pub enum CategoryType {
    #[sea_orm(string_value = "EXPENSE")]
    Expense,
    #[sea_orm(string_value = "INCOME")]
    Income,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Expense => "EXPENSE",
            CategoryType::Income => "INCOME",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_uppercase().as_str() {
            "EXPENSE" => Ok(CategoryType::Expense),
            "INCOME" => Ok(CategoryType::Income),
            other => Err(ModelError::validation("type", format!("Unknown category type '{}'", other))),
        }
    }
}

/// A built-in category available to every user.
pub struct SystemCategory {
    pub name: &'static str,
    pub category_type: CategoryType,
    pub icon: &'static str,
    pub color: &'static str,
}

const fn system(name: &'static str, category_type: CategoryType, icon: &'static str, color: &'static str) -> SystemCategory {
    SystemCategory {
        name,
        category_type,
        icon,
        color,
    }
}

pub const SYSTEM_CATEGORIES: &[SystemCategory] = &[
    system("Alimentación", CategoryType::Expense, "bi-cart", "#28a745"),
    system("Transporte", CategoryType::Expense, "bi-car-front", "#17a2b8"),
    system("Vivienda", CategoryType::Expense, "bi-house", "#6c757d"),
    system("Servicios", CategoryType::Expense, "bi-lightning", "#ffc107"),
    system("Salud", CategoryType::Expense, "bi-heart-pulse", "#dc3545"),
    system("Entretenimiento", CategoryType::Expense, "bi-controller", "#e83e8c"),
    system("Educación", CategoryType::Expense, "bi-book", "#6f42c1"),
    system("Ropa", CategoryType::Expense, "bi-bag", "#fd7e14"),
    system("Otros gastos", CategoryType::Expense, "bi-three-dots", "#6c757d"),
    system("Sueldo", CategoryType::Income, "bi-briefcase", "#28a745"),
    system("Freelance", CategoryType::Income, "bi-laptop", "#17a2b8"),
    system("Inversiones", CategoryType::Income, "bi-graph-up-arrow", "#6f42c1"),
    system("Otros ingresos", CategoryType::Income, "bi-three-dots", "#6c757d"),
];

/// Category used to classify expenses or incomes.
///
/// System categories have no owner and are shared by all users; user
/// categories always have one. Names are unique per (name, user, type).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub category_type: CategoryType,
    pub user_id: Option<i32>,
    pub is_system: bool,
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
    #[sea_orm(has_many = "super::expense::Entity")]
    Expense,
    #[sea_orm(has_many = "super::income::Entity")]
    Income,
    #[sea_orm(has_many = "super::budget::Entity")]
    Budget,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expense.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            is_system: Set(false),
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
        let is_system = active_value(&self.is_system).unwrap_or(false);
        let user_id = active_value(&self.user_id).flatten();
        match (is_system, user_id) {
            (true, Some(_)) => {
                return Err(DbErr::Custom("System categories cannot have an owner".to_string()));
            }
            (false, None) => {
                return Err(DbErr::Custom("User categories must have an owner".to_string()));
            }
            _ => {}
        }

        let now = Utc::now();
        if insert && active_value(&self.created_at).is_none() {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);
        Ok(self)
    }
}

impl Model {
    /// Whether the given user may use this category on their records.
    pub fn is_available_to(&self, user_id: i32) -> bool {
        self.is_active && (self.is_system || self.user_id == Some(user_id))
    }
}

/// Values accepted when a user creates or edits a category.
#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub category_type: CategoryType,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// Active system categories plus the user's own ones, ordered by type and name.
pub fn available_for_user(user_id: i32, category_type: Option<CategoryType>) -> Select<Entity> {
    let mut query = Entity::find_active().filter(
        Condition::any()
            .add(Column::IsSystem.eq(true))
            .add(Column::UserId.eq(user_id)),
    );
    if let Some(category_type) = category_type {
        query = query.filter(Column::CategoryType.eq(category_type));
    }
    query
        .order_by_asc(Column::CategoryType)
        .order_by_asc(Column::Name)
}

/// Fetches a category usable by `user_id`, failing when it is not visible.
pub async fn find_available<C: ConnectionTrait>(db: &C, user_id: i32, category_id: i32) -> Result<Model> {
    available_for_user(user_id, None)
        .filter(Column::Id.eq(category_id))
        .one(db)
        .await?
        .ok_or_else(|| ModelError::NotFound(format!("Category {}", category_id)))
}

/// Fetches a category the user may use and checks its type.
pub async fn find_available_of_type<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    category_id: i32,
    expected: CategoryType,
) -> Result<Model> {
    let category = find_available(db, user_id, category_id)
        .await
        .map_err(|err| match err {
            ModelError::NotFound(_) => ModelError::validation("category_id", "Invalid category"),
            other => other,
        })?;
    if category.category_type != expected {
        let message = match expected {
            CategoryType::Expense => "Category must be an expense category",
            CategoryType::Income => "Category must be an income category",
        };
        return Err(ModelError::validation("category_id", message));
    }
    Ok(category)
}

/// Trims the name and rejects duplicates against the user's own and the
/// system categories of the same type, ignoring case.
pub async fn validate_name<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    name: &str,
    category_type: CategoryType,
    exclude_id: Option<i32>,
) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ModelError::validation("name", "Name is required"));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ModelError::validation(
            "name",
            format!("Name cannot exceed {} characters", MAX_NAME_LENGTH),
        ));
    }

    let mut query = Entity::find_active()
        .filter(Column::CategoryType.eq(category_type))
        .filter(Expr::expr(Func::lower(Expr::col(Column::Name))).eq(name.to_lowercase()))
        .filter(
            Condition::any()
                .add(Column::IsSystem.eq(true))
                .add(Column::UserId.eq(user_id)),
        );
    if let Some(id) = exclude_id {
        query = query.filter(Column::Id.ne(id));
    }

    if let Some(existing) = query.one(db).await? {
        let message = if existing.is_system {
            format!("A system category named '{}' already exists", existing.name)
        } else {
            format!("You already have a category named '{}'", existing.name)
        };
        return Err(ModelError::Conflict(message));
    }
    Ok(name.to_string())
}

#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_for_user<C: ConnectionTrait>(db: &C, user_id: i32, input: CategoryInput) -> Result<Model> {
    let name = validate_name(db, user_id, &input.name, input.category_type, None).await?;
    let category = ActiveModel {
        name: Set(name),
        category_type: Set(input.category_type),
        user_id: Set(Some(user_id)),
        is_system: Set(false),
        icon: Set(input.icon.unwrap_or_else(|| DEFAULT_ICON.to_string())),
        color: Set(input.color.unwrap_or_else(|| DEFAULT_COLOR.to_string())),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("Created category {} for user {}", category.id, user_id);
    Ok(category)
}

/// Loads a category owned by the user; system categories are refused.
pub async fn find_owned<C: ConnectionTrait>(db: &C, user_id: i32, category_id: i32) -> Result<Model> {
    let category = Entity::find_active()
        .filter(Column::Id.eq(category_id))
        .one(db)
        .await?
        .ok_or_else(|| ModelError::NotFound(format!("Category {}", category_id)))?;
    if category.is_system {
        return Err(ModelError::PermissionDenied("System categories cannot be modified".to_string()));
    }
    if category.user_id != Some(user_id) {
        return Err(ModelError::NotFound(format!("Category {}", category_id)));
    }
    Ok(category)
}

pub async fn update_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    category_id: i32,
    input: CategoryInput,
) -> Result<Model> {
    let category = find_owned(db, user_id, category_id).await?;
    let name = validate_name(db, user_id, &input.name, input.category_type, Some(category.id)).await?;

    let mut active: ActiveModel = category.into();
    active.name = Set(name);
    active.category_type = Set(input.category_type);
    if let Some(icon) = input.icon {
        active.icon = Set(icon);
    }
    if let Some(color) = input.color {
        active.color = Set(color);
    }
    Ok(active.update(db).await?)
}

pub async fn soft_delete_for_user<C: ConnectionTrait>(db: &C, user_id: i32, category_id: i32) -> Result<()> {
    let category = find_owned(db, user_id, category_id).await?;
    Entity::soft_delete_by_id(category.id).exec(db).await?;
    info!("Soft deleted category {} of user {}", category.id, user_id);
    Ok(())
}

/// Outcome of seeding the built-in categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
}

/// Creates any missing system category. Safe to run repeatedly.
pub async fn seed_system_categories<C: ConnectionTrait>(db: &C) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    for definition in SYSTEM_CATEGORIES {
        let existing = Entity::find()
            .filter(Column::Name.eq(definition.name))
            .filter(Column::CategoryType.eq(definition.category_type))
            .filter(Column::UserId.is_null())
            .one(db)
            .await?;

        if existing.is_some() {
            debug!("System category {} already present", definition.name);
            report.existing.push(definition.name.to_string());
            continue;
        }

        ActiveModel {
            name: Set(definition.name.to_string()),
            category_type: Set(definition.category_type),
            user_id: Set(None),
            is_system: Set(true),
            icon: Set(definition.icon.to_string()),
            color: Set(definition.color.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        report.created.push(definition.name.to_string());
    }
    info!(
        "Seeded system categories: {} created, {} existing",
        report.created.len(),
        report.existing.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::testing::{create_user, setup_db, system_category};

    fn input(name: &str, category_type: CategoryType) -> CategoryInput {
        CategoryInput {
            name: name.to_string(),
            category_type,
            icon: None,
            color: None,
        }
    }

    #[tokio::test]
    async fn test_system_categories_seeded_by_migrations() {
        let db = setup_db().await;

        let report = seed_system_categories(&db).await.unwrap();
        assert!(report.created.is_empty());
        assert_eq!(report.existing.len(), SYSTEM_CATEGORIES.len());

        let food = system_category(&db, "Alimentación").await;
        assert!(food.is_system);
        assert_eq!(food.user_id, None);
        assert_eq!(food.icon, "bi-cart");
    }

    #[tokio::test]
    async fn test_available_categories_include_system_and_own_only() {
        let db = setup_db().await;
        let ana = create_user(&db, "ana").await;
        let beto = create_user(&db, "beto").await;

        create_for_user(&db, ana.id, input("Mascotas", CategoryType::Expense)).await.unwrap();
        create_for_user(&db, beto.id, input("Gimnasio", CategoryType::Expense)).await.unwrap();

        let visible = available_for_user(ana.id, Some(CategoryType::Expense)).all(&db).await.unwrap();
        assert!(visible.iter().any(|c| c.name == "Mascotas"));
        assert!(!visible.iter().any(|c| c.name == "Gimnasio"));
        assert!(visible.iter().all(|c| c.category_type == CategoryType::Expense));

        let names: Vec<_> = visible.iter().map(|c| c.name.clone()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn test_duplicate_names_are_rejected_case_insensitively() {
        let db = setup_db().await;
        let ana = create_user(&db, "ana").await;

        create_for_user(&db, ana.id, input("Mascotas", CategoryType::Expense)).await.unwrap();

        let own_dup = create_for_user(&db, ana.id, input("  mascotas ", CategoryType::Expense)).await;
        assert!(matches!(own_dup, Err(ModelError::Conflict(_))));

        let system_dup = create_for_user(&db, ana.id, input("SUELDO", CategoryType::Income)).await;
        assert!(matches!(system_dup, Err(ModelError::Conflict(_))));

        // Same name is fine under the other type
        create_for_user(&db, ana.id, input("Mascotas", CategoryType::Income)).await.unwrap();
    }

    #[tokio::test]
    async fn test_system_categories_cannot_be_modified() {
        let db = setup_db().await;
        let ana = create_user(&db, "ana").await;
        let food = system_category(&db, "Alimentación").await;

        let result = update_for_user(&db, ana.id, food.id, input("Comida", CategoryType::Expense)).await;
        assert!(matches!(result, Err(ModelError::PermissionDenied(_))));

        let result = soft_delete_for_user(&db, ana.id, food.id).await;
        assert!(matches!(result, Err(ModelError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_soft_deleted_category_hidden_but_retained() {
        let db = setup_db().await;
        let ana = create_user(&db, "ana").await;
        let pets = create_for_user(&db, ana.id, input("Mascotas", CategoryType::Expense)).await.unwrap();

        soft_delete_for_user(&db, ana.id, pets.id).await.unwrap();

        assert!(Entity::find_active().filter(Column::Id.eq(pets.id)).one(&db).await.unwrap().is_none());
        let deleted = Entity::find_deleted_only().filter(Column::Id.eq(pets.id)).one(&db).await.unwrap().unwrap();
        assert!(!deleted.is_active);
        assert!(deleted.deleted_at.is_some());

        Entity::restore_by_id(pets.id).exec(&db).await.unwrap();
        let restored = Entity::find_active().filter(Column::Id.eq(pets.id)).one(&db).await.unwrap().unwrap();
        assert!(restored.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_owner_invariant_enforced_on_save() {
        let db = setup_db().await;
        let orphan = ActiveModel {
            name: Set("Huérfana".to_string()),
            category_type: Set(CategoryType::Expense),
            user_id: Set(None),
            is_system: Set(false),
            ..Default::default()
        }
        .insert(&db)
        .await;
        assert!(orphan.is_err());
    }
}
