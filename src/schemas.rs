use std::sync::Arc;

use chrono::NaiveDate;
use common::{
    BalanceSummary, BudgetOverview, BudgetProgress, BudgetStatus, CategoryShare, Dashboard, MonthlyBudgetSummary,
    RecentTransaction, SavingProgress, SavingsOverview, SavingsSummary, TransactionKind,
};
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};

use crate::auth::AuthManager;
use crate::config::Settings;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection
    pub db: DatabaseConnection,
    /// Cache for expensive operations
    pub cache: Cache<String, CachedData>,
    pub settings: Arc<Settings>,
    pub auth: Arc<AuthManager>,
}

impl AppState {
    pub fn dashboard_key(user_id: i32, today: NaiveDate) -> String {
        format!("dashboard:{}:{}", user_id, today.format("%Y-%m"))
    }

    /// Drops everything cached for the user after one of their writes.
    pub async fn invalidate_user_cache(&self, user_id: i32) {
        self.cache
            .invalidate(&Self::dashboard_key(user_id, common::today()))
            .await;
    }
}

/// Cached data types
#[derive(Clone, Debug)]
pub enum CachedData {
    Dashboard(Box<Dashboard>),
}

/// API response wrapper
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response data
    pub data: T,
    /// Response message
    pub message: String,
    /// Success status
    pub success: bool,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
            success: true,
        }
    }
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    pub code: String,
    /// Success status (always false for errors)
    pub success: bool,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Database connection status
    pub database: String,
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::logout,
        crate::handlers::auth::get_profile,
        crate::handlers::auth::update_profile,
        crate::handlers::auth::change_password,
        crate::handlers::categories::get_categories,
        crate::handlers::categories::create_category,
        crate::handlers::categories::get_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,
        crate::handlers::expenses::get_expenses,
        crate::handlers::expenses::create_expense,
        crate::handlers::expenses::get_expense,
        crate::handlers::expenses::update_expense,
        crate::handlers::expenses::delete_expense,
        crate::handlers::expenses::get_expenses_by_category,
        crate::handlers::expenses::get_monthly_expense_total,
        crate::handlers::expenses::export_expenses,
        crate::handlers::incomes::get_incomes,
        crate::handlers::incomes::create_income,
        crate::handlers::incomes::get_income,
        crate::handlers::incomes::update_income,
        crate::handlers::incomes::delete_income,
        crate::handlers::incomes::get_monthly_income_total,
        crate::handlers::incomes::export_incomes,
        crate::handlers::budgets::get_budgets,
        crate::handlers::budgets::create_budget,
        crate::handlers::budgets::get_budget,
        crate::handlers::budgets::update_budget,
        crate::handlers::budgets::delete_budget,
        crate::handlers::budgets::get_budget_summary,
        crate::handlers::budgets::copy_previous_month,
        crate::handlers::savings::get_savings,
        crate::handlers::savings::create_saving,
        crate::handlers::savings::get_saving,
        crate::handlers::savings::update_saving,
        crate::handlers::savings::delete_saving,
        crate::handlers::savings::get_saving_movements,
        crate::handlers::savings::deposit,
        crate::handlers::savings::withdraw,
        crate::handlers::reports::get_dashboard,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            crate::handlers::auth::RegisterRequest,
            crate::handlers::auth::LoginRequest,
            crate::handlers::auth::TokenResponse,
            crate::handlers::auth::UserResponse,
            crate::handlers::auth::ProfileUpdateRequest,
            crate::handlers::auth::ChangePasswordRequest,
            crate::handlers::categories::CategoryRequest,
            crate::handlers::categories::CategoryResponse,
            crate::handlers::expenses::ExpenseRequest,
            crate::handlers::expenses::ExpenseResponse,
            crate::handlers::expenses::ExpenseList,
            crate::handlers::expenses::MonthlyTotal,
            crate::handlers::incomes::IncomeRequest,
            crate::handlers::incomes::IncomeResponse,
            crate::handlers::incomes::IncomeList,
            crate::handlers::budgets::BudgetRequest,
            crate::handlers::budgets::BudgetList,
            crate::handlers::budgets::BudgetDetailResponse,
            crate::handlers::budgets::CopyBudgetsRequest,
            crate::handlers::budgets::CopyBudgetsResponse,
            crate::handlers::savings::SavingRequest,
            crate::handlers::savings::SavingResponse,
            crate::handlers::savings::SavingList,
            crate::handlers::savings::MovementRequest,
            crate::handlers::savings::MovementResponse,
            crate::handlers::savings::MovementResult,
            crate::handlers::savings::SavingDetail,
            BudgetProgress,
            BudgetStatus,
            MonthlyBudgetSummary,
            SavingsSummary,
            SavingProgress,
            BalanceSummary,
            BudgetOverview,
            SavingsOverview,
            TransactionKind,
            RecentTransaction,
            CategoryShare,
            Dashboard,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and profile"),
        (name = "categories", description = "Expense and income categories"),
        (name = "expenses", description = "Expense records"),
        (name = "incomes", description = "Income records"),
        (name = "budgets", description = "Monthly budgets per category"),
        (name = "savings", description = "Savings goals and their movements"),
        (name = "reports", description = "Dashboard and reports"),
    ),
    info(
        title = "Cashbook API",
        description = "Personal finance tracker API - expenses, income, budgets and savings goals",
        version = "0.1.0",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
