use crate::handlers::{
    auth::{change_password, get_profile, login, logout, register, update_profile},
    budgets::{
        copy_previous_month, create_budget, delete_budget, get_budget, get_budget_summary, get_budgets, update_budget,
    },
    categories::{create_category, delete_category, get_categories, get_category, update_category},
    expenses::{
        create_expense, delete_expense, export_expenses, get_expense, get_expenses, get_expenses_by_category,
        get_monthly_expense_total, update_expense,
    },
    health::health_check,
    incomes::{create_income, delete_income, export_incomes, get_income, get_incomes, get_monthly_income_total, update_income},
    reports::get_dashboard,
    savings::{
        create_saving, delete_saving, deposit, get_saving, get_saving_movements, get_savings, update_saving, withdraw,
    },
};
use crate::schemas::{ApiDoc, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Authentication and profile
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/profile", get(get_profile).put(update_profile))
        .route("/api/v1/auth/password", post(change_password))
        // Categories
        .route("/api/v1/categories", get(get_categories).post(create_category))
        .route(
            "/api/v1/categories/:category_id",
            get(get_category).put(update_category).delete(delete_category),
        )
        // Expenses
        .route("/api/v1/expenses", get(get_expenses).post(create_expense))
        .route("/api/v1/expenses/export", get(export_expenses))
        .route("/api/v1/expenses/by-category", get(get_expenses_by_category))
        .route("/api/v1/expenses/monthly-total", get(get_monthly_expense_total))
        .route(
            "/api/v1/expenses/:expense_id",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
        // Incomes
        .route("/api/v1/incomes", get(get_incomes).post(create_income))
        .route("/api/v1/incomes/export", get(export_incomes))
        .route("/api/v1/incomes/monthly-total", get(get_monthly_income_total))
        .route(
            "/api/v1/incomes/:income_id",
            get(get_income).put(update_income).delete(delete_income),
        )
        // Budgets
        .route("/api/v1/budgets", get(get_budgets).post(create_budget))
        .route("/api/v1/budgets/summary", get(get_budget_summary))
        .route("/api/v1/budgets/copy", post(copy_previous_month))
        .route(
            "/api/v1/budgets/:budget_id",
            get(get_budget).put(update_budget).delete(delete_budget),
        )
        // Savings
        .route("/api/v1/savings", get(get_savings).post(create_saving))
        .route(
            "/api/v1/savings/:saving_id",
            get(get_saving).put(update_saving).delete(delete_saving),
        )
        .route("/api/v1/savings/:saving_id/movements", get(get_saving_movements))
        .route("/api/v1/savings/:saving_id/deposit", post(deposit))
        .route("/api/v1/savings/:saving_id/withdraw", post(withdraw))
        // Reports
        .route("/api/v1/reports/dashboard", get(get_dashboard))
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(TimeoutLayer::new(Duration::from_secs(30)))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
