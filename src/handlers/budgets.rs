use std::collections::HashSet;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use common::{BudgetProgress, MonthlyBudgetSummary};
use compute::budgets::{budget_detail, budgets_with_progress, monthly_summary, summarize};
use model::entities::budget::{self, BudgetFilter, BudgetInput};
use model::entities::category;
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use super::expenses::ExpenseResponse;
use super::{ListQuery, MonthQuery};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct BudgetRequest {
    /// Must be an EXPENSE category available to the user
    pub category_id: i32,
    pub month: u32,
    pub year: i32,
    /// Positive amount in ARS
    pub amount: Decimal,
    /// Percentage (1-100) that flags the budget; defaults to the user's preference
    pub alert_threshold: Option<i32>,
    pub notes: Option<String>,
}

impl BudgetRequest {
    fn into_input(self, default_threshold: i32) -> BudgetInput {
        BudgetInput {
            category_id: self.category_id,
            month: self.month,
            year: self.year,
            amount: self.amount,
            alert_threshold: Some(self.alert_threshold.unwrap_or(default_threshold)),
            notes: self.notes,
        }
    }
}

/// Budgets with their spending, plus the month's totals when a single month
/// is listed
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BudgetList {
    pub budgets: Vec<BudgetProgress>,
    pub summary: Option<MonthlyBudgetSummary>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BudgetDetailResponse {
    pub budget: BudgetProgress,
    /// Latest expenses of the budget's category and period
    pub recent_expenses: Vec<ExpenseResponse>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CopyBudgetsRequest {
    /// Target month, defaults to the current one
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CopyBudgetsResponse {
    pub copied: usize,
    pub budgets: Vec<BudgetProgress>,
}

async fn progress_of(state: &AppState, user_id: i32, budget_id: i32) -> Result<BudgetProgress, ApiError> {
    Ok(budget_detail(&state.db, user_id, budget_id).await?.progress)
}

/// List budgets; without filters the current month is shown
#[utoipa::path(
    get,
    path = "/api/v1/budgets",
    params(ListQuery),
    responses(
        (status = 200, description = "Budgets with spending", body = ApiResponse<BudgetList>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "budgets"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_budgets(
    State(state): State<AppState>,
    user: CurrentUser,
    Valid(Query(query)): Valid<Query<ListQuery>>,
) -> Result<Json<ApiResponse<BudgetList>>, ApiError> {
    let filter = if query.has_filters() {
        BudgetFilter {
            month: query.month(),
            year: query.year(),
            category_id: query.category(),
        }
    } else {
        let (month, year) = common::current_month_year();
        BudgetFilter {
            month: Some(month),
            year: Some(year),
            category_id: None,
        }
    };
    debug!("Listing budgets of user {} with {:?}", user.id(), filter);

    let budgets = budgets_with_progress(&state.db, user.id(), filter).await?;
    let summary = match (filter.month, filter.year, filter.category_id) {
        (Some(month), Some(year), None) => Some(summarize(month, year, &budgets)),
        _ => None,
    };
    info!("Retrieved {} budgets", budgets.len());
    Ok(Json(ApiResponse::ok(
        BudgetList { budgets, summary },
        "Budgets retrieved successfully",
    )))
}

/// Create a budget for a category and month
#[utoipa::path(
    post,
    path = "/api/v1/budgets",
    request_body = BudgetRequest,
    responses(
        (status = 201, description = "Budget created successfully", body = ApiResponse<BudgetProgress>),
        (status = 409, description = "A budget already exists for that category and month", body = ErrorResponse),
        (status = 422, description = "Invalid request data", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "budgets"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn create_budget(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<BudgetRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BudgetProgress>>), ApiError> {
    let input = request.into_input(user.0.alert_threshold);
    let budget = budget::create(&state.db, user.id(), input).await?;
    state.invalidate_user_cache(user.id()).await;
    info!("Budget created successfully with ID: {}", budget.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(
            progress_of(&state, user.id(), budget.id).await?,
            "Budget created successfully",
        )),
    ))
}

/// Get a budget with its latest expenses
#[utoipa::path(
    get,
    path = "/api/v1/budgets/{budget_id}",
    params(("budget_id" = i32, Path, description = "Budget ID")),
    responses(
        (status = 200, description = "Budget detail", body = ApiResponse<BudgetDetailResponse>),
        (status = 404, description = "Budget not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "budgets"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_budget(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(budget_id): Path<i32>,
) -> Result<Json<ApiResponse<BudgetDetailResponse>>, ApiError> {
    let detail = budget_detail(&state.db, user.id(), budget_id).await?;
    let category = category::Entity::find_by_id(detail.progress.category_id)
        .one(&state.db)
        .await?;
    let recent_expenses = detail
        .recent_expenses
        .into_iter()
        .map(|e| ExpenseResponse::from((e, category.clone())))
        .collect();
    Ok(Json(ApiResponse::ok(
        BudgetDetailResponse {
            budget: detail.progress,
            recent_expenses,
        },
        "Budget retrieved successfully",
    )))
}

/// Edit a budget
#[utoipa::path(
    put,
    path = "/api/v1/budgets/{budget_id}",
    params(("budget_id" = i32, Path, description = "Budget ID")),
    request_body = BudgetRequest,
    responses(
        (status = 200, description = "Budget updated successfully", body = ApiResponse<BudgetProgress>),
        (status = 404, description = "Budget not found", body = ErrorResponse),
        (status = 409, description = "Another budget covers that category and month", body = ErrorResponse),
        (status = 422, description = "Invalid request data", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "budgets"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn update_budget(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(budget_id): Path<i32>,
    Json(request): Json<BudgetRequest>,
) -> Result<Json<ApiResponse<BudgetProgress>>, ApiError> {
    let input = request.into_input(user.0.alert_threshold);
    let budget = budget::update(&state.db, user.id(), budget_id, input).await?;
    state.invalidate_user_cache(user.id()).await;
    info!("Budget {} updated", budget.id);
    Ok(Json(ApiResponse::ok(
        progress_of(&state, user.id(), budget.id).await?,
        "Budget updated successfully",
    )))
}

/// Soft delete a budget
#[utoipa::path(
    delete,
    path = "/api/v1/budgets/{budget_id}",
    params(("budget_id" = i32, Path, description = "Budget ID")),
    responses(
        (status = 204, description = "Budget deleted successfully"),
        (status = 404, description = "Budget not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "budgets"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn delete_budget(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(budget_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    budget::soft_delete(&state.db, user.id(), budget_id).await?;
    state.invalidate_user_cache(user.id()).await;
    info!("Budget {} deleted", budget_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Budget totals for a month
#[utoipa::path(
    get,
    path = "/api/v1/budgets/summary",
    params(MonthQuery),
    responses(
        (status = 200, description = "Monthly budget summary", body = ApiResponse<MonthlyBudgetSummary>),
        (status = 400, description = "Invalid month or year", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "budgets"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_budget_summary(
    State(state): State<AppState>,
    user: CurrentUser,
    Valid(Query(query)): Valid<Query<MonthQuery>>,
) -> Result<Json<ApiResponse<MonthlyBudgetSummary>>, ApiError> {
    let (month, year) = query.resolve();
    let summary = monthly_summary(&state.db, user.id(), month, year).await?;
    Ok(Json(ApiResponse::ok(summary, "Budget summary retrieved successfully")))
}

/// Copy last month's budgets into the given month
#[utoipa::path(
    post,
    path = "/api/v1/budgets/copy",
    request_body = CopyBudgetsRequest,
    responses(
        (status = 200, description = "Budgets copied; categories already budgeted are skipped", body = ApiResponse<CopyBudgetsResponse>),
        (status = 422, description = "Invalid month or year", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "budgets"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn copy_previous_month(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CopyBudgetsRequest>,
) -> Result<Json<ApiResponse<CopyBudgetsResponse>>, ApiError> {
    let (current_month, current_year) = common::current_month_year();
    let month = request.month.unwrap_or(current_month);
    let year = request.year.unwrap_or(current_year);

    let created = budget::copy_from_previous_month(&state.db, user.id(), month, year).await?;
    state.invalidate_user_cache(user.id()).await;

    let created_ids: HashSet<i32> = created.iter().map(|b| b.id).collect();
    let budgets: Vec<BudgetProgress> = budgets_with_progress(
        &state.db,
        user.id(),
        BudgetFilter {
            month: Some(month),
            year: Some(year),
            category_id: None,
        },
    )
    .await?
    .into_iter()
    .filter(|b| created_ids.contains(&b.id))
    .collect();

    let message = if budgets.is_empty() {
        "No budgets to copy from the previous month".to_string()
    } else {
        format!("Copied {} budgets from the previous month", budgets.len())
    };
    info!("{}", message);
    Ok(Json(ApiResponse::ok(
        CopyBudgetsResponse {
            copied: budgets.len(),
            budgets,
        },
        message,
    )))
}
