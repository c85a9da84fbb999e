use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use axum_valid::Valid;
use chrono::{DateTime, NaiveDate, Utc};
use common::{Page, SavingsSummary};
use compute::savings::savings_summary;
use model::currency::Currency;
use model::entities::saving::{self, MovementOutcome, SavingInput, SavingStatus};
use model::entities::saving_movement;
use rust_decimal::Decimal;
use sea_orm::{PaginatorTrait, TransactionTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

use super::{fetch_page, PageQuery, MOVEMENTS_PAGE_SIZE};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct SavingRequest {
    pub name: String,
    pub description: Option<String>,
    pub target_amount: Decimal,
    /// ARS or USD, defaults to the user's preferred currency
    pub currency: Option<String>,
    /// Cannot be in the past when creating
    pub target_date: Option<NaiveDate>,
    /// ACTIVE, COMPLETED or CANCELLED
    pub status: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

impl SavingRequest {
    fn into_input(self, default_currency: Currency) -> Result<SavingInput, ApiError> {
        let currency = match self.currency.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(code) => Currency::parse(code)?,
            None => default_currency,
        };
        let status = match self.status.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(status) => Some(SavingStatus::parse(status)?),
            None => None,
        };
        Ok(SavingInput {
            name: self.name,
            description: self.description.unwrap_or_default(),
            target_amount: self.target_amount,
            currency,
            target_date: self.target_date,
            status,
            icon: self.icon.filter(|i| !i.trim().is_empty()),
            color: self.color.filter(|c| !c.trim().is_empty()),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SavingResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub currency: String,
    pub target_date: Option<NaiveDate>,
    pub status: String,
    pub icon: String,
    pub color: String,
    /// Percentage of the target reached, capped at 100
    pub progress_percentage: Decimal,
    pub remaining_amount: Decimal,
    pub is_overdue: bool,
    pub formatted_target: String,
    pub formatted_current: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<saving::Model> for SavingResponse {
    fn from(model: saving::Model) -> Self {
        let code = model.currency.code();
        Self {
            progress_percentage: model.progress_percentage(),
            remaining_amount: model.remaining_amount(),
            is_overdue: model.is_overdue(common::today()),
            formatted_target: common::format_currency(model.target_amount, code),
            formatted_current: common::format_currency(model.current_amount, code),
            currency: code.to_string(),
            status: model.status.as_str().to_string(),
            id: model.id,
            name: model.name,
            description: model.description,
            target_amount: model.target_amount,
            current_amount: model.current_amount,
            target_date: model.target_date,
            icon: model.icon,
            color: model.color,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SavingList {
    pub savings: Vec<SavingResponse>,
    pub summary: SavingsSummary,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MovementRequest {
    /// Positive amount in the goal's currency
    pub amount: Decimal,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MovementResponse {
    pub id: i32,
    /// DEPOSIT or WITHDRAWAL
    pub movement_type: String,
    pub amount: Decimal,
    pub description: String,
    pub date: NaiveDate,
    /// Set when the movement was generated by an expense
    pub expense_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<saving_movement::Model> for MovementResponse {
    fn from(model: saving_movement::Model) -> Self {
        Self {
            id: model.id,
            movement_type: model.movement_type.as_str().to_string(),
            amount: model.amount,
            description: model.description,
            date: model.date,
            expense_id: model.expense_id,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MovementResult {
    pub saving: SavingResponse,
    pub movement: MovementResponse,
}

impl From<MovementOutcome> for MovementResult {
    fn from(outcome: MovementOutcome) -> Self {
        Self {
            saving: outcome.saving.into(),
            movement: outcome.movement.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SavingDetail {
    pub saving: SavingResponse,
    pub movements: Page<MovementResponse>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SavingQuery {
    /// ACTIVE, COMPLETED or CANCELLED; unknown values are ignored
    pub status: Option<String>,
}

async fn movements_page(state: &AppState, saving_id: i32, page: u64) -> Result<Page<MovementResponse>, ApiError> {
    let paginator = saving_movement::for_saving(saving_id).paginate(&state.db, MOVEMENTS_PAGE_SIZE);
    Ok(fetch_page(paginator, page, MOVEMENTS_PAGE_SIZE)
        .await?
        .map(MovementResponse::from))
}

/// List saving goals with the overall summary
#[utoipa::path(
    get,
    path = "/api/v1/savings",
    params(SavingQuery),
    responses(
        (status = 200, description = "Saving goals, newest first", body = ApiResponse<SavingList>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "savings"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_savings(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<SavingQuery>,
) -> Result<Json<ApiResponse<SavingList>>, ApiError> {
    let status = query.status.as_deref().and_then(|s| match SavingStatus::parse(s) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            debug!("Ignoring unknown saving status filter '{}'", s);
            None
        }
    });

    let savings = saving::for_user(user.id(), status).all(&state.db).await?;
    let summary = savings_summary(&state.db, user.id()).await?;
    info!("Retrieved {} savings for user {}", savings.len(), user.id());
    Ok(Json(ApiResponse::ok(
        SavingList {
            savings: savings.into_iter().map(SavingResponse::from).collect(),
            summary,
        },
        "Savings retrieved successfully",
    )))
}

/// Create a saving goal
#[utoipa::path(
    post,
    path = "/api/v1/savings",
    request_body = SavingRequest,
    responses(
        (status = 201, description = "Saving created successfully", body = ApiResponse<SavingResponse>),
        (status = 422, description = "Invalid request data", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "savings"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn create_saving(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<SavingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SavingResponse>>), ApiError> {
    debug!("Creating saving with name: {}", request.name);
    let input = request.into_input(user.0.default_currency)?;
    let saving = saving::create(&state.db, user.id(), input).await?;
    state.invalidate_user_cache(user.id()).await;
    info!("Saving created successfully with ID: {}", saving.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(SavingResponse::from(saving), "Saving created successfully")),
    ))
}

/// Get a saving goal with a page of its movements
#[utoipa::path(
    get,
    path = "/api/v1/savings/{saving_id}",
    params(("saving_id" = i32, Path, description = "Saving ID"), PageQuery),
    responses(
        (status = 200, description = "Saving with movements, 10 per page", body = ApiResponse<SavingDetail>),
        (status = 404, description = "Saving not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "savings"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_saving(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(saving_id): Path<i32>,
    Valid(Query(query)): Valid<Query<PageQuery>>,
) -> Result<Json<ApiResponse<SavingDetail>>, ApiError> {
    let saving = saving::find_for_user(&state.db, user.id(), saving_id).await?;
    let movements = movements_page(&state, saving.id, query.page.unwrap_or(1)).await?;
    Ok(Json(ApiResponse::ok(
        SavingDetail {
            saving: saving.into(),
            movements,
        },
        "Saving retrieved successfully",
    )))
}

/// Edit a saving goal; the balance only changes through movements
#[utoipa::path(
    put,
    path = "/api/v1/savings/{saving_id}",
    params(("saving_id" = i32, Path, description = "Saving ID")),
    request_body = SavingRequest,
    responses(
        (status = 200, description = "Saving updated successfully", body = ApiResponse<SavingResponse>),
        (status = 404, description = "Saving not found", body = ErrorResponse),
        (status = 422, description = "Invalid request data", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "savings"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn update_saving(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(saving_id): Path<i32>,
    Json(request): Json<SavingRequest>,
) -> Result<Json<ApiResponse<SavingResponse>>, ApiError> {
    let input = request.into_input(user.0.default_currency)?;
    let saving = saving::update(&state.db, user.id(), saving_id, input).await?;
    state.invalidate_user_cache(user.id()).await;
    info!("Saving {} updated", saving.id);
    Ok(Json(ApiResponse::ok(SavingResponse::from(saving), "Saving updated successfully")))
}

/// Soft delete a saving goal
#[utoipa::path(
    delete,
    path = "/api/v1/savings/{saving_id}",
    params(("saving_id" = i32, Path, description = "Saving ID")),
    responses(
        (status = 204, description = "Saving deleted successfully"),
        (status = 404, description = "Saving not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "savings"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn delete_saving(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(saving_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    saving::soft_delete(&state.db, user.id(), saving_id).await?;
    state.invalidate_user_cache(user.id()).await;
    info!("Saving {} deleted", saving_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Page through the movement ledger of a saving goal
#[utoipa::path(
    get,
    path = "/api/v1/savings/{saving_id}/movements",
    params(("saving_id" = i32, Path, description = "Saving ID"), PageQuery),
    responses(
        (status = 200, description = "Movements, newest first, 10 per page", body = ApiResponse<Page<MovementResponse>>),
        (status = 404, description = "Saving not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "savings"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_saving_movements(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(saving_id): Path<i32>,
    Valid(Query(query)): Valid<Query<PageQuery>>,
) -> Result<Json<ApiResponse<Page<MovementResponse>>>, ApiError> {
    let saving = saving::find_for_user(&state.db, user.id(), saving_id).await?;
    let movements = movements_page(&state, saving.id, query.page.unwrap_or(1)).await?;
    Ok(Json(ApiResponse::ok(movements, "Movements retrieved successfully")))
}

/// Add money to a saving goal
#[utoipa::path(
    post,
    path = "/api/v1/savings/{saving_id}/deposit",
    params(("saving_id" = i32, Path, description = "Saving ID")),
    request_body = MovementRequest,
    responses(
        (status = 201, description = "Deposit recorded", body = ApiResponse<MovementResult>),
        (status = 404, description = "Saving not found", body = ErrorResponse),
        (status = 422, description = "Amount must be positive", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "savings"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn deposit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(saving_id): Path<i32>,
    Json(request): Json<MovementRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MovementResult>>), ApiError> {
    let saving = saving::find_for_user(&state.db, user.id(), saving_id).await?;
    let description = request.description.unwrap_or_default();

    let txn = state.db.begin().await?;
    let outcome = saving.add_deposit(&txn, request.amount, &description).await?;
    txn.commit().await?;

    state.invalidate_user_cache(user.id()).await;
    info!(
        "Deposited {} into saving {}, balance now {}",
        request.amount, saving_id, outcome.saving.current_amount
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(MovementResult::from(outcome), "Deposit recorded successfully")),
    ))
}

/// Take money out of a saving goal
#[utoipa::path(
    post,
    path = "/api/v1/savings/{saving_id}/withdraw",
    params(("saving_id" = i32, Path, description = "Saving ID")),
    request_body = MovementRequest,
    responses(
        (status = 201, description = "Withdrawal recorded", body = ApiResponse<MovementResult>),
        (status = 404, description = "Saving not found", body = ErrorResponse),
        (status = 422, description = "Amount not positive or above the balance", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "savings"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn withdraw(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(saving_id): Path<i32>,
    Json(request): Json<MovementRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MovementResult>>), ApiError> {
    let saving = saving::find_for_user(&state.db, user.id(), saving_id).await?;
    let description = request.description.unwrap_or_default();

    let txn = state.db.begin().await?;
    let outcome = saving.add_withdrawal(&txn, request.amount, &description).await?;
    txn.commit().await?;

    state.invalidate_user_cache(user.id()).await;
    info!(
        "Withdrew {} from saving {}, balance now {}",
        request.amount, saving_id, outcome.saving.current_amount
    );
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(MovementResult::from(outcome), "Withdrawal recorded successfully")),
    ))
}
