use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Response},
};
use axum_valid::Valid;
use chrono::{DateTime, NaiveDate, Utc};
use common::Page;
use model::currency::Currency;
use model::entities::category;
use model::entities::income::{self, IncomeFilter, IncomeInput};
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use super::expenses::MonthlyTotal;
use super::{csv_attachment, fetch_page, ListQuery, MonthQuery, LIST_PAGE_SIZE};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct IncomeRequest {
    pub date: NaiveDate,
    /// Must be an INCOME category available to the user
    pub category_id: i32,
    pub description: String,
    pub amount: Decimal,
    /// ARS or USD, defaults to the user's preferred currency
    pub currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    #[serde(default)]
    pub is_recurring: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IncomeResponse {
    pub id: i32,
    pub date: NaiveDate,
    pub category_id: i32,
    pub category_name: String,
    pub category_icon: String,
    pub category_color: String,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub amount_ars: Decimal,
    pub formatted_amount: String,
    pub is_recurring: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<(income::Model, Option<category::Model>)> for IncomeResponse {
    fn from((model, category): (income::Model, Option<category::Model>)) -> Self {
        let (category_name, category_icon, category_color) = match category {
            Some(c) => (c.name, c.icon, c.color),
            None => (String::new(), category::DEFAULT_ICON.to_string(), category::DEFAULT_COLOR.to_string()),
        };
        Self {
            id: model.id,
            date: model.date,
            category_id: model.category_id,
            category_name,
            category_icon,
            category_color,
            description: model.description,
            formatted_amount: common::format_currency(model.amount, model.currency.code()),
            amount: model.amount,
            currency: model.currency.code().to_string(),
            exchange_rate: model.exchange_rate,
            amount_ars: model.amount_ars,
            is_recurring: model.is_recurring,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IncomeList {
    pub incomes: Page<IncomeResponse>,
    pub total_ars: Decimal,
    pub formatted_total: String,
}

fn input_of(request: IncomeRequest, default_currency: Currency) -> Result<IncomeInput, ApiError> {
    let currency = match request.currency.as_deref() {
        Some(code) => Currency::parse(code)?,
        None => default_currency,
    };
    Ok(IncomeInput {
        date: request.date,
        category_id: request.category_id,
        description: request.description,
        amount: request.amount,
        currency,
        exchange_rate: request.exchange_rate,
        is_recurring: request.is_recurring,
    })
}

fn filter_of(query: &ListQuery) -> IncomeFilter {
    IncomeFilter {
        month: query.month(),
        year: query.year(),
        category_id: query.category(),
    }
}

async fn with_category(state: &AppState, income: income::Model) -> Result<IncomeResponse, ApiError> {
    let category = category::Entity::find_by_id(income.category_id).one(&state.db).await?;
    Ok(IncomeResponse::from((income, category)))
}

/// List incomes with optional month, year and category filters
#[utoipa::path(
    get,
    path = "/api/v1/incomes",
    params(ListQuery),
    responses(
        (status = 200, description = "Incomes, newest first, 20 per page", body = ApiResponse<IncomeList>),
        (status = 400, description = "Invalid page", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "incomes"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_incomes(
    State(state): State<AppState>,
    user: CurrentUser,
    Valid(Query(query)): Valid<Query<ListQuery>>,
) -> Result<Json<ApiResponse<IncomeList>>, ApiError> {
    let filter = filter_of(&query);
    debug!("Listing incomes of user {} with {:?}", user.id(), filter);

    let paginator = income::for_user(user.id(), filter)
        .find_also_related(category::Entity)
        .paginate(&state.db, LIST_PAGE_SIZE);
    let page = fetch_page(paginator, query.page(), LIST_PAGE_SIZE).await?;

    let total_ars = income::for_user(user.id(), filter)
        .all(&state.db)
        .await?
        .iter()
        .map(|i| i.amount_ars)
        .sum::<Decimal>()
        .round_dp(2);

    info!("Retrieved page {} of incomes ({} matching)", page.page, page.total_items);
    Ok(Json(ApiResponse::ok(
        IncomeList {
            incomes: page.map(IncomeResponse::from),
            formatted_total: common::format_currency(total_ars, Currency::Ars.code()),
            total_ars,
        },
        "Incomes retrieved successfully",
    )))
}

/// Record a new income
#[utoipa::path(
    post,
    path = "/api/v1/incomes",
    request_body = IncomeRequest,
    responses(
        (status = 201, description = "Income created successfully", body = ApiResponse<IncomeResponse>),
        (status = 422, description = "Invalid request data", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "incomes"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn create_income(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<IncomeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<IncomeResponse>>), ApiError> {
    let income = income::create(&state.db, user.id(), input_of(request, user.0.default_currency)?).await?;
    state.invalidate_user_cache(user.id()).await;
    info!("Income created successfully with ID: {}", income.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(with_category(&state, income).await?, "Income created successfully")),
    ))
}

/// Get a single income
#[utoipa::path(
    get,
    path = "/api/v1/incomes/{income_id}",
    params(("income_id" = i32, Path, description = "Income ID")),
    responses(
        (status = 200, description = "Income", body = ApiResponse<IncomeResponse>),
        (status = 404, description = "Income not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "incomes"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_income(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(income_id): Path<i32>,
) -> Result<Json<ApiResponse<IncomeResponse>>, ApiError> {
    let income = income::find_for_user(&state.db, user.id(), income_id).await?;
    Ok(Json(ApiResponse::ok(with_category(&state, income).await?, "Income retrieved successfully")))
}

/// Edit an income
#[utoipa::path(
    put,
    path = "/api/v1/incomes/{income_id}",
    params(("income_id" = i32, Path, description = "Income ID")),
    request_body = IncomeRequest,
    responses(
        (status = 200, description = "Income updated successfully", body = ApiResponse<IncomeResponse>),
        (status = 404, description = "Income not found", body = ErrorResponse),
        (status = 422, description = "Invalid request data", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "incomes"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn update_income(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(income_id): Path<i32>,
    Json(request): Json<IncomeRequest>,
) -> Result<Json<ApiResponse<IncomeResponse>>, ApiError> {
    let input = input_of(request, user.0.default_currency)?;
    let income = income::update(&state.db, user.id(), income_id, input).await?;
    state.invalidate_user_cache(user.id()).await;
    info!("Income {} updated", income.id);
    Ok(Json(ApiResponse::ok(with_category(&state, income).await?, "Income updated successfully")))
}

/// Soft delete an income
#[utoipa::path(
    delete,
    path = "/api/v1/incomes/{income_id}",
    params(("income_id" = i32, Path, description = "Income ID")),
    responses(
        (status = 204, description = "Income deleted successfully"),
        (status = 404, description = "Income not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "incomes"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn delete_income(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(income_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    income::soft_delete(&state.db, user.id(), income_id).await?;
    state.invalidate_user_cache(user.id()).await;
    info!("Income {} deleted", income_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Total income of a month in ARS
#[utoipa::path(
    get,
    path = "/api/v1/incomes/monthly-total",
    params(MonthQuery),
    responses(
        (status = 200, description = "Monthly total", body = ApiResponse<MonthlyTotal>),
        (status = 400, description = "Invalid month or year", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "incomes"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_monthly_income_total(
    State(state): State<AppState>,
    user: CurrentUser,
    Valid(Query(query)): Valid<Query<MonthQuery>>,
) -> Result<Json<ApiResponse<MonthlyTotal>>, ApiError> {
    let (month, year) = query.resolve();
    let total_ars = income::monthly_total(&state.db, user.id(), month, year).await?;
    Ok(Json(ApiResponse::ok(
        MonthlyTotal {
            month,
            year,
            formatted_total: common::format_currency(total_ars, Currency::Ars.code()),
            total_ars,
        },
        "Monthly total retrieved successfully",
    )))
}

/// Download the filtered incomes as CSV
#[utoipa::path(
    get,
    path = "/api/v1/incomes/export",
    params(ListQuery),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String)
    ),
    security(("bearer_auth" = [])),
    tag = "incomes"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn export_incomes(
    State(state): State<AppState>,
    user: CurrentUser,
    Valid(Query(query)): Valid<Query<ListQuery>>,
) -> Result<Response, ApiError> {
    let rows = income::for_user(user.id(), filter_of(&query))
        .find_also_related(category::Entity)
        .all(&state.db)
        .await?;
    info!("Exporting {} incomes of user {}", rows.len(), user.id());

    let records = rows
        .into_iter()
        .map(|(i, c)| {
            vec![
                i.date.format("%Y-%m-%d").to_string(),
                i.description,
                c.map(|c| c.name).unwrap_or_default(),
                i.amount.to_string(),
                i.currency.code().to_string(),
                i.exchange_rate.to_string(),
                i.amount_ars.to_string(),
                if i.is_recurring { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    csv_attachment(
        "incomes",
        &["Date", "Description", "Category", "Amount", "Currency", "Exchange rate", "Amount ARS", "Recurring"],
        records,
    )
}
