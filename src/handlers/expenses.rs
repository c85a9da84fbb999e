use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Json, Response},
};
use axum_valid::Valid;
use chrono::{DateTime, NaiveDate, Utc};
use common::{CategoryShare, Page};
use model::currency::Currency;
use model::entities::category;
use model::entities::expense::{self, ExpenseFilter, ExpenseInput, ExpenseType, PaymentMethod};
use rust_decimal::Decimal;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use super::{csv_attachment, fetch_page, ListQuery, MonthQuery, LIST_PAGE_SIZE};
use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState};

/// Request structure for recording or editing an expense
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExpenseRequest {
    pub date: NaiveDate,
    /// Must be an EXPENSE category available to the user
    pub category_id: i32,
    pub description: String,
    /// Positive amount in `currency`
    pub amount: Decimal,
    /// ARS or USD, defaults to the user's preferred currency
    pub currency: Option<String>,
    /// ARS per unit of `currency`, required for USD
    pub exchange_rate: Option<Decimal>,
    /// CASH, DEBIT, CREDIT or TRANSFER
    pub payment_method: Option<String>,
    /// FIXED or VARIABLE
    pub expense_type: Option<String>,
    /// Active saving goal this expense feeds
    pub saving_id: Option<i32>,
}

impl ExpenseRequest {
    fn into_input(self, default_currency: Currency) -> Result<ExpenseInput, ApiError> {
        let currency = match self.currency.as_deref() {
            Some(code) => Currency::parse(code)?,
            None => default_currency,
        };
        let payment_method = self
            .payment_method
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(PaymentMethod::parse)
            .transpose()?;
        let expense_type = self
            .expense_type
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(ExpenseType::parse)
            .transpose()?;
        Ok(ExpenseInput {
            date: self.date,
            category_id: self.category_id,
            description: self.description,
            amount: self.amount,
            currency,
            exchange_rate: self.exchange_rate,
            payment_method,
            expense_type,
            saving_id: self.saving_id,
        })
    }
}

/// Response structure for expense operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseResponse {
    pub id: i32,
    pub date: NaiveDate,
    pub category_id: i32,
    pub category_name: String,
    pub category_icon: String,
    pub category_color: String,
    pub saving_id: Option<i32>,
    pub description: String,
    pub amount: Decimal,
    pub currency: String,
    pub exchange_rate: Decimal,
    pub amount_ars: Decimal,
    /// `amount` rendered in its currency, e.g. `US$ 100,00`
    pub formatted_amount: String,
    pub payment_method: Option<String>,
    pub expense_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<(expense::Model, Option<category::Model>)> for ExpenseResponse {
    fn from((model, category): (expense::Model, Option<category::Model>)) -> Self {
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
            saving_id: model.saving_id,
            description: model.description,
            formatted_amount: common::format_currency(model.amount, model.currency.code()),
            amount: model.amount,
            currency: model.currency.code().to_string(),
            exchange_rate: model.exchange_rate,
            amount_ars: model.amount_ars,
            payment_method: model.payment_method.map(|p| p.as_str().to_string()),
            expense_type: model.expense_type.map(|t| t.as_str().to_string()),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// A page of expenses plus the total of every row matching the filters
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ExpenseList {
    pub expenses: Page<ExpenseResponse>,
    pub total_ars: Decimal,
    pub formatted_total: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MonthlyTotal {
    pub month: u32,
    pub year: i32,
    pub total_ars: Decimal,
    pub formatted_total: String,
}

fn filter_of(query: &ListQuery) -> ExpenseFilter {
    ExpenseFilter {
        month: query.month(),
        year: query.year(),
        category_id: query.category(),
    }
}

async fn with_category(state: &AppState, expense: expense::Model) -> Result<ExpenseResponse, ApiError> {
    let category = category::Entity::find_by_id(expense.category_id).one(&state.db).await?;
    Ok(ExpenseResponse::from((expense, category)))
}

/// List expenses with optional month, year and category filters
#[utoipa::path(
    get,
    path = "/api/v1/expenses",
    params(ListQuery),
    responses(
        (status = 200, description = "Expenses, newest first, 20 per page", body = ApiResponse<ExpenseList>),
        (status = 400, description = "Invalid page", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_expenses(
    State(state): State<AppState>,
    user: CurrentUser,
    Valid(Query(query)): Valid<Query<ListQuery>>,
) -> Result<Json<ApiResponse<ExpenseList>>, ApiError> {
    let filter = filter_of(&query);
    debug!("Listing expenses of user {} with {:?}", user.id(), filter);

    let paginator = expense::for_user(user.id(), filter)
        .find_also_related(category::Entity)
        .paginate(&state.db, LIST_PAGE_SIZE);
    let page = fetch_page(paginator, query.page(), LIST_PAGE_SIZE).await?;

    let total_ars = expense::for_user(user.id(), filter)
        .all(&state.db)
        .await?
        .iter()
        .map(|e| e.amount_ars)
        .sum::<Decimal>()
        .round_dp(2);

    info!("Retrieved page {} of expenses ({} matching)", page.page, page.total_items);
    Ok(Json(ApiResponse::ok(
        ExpenseList {
            expenses: page.map(ExpenseResponse::from),
            formatted_total: common::format_currency(total_ars, Currency::Ars.code()),
            total_ars,
        },
        "Expenses retrieved successfully",
    )))
}

/// Record a new expense
#[utoipa::path(
    post,
    path = "/api/v1/expenses",
    request_body = ExpenseRequest,
    responses(
        (status = 201, description = "Expense created successfully", body = ApiResponse<ExpenseResponse>),
        (status = 422, description = "Invalid request data", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn create_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ExpenseRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ExpenseResponse>>), ApiError> {
    let input = request.into_input(user.0.default_currency)?;
    let expense = expense::create(&state.db, user.id(), input).await?;
    state.invalidate_user_cache(user.id()).await;
    info!("Expense created successfully with ID: {}", expense.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(with_category(&state, expense).await?, "Expense created successfully")),
    ))
}

/// Get a single expense
#[utoipa::path(
    get,
    path = "/api/v1/expenses/{expense_id}",
    params(("expense_id" = i32, Path, description = "Expense ID")),
    responses(
        (status = 200, description = "Expense", body = ApiResponse<ExpenseResponse>),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(expense_id): Path<i32>,
) -> Result<Json<ApiResponse<ExpenseResponse>>, ApiError> {
    let expense = expense::find_for_user(&state.db, user.id(), expense_id).await?;
    Ok(Json(ApiResponse::ok(with_category(&state, expense).await?, "Expense retrieved successfully")))
}

/// Edit an expense, resynchronizing its linked saving
#[utoipa::path(
    put,
    path = "/api/v1/expenses/{expense_id}",
    params(("expense_id" = i32, Path, description = "Expense ID")),
    request_body = ExpenseRequest,
    responses(
        (status = 200, description = "Expense updated successfully", body = ApiResponse<ExpenseResponse>),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 422, description = "Invalid request data", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn update_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(expense_id): Path<i32>,
    Json(request): Json<ExpenseRequest>,
) -> Result<Json<ApiResponse<ExpenseResponse>>, ApiError> {
    let input = request.into_input(user.0.default_currency)?;
    let expense = expense::update(&state.db, user.id(), expense_id, input).await?;
    state.invalidate_user_cache(user.id()).await;
    info!("Expense {} updated", expense.id);
    Ok(Json(ApiResponse::ok(with_category(&state, expense).await?, "Expense updated successfully")))
}

/// Soft delete an expense and reverse what it put into its saving
#[utoipa::path(
    delete,
    path = "/api/v1/expenses/{expense_id}",
    params(("expense_id" = i32, Path, description = "Expense ID")),
    responses(
        (status = 204, description = "Expense deleted successfully"),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn delete_expense(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(expense_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    expense::soft_delete(&state.db, user.id(), expense_id).await?;
    state.invalidate_user_cache(user.id()).await;
    info!("Expense {} deleted", expense_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Spending per category for a month, largest first
#[utoipa::path(
    get,
    path = "/api/v1/expenses/by-category",
    params(MonthQuery),
    responses(
        (status = 200, description = "Totals per category", body = ApiResponse<Vec<CategoryShare>>),
        (status = 400, description = "Invalid month or year", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_expenses_by_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Valid(Query(query)): Valid<Query<MonthQuery>>,
) -> Result<Json<ApiResponse<Vec<CategoryShare>>>, ApiError> {
    let (month, year) = query.resolve();
    let totals = expense::totals_by_category(&state.db, user.id(), month, year).await?;
    let shares = totals
        .into_iter()
        .map(|t| CategoryShare {
            category_id: t.category_id,
            name: t.name,
            icon: t.icon,
            color: t.color,
            total: t.total,
        })
        .collect();
    Ok(Json(ApiResponse::ok(shares, "Expenses by category retrieved successfully")))
}

/// Total expenses of a month in ARS
#[utoipa::path(
    get,
    path = "/api/v1/expenses/monthly-total",
    params(MonthQuery),
    responses(
        (status = 200, description = "Monthly total", body = ApiResponse<MonthlyTotal>),
        (status = 400, description = "Invalid month or year", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_monthly_expense_total(
    State(state): State<AppState>,
    user: CurrentUser,
    Valid(Query(query)): Valid<Query<MonthQuery>>,
) -> Result<Json<ApiResponse<MonthlyTotal>>, ApiError> {
    let (month, year) = query.resolve();
    let total_ars = expense::monthly_total(&state.db, user.id(), month, year).await?;
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

/// Download the filtered expenses as CSV
#[utoipa::path(
    get,
    path = "/api/v1/expenses/export",
    params(ListQuery),
    responses(
        (status = 200, description = "CSV file", content_type = "text/csv", body = String),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "expenses"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn export_expenses(
    State(state): State<AppState>,
    user: CurrentUser,
    Valid(Query(query)): Valid<Query<ListQuery>>,
) -> Result<Response, ApiError> {
    let rows = expense::for_user(user.id(), filter_of(&query))
        .find_also_related(category::Entity)
        .all(&state.db)
        .await?;
    info!("Exporting {} expenses of user {}", rows.len(), user.id());

    let records = rows
        .into_iter()
        .map(|(e, c)| {
            vec![
                e.date.format("%Y-%m-%d").to_string(),
                e.description,
                c.map(|c| c.name).unwrap_or_default(),
                e.amount.to_string(),
                e.currency.code().to_string(),
                e.exchange_rate.to_string(),
                e.amount_ars.to_string(),
                e.payment_method.map(|p| p.as_str().to_string()).unwrap_or_default(),
                e.expense_type.map(|t| t.as_str().to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    csv_attachment(
        "expenses",
        &[
            "Date",
            "Description",
            "Category",
            "Amount",
            "Currency",
            "Exchange rate",
            "Amount ARS",
            "Payment method",
            "Expense type",
        ],
        records,
    )
}
