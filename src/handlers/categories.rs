use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use model::entities::category::{self, CategoryInput, CategoryType};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState};

/// Request structure for creating or updating a category
#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    /// Unique among the user's and the system categories of the same type
    pub name: String,
    /// EXPENSE or INCOME
    #[serde(rename = "type")]
    pub category_type: String,
    /// Bootstrap icon class, e.g. `bi-cart`
    pub icon: Option<String>,
    /// Hex color, e.g. `#28a745`
    pub color: Option<String>,
}

impl CategoryRequest {
    fn into_input(self) -> Result<CategoryInput, ApiError> {
        Ok(CategoryInput {
            category_type: CategoryType::parse(&self.category_type)?,
            name: self.name,
            icon: self.icon.filter(|i| !i.trim().is_empty()),
            color: self.color.filter(|c| !c.trim().is_empty()),
        })
    }
}

/// Response structure for category operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub category_type: String,
    pub is_system: bool,
    pub icon: String,
    pub color: String,
}

impl From<category::Model> for CategoryResponse {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            category_type: model.category_type.as_str().to_string(),
            is_system: model.is_system,
            icon: model.icon,
            color: model.color,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryQuery {
    /// EXPENSE or INCOME; unknown values are ignored
    #[serde(rename = "type")]
    pub category_type: Option<String>,
}

/// List the categories available to the user
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    params(CategoryQuery),
    responses(
        (status = 200, description = "System and own categories, by type and name", body = ApiResponse<Vec<CategoryResponse>>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_categories(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<ApiResponse<Vec<CategoryResponse>>>, ApiError> {
    let category_type = query.category_type.as_deref().and_then(|t| match CategoryType::parse(t) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            debug!("Ignoring unknown category type filter '{}'", t);
            None
        }
    });

    let categories = category::available_for_user(user.id(), category_type).all(&state.db).await?;
    info!("Retrieved {} categories for user {}", categories.len(), user.id());
    Ok(Json(ApiResponse::ok(
        categories.into_iter().map(CategoryResponse::from).collect(),
        "Categories retrieved successfully",
    )))
}

/// Create a new category owned by the user
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created successfully", body = ApiResponse<CategoryResponse>),
        (status = 409, description = "Category name already exists", body = ErrorResponse),
        (status = 422, description = "Invalid request data", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn create_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryResponse>>), ApiError> {
    debug!("Creating category with name: {}", request.name);
    let category = category::create_for_user(&state.db, user.id(), request.into_input()?).await?;
    info!("Category created successfully with ID: {}", category.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(CategoryResponse::from(category), "Category created successfully")),
    ))
}

/// Get a single category by ID
#[utoipa::path(
    get,
    path = "/api/v1/categories/{category_id}",
    params(("category_id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category", body = ApiResponse<CategoryResponse>),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(category_id): Path<i32>,
) -> Result<Json<ApiResponse<CategoryResponse>>, ApiError> {
    let category = category::find_available(&state.db, user.id(), category_id).await?;
    Ok(Json(ApiResponse::ok(CategoryResponse::from(category), "Category retrieved successfully")))
}

/// Update one of the user's categories
#[utoipa::path(
    put,
    path = "/api/v1/categories/{category_id}",
    params(("category_id" = i32, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category updated successfully", body = ApiResponse<CategoryResponse>),
        (status = 403, description = "System categories cannot be modified", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 409, description = "Category name already exists", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn update_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(category_id): Path<i32>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<ApiResponse<CategoryResponse>>, ApiError> {
    let category = category::update_for_user(&state.db, user.id(), category_id, request.into_input()?).await?;
    state.invalidate_user_cache(user.id()).await;
    info!("Category {} updated", category.id);
    Ok(Json(ApiResponse::ok(CategoryResponse::from(category), "Category updated successfully")))
}

/// Soft delete one of the user's categories
#[utoipa::path(
    delete,
    path = "/api/v1/categories/{category_id}",
    params(("category_id" = i32, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Category deleted successfully"),
        (status = 403, description = "System categories cannot be deleted", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn delete_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(category_id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    category::soft_delete_for_user(&state.db, user.id(), category_id).await?;
    state.invalidate_user_cache(user.id()).await;
    info!("Category {} deleted", category_id);
    Ok(StatusCode::NO_CONTENT)
}
