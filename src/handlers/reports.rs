use axum::{extract::State, response::Json};
use common::Dashboard;
use tracing::{debug, info, instrument};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::schemas::{ApiResponse, AppState, CachedData};

/// Dashboard for the current month: balance against last month, budget
/// alerts, savings progress, latest transactions and the expense breakdown
#[utoipa::path(
    get,
    path = "/api/v1/reports/dashboard",
    responses(
        (status = 200, description = "Dashboard of the current month", body = ApiResponse<Dashboard>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reports"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn get_dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ApiResponse<Dashboard>>, ApiError> {
    let today = common::today();
    let cache_key = AppState::dashboard_key(user.id(), today);

    // Check cache first
    if let Some(CachedData::Dashboard(dashboard)) = state.cache.get(&cache_key).await {
        debug!("Dashboard of user {} served from cache", user.id());
        return Ok(Json(ApiResponse::ok(*dashboard, "Dashboard retrieved from cache")));
    }

    let dashboard = compute::default_dashboard(Some(today)).compute(&state.db, user.id()).await?;
    state
        .cache
        .insert(cache_key, CachedData::Dashboard(Box::new(dashboard.clone())))
        .await;

    info!(
        "Computed dashboard of user {}: {} recent transactions, {} budgets",
        user.id(),
        dashboard.recent_transactions.len(),
        dashboard.budgets.budget_count
    );
    Ok(Json(ApiResponse::ok(dashboard, "Dashboard retrieved successfully")))
}
