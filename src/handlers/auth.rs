use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use model::currency::Currency;
use model::entities::{access_attempt, user};
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use utoipa::ToSchema;

use crate::auth::{hash_password, verify_password, ClientIp, CurrentUser};
use crate::error::ApiError;
use crate::logging::SECURITY_TARGET;
use crate::schemas::{ApiResponse, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Must repeat `password`
    pub password_confirm: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Username or email, case-insensitive
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest").field("username", &self.username).finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProfileUpdateRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// ARS or USD
    pub default_currency: Option<String>,
    /// Budget usage percentage (1-100) that triggers a warning
    pub alert_threshold: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

impl std::fmt::Debug for ChangePasswordRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangePasswordRequest").finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub default_currency: String,
    pub alert_threshold: i32,
    pub is_staff: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            full_name: model.full_name(),
            id: model.id,
            username: model.username,
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            default_currency: model.default_currency.code().to_string(),
            alert_threshold: model.alert_threshold,
            is_staff: model.is_staff,
            last_login: model.last_login,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub user: UserResponse,
}

fn token_response(state: &AppState, user: user::Model) -> Result<TokenResponse, ApiError> {
    Ok(TokenResponse {
        access_token: state.auth.issue_token(user.id)?,
        token_type: "Bearer".to_string(),
        expires_in: state.auth.expires_in_seconds(),
        user: UserResponse::from(user),
    })
}

/// Register a new user and sign them in
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = ApiResponse<TokenResponse>),
        (status = 409, description = "Username or email already in use", body = ErrorResponse),
        (status = 422, description = "Invalid registration data", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(state, request), fields(username = %request.username))]
pub async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TokenResponse>>), ApiError> {
    debug!("Registering user {}", request.username);
    user::validate_registration(&request.username, &request.email, &request.password, &request.password_confirm)?;

    if user::username_taken(&state.db, &request.username, None).await? {
        return Err(ApiError::Conflict("A user with this username already exists".to_string()));
    }
    if user::email_taken(&state.db, &request.email, None).await? {
        return Err(ApiError::Conflict("A user with this email already exists".to_string()));
    }

    let mut active = <user::ActiveModel as sea_orm::ActiveModelBehavior>::new();
    active.username = Set(request.username.trim().to_string());
    active.email = Set(request.email.trim().to_lowercase());
    active.password_hash = Set(hash_password(&request.password)?);
    active.first_name = Set(request.first_name.unwrap_or_default().trim().to_string());
    active.last_name = Set(request.last_name.unwrap_or_default().trim().to_string());
    active.last_login = Set(Some(Utc::now()));

    let user = active.insert(&state.db).await?;
    info!(target: SECURITY_TARGET, event = "registration", user_id = user.id, username = %user.username, ip = %ip, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok(token_response(&state, user)?, "User registered successfully")),
    ))
}

/// Log in with username or email
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 429, description = "Too many failed attempts", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(state, request), fields(username = %request.username, ip = %ip))]
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let auth_settings = &state.settings.auth;
    let limit = auth_settings.failure_limit;
    let cooloff = auth_settings.cooloff();

    // Counters follow the account, whether it was named by username or email
    let candidate = user::find_by_login(&state.db, &request.username).await?;
    let account = candidate
        .as_ref()
        .map(|user| user.username.clone())
        .unwrap_or_else(|| request.username.clone());

    if let Some(until) = access_attempt::active_lock(&state.db, &account, &ip, limit, cooloff).await? {
        warn!(target: SECURITY_TARGET, event = "login_locked", username = %account, ip = %ip, until = %until, "Login refused while locked out");
        return Err(ApiError::Locked { until });
    }

    let authenticated = match candidate {
        Some(user) if user.is_active && verify_password(&request.password, &user.password_hash)? => Some(user),
        _ => None,
    };

    let Some(user) = authenticated else {
        let attempt = access_attempt::record_failure(&state.db, &account, &ip, cooloff).await?;
        warn!(target: SECURITY_TARGET, event = "login_failure", username = %account, ip = %ip, failures = attempt.failures, "Failed login");
        if let Some(until) = access_attempt::active_lock(&state.db, &account, &ip, limit, cooloff).await? {
            warn!(target: SECURITY_TARGET, event = "lockout", username = %account, ip = %ip, until = %until, "Login locked out");
            return Err(ApiError::Locked { until });
        }
        return Err(ApiError::Unauthorized("Invalid username or password".to_string()));
    };

    access_attempt::reset(&state.db, &account, &ip).await?;
    let mut active: user::ActiveModel = user.into();
    active.last_login = Set(Some(Utc::now()));
    let user = active.update(&state.db).await?;
    info!(target: SECURITY_TARGET, event = "login_success", user_id = user.id, username = %user.username, ip = %ip, "User logged in");

    Ok(Json(ApiResponse::ok(token_response(&state, user)?, "Logged in successfully")))
}

/// Log out. Tokens are stateless; the client discards its copy.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = ApiResponse<String>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
#[instrument(skip(user), fields(user_id = user.id()))]
pub async fn logout(user: CurrentUser, ClientIp(ip): ClientIp) -> Json<ApiResponse<String>> {
    info!(target: SECURITY_TARGET, event = "logout", user_id = user.id(), username = %user.0.username, ip = %ip, "User logged out");
    Json(ApiResponse::ok(String::new(), "Logged out successfully"))
}

/// Get the current user's profile
#[utoipa::path(
    get,
    path = "/api/v1/auth/profile",
    responses(
        (status = 200, description = "Profile", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
#[instrument(skip(user), fields(user_id = user.id()))]
pub async fn get_profile(user: CurrentUser) -> Json<ApiResponse<UserResponse>> {
    Json(ApiResponse::ok(UserResponse::from(user.0), "Profile retrieved successfully"))
}

/// Update the current user's profile
#[utoipa::path(
    put,
    path = "/api/v1/auth/profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<UserResponse>),
        (status = 409, description = "Email already in use", body = ErrorResponse),
        (status = 422, description = "Invalid data", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ProfileUpdateRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let default_currency = request.default_currency.as_deref().map(Currency::parse).transpose()?;
    let update = user::ProfileUpdate {
        first_name: request.first_name,
        last_name: request.last_name,
        email: request.email,
        default_currency,
        alert_threshold: request.alert_threshold,
    };
    let user_id = user.id();
    let updated = user::update_profile(&state.db, user.0, update).await?;
    state.invalidate_user_cache(user_id).await;
    info!("Updated profile of user {}", user_id);
    Ok(Json(ApiResponse::ok(UserResponse::from(updated), "Profile updated successfully")))
}

/// Change the current user's password
#[utoipa::path(
    post,
    path = "/api/v1/auth/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<String>),
        (status = 422, description = "Old password wrong or new password invalid", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
#[instrument(skip(state, user, request), fields(user_id = user.id()))]
pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    ClientIp(ip): ClientIp,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    if !verify_password(&request.old_password, &user.0.password_hash)? {
        warn!(target: SECURITY_TARGET, event = "password_change_denied", user_id = user.id(), ip = %ip, "Wrong current password");
        return Err(ApiError::validation("old_password", "Current password is incorrect"));
    }
    user::validate_new_password(&request.new_password, &request.new_password_confirm)?;

    let user_id = user.id();
    let mut active: user::ActiveModel = user.0.into();
    active.password_hash = Set(hash_password(&request.new_password)?);
    active.update(&state.db).await?;
    info!(target: SECURITY_TARGET, event = "password_change", user_id, ip = %ip, "Password changed");

    Ok(Json(ApiResponse::ok(String::new(), "Password changed successfully")))
}
