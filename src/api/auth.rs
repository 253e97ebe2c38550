//! Login, logout and self-registration.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{required, success, ApiResponse, ApiResult, Json};
use crate::auth::{clear_session_cookie, session_cookie, session_token, CurrentUser};
use crate::db::NewUser;
use crate::errors::AppError;
use crate::models::{is_plausible_email, normalize_email, Role, User, MIN_PASSWORD_LEN};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// A new session and its owner.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

fn with_cookie<T: serde::Serialize>(body: ApiResponse<T>, cookie: String) -> Response {
    ([(header::SET_COOKIE, cookie)], body).into_response()
}

/// POST /api/auth/login - Exchange credentials for a session.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let email = normalize_email(&request.email);
    let rejected = || AppError::Unauthorized("Invalid email or password".to_string());

    let user = state
        .repo
        .find_user_by_email(&email)
        .await?
        .ok_or_else(rejected)?;

    let valid = user
        .verify_password(&request.password)
        .map_err(|e| AppError::Internal(format!("Stored password hash is invalid: {}", e)))?;
    if !valid {
        tracing::info!("Failed login for {}", email);
        return Err(rejected());
    }
    if !user.active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    let ttl = Duration::hours(state.config.session_ttl_hours);
    let session = state.repo.create_session(&user.id, ttl).await?;
    tracing::info!("User {} logged in", user.email);

    let cookie = session_cookie(&session.token, ttl, state.config.cookie_secure);
    let body = ApiResponse::new(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        user,
    });
    Ok(with_cookie(body, cookie))
}

/// POST /api/auth/logout - End the current session.
pub async fn logout(
    State(state): State<AppState>,
    _user: CurrentUser,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = session_token(&headers) {
        state.repo.delete_session(&token).await?;
    }
    Ok(with_cookie(
        ApiResponse::new(()),
        clear_session_cookie(state.config.cookie_secure),
    ))
}

/// GET /api/auth/me - The signed-in user.
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> ApiResult<User> {
    match state.repo.get_user(&user.id).await? {
        Some(user) => success(user),
        None => Err(AppError::Unauthorized("Session user no longer exists".to_string())),
    }
}

/// POST /api/auth/register - Create a public account.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<User> {
    let name = required(&request.name, "Name")?;
    let email = normalize_email(&request.email);
    if !is_plausible_email(&email) {
        return Err(AppError::Validation(format!("Invalid email: {}", request.email)));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let password_hash = User::hash_password(&request.password)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

    let user = state
        .repo
        .create_user(NewUser {
            name: &name,
            email: &email,
            password_hash,
            role: Role::Public,
            station_id: None,
            active: true,
        })
        .await?;

    tracing::info!("Public user {} registered", user.email);
    success(user)
}
