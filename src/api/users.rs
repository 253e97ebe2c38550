//! User management endpoints.

use axum::extract::{Path, State};

use super::{required, success, ApiResult, Json, Query};
use crate::auth::CurrentUser;
use crate::db::NewUser;
use crate::errors::AppError;
use crate::models::{
    access, is_plausible_email, normalize_email, CreateUserRequest, Role, UpdateUserRequest,
    User, UserQuery, MIN_PASSWORD_LEN,
};
use crate::AppState;

fn check_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn hash(password: &str) -> Result<String, AppError> {
    User::hash_password(password)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Station-bound roles need an existing station; the others get none.
async fn resolve_station(
    state: &AppState,
    role: Role,
    station_id: Option<&str>,
) -> Result<Option<String>, AppError> {
    if !role.is_station_bound() {
        return Ok(None);
    }
    let station_id = station_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| {
            AppError::Validation(format!("Role {} requires a stationId", role.as_str()))
        })?;
    if state.repo.get_station(station_id).await?.is_none() {
        return Err(AppError::Validation(format!(
            "Station {} does not exist",
            station_id
        )));
    }
    Ok(Some(station_id.to_string()))
}

/// GET /api/users - List users. Station managers see their own station only.
pub async fn list_users(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(mut query): Query<UserQuery>,
) -> ApiResult<Vec<User>> {
    user.require(access::MANAGERS)?;
    query.station_id = user.station_scope(query.station_id.take())?;
    success(state.repo.list_users(&query).await?)
}

/// GET /api/users/{id} - Get a single user.
pub async fn get_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<User> {
    user.require(access::MANAGERS)?;
    match state.repo.get_user(&id).await? {
        Some(found)
            if user.is_super_admin()
                || found
                    .station_id
                    .as_deref()
                    .is_some_and(|s| user.can_access_station(s)) =>
        {
            success(found)
        }
        _ => Err(AppError::NotFound(format!("User {} not found", id))),
    }
}

/// POST /api/users - Create a user.
pub async fn create_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<User> {
    user.require(access::ADMIN)?;

    let name = required(&request.name, "Name")?;
    let email = normalize_email(&request.email);
    if !is_plausible_email(&email) {
        return Err(AppError::Validation(format!("Invalid email: {}", request.email)));
    }
    check_password(&request.password)?;
    let station_id = resolve_station(&state, request.role, request.station_id.as_deref()).await?;

    let created = state
        .repo
        .create_user(NewUser {
            name: &name,
            email: &email,
            password_hash: hash(&request.password)?,
            role: request.role,
            station_id: station_id.as_deref(),
            active: request.active,
        })
        .await?;
    success(created)
}

/// PUT /api/users/{id} - Update a user.
pub async fn update_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(mut request): Json<UpdateUserRequest>,
) -> ApiResult<User> {
    user.require(access::ADMIN)?;

    let existing = state
        .repo
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

    if let Some(name) = &request.name {
        required(name, "Name")?;
    }
    if let Some(email) = &request.email {
        if !is_plausible_email(&normalize_email(email)) {
            return Err(AppError::Validation(format!("Invalid email: {}", email)));
        }
    }
    let password_hash = match &request.password {
        Some(password) => {
            check_password(password)?;
            Some(hash(password)?)
        }
        None => None,
    };

    let role = request.role.unwrap_or(existing.role);
    let station_id = request.station_id.clone().or(existing.station_id.clone());
    request.station_id = resolve_station(&state, role, station_id.as_deref()).await?;

    if id == user.id && (request.active == Some(false) || role != Role::SuperAdmin) {
        return Err(AppError::Validation(
            "You cannot deactivate or demote your own account".to_string(),
        ));
    }

    success(state.repo.update_user(&id, &request, password_hash).await?)
}

/// DELETE /api/users/{id} - Delete a user.
pub async fn delete_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    user.require(access::ADMIN)?;
    if id == user.id {
        return Err(AppError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }
    state.repo.delete_user(&id).await?;
    success(())
}
