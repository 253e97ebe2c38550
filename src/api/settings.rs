//! System configuration endpoints.

use axum::extract::State;

use super::{success, ApiResult, Json};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{access, is_plausible_email, normalize_email, SystemSettings};
use crate::AppState;

/// GET /api/config - Current system settings.
pub async fn get_config(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<SystemSettings> {
    user.require(access::ANYONE)?;
    success(state.repo.get_settings().await?)
}

/// PUT /api/config - Replace the system settings.
pub async fn update_config(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(mut settings): Json<SystemSettings>,
) -> ApiResult<SystemSettings> {
    user.require(access::ADMIN)?;

    if settings.site_name.trim().is_empty() {
        return Err(AppError::Validation("siteName is required".to_string()));
    }
    if settings.inspection_interval_days == 0 {
        return Err(AppError::Validation(
            "inspectionIntervalDays must be at least 1".to_string(),
        ));
    }

    let mut emails = Vec::with_capacity(settings.alert_emails.len());
    for email in &settings.alert_emails {
        let email = normalize_email(email);
        if !is_plausible_email(&email) {
            return Err(AppError::Validation(format!("Invalid alert email: {}", email)));
        }
        if !emails.contains(&email) {
            emails.push(email);
        }
    }
    settings.alert_emails = emails;
    settings.site_name = settings.site_name.trim().to_string();

    state.repo.save_settings(&settings).await?;
    tracing::info!("System settings updated by {}", user.email);
    success(settings)
}
