//! REST API module.
//!
//! Handlers for every route under `/api`. Each handler authenticates through the
//! [`CurrentUser`](crate::auth::CurrentUser) extractor and answers with the
//! `{success, data}` envelope.

mod amenities;
mod amenity_types;
mod analysis;
mod auth;
mod extract;
mod inspections;
mod issues;
mod reports;
mod settings;
mod stations;
mod uploads;
mod users;

pub use amenities::*;
pub use amenity_types::*;
pub use analysis::*;
pub use auth::*;
pub use extract::{Json, Query};
pub use inspections::*;
pub use issues::*;
pub use reports::*;
pub use settings::*;
pub use stations::*;
pub use uploads::*;
pub use users::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, axum::Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Trimmed, non-empty text field or a validation error naming it.
pub(crate) fn required(value: &str, field: &str) -> Result<String, crate::errors::AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(crate::errors::AppError::Validation(format!(
            "{} is required",
            field
        )));
    }
    Ok(value.to_string())
}

/// Mail an alert about a station to the configured alert addresses and the
/// station's managers. Failures are logged and never fail the request.
pub(crate) async fn send_station_alert(
    state: &crate::AppState,
    station_id: &str,
    subject: &str,
    body: &str,
) {
    if !state.mailer.is_enabled() {
        return;
    }

    let configured = match state.repo.get_settings().await {
        Ok(settings) => settings.alert_emails,
        Err(e) => {
            tracing::warn!("Could not load alert settings: {}", e);
            Vec::new()
        }
    };
    let managers = state
        .repo
        .list_users(&crate::models::UserQuery {
            role: Some(crate::models::Role::StationManager),
            station_id: Some(station_id.to_string()),
        })
        .await
        .unwrap_or_else(|e| {
            tracing::warn!("Could not load managers of station {}: {}", station_id, e);
            Vec::new()
        });

    let recipients = crate::mail::alert_recipients(
        &configured,
        managers.into_iter().filter(|m| m.active).map(|m| m.email),
    );
    if recipients.is_empty() {
        tracing::debug!("No recipients for alert {:?}", subject);
        return;
    }
    if let Err(e) = state.mailer.send(&recipients, subject, body).await {
        tracing::warn!("Failed to send alert {:?}: {}", subject, e);
    }
}
