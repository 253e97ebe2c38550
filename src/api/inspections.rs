//! Inspection endpoints.

use axum::extract::{Path, State};

use super::amenities::visible_amenity;
use super::{send_station_alert, success, ApiResponse, ApiResult, Json, Query};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{
    access, AmenityStatus, CreateInspectionRequest, Inspection, InspectionQuery,
};
use crate::AppState;

/// GET /api/inspections - List inspections, newest first.
pub async fn list_inspections(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(mut query): Query<InspectionQuery>,
) -> ApiResult<Vec<Inspection>> {
    user.require(access::OPERATORS)?;
    query.station_id = user.station_scope(query.station_id.take())?;
    success(state.repo.list_inspections(&query).await?)
}

/// GET /api/inspections/{id} - Get a single inspection.
pub async fn get_inspection(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Inspection> {
    user.require(access::OPERATORS)?;
    state
        .repo
        .get_inspection(&id)
        .await?
        .filter(|inspection| user.can_access_station(&inspection.station_id))
        .map(ApiResponse::new)
        .ok_or_else(|| AppError::NotFound(format!("Inspection {} not found", id)))
}

/// POST /api/inspections - Record an inspection and update the amenity's status.
pub async fn create_inspection(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateInspectionRequest>,
) -> ApiResult<Inspection> {
    user.require(access::OPERATORS)?;
    let amenity = visible_amenity(&state, &user, &request.amenity_id).await?;

    let inspection = state
        .repo
        .create_inspection(&amenity, &request, &user.id)
        .await?;

    let went_down = inspection.status == AmenityStatus::OutOfService
        && amenity.status != AmenityStatus::OutOfService;
    if went_down {
        let alerts_on = state
            .repo
            .get_settings()
            .await
            .map(|s| s.out_of_service_alerts)
            .unwrap_or(true);
        if alerts_on {
            let station_code = state
                .repo
                .get_station(&amenity.station_id)
                .await
                .ok()
                .flatten()
                .map(|s| s.code)
                .unwrap_or_else(|| amenity.station_id.clone());
            let subject = format!("[{}] Out of service: {}", station_code, amenity.name);
            let body = format!(
                "Inspection {} by {} found {} out of service.\n\nNotes: {}\n",
                inspection.id,
                user.name,
                amenity.name,
                inspection.notes.as_deref().unwrap_or("-")
            );
            send_station_alert(&state, &amenity.station_id, &subject, &body).await;
        }
    }

    success(inspection)
}
