//! Station API endpoints.

use axum::extract::{Path, State};

use super::{required, success, ApiResult, Json};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{
    access, validate_coordinates, CreateStationRequest, Station, UpdateStationRequest,
};
use crate::AppState;

/// GET /api/stations - List all stations.
pub async fn list_stations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<Station>> {
    user.require(access::ANYONE)?;
    success(state.repo.list_stations().await?)
}

/// GET /api/stations/{id} - Get a single station.
pub async fn get_station(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Station> {
    user.require(access::ANYONE)?;
    match state.repo.get_station(&id).await? {
        Some(station) => success(station),
        None => Err(AppError::NotFound(format!("Station {} not found", id))),
    }
}

/// POST /api/stations - Create a station.
pub async fn create_station(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateStationRequest>,
) -> ApiResult<Station> {
    user.require(access::ADMIN)?;

    required(&request.name, "Name")?;
    required(&request.code, "Code")?;
    required(&request.region, "Region")?;
    validate_coordinates(request.latitude, request.longitude).map_err(AppError::Validation)?;

    let station = state.repo.create_station(&request).await?;
    tracing::info!("Station {} ({}) created by {}", station.code, station.id, user.email);
    success(station)
}

/// PUT /api/stations/{id} - Update a station.
pub async fn update_station(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateStationRequest>,
) -> ApiResult<Station> {
    user.require(access::ADMIN)?;

    for (value, field) in [
        (&request.name, "Name"),
        (&request.code, "Code"),
        (&request.region, "Region"),
    ] {
        if let Some(value) = value {
            required(value, field)?;
        }
    }

    let existing = state
        .repo
        .get_station(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Station {} not found", id)))?;
    validate_coordinates(
        request.latitude.or(existing.latitude),
        request.longitude.or(existing.longitude),
    )
    .map_err(AppError::Validation)?;

    success(state.repo.update_station(&id, &request).await?)
}

/// DELETE /api/stations/{id} - Delete a station with nothing attached to it.
pub async fn delete_station(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    user.require(access::ADMIN)?;
    state.repo.delete_station(&id).await?;
    tracing::info!("Station {} deleted by {}", id, user.email);
    success(())
}
