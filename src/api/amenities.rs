//! Station amenity endpoints.

use axum::extract::{Path, State};

use super::{required, success, ApiResult, Json, Query};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{
    access, AmenityQuery, CreateAmenityRequest, StationAmenity, UpdateAmenityRequest,
};
use crate::AppState;

/// Load an amenity the caller may see; anything else reads as missing.
pub(crate) async fn visible_amenity(
    state: &AppState,
    user: &CurrentUser,
    id: &str,
) -> Result<StationAmenity, AppError> {
    state
        .repo
        .get_amenity(id)
        .await?
        .filter(|amenity| user.can_access_station(&amenity.station_id))
        .ok_or_else(|| AppError::NotFound(format!("Amenity {} not found", id)))
}

/// GET /api/amenities - List amenities, scoped to the caller's station.
pub async fn list_amenities(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(mut query): Query<AmenityQuery>,
) -> ApiResult<Vec<StationAmenity>> {
    user.require(access::OPERATORS)?;
    query.station_id = user.station_scope(query.station_id.take())?;
    success(state.repo.list_amenities(&query).await?)
}

/// GET /api/amenities/{id} - Get a single amenity.
pub async fn get_amenity(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StationAmenity> {
    user.require(access::OPERATORS)?;
    success(visible_amenity(&state, &user, &id).await?)
}

/// POST /api/amenities - Add an amenity to a station.
pub async fn create_amenity(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(mut request): Json<CreateAmenityRequest>,
) -> ApiResult<StationAmenity> {
    user.require(access::MANAGERS)?;

    required(&request.name, "Name")?;
    if let Some(station_id) = user.station_scope(Some(request.station_id.clone()))? {
        request.station_id = station_id;
    }
    if state.repo.get_station(&request.station_id).await?.is_none() {
        return Err(AppError::Validation(format!(
            "Station {} does not exist",
            request.station_id
        )));
    }
    if state
        .repo
        .get_amenity_type(&request.amenity_type_id)
        .await?
        .is_none()
    {
        return Err(AppError::Validation(format!(
            "Amenity type {} does not exist",
            request.amenity_type_id
        )));
    }

    success(state.repo.create_amenity(&request).await?)
}

/// PUT /api/amenities/{id} - Update an amenity.
///
/// Send `expectedVersion` to fail with 409 if someone else changed it first.
pub async fn update_amenity(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateAmenityRequest>,
) -> ApiResult<StationAmenity> {
    user.require(access::MANAGERS)?;
    visible_amenity(&state, &user, &id).await?;

    if let Some(name) = &request.name {
        required(name, "Name")?;
    }

    success(state.repo.update_amenity(&id, &request).await?)
}

/// DELETE /api/amenities/{id} - Remove an amenity.
pub async fn delete_amenity(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    user.require(access::MANAGERS)?;
    visible_amenity(&state, &user, &id).await?;
    state.repo.delete_amenity(&id).await?;
    success(())
}
