//! Amenity type catalog endpoints.

use axum::extract::State;

use super::{required, success, ApiResult, Json};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{access, is_valid_type_key, AmenityType, CreateAmenityTypeRequest};
use crate::AppState;

/// GET /api/amenity-types - List the amenity catalog.
pub async fn list_amenity_types(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<AmenityType>> {
    user.require(access::ANYONE)?;
    success(state.repo.list_amenity_types().await?)
}

/// POST /api/amenity-types - Add an amenity type.
pub async fn create_amenity_type(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateAmenityTypeRequest>,
) -> ApiResult<AmenityType> {
    user.require(access::ADMIN)?;

    if !is_valid_type_key(&request.key) {
        return Err(AppError::Validation(format!(
            "Invalid key '{}': use lower-case letters, digits and underscores",
            request.key
        )));
    }
    required(&request.label, "Label")?;

    success(state.repo.create_amenity_type(&request).await?)
}
