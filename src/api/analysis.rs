//! Photo analysis endpoint.

use axum::extract::{Multipart, State};

use super::uploads::read_photo_form;
use super::{success, ApiResult};
use crate::analysis::PhotoAnalysis;
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::access;
use crate::uploads::prepare_for_analysis;
use crate::AppState;

/// POST /api/analysis/photo - Describe a photo and suggest an amenity status.
pub async fn analyze_photo(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> ApiResult<PhotoAnalysis> {
    user.require(access::OPERATORS)?;

    if !state.analyzer.is_configured() {
        return Err(AppError::Unavailable(
            "Photo analysis is not configured".to_string(),
        ));
    }
    if !state.repo.get_settings().await?.ai_analysis_enabled {
        return Err(AppError::Unavailable(
            "Photo analysis is disabled".to_string(),
        ));
    }

    let form = read_photo_form(multipart).await?;
    let filename = form.filename;
    let data = form.data;
    let jpeg = tokio::task::spawn_blocking(move || prepare_for_analysis(&data, &filename))
        .await
        .map_err(|e| AppError::Internal(format!("Image task failed: {}", e)))??;

    let analysis = state.analyzer.analyze(&jpeg, form.context.as_deref()).await?;
    tracing::info!(
        "Photo analysed for {}: {:?}",
        user.email,
        analysis.suggested_status
    );
    success(analysis)
}
