//! Image upload endpoint.

use axum::extract::{Multipart, State};
use chrono::Utc;

use super::{success, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::access;
use crate::uploads::{store_image, StoredImage};
use crate::AppState;

/// Fields of a photo form: the `file` part and an optional `context` text part.
pub(crate) struct PhotoForm {
    pub filename: String,
    pub data: Vec<u8>,
    pub context: Option<String>,
}

pub(crate) async fn read_photo_form(mut multipart: Multipart) -> Result<PhotoForm, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut context = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart request: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .ok_or_else(|| {
                        AppError::Validation("No filename provided in file field".to_string())
                    })?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Multipart error: {}", e)))?;
                file = Some((filename, data.to_vec()));
            }
            Some("context") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Multipart error: {}", e)))?;
                context = Some(text);
            }
            _ => {}
        }
    }

    let (filename, data) = file.ok_or_else(|| {
        AppError::Validation("No 'file' field found. Field name must be 'file'".to_string())
    })?;
    Ok(PhotoForm {
        filename,
        data,
        context,
    })
}

/// POST /api/uploads - Store an image and its thumbnail.
pub async fn upload_image(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> ApiResult<StoredImage> {
    user.require(access::ANYONE)?;
    let form = read_photo_form(multipart).await?;

    let upload_dir = state.config.upload_dir.clone();
    let stored = tokio::task::spawn_blocking(move || {
        store_image(&upload_dir, &form.data, &form.filename, Utc::now())
    })
    .await
    .map_err(|e| AppError::Internal(format!("Image task failed: {}", e)))??;

    tracing::info!("{} uploaded {}", user.email, stored.url);
    success(stored)
}
