//! Image upload storage.
//!
//! Uploaded images are decoded, re-encoded as JPEG and written under
//! `<upload_dir>/<YYYY>/<MM>/` with a thumbnail next to them.

use std::io::Cursor;
use std::path::Path;

use chrono::{DateTime, Datelike, Utc};
use image::DynamicImage;
use serde::Serialize;

use crate::errors::AppError;

/// Maximum file size (5MB)
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Supported image formats
const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// JPEG quality for stored photos
const JPEG_QUALITY: u8 = 85;

/// Longest edge of a thumbnail, in pixels
const THUMBNAIL_SIZE: u32 = 320;

/// URL prefix the upload directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// A stored image and where to fetch it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredImage {
    pub url: String,
    pub thumbnail_url: String,
    pub size: usize,
}

/// Lower-cased extension of `filename` if it is an accepted image format.
pub fn image_extension(filename: &str) -> Result<String, AppError> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .ok_or_else(|| AppError::Validation(format!("Invalid file extension for: {}", filename)))?;

    if !SUPPORTED_FORMATS.contains(&ext.as_str()) {
        return Err(AppError::Validation(format!(
            "Unsupported file format '{}'. Supported: {}",
            ext,
            SUPPORTED_FORMATS.join(", ")
        )));
    }
    Ok(ext)
}

/// Check size and format, then decode.
pub fn decode_image(data: &[u8], filename: &str) -> Result<DynamicImage, AppError> {
    if data.is_empty() {
        return Err(AppError::Validation("Empty file provided".to_string()));
    }
    if data.len() > MAX_FILE_SIZE {
        return Err(AppError::Validation(format!(
            "File too large. Maximum size is {} bytes ({}MB)",
            MAX_FILE_SIZE,
            MAX_FILE_SIZE / 1024 / 1024
        )));
    }
    let ext = image_extension(filename)?;

    image::load_from_memory(data)
        .map_err(|e| AppError::Validation(format!("Invalid image file ({}): {}", ext, e)))
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, AppError> {
    let mut buffer = Vec::new();
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(Cursor::new(&mut buffer), JPEG_QUALITY);
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| AppError::Internal(format!("Failed to encode image: {}", e)))?;
    Ok(buffer)
}

/// Longest edge of an image sent for analysis, in pixels
const ANALYSIS_SIZE: u32 = 1024;

/// Validate an image and shrink it to a JPEG suitable for photo analysis.
///
/// Blocking; run it on the blocking pool.
pub fn prepare_for_analysis(data: &[u8], filename: &str) -> Result<Vec<u8>, AppError> {
    let img = decode_image(data, filename)?;
    if img.width() > ANALYSIS_SIZE || img.height() > ANALYSIS_SIZE {
        encode_jpeg(&img.thumbnail(ANALYSIS_SIZE, ANALYSIS_SIZE))
    } else {
        encode_jpeg(&img)
    }
}

/// Validate, convert and write an uploaded image plus its thumbnail.
///
/// Blocking; run it on the blocking pool.
pub fn store_image(
    upload_dir: &Path,
    data: &[u8],
    filename: &str,
    now: DateTime<Utc>,
) -> Result<StoredImage, AppError> {
    let img = decode_image(data, filename)?;
    let full = encode_jpeg(&img)?;
    let thumbnail = encode_jpeg(&img.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE))?;

    let dir = upload_dir
        .join(format!("{:04}", now.year()))
        .join(format!("{:02}", now.month()));
    std::fs::create_dir_all(&dir)
        .map_err(|e| AppError::Internal(format!("Failed to create upload directory: {}", e)))?;

    let name = format!("{}.jpg", uuid::Uuid::new_v4().simple());
    let thumb_name = format!("thumb_{}", name);

    std::fs::write(dir.join(&name), &full)
        .map_err(|e| AppError::Internal(format!("Failed to write image: {}", e)))?;
    std::fs::write(dir.join(&thumb_name), &thumbnail)
        .map_err(|e| AppError::Internal(format!("Failed to write thumbnail: {}", e)))?;

    let url_dir = format!("{}/{:04}/{:02}", PUBLIC_PREFIX, now.year(), now.month());
    tracing::info!("Stored upload {}/{} ({} bytes)", url_dir, name, full.len());

    Ok(StoredImage {
        url: format!("{}/{}", url_dir, name),
        thumbnail_url: format!("{}/{}", url_dir, thumb_name),
        size: full.len(),
    })
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb([40, 120, 200]),
    ));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}
