//! Inspection records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AmenityStatus;

/// One check of a station amenity. Never modified after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub id: String,
    pub amenity_id: String,
    pub station_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspector_id: Option<String>,
    pub status: AmenityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Request body for recording an inspection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInspectionRequest {
    pub amenity_id: String,
    pub status: AmenityStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
}

/// Filters for listing inspections.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionQuery {
    #[serde(default)]
    pub station_id: Option<String>,
    #[serde(default)]
    pub amenity_id: Option<String>,
}
