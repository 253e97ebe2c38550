//! Amenity catalog and per-station amenity instances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Condition of a station amenity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AmenityStatus {
    Ok,
    NeedsMaintenance,
    OutOfService,
}

impl AmenityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmenityStatus::Ok => "ok",
            AmenityStatus::NeedsMaintenance => "needs_maintenance",
            AmenityStatus::OutOfService => "out_of_service",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ok" => Some(AmenityStatus::Ok),
            "needs_maintenance" => Some(AmenityStatus::NeedsMaintenance),
            "out_of_service" => Some(AmenityStatus::OutOfService),
            _ => None,
        }
    }
}

/// Catalog entry such as a water booth or a toilet block.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmenityType {
    pub id: String,
    pub key: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Amenity types seeded on first start: (key, label).
pub const DEFAULT_AMENITY_TYPES: &[(&str, &str)] = &[
    ("water_booth", "Water Booth"),
    ("toilet", "Toilet"),
    ("seating", "Seating"),
    ("waiting_room", "Waiting Room"),
    ("lighting", "Lighting"),
    ("dustbin", "Dustbin"),
    ("ramp", "Ramp"),
    ("display_board", "Display Board"),
];

/// Request body for adding an amenity type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAmenityTypeRequest {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Keys are lower-case identifiers, used as map keys in MIS reports.
pub fn is_valid_type_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// One physical amenity at a station.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationAmenity {
    pub id: String,
    pub station_id: String,
    pub amenity_type_id: String,
    pub name: String,
    pub status: AmenityStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_inspected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// Request body for creating a station amenity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAmenityRequest {
    pub station_id: String,
    pub amenity_type_id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<AmenityStatus>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
}

/// Request body for updating a station amenity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAmenityRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<AmenityStatus>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Option<Vec<String>>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

/// Query parameters for listing amenities.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmenityQuery {
    #[serde(default)]
    pub station_id: Option<String>,
    #[serde(default)]
    pub amenity_type_id: Option<String>,
    #[serde(default)]
    pub status: Option<AmenityStatus>,
}
