//! Amenity type catalog and station amenity operations.

use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite};

use super::repository::{
    parse_json_array, parse_optional_timestamp, parse_timestamp, timestamp, to_json_array,
    Repository,
};
use crate::errors::AppError;
use crate::models::{
    AmenityQuery, AmenityStatus, AmenityType, CreateAmenityRequest, CreateAmenityTypeRequest,
    StationAmenity, UpdateAmenityRequest,
};

const AMENITY_COLUMNS: &str = "id, station_id, amenity_type_id, name, status, last_inspected_at, notes, photos, created_at, updated_at, version";

impl Repository {
    // ==================== AMENITY TYPES ====================

    /// List the amenity catalog.
    pub async fn list_amenity_types(&self) -> Result<Vec<AmenityType>, AppError> {
        let rows = sqlx::query(
            "SELECT id, key, label, description, created_at FROM amenity_types ORDER BY label",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(amenity_type_from_row).collect())
    }

    /// Get an amenity type by ID.
    pub async fn get_amenity_type(&self, id: &str) -> Result<Option<AmenityType>, AppError> {
        let row = sqlx::query(
            "SELECT id, key, label, description, created_at FROM amenity_types WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(amenity_type_from_row))
    }

    /// Add an amenity type to the catalog.
    pub async fn create_amenity_type(
        &self,
        request: &CreateAmenityTypeRequest,
    ) -> Result<AmenityType, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO amenity_types (id, key, label, description, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.key)
        .bind(request.label.trim())
        .bind(&request.description)
        .bind(timestamp(&now))
        .execute(&self.pool)
        .await?;

        Ok(AmenityType {
            id,
            key: request.key.clone(),
            label: request.label.trim().to_string(),
            description: request.description.clone(),
            created_at: now,
        })
    }

    // ==================== STATION AMENITIES ====================

    /// List station amenities matching the filter.
    pub async fn list_amenities(
        &self,
        filter: &AmenityQuery,
    ) -> Result<Vec<StationAmenity>, AppError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM station_amenities WHERE 1 = 1",
            AMENITY_COLUMNS
        ));
        if let Some(station_id) = &filter.station_id {
            query.push(" AND station_id = ").push_bind(station_id.clone());
        }
        if let Some(type_id) = &filter.amenity_type_id {
            query.push(" AND amenity_type_id = ").push_bind(type_id.clone());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        query.push(" ORDER BY station_id, name");

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(amenity_from_row).collect())
    }

    /// Get a station amenity by ID.
    pub async fn get_amenity(&self, id: &str) -> Result<Option<StationAmenity>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM station_amenities WHERE id = ?",
            AMENITY_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(amenity_from_row))
    }

    /// Create a station amenity.
    pub async fn create_amenity(
        &self,
        request: &CreateAmenityRequest,
    ) -> Result<StationAmenity, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let status = request.status.unwrap_or(AmenityStatus::Ok);

        sqlx::query(
            "INSERT INTO station_amenities (id, station_id, amenity_type_id, name, status, notes, photos, created_at, updated_at, version) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1)",
        )
        .bind(&id)
        .bind(&request.station_id)
        .bind(&request.amenity_type_id)
        .bind(request.name.trim())
        .bind(status.as_str())
        .bind(&request.notes)
        .bind(to_json_array(&request.photos))
        .bind(timestamp(&now))
        .bind(timestamp(&now))
        .execute(&self.pool)
        .await?;

        Ok(StationAmenity {
            id,
            station_id: request.station_id.clone(),
            amenity_type_id: request.amenity_type_id.clone(),
            name: request.name.trim().to_string(),
            status,
            last_inspected_at: None,
            notes: request.notes.clone(),
            photos: request.photos.clone(),
            created_at: now,
            updated_at: now,
            version: 1,
        })
    }

    /// Update a station amenity with optional optimistic concurrency control.
    pub async fn update_amenity(
        &self,
        id: &str,
        request: &UpdateAmenityRequest,
    ) -> Result<StationAmenity, AppError> {
        let existing = self
            .get_amenity(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Amenity {} not found", id)))?;

        // Check version for optimistic concurrency
        if let Some(expected) = request.expected_version {
            if existing.version != expected {
                return Err(AppError::Conflict {
                    message: format!(
                        "Version mismatch: expected {}, current {}",
                        expected, existing.version
                    ),
                    current_version: Some(existing.version),
                });
            }
        }

        let now = Utc::now();
        let new_version = existing.version + 1;

        let name = request
            .name
            .as_deref()
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.name.clone());
        let status = request.status.unwrap_or(existing.status);
        let notes = request.notes.clone().or(existing.notes.clone());
        let photos = request.photos.clone().unwrap_or(existing.photos.clone());

        // Use conditional UPDATE with version check to prevent lost updates between admins
        let result = sqlx::query(
            "UPDATE station_amenities SET name = ?, status = ?, notes = ?, photos = ?, updated_at = ?, version = ? WHERE id = ? AND version = ?",
        )
        .bind(&name)
        .bind(status.as_str())
        .bind(&notes)
        .bind(to_json_array(&photos))
        .bind(timestamp(&now))
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let current = self.get_amenity(id).await?;
            return Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: Some(current.map(|a| a.version).unwrap_or(0)),
            });
        }

        Ok(StationAmenity {
            name,
            status,
            notes,
            photos,
            updated_at: now,
            version: new_version,
            ..existing
        })
    }

    /// Delete a station amenity. Its inspections are removed with it.
    pub async fn delete_amenity(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM station_amenities WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Amenity {} not found", id)));
        }

        Ok(())
    }
}

fn amenity_type_from_row(row: &sqlx::sqlite::SqliteRow) -> AmenityType {
    let created_at: String = row.get("created_at");
    AmenityType {
        id: row.get("id"),
        key: row.get("key"),
        label: row.get("label"),
        description: row.get("description"),
        created_at: parse_timestamp(&created_at),
    }
}

fn amenity_from_row(row: &sqlx::sqlite::SqliteRow) -> StationAmenity {
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    StationAmenity {
        id: row.get("id"),
        station_id: row.get("station_id"),
        amenity_type_id: row.get("amenity_type_id"),
        name: row.get("name"),
        status: AmenityStatus::from_str(&status).unwrap_or(AmenityStatus::NeedsMaintenance),
        last_inspected_at: parse_optional_timestamp(row.get("last_inspected_at")),
        notes: row.get("notes"),
        photos: parse_json_array(row.get("photos")),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
        version: row.get("version"),
    }
}
