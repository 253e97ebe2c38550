//! Inspection operations.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite};

use super::repository::{parse_json_array, parse_timestamp, timestamp, to_json_array, Repository};
use crate::errors::AppError;
use crate::models::{
    AmenityStatus, CreateInspectionRequest, Inspection, InspectionQuery, StationAmenity,
};

const INSPECTION_COLUMNS: &str =
    "id, amenity_id, station_id, inspector_id, status, notes, photos, created_at";

impl Repository {
    /// List inspections matching the filter, newest first.
    pub async fn list_inspections(
        &self,
        filter: &InspectionQuery,
    ) -> Result<Vec<Inspection>, AppError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM inspections WHERE 1 = 1",
            INSPECTION_COLUMNS
        ));
        if let Some(station_id) = &filter.station_id {
            query.push(" AND station_id = ").push_bind(station_id.clone());
        }
        if let Some(amenity_id) = &filter.amenity_id {
            query.push(" AND amenity_id = ").push_bind(amenity_id.clone());
        }
        query.push(" ORDER BY created_at DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(inspection_from_row).collect())
    }

    /// Get an inspection by ID.
    pub async fn get_inspection(&self, id: &str) -> Result<Option<Inspection>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM inspections WHERE id = ?",
            INSPECTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(inspection_from_row))
    }

    /// Record an inspection and carry its observed status onto the amenity.
    ///
    /// Both writes share one transaction. The amenity update is unconditional,
    /// so it wins over any admin edit that landed in between.
    pub async fn create_inspection(
        &self,
        amenity: &StationAmenity,
        request: &CreateInspectionRequest,
        inspector_id: &str,
    ) -> Result<Inspection, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO inspections (id, amenity_id, station_id, inspector_id, status, notes, photos, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&amenity.id)
        .bind(&amenity.station_id)
        .bind(inspector_id)
        .bind(request.status.as_str())
        .bind(&request.notes)
        .bind(to_json_array(&request.photos))
        .bind(timestamp(&now))
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE station_amenities SET status = ?, last_inspected_at = ?, updated_at = ?, version = version + 1 WHERE id = ?",
        )
        .bind(request.status.as_str())
        .bind(timestamp(&now))
        .bind(timestamp(&now))
        .bind(&amenity.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Inspection {} set amenity {} to {}",
            id,
            amenity.id,
            request.status.as_str()
        );

        Ok(Inspection {
            id,
            amenity_id: amenity.id.clone(),
            station_id: amenity.station_id.clone(),
            inspector_id: Some(inspector_id.to_string()),
            status: request.status,
            notes: request.notes.clone(),
            photos: request.photos.clone(),
            created_at: now,
        })
    }

    /// Count inspections created at or after `since`, optionally for one station.
    pub async fn count_inspections_since(
        &self,
        station_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT COUNT(*) AS count FROM inspections WHERE created_at >= ");
        query.push_bind(timestamp(&since));
        if let Some(station_id) = station_id {
            query.push(" AND station_id = ").push_bind(station_id.to_string());
        }

        let row = query.build().fetch_one(&self.pool).await?;
        Ok(row.get("count"))
    }
}

fn inspection_from_row(row: &sqlx::sqlite::SqliteRow) -> Inspection {
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");
    Inspection {
        id: row.get("id"),
        amenity_id: row.get("amenity_id"),
        station_id: row.get("station_id"),
        inspector_id: row.get("inspector_id"),
        status: AmenityStatus::from_str(&status).unwrap_or(AmenityStatus::NeedsMaintenance),
        notes: row.get("notes"),
        photos: parse_json_array(row.get("photos")),
        created_at: parse_timestamp(&created_at),
    }
}
