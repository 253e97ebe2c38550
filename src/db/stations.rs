//! Station operations.

use chrono::Utc;
use sqlx::Row;

use super::repository::{parse_timestamp, timestamp, Repository};
use crate::errors::AppError;
use crate::models::{CreateStationRequest, Station, UpdateStationRequest};

const STATION_COLUMNS: &str =
    "id, name, code, region, address, latitude, longitude, created_at, updated_at";

impl Repository {
    /// List all stations.
    pub async fn list_stations(&self) -> Result<Vec<Station>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM stations ORDER BY name",
            STATION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(station_from_row).collect())
    }

    /// Get a station by ID.
    pub async fn get_station(&self, id: &str) -> Result<Option<Station>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM stations WHERE id = ?",
            STATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(station_from_row))
    }

    /// Create a new station.
    pub async fn create_station(
        &self,
        request: &CreateStationRequest,
    ) -> Result<Station, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let code = request.code.trim().to_uppercase();

        sqlx::query(
            "INSERT INTO stations (id, name, code, region, address, latitude, longitude, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(request.name.trim())
        .bind(&code)
        .bind(request.region.trim())
        .bind(&request.address)
        .bind(request.latitude)
        .bind(request.longitude)
        .bind(timestamp(&now))
        .bind(timestamp(&now))
        .execute(&self.pool)
        .await?;

        tracing::info!("Created station {} ({})", code, id);

        Ok(Station {
            id,
            name: request.name.trim().to_string(),
            code,
            region: request.region.trim().to_string(),
            address: request.address.clone(),
            latitude: request.latitude,
            longitude: request.longitude,
            created_at: now,
            updated_at: now,
        })
    }

    /// Update a station. Absent fields keep their current value.
    pub async fn update_station(
        &self,
        id: &str,
        request: &UpdateStationRequest,
    ) -> Result<Station, AppError> {
        let existing = self
            .get_station(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Station {} not found", id)))?;

        let now = Utc::now();
        let station = Station {
            id: existing.id,
            name: request
                .name
                .as_deref()
                .map(|n| n.trim().to_string())
                .unwrap_or(existing.name),
            code: request
                .code
                .as_deref()
                .map(|c| c.trim().to_uppercase())
                .unwrap_or(existing.code),
            region: request
                .region
                .as_deref()
                .map(|r| r.trim().to_string())
                .unwrap_or(existing.region),
            address: request.address.clone().or(existing.address),
            latitude: request.latitude.or(existing.latitude),
            longitude: request.longitude.or(existing.longitude),
            created_at: existing.created_at,
            updated_at: now,
        };

        sqlx::query(
            "UPDATE stations SET name = ?, code = ?, region = ?, address = ?, latitude = ?, longitude = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&station.name)
        .bind(&station.code)
        .bind(&station.region)
        .bind(&station.address)
        .bind(station.latitude)
        .bind(station.longitude)
        .bind(timestamp(&now))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(station)
    }

    /// Delete a station that nothing references any more.
    pub async fn delete_station(&self, id: &str) -> Result<(), AppError> {
        let row = sqlx::query(
            r#"SELECT
                (SELECT COUNT(*) FROM station_amenities WHERE station_id = ?) AS amenities,
                (SELECT COUNT(*) FROM issues WHERE station_id = ?) AS issues,
                (SELECT COUNT(*) FROM users WHERE station_id = ?) AS users"#,
        )
        .bind(id)
        .bind(id)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        let amenities: i64 = row.get("amenities");
        let issues: i64 = row.get("issues");
        let users: i64 = row.get("users");
        if amenities + issues + users > 0 {
            return Err(AppError::conflict(format!(
                "Station {} still has {} amenities, {} issues and {} users",
                id, amenities, issues, users
            )));
        }

        let result = sqlx::query("DELETE FROM stations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Station {} not found", id)));
        }

        tracing::info!("Deleted station {}", id);
        Ok(())
    }
}

fn station_from_row(row: &sqlx::sqlite::SqliteRow) -> Station {
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    Station {
        id: row.get("id"),
        name: row.get("name"),
        code: row.get("code"),
        region: row.get("region"),
        address: row.get("address"),
        latitude: row.get("latitude"),
        longitude: row.get("longitude"),
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    }
}
