//! Stored MIS report snapshots.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite};

use super::repository::{parse_timestamp, timestamp, Repository};
use crate::errors::AppError;
use crate::models::{MisMetrics, Report, ReportPeriod, ReportQuery};

const REPORT_COLUMNS: &str = "id, station_id, period, start_date, generated_by, data, created_at";

impl Repository {
    /// Store a generated report.
    pub async fn create_report(
        &self,
        station_id: Option<&str>,
        period: ReportPeriod,
        start_date: DateTime<Utc>,
        generated_by: &str,
        metrics: &MisMetrics,
    ) -> Result<Report, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let data = serde_json::to_string(metrics)?;

        sqlx::query(
            "INSERT INTO reports (id, station_id, period, start_date, generated_by, data, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(station_id)
        .bind(period.as_str())
        .bind(timestamp(&start_date))
        .bind(generated_by)
        .bind(&data)
        .bind(timestamp(&now))
        .execute(&self.pool)
        .await?;

        Ok(Report {
            id,
            station_id: station_id.map(str::to_string),
            period,
            start_date,
            generated_by: Some(generated_by.to_string()),
            metrics: metrics.clone(),
            created_at: now,
        })
    }

    /// List stored reports, newest first.
    pub async fn list_reports(&self, filter: &ReportQuery) -> Result<Vec<Report>, AppError> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM reports WHERE 1 = 1", REPORT_COLUMNS));
        if let Some(station_id) = &filter.station_id {
            query.push(" AND station_id = ").push_bind(station_id.clone());
        }
        if let Some(period) = filter.period {
            query.push(" AND period = ").push_bind(period.as_str());
        }
        query.push(" ORDER BY created_at DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(report_from_row).collect())
    }

    /// Get a stored report by ID.
    pub async fn get_report(&self, id: &str) -> Result<Option<Report>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM reports WHERE id = ?",
            REPORT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(report_from_row))
    }
}

fn report_from_row(row: &sqlx::sqlite::SqliteRow) -> Report {
    let period: String = row.get("period");
    let start_date: String = row.get("start_date");
    let data: String = row.get("data");
    let created_at: String = row.get("created_at");
    Report {
        id: row.get("id"),
        station_id: row.get("station_id"),
        period: ReportPeriod::from_str(&period).unwrap_or_default(),
        start_date: parse_timestamp(&start_date),
        generated_by: row.get("generated_by"),
        metrics: serde_json::from_str(&data).unwrap_or_default(),
        created_at: parse_timestamp(&created_at),
    }
}
