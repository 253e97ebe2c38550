//! Issue operations.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite};

use super::repository::{
    parse_json_array, parse_optional_timestamp, parse_timestamp, timestamp, to_json_array,
    Repository,
};
use crate::errors::AppError;
use crate::models::{
    CreateIssueRequest, Issue, IssueQuery, IssueStatus, Priority, UpdateIssueRequest,
};

const ISSUE_COLUMNS: &str = "id, station_id, amenity_id, reporter_id, assignee_id, title, description, priority, status, photos, resolution_notes, reported_at, acknowledged_at, assigned_at, resolved_at, closed_at, updated_at";

impl Repository {
    /// List issues matching the filter, newest first.
    pub async fn list_issues(&self, filter: &IssueQuery) -> Result<Vec<Issue>, AppError> {
        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {} FROM issues WHERE 1 = 1", ISSUE_COLUMNS));
        if let Some(station_id) = &filter.station_id {
            query.push(" AND station_id = ").push_bind(station_id.clone());
        }
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            query.push(" AND priority = ").push_bind(priority.as_str());
        }
        if let Some(reporter_id) = &filter.reporter_id {
            query.push(" AND reporter_id = ").push_bind(reporter_id.clone());
        }
        if let Some(since) = &filter.since {
            query.push(" AND reported_at >= ").push_bind(timestamp(since));
        }
        query.push(" ORDER BY reported_at DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(issue_from_row).collect())
    }

    /// Get an issue by ID.
    pub async fn get_issue(&self, id: &str) -> Result<Option<Issue>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM issues WHERE id = ?", ISSUE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(issue_from_row))
    }

    /// Record a newly reported issue.
    pub async fn create_issue(
        &self,
        request: &CreateIssueRequest,
        reporter_id: &str,
    ) -> Result<Issue, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let priority = request.priority.unwrap_or(Priority::Medium);

        sqlx::query(
            "INSERT INTO issues (id, station_id, amenity_id, reporter_id, title, description, priority, status, photos, reported_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.station_id)
        .bind(&request.amenity_id)
        .bind(reporter_id)
        .bind(request.title.trim())
        .bind(&request.description)
        .bind(priority.as_str())
        .bind(IssueStatus::Reported.as_str())
        .bind(to_json_array(&request.photos))
        .bind(timestamp(&now))
        .bind(timestamp(&now))
        .execute(&self.pool)
        .await?;

        Ok(Issue {
            id,
            station_id: request.station_id.clone(),
            amenity_id: request.amenity_id.clone(),
            reporter_id: Some(reporter_id.to_string()),
            assignee_id: None,
            title: request.title.trim().to_string(),
            description: request.description.clone(),
            priority,
            status: IssueStatus::Reported,
            photos: request.photos.clone(),
            resolution_notes: None,
            reported_at: now,
            acknowledged_at: None,
            assigned_at: None,
            resolved_at: None,
            closed_at: None,
            updated_at: now,
        })
    }

    /// Edit the descriptive fields of an issue.
    pub async fn update_issue(
        &self,
        id: &str,
        request: &UpdateIssueRequest,
    ) -> Result<Issue, AppError> {
        let existing = self
            .get_issue(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Issue {} not found", id)))?;

        let now = Utc::now();
        let issue = Issue {
            title: request
                .title
                .as_deref()
                .map(|t| t.trim().to_string())
                .unwrap_or(existing.title.clone()),
            description: request.description.clone().or(existing.description.clone()),
            priority: request.priority.unwrap_or(existing.priority),
            amenity_id: request.amenity_id.clone().or(existing.amenity_id.clone()),
            photos: request.photos.clone().unwrap_or(existing.photos.clone()),
            updated_at: now,
            ..existing
        };

        sqlx::query(
            "UPDATE issues SET title = ?, description = ?, priority = ?, amenity_id = ?, photos = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&issue.title)
        .bind(&issue.description)
        .bind(issue.priority.as_str())
        .bind(&issue.amenity_id)
        .bind(to_json_array(&issue.photos))
        .bind(timestamp(&now))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(issue)
    }

    /// Set an issue's status. Any status may follow any other; only `resolved`
    /// stamps `resolved_at`.
    pub async fn set_issue_status(
        &self,
        id: &str,
        status: IssueStatus,
        resolution_notes: Option<&str>,
    ) -> Result<Issue, AppError> {
        let existing = self
            .get_issue(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Issue {} not found", id)))?;

        let now = Utc::now();
        let resolved_at = if status == IssueStatus::Resolved {
            Some(now)
        } else {
            existing.resolved_at
        };
        let resolution_notes = resolution_notes
            .map(str::to_string)
            .or(existing.resolution_notes.clone());

        sqlx::query(
            "UPDATE issues SET status = ?, resolved_at = ?, resolution_notes = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(resolved_at.as_ref().map(timestamp))
        .bind(&resolution_notes)
        .bind(timestamp(&now))
        .bind(id)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            "Issue {} status {} -> {}",
            id,
            existing.status.as_str(),
            status.as_str()
        );

        Ok(Issue {
            status,
            resolved_at,
            resolution_notes,
            updated_at: now,
            ..existing
        })
    }

    /// Assign an issue, moving it to `assigned` and stamping `assigned_at`.
    pub async fn assign_issue(&self, id: &str, assignee_id: &str) -> Result<Issue, AppError> {
        let existing = self
            .get_issue(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Issue {} not found", id)))?;

        let now = Utc::now();
        sqlx::query(
            "UPDATE issues SET assignee_id = ?, status = ?, assigned_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(assignee_id)
        .bind(IssueStatus::Assigned.as_str())
        .bind(timestamp(&now))
        .bind(timestamp(&now))
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Issue {
            assignee_id: Some(assignee_id.to_string()),
            status: IssueStatus::Assigned,
            assigned_at: Some(now),
            updated_at: now,
            ..existing
        })
    }

    /// Delete an issue.
    pub async fn delete_issue(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM issues WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Issue {} not found", id)));
        }

        Ok(())
    }

    /// Issues reported at or after `since`, optionally for one station.
    pub async fn issues_since(
        &self,
        station_id: Option<&str>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Issue>, AppError> {
        self.list_issues(&IssueQuery {
            station_id: station_id.map(str::to_string),
            since: Some(since),
            ..IssueQuery::default()
        })
        .await
    }
}

fn issue_from_row(row: &sqlx::sqlite::SqliteRow) -> Issue {
    let priority: String = row.get("priority");
    let status: String = row.get("status");
    let reported_at: String = row.get("reported_at");
    let updated_at: String = row.get("updated_at");
    Issue {
        id: row.get("id"),
        station_id: row.get("station_id"),
        amenity_id: row.get("amenity_id"),
        reporter_id: row.get("reporter_id"),
        assignee_id: row.get("assignee_id"),
        title: row.get("title"),
        description: row.get("description"),
        priority: Priority::from_str(&priority).unwrap_or(Priority::Medium),
        status: IssueStatus::from_str(&status).unwrap_or(IssueStatus::Reported),
        photos: parse_json_array(row.get("photos")),
        resolution_notes: row.get("resolution_notes"),
        reported_at: parse_timestamp(&reported_at),
        acknowledged_at: parse_optional_timestamp(row.get("acknowledged_at")),
        assigned_at: parse_optional_timestamp(row.get("assigned_at")),
        resolved_at: parse_optional_timestamp(row.get("resolved_at")),
        closed_at: parse_optional_timestamp(row.get("closed_at")),
        updated_at: parse_timestamp(&updated_at),
    }
}
