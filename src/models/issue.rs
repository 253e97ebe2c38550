//! Issue reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Issue lifecycle. The intended order is reported, acknowledged, assigned,
/// resolved, closed, but any value may be set at any time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Reported,
    Acknowledged,
    Assigned,
    Resolved,
    Closed,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 5] = [
        IssueStatus::Reported,
        IssueStatus::Acknowledged,
        IssueStatus::Assigned,
        IssueStatus::Resolved,
        IssueStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueStatus::Reported => "reported",
            IssueStatus::Acknowledged => "acknowledged",
            IssueStatus::Assigned => "assigned",
            IssueStatus::Resolved => "resolved",
            IssueStatus::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "reported" => Some(IssueStatus::Reported),
            "acknowledged" => Some(IssueStatus::Acknowledged),
            "assigned" => Some(IssueStatus::Assigned),
            "resolved" => Some(IssueStatus::Resolved),
            "closed" => Some(IssueStatus::Closed),
            _ => None,
        }
    }

    /// Resolved and closed issues count as resolved in reports.
    pub fn is_resolved(&self) -> bool {
        matches!(self, IssueStatus::Resolved | IssueStatus::Closed)
    }
}

/// A reported problem at a station.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub station_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amenity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub priority: Priority,
    pub status: IssueStatus,
    #[serde(default)]
    pub photos: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
    pub reported_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// Hours from report to resolution, if the issue has a resolution stamp.
    pub fn resolution_hours(&self) -> Option<f64> {
        self.resolved_at
            .map(|resolved| (resolved - self.reported_at).num_seconds() as f64 / 3600.0)
    }
}

/// Request body for reporting an issue.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueRequest {
    pub station_id: String,
    #[serde(default)]
    pub amenity_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub photos: Vec<String>,
}

/// Request body for editing an issue's descriptive fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub amenity_id: Option<String>,
    #[serde(default)]
    pub photos: Option<Vec<String>>,
}

/// Request body for `PATCH /api/issues/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueStatusRequest {
    pub status: IssueStatus,
    #[serde(default)]
    pub resolution_notes: Option<String>,
}

/// Request body for `PATCH /api/issues/{id}/assign`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignIssueRequest {
    pub assignee_id: String,
}

/// Filters for listing issues. `reporter_id` and `since` are set server-side.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueQuery {
    #[serde(default)]
    pub station_id: Option<String>,
    #[serde(default)]
    pub status: Option<IssueStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(skip)]
    pub reporter_id: Option<String>,
    #[serde(skip)]
    pub since: Option<DateTime<Utc>>,
}
