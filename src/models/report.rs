//! MIS report periods, metrics and stored snapshots.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Reporting window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl ReportPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportPeriod::Daily => "daily",
            ReportPeriod::Weekly => "weekly",
            ReportPeriod::Monthly => "monthly",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "daily" => Some(ReportPeriod::Daily),
            "weekly" => Some(ReportPeriod::Weekly),
            "monthly" => Some(ReportPeriod::Monthly),
            _ => None,
        }
    }

    /// Start of the window ending at `now`: UTC midnight today, seven days back,
    /// or UTC midnight on the first of the month.
    pub fn start_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            ReportPeriod::Daily => midnight(now.date_naive()),
            ReportPeriod::Weekly => now - Duration::days(7),
            ReportPeriod::Monthly => {
                let today = now.date_naive();
                midnight(today.with_day(1).unwrap_or(today))
            }
        }
    }
}

fn midnight(date: chrono::NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// Aggregated MIS figures for one station (or all stations) over one period.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MisMetrics {
    pub total_issues: i64,
    pub resolved_issues: i64,
    pub open_issues: i64,
    pub high_priority_issues: i64,
    pub avg_resolution_time_hours: f64,
    pub inspection_count: i64,
    /// Percentage of amenities in `ok` status, keyed by amenity type key
    pub amenity_uptime: BTreeMap<String, f64>,
}

/// Query parameters for `GET /api/reports/mis`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MisQuery {
    #[serde(default)]
    pub period: ReportPeriod,
    #[serde(default)]
    pub station_id: Option<String>,
}

/// Live MIS response: the metrics plus the window they cover.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MisReport {
    pub period: ReportPeriod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_id: Option<String>,
    pub start_date: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub metrics: MisMetrics,
}

/// Stored snapshot of a generated MIS report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_id: Option<String>,
    pub period: ReportPeriod,
    pub start_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,
    pub metrics: MisMetrics,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /api/reports`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    #[serde(default)]
    pub period: ReportPeriod,
    #[serde(default)]
    pub station_id: Option<String>,
}

/// Filters for listing stored reports.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    #[serde(default)]
    pub station_id: Option<String>,
    #[serde(default)]
    pub period: Option<ReportPeriod>,
}
