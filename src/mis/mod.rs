//! MIS aggregation: issue, inspection and uptime figures over a reporting window.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    AmenityQuery, AmenityStatus, AmenityType, Issue, MisMetrics, Priority, ReportPeriod,
    StationAmenity,
};

/// Compute MIS metrics for a station (or all stations) over `period` ending at `now`.
///
/// Failures are logged and yield the zeroed metrics instead of an error, so a
/// broken store reads as an empty report.
pub async fn calculate_mis_metrics(
    repo: &Repository,
    station_id: Option<&str>,
    period: ReportPeriod,
    now: DateTime<Utc>,
) -> MisMetrics {
    match try_calculate_mis_metrics(repo, station_id, period, now).await {
        Ok(metrics) => metrics,
        Err(e) => {
            tracing::error!(
                "MIS calculation failed for station {:?} ({}): {}",
                station_id,
                period.as_str(),
                e
            );
            MisMetrics::default()
        }
    }
}

async fn try_calculate_mis_metrics(
    repo: &Repository,
    station_id: Option<&str>,
    period: ReportPeriod,
    now: DateTime<Utc>,
) -> Result<MisMetrics, AppError> {
    let start_date = period.start_date(now);

    let amenity_types = repo.list_amenity_types().await?;
    let amenities = repo
        .list_amenities(&AmenityQuery {
            station_id: station_id.map(str::to_string),
            ..AmenityQuery::default()
        })
        .await?;
    let issues = repo.issues_since(station_id, start_date).await?;
    let inspection_count = repo.count_inspections_since(station_id, start_date).await?;

    Ok(compute_metrics(
        &amenity_types,
        &amenities,
        &issues,
        inspection_count,
    ))
}

/// Aggregate already-windowed records into metrics.
pub fn compute_metrics(
    amenity_types: &[AmenityType],
    amenities: &[StationAmenity],
    issues: &[Issue],
    inspection_count: i64,
) -> MisMetrics {
    let amenity_uptime: BTreeMap<String, f64> = amenity_types
        .iter()
        .map(|amenity_type| {
            let of_type = amenities
                .iter()
                .filter(|a| a.amenity_type_id == amenity_type.id);
            let (total, working) = of_type.fold((0usize, 0usize), |(total, working), a| {
                (total + 1, working + usize::from(a.status == AmenityStatus::Ok))
            });
            let uptime = if total == 0 {
                0.0
            } else {
                round2(working as f64 / total as f64 * 100.0)
            };
            (amenity_type.key.clone(), uptime)
        })
        .collect();

    let resolved: Vec<&Issue> = issues.iter().filter(|i| i.status.is_resolved()).collect();
    let high_priority = issues
        .iter()
        .filter(|i| i.priority == Priority::High)
        .count();

    // Resolved issues without a resolution stamp count for neither sum nor mean
    let resolution_hours: Vec<f64> = resolved
        .iter()
        .filter_map(|i| i.resolution_hours())
        .collect();
    let avg_resolution_time_hours = if resolution_hours.is_empty() {
        0.0
    } else {
        round2(resolution_hours.iter().sum::<f64>() / resolution_hours.len() as f64)
    };

    MisMetrics {
        total_issues: issues.len() as i64,
        resolved_issues: resolved.len() as i64,
        open_issues: (issues.len() - resolved.len()) as i64,
        high_priority_issues: high_priority as i64,
        avg_resolution_time_hours,
        inspection_count,
        amenity_uptime,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
