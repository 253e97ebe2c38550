//! MIS reporting endpoints.

use axum::extract::{Path, State};
use chrono::Utc;

use super::{success, ApiResult, Json, Query};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::mis::calculate_mis_metrics;
use crate::models::{access, CreateReportRequest, MisQuery, MisReport, Report, ReportQuery};
use crate::AppState;

/// GET /api/reports/mis - Live MIS metrics for a period.
pub async fn get_mis(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<MisQuery>,
) -> ApiResult<MisReport> {
    user.require(access::MANAGERS)?;
    let station_id = user.station_scope(query.station_id)?;

    let now = Utc::now();
    let metrics =
        calculate_mis_metrics(&state.repo, station_id.as_deref(), query.period, now).await;

    success(MisReport {
        period: query.period,
        station_id,
        start_date: query.period.start_date(now),
        generated_at: now,
        metrics,
    })
}

/// POST /api/reports - Generate and store an MIS snapshot.
pub async fn create_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateReportRequest>,
) -> ApiResult<Report> {
    user.require(access::MANAGERS)?;
    let station_id = user.station_scope(request.station_id)?;

    let now = Utc::now();
    let metrics =
        calculate_mis_metrics(&state.repo, station_id.as_deref(), request.period, now).await;
    let report = state
        .repo
        .create_report(
            station_id.as_deref(),
            request.period,
            request.period.start_date(now),
            &user.id,
            &metrics,
        )
        .await?;

    tracing::info!(
        "Stored {} report {} for {:?}",
        report.period.as_str(),
        report.id,
        report.station_id
    );
    success(report)
}

/// GET /api/reports - List stored reports.
pub async fn list_reports(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(mut query): Query<ReportQuery>,
) -> ApiResult<Vec<Report>> {
    user.require(access::MANAGERS)?;
    query.station_id = user.station_scope(query.station_id.take())?;
    success(state.repo.list_reports(&query).await?)
}

/// GET /api/reports/{id} - Get a stored report.
pub async fn get_report(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Report> {
    user.require(access::MANAGERS)?;
    let visible = |report: &Report| match &report.station_id {
        Some(station_id) => user.can_access_station(station_id),
        // Network-wide snapshots
        None => user.is_super_admin(),
    };
    match state.repo.get_report(&id).await? {
        Some(report) if visible(&report) => success(report),
        _ => Err(AppError::NotFound(format!("Report {} not found", id))),
    }
}
