//! Issue reporting and workflow endpoints.

use axum::extract::{Path, State};

use super::{required, send_station_alert, success, ApiResult, Json, Query};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{
    access, AssignIssueRequest, CreateIssueRequest, Issue, IssueQuery, Priority, Role,
    UpdateIssueRequest, UpdateIssueStatusRequest,
};
use crate::AppState;

/// Whether the caller may see `issue`. Public users see what they reported.
fn can_see(user: &CurrentUser, issue: &Issue) -> bool {
    match user.role {
        Role::Public => issue.reporter_id.as_deref() == Some(user.id.as_str()),
        _ => user.can_access_station(&issue.station_id),
    }
}

async fn visible_issue(state: &AppState, user: &CurrentUser, id: &str) -> Result<Issue, AppError> {
    state
        .repo
        .get_issue(id)
        .await?
        .filter(|issue| can_see(user, issue))
        .ok_or_else(|| AppError::NotFound(format!("Issue {} not found", id)))
}

/// An amenity referenced by an issue must sit at the issue's station.
async fn check_amenity(
    state: &AppState,
    station_id: &str,
    amenity_id: Option<&str>,
) -> Result<(), AppError> {
    let Some(amenity_id) = amenity_id else {
        return Ok(());
    };
    match state.repo.get_amenity(amenity_id).await? {
        Some(amenity) if amenity.station_id == station_id => Ok(()),
        Some(_) => Err(AppError::Validation(format!(
            "Amenity {} is not at station {}",
            amenity_id, station_id
        ))),
        None => Err(AppError::Validation(format!(
            "Amenity {} does not exist",
            amenity_id
        ))),
    }
}

/// GET /api/issues - List issues visible to the caller.
pub async fn list_issues(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(mut query): Query<IssueQuery>,
) -> ApiResult<Vec<Issue>> {
    user.require(access::ANYONE)?;

    if user.role == Role::Public {
        query.reporter_id = Some(user.id.clone());
    } else {
        query.station_id = user.station_scope(query.station_id.take())?;
    }

    success(state.repo.list_issues(&query).await?)
}

/// GET /api/issues/{id} - Get a single issue.
pub async fn get_issue(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Issue> {
    user.require(access::ANYONE)?;
    success(visible_issue(&state, &user, &id).await?)
}

/// POST /api/issues - Report an issue.
///
/// Station staff always report against their own station; public users pick one.
pub async fn create_issue(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(mut request): Json<CreateIssueRequest>,
) -> ApiResult<Issue> {
    user.require(access::ANYONE)?;

    required(&request.title, "Title")?;
    if user.role.is_station_bound() {
        if let Some(station_id) = user.station_scope(None)? {
            request.station_id = station_id;
        }
    }
    let station = state
        .repo
        .get_station(&request.station_id)
        .await?
        .ok_or_else(|| {
            AppError::Validation(format!("Station {} does not exist", request.station_id))
        })?;
    check_amenity(&state, &station.id, request.amenity_id.as_deref()).await?;

    let issue = state.repo.create_issue(&request, &user.id).await?;
    tracing::info!(
        "Issue {} ({}) reported at {} by {}",
        issue.id,
        issue.priority.as_str(),
        station.code,
        user.email
    );

    if issue.priority == Priority::High {
        let alerts_on = state
            .repo
            .get_settings()
            .await
            .map(|s| s.high_priority_alerts)
            .unwrap_or(true);
        if alerts_on {
            let subject = format!("[{}] High priority issue: {}", station.code, issue.title);
            let body = format!(
                "A high priority issue was reported at {} ({}).\n\nTitle: {}\nDescription: {}\nReported by: {}\nIssue ID: {}\n",
                station.name,
                station.code,
                issue.title,
                issue.description.as_deref().unwrap_or("-"),
                user.name,
                issue.id
            );
            send_station_alert(&state, &station.id, &subject, &body).await;
        }
    }

    success(issue)
}

/// PUT /api/issues/{id} - Edit an issue's title, description, priority or photos.
pub async fn update_issue(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateIssueRequest>,
) -> ApiResult<Issue> {
    user.require(access::MANAGERS)?;
    let issue = visible_issue(&state, &user, &id).await?;

    if let Some(title) = &request.title {
        required(title, "Title")?;
    }
    check_amenity(&state, &issue.station_id, request.amenity_id.as_deref()).await?;

    success(state.repo.update_issue(&id, &request).await?)
}

/// DELETE /api/issues/{id} - Delete an issue.
pub async fn delete_issue(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    user.require(access::ADMIN)?;
    state.repo.delete_issue(&id).await?;
    success(())
}

/// PATCH /api/issues/{id}/status - Move an issue to any status.
pub async fn update_issue_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateIssueStatusRequest>,
) -> ApiResult<Issue> {
    user.require(access::OPERATORS)?;
    visible_issue(&state, &user, &id).await?;

    let notes = request
        .resolution_notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    success(state.repo.set_issue_status(&id, request.status, notes).await?)
}

/// PATCH /api/issues/{id}/assign - Hand an issue to a member of station staff.
pub async fn assign_issue(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<AssignIssueRequest>,
) -> ApiResult<Issue> {
    user.require(access::MANAGERS)?;
    let issue = visible_issue(&state, &user, &id).await?;

    let assignee = state
        .repo
        .get_user(&request.assignee_id)
        .await?
        .filter(|u| u.active)
        .ok_or_else(|| {
            AppError::Validation(format!("User {} cannot be assigned", request.assignee_id))
        })?;

    let eligible = match assignee.role {
        Role::SuperAdmin => true,
        Role::StationManager | Role::Staff => {
            assignee.station_id.as_deref() == Some(issue.station_id.as_str())
        }
        Role::Public => false,
    };
    if !eligible {
        return Err(AppError::Validation(format!(
            "{} does not work at the issue's station",
            assignee.email
        )));
    }

    let updated = state.repo.assign_issue(&id, &assignee.id).await?;
    tracing::info!("Issue {} assigned to {} by {}", id, assignee.email, user.email);
    success(updated)
}
