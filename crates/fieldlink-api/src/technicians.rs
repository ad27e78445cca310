use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use fieldlink_types::api::{
    Claims, CreateTechnicianRequest, DashboardResponse, MonthlyCount, ProfileResponse,
    UpdateTechnicianRequest,
};
use fieldlink_types::error::ChatError;
use fieldlink_types::models::Technician;

use crate::auth::{AppState, hash_password};
use crate::error::ApiError;
use crate::run_blocking;

fn require_admin(claims: &Claims) -> Result<(), ApiError> {
    if claims.is_admin() {
        Ok(())
    } else {
        Err(ChatError::Unauthorized("admin access required".to_string()).into())
    }
}

pub async fn list_technicians(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Vec<Technician>>, ApiError> {
    let db = state.db.clone();
    let technicians = run_blocking(move || db.list_technicians()).await?;
    Ok(Json(technicians))
}

pub async fn create_technician(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateTechnicianRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&claims)?;

    let name = req.name.trim().to_string();
    let role = req.role.trim().to_string();
    let contact = req.contact.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if name.is_empty() || role.is_empty() || contact.is_empty() || email.is_empty() || req.password.is_empty() {
        return Err(ChatError::Validation("all fields are required".to_string()).into());
    }

    let password_hash = hash_password(&req.password)?;

    let db = state.db.clone();
    let technician = run_blocking(move || {
        let id = db.create_technician(&name, &role, &contact, &email, &password_hash)?;
        Ok(Technician {
            id,
            name,
            role: Some(role),
            contact: Some(contact),
            email: Some(email),
            photo: None,
        })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(technician)))
}

pub async fn get_technician(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<Technician>, ApiError> {
    let db = state.db.clone();
    let row = run_blocking(move || db.technician_by_id(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("no technician with id {id}")))?;
    Ok(Json(row.into()))
}

/// Self-service profile edit, also available to the admin for any
/// technician. Only the supplied fields change.
pub async fn update_technician(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateTechnicianRequest>,
) -> Result<Json<Technician>, ApiError> {
    if !claims.is_admin() && claims.sub != id {
        return Err(ChatError::Unauthorized(
            "technicians may only edit their own profile".to_string(),
        )
        .into());
    }

    let db = state.db.clone();
    let row = run_blocking(move || {
        let changed = db.update_technician(
            id,
            req.email.as_deref().map(str::trim),
            req.contact.as_deref(),
            req.role.as_deref(),
            req.photo.as_deref(),
        )?;
        if !changed {
            return Ok(None);
        }
        db.technician_by_id(id)
    })
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("no technician with id {id}")))?;

    Ok(Json(row.into()))
}

pub async fn delete_technician(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    require_admin(&claims)?;

    let db = state.db.clone();
    let deleted = run_blocking(move || db.delete_technician(id)).await?;
    if !deleted {
        return Err(ApiError::NotFound(format!("no technician with id {id}")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// The caller's own record plus report counters for the profile card.
pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let db = state.db.clone();
    let technician_id = claims.sub;
    let (row, job_count, avg_progress) = run_blocking(move || {
        let row = db.technician_by_id(technician_id)?;
        let (job_count, avg_progress) = db.profile_stats(technician_id)?;
        Ok((row, job_count, avg_progress))
    })
    .await?;

    let row = row.ok_or_else(|| ApiError::NotFound("no profile for this identity".to_string()))?;

    Ok(Json(ProfileResponse {
        technician: row.into(),
        job_count,
        avg_progress,
    }))
}

/// Landing-page numbers: report counters, the latest visible message and
/// the completed-jobs-per-month series.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let db = state.db.clone();
    let technician_id = claims.sub;
    let (stats, latest, monthly) = run_blocking(move || {
        let stats = db.report_stats(technician_id)?;
        let latest = db.latest_for_technician(technician_id)?;
        let monthly = db.monthly_completed(technician_id)?;
        Ok((stats, latest, monthly))
    })
    .await?;

    Ok(Json(DashboardResponse {
        total_reports: stats.total,
        completed: stats.completed,
        in_progress: stats.in_progress,
        latest_message: latest,
        monthly_completed: monthly
            .into_iter()
            .map(|(month, count)| MonthlyCount { month, count })
            .collect(),
    }))
}
