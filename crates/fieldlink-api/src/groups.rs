use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use fieldlink_types::api::{Claims, CreateGroupRequest};
use fieldlink_types::error::ChatError;
use fieldlink_types::models::Group;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_blocking;

/// Any technician can create a group; the creator is always added to the
/// membership. Name and member validation lives in the directory store.
pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if claims.is_admin() {
        return Err(ChatError::Unauthorized(
            "only technicians can create chat groups".to_string(),
        )
        .into());
    }

    let db = state.db.clone();
    let creator_id = claims.sub;
    let group =
        run_blocking(move || db.create_group(&req.name, creator_id, &req.member_ids)).await?;

    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Group>>, ApiError> {
    let db = state.db.clone();
    let technician_id = claims.sub;
    let groups = run_blocking(move || db.groups_for_technician(technician_id)).await?;
    Ok(Json(groups))
}
