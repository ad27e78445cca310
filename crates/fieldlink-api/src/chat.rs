use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use fieldlink_types::api::{ChatOverviewResponse, Claims, SendMessageRequest};
use fieldlink_types::models::{ChatMessage, NewMessage, timestamp_now};
use fieldlink_types::room::Room;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::run_blocking;

/// The caller's room set, resolved fresh from the directory.
pub async fn rooms(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Room>>, ApiError> {
    let db = state.db.clone();
    let technician_id = claims.sub;
    let rooms = run_blocking(move || db.rooms_for_technician(technician_id)).await?;
    Ok(Json(rooms))
}

/// All messages visible to the caller, most recent first.
pub async fn history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let db = state.db.clone();
    let technician_id = claims.sub;
    let messages = run_blocking(move || db.history_for_technician(technician_id)).await?;
    Ok(Json(messages))
}

/// One fetch for the chat page: rooms, roster, groups and history.
pub async fn overview(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ChatOverviewResponse>, ApiError> {
    let db = state.db.clone();
    let technician_id = claims.sub;
    let (rooms, technicians, groups, messages) = run_blocking(move || {
        Ok((
            db.rooms_for_technician(technician_id)?,
            db.list_technicians()?,
            db.groups_for_technician(technician_id)?,
            db.history_for_technician(technician_id)?,
        ))
    })
    .await?;

    Ok(Json(ChatOverviewResponse {
        rooms,
        technicians,
        groups,
        messages,
    }))
}

/// REST send path: persist through the message store, then fan out to
/// every live session joined to the target room — the same bridge the
/// WebSocket send uses. A store failure surfaces here and nothing is
/// broadcast.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let msg = NewMessage {
        sender_id: claims.sub,
        sender_name: claims.name.clone(),
        recipient_id: req.recipient_id,
        group_id: req.group_id,
        message: req.message,
        timestamp: req.timestamp.unwrap_or_else(timestamp_now),
    };

    let stored = state.hub.publish(&state.db, msg).await?;

    Ok((StatusCode::CREATED, Json(stored)))
}
