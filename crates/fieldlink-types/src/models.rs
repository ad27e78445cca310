use serde::{Deserialize, Serialize};

use crate::room::Room;

/// Timestamps are persisted as text in this format (lexicographic order is
/// chronological order), matching the store schema.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sender id used for system-generated join/leave notices.
pub const SYSTEM_SENDER_ID: i64 = 0;
pub const SYSTEM_SENDER_NAME: &str = "System";

/// Current time in the persisted timestamp format.
pub fn timestamp_now() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technician {
    pub id: i64,
    pub name: String,
    pub role: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub creator_id: Option<i64>,
    pub created_at: String,
}

/// A persisted chat message.
///
/// `sender_name` is a deliberate write-time snapshot: renaming a technician
/// does not rewrite history. `sender_id` is nulled when the sender is
/// deleted. Exactly one of `recipient_id` / `group_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub sender_id: Option<i64>,
    pub sender_name: String,
    pub recipient_id: Option<i64>,
    pub group_id: Option<i64>,
    pub message: String,
    pub timestamp: String,
}

impl ChatMessage {
    /// The room this message fans out to.
    pub fn room(&self) -> Option<Room> {
        match (self.recipient_id, self.group_id) {
            (Some(recipient), None) => Some(Room::Direct(recipient)),
            (None, Some(group)) => Some(Room::Group(group)),
            _ => None,
        }
    }
}

/// Input to the message store's append operation.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: i64,
    pub sender_name: String,
    pub recipient_id: Option<i64>,
    pub group_id: Option<i64>,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: i64,
    pub job_number: String,
    pub technician_id: Option<i64>,
    pub technician_name: String,
    pub progress: i64,
    pub challenges: Option<String>,
    pub comments: Option<String>,
    pub observations: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub duration: Option<String>,
    pub team: Option<String>,
    pub files: Option<String>,
    pub created_at: String,
    pub job_id: String,
}
