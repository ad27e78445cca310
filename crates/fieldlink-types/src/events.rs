use serde::{Deserialize, Serialize};

use crate::models::{ChatMessage, SYSTEM_SENDER_ID, SYSTEM_SENDER_NAME};
use crate::room::Room;

/// Commands sent FROM client TO server over the WebSocket.
///
/// `sender_id` / `sender_name` in `Message` are accepted for wire
/// compatibility but ignored: identity always comes from the authenticated
/// session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChatCommand {
    /// Authenticate the WebSocket connection.
    Identify { token: String },

    /// Join a room's fan-out set.
    Join { room: Room, user_name: Option<String> },

    /// Leave a room's fan-out set.
    Leave { room: Room },

    /// Send a chat message to a room.
    Message {
        room: Room,
        message: String,
        sender_id: Option<i64>,
        sender_name: Option<String>,
        recipient_id: Option<i64>,
        group_id: Option<i64>,
        timestamp: Option<String>,
    },

    /// Transient typing indicator.
    Typing { room: Room },
}

/// Events sent FROM server TO client over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Server confirms successful authentication.
    Ready { technician_id: i64, name: String },

    /// A chat message, or a system join/leave notice (sender id 0,
    /// `id` unset — notices are never persisted).
    Message {
        id: Option<i64>,
        sender_id: i64,
        sender_name: String,
        message: String,
        room: Room,
        recipient_id: Option<i64>,
        group_id: Option<i64>,
        timestamp: String,
    },

    /// A technician is typing in a room. The receiving UI is responsible
    /// for clearing the indicator after a delay.
    Typing {
        room: Room,
        technician_id: i64,
        name: String,
    },

    /// An error surfaced to the originating session only.
    Error { reason: String },
}

impl ChatEvent {
    /// Build the broadcast payload for a persisted message.
    pub fn from_stored(msg: &ChatMessage, room: Room) -> Self {
        ChatEvent::Message {
            id: Some(msg.id),
            sender_id: msg.sender_id.unwrap_or(SYSTEM_SENDER_ID),
            sender_name: msg.sender_name.clone(),
            message: msg.message.clone(),
            room,
            recipient_id: msg.recipient_id,
            group_id: msg.group_id,
            timestamp: msg.timestamp.clone(),
        }
    }

    /// Build a transient system notice for a room.
    pub fn notice(room: Room, text: impl Into<String>, timestamp: String) -> Self {
        ChatEvent::Message {
            id: None,
            sender_id: SYSTEM_SENDER_ID,
            sender_name: SYSTEM_SENDER_NAME.to_string(),
            message: text.into(),
            room,
            recipient_id: None,
            group_id: None,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_tags_are_snake_case() {
        let cmd: ChatCommand =
            serde_json::from_str(r#"{"type":"join","data":{"room":"group:1","user_name":"Alice"}}"#)
                .unwrap();
        match cmd {
            ChatCommand::Join { room, user_name } => {
                assert_eq!(room, Room::Group(1));
                assert_eq!(user_name.as_deref(), Some("Alice"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn notice_carries_the_system_sender() {
        let event = ChatEvent::notice(Room::Group(2), "Alice joined the chat", "2025-01-01 10:00:00".into());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"sender_name\":\"System\""));
        assert!(json.contains("\"room\":\"group:2\""));
        assert!(json.contains("\"id\":null"));
    }
}
