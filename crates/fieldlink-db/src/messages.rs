use rusqlite::{OptionalExtension, params};

use fieldlink_types::error::ChatError;
use fieldlink_types::models::{ChatMessage, NewMessage};

use crate::{Database, StoreResultExt};

const HISTORY_SELECT: &str =
    "SELECT id, sender_id, sender_name, recipient_id, group_id, message, timestamp
     FROM messages
     WHERE recipient_id = ?1
        OR group_id IN (SELECT group_id FROM group_members WHERE technician_id = ?1)
     ORDER BY timestamp DESC, id DESC";

impl Database {
    /// Append a message to the log.
    ///
    /// Rejects an empty body (`Validation`) and any addressing that is not
    /// exactly one of recipient/group (`InvalidAddressing`). The returned
    /// row carries the monotonically increasing append identifier; the
    /// single guarded connection makes concurrent appends atomic.
    pub fn append_message(&self, msg: &NewMessage) -> Result<ChatMessage, ChatError> {
        if msg.message.trim().is_empty() {
            return Err(ChatError::Validation("message body is required".to_string()));
        }
        match (msg.recipient_id, msg.group_id) {
            (Some(_), None) | (None, Some(_)) => {}
            _ => return Err(ChatError::InvalidAddressing),
        }

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (sender_id, sender_name, recipient_id, group_id, message, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    msg.sender_id,
                    msg.sender_name,
                    msg.recipient_id,
                    msg.group_id,
                    msg.message,
                    msg.timestamp
                ],
            )
            .store()?;

            Ok(ChatMessage {
                id: conn.last_insert_rowid(),
                sender_id: Some(msg.sender_id),
                sender_name: msg.sender_name.clone(),
                recipient_id: msg.recipient_id,
                group_id: msg.group_id,
                message: msg.message.clone(),
                timestamp: msg.timestamp.clone(),
            })
        })
    }

    /// Full history visible to a technician: direct messages addressed to
    /// them plus every message in a group they currently belong to, most
    /// recent first. The membership join is evaluated at read time, so
    /// visibility follows current membership (intentional).
    pub fn history_for_technician(&self, technician_id: i64) -> Result<Vec<ChatMessage>, ChatError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(HISTORY_SELECT).store()?;
            let rows = stmt
                .query_map(params![technician_id], map_message_row)
                .store()?
                .collect::<Result<Vec<_>, _>>()
                .store()?;
            Ok(rows)
        })
    }

    /// Most recent visible message, for the dashboard card.
    pub fn latest_for_technician(&self, technician_id: i64) -> Result<Option<ChatMessage>, ChatError> {
        self.with_conn(|conn| {
            let sql = format!("{HISTORY_SELECT} LIMIT 1");
            conn.query_row(&sql, params![technician_id], map_message_row)
                .optional()
                .store()
        })
    }
}

fn map_message_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    Ok(ChatMessage {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        sender_name: row.get(2)?,
        recipient_id: row.get(3)?,
        group_id: row.get(4)?,
        message: row.get(5)?,
        timestamp: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn add_tech(db: &Database, name: &str, email: &str) -> i64 {
        db.create_technician(name, "role", "contact", email, "hash").unwrap()
    }

    fn direct(sender: i64, recipient: i64, body: &str, ts: &str) -> NewMessage {
        NewMessage {
            sender_id: sender,
            sender_name: format!("tech-{sender}"),
            recipient_id: Some(recipient),
            group_id: None,
            message: body.to_string(),
            timestamp: ts.to_string(),
        }
    }

    #[test]
    fn append_assigns_monotonic_ids() {
        let db = db();
        let a = add_tech(&db, "Alice Mwansa", "alice@techcorp.com");
        let b = add_tech(&db, "Brian Zulu", "brian@techcorp.com");

        let first = db.append_message(&direct(a, b, "one", "2025-01-01 10:00:00")).unwrap();
        let second = db.append_message(&direct(a, b, "two", "2025-01-01 10:00:01")).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn append_rejects_bad_addressing() {
        let db = db();
        let a = add_tech(&db, "Alice Mwansa", "alice@techcorp.com");
        let b = add_tech(&db, "Brian Zulu", "brian@techcorp.com");
        let group = db.create_group("Ops", a, &[b]).unwrap();

        let mut both = direct(a, b, "hello", "2025-01-01 10:00:00");
        both.group_id = Some(group.id);
        assert!(matches!(db.append_message(&both), Err(ChatError::InvalidAddressing)));

        let mut neither = direct(a, b, "hello", "2025-01-01 10:00:00");
        neither.recipient_id = None;
        assert!(matches!(db.append_message(&neither), Err(ChatError::InvalidAddressing)));
    }

    #[test]
    fn append_rejects_empty_body() {
        let db = db();
        let a = add_tech(&db, "Alice Mwansa", "alice@techcorp.com");
        let b = add_tech(&db, "Brian Zulu", "brian@techcorp.com");
        let blank = direct(a, b, "   ", "2025-01-01 10:00:00");
        assert!(matches!(db.append_message(&blank), Err(ChatError::Validation(_))));
    }

    #[test]
    fn direct_message_lands_in_recipient_history_most_recent_first() {
        let db = db();
        let sender = add_tech(&db, "Alice Mwansa", "alice@techcorp.com");
        let recipient = add_tech(&db, "Brian Zulu", "brian@techcorp.com");

        db.append_message(&direct(sender, recipient, "test", "2025-01-01 10:00:00")).unwrap();
        db.append_message(&direct(sender, recipient, "newer", "2025-01-02 09:00:00")).unwrap();

        let history = db.history_for_technician(recipient).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, "newer");
        assert_eq!(history[1].message, "test");
        // The sender is not the recipient, so their history stays empty.
        assert!(db.history_for_technician(sender).unwrap().is_empty());
    }

    #[test]
    fn group_history_follows_current_membership() {
        let db = db();
        let a = add_tech(&db, "Alice Mwansa", "alice@techcorp.com");
        let b = add_tech(&db, "Brian Zulu", "brian@techcorp.com");
        let c = add_tech(&db, "Chipo Banda", "chipo@techcorp.com");
        let group = db.create_group("Ops", a, &[b]).unwrap();

        db.append_message(&NewMessage {
            sender_id: a,
            sender_name: "Alice Mwansa".into(),
            recipient_id: None,
            group_id: Some(group.id),
            message: "upgrade done".into(),
            timestamp: "2025-01-01 10:00:00".into(),
        })
        .unwrap();

        // Member sees it, non-member does not.
        assert_eq!(db.history_for_technician(b).unwrap().len(), 1);
        assert!(db.history_for_technician(c).unwrap().is_empty());

        // Visibility is retroactive: joining the group exposes old messages.
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO group_members (group_id, technician_id) VALUES (?1, ?2)",
                params![group.id, c],
            )
            .store()?;
            Ok(())
        })
        .unwrap();
        assert_eq!(db.history_for_technician(c).unwrap().len(), 1);
    }

    #[test]
    fn latest_message_is_the_history_head() {
        let db = db();
        let a = add_tech(&db, "Alice Mwansa", "alice@techcorp.com");
        let b = add_tech(&db, "Brian Zulu", "brian@techcorp.com");

        assert!(db.latest_for_technician(b).unwrap().is_none());
        db.append_message(&direct(a, b, "first", "2025-01-01 10:00:00")).unwrap();
        db.append_message(&direct(a, b, "second", "2025-01-01 11:00:00")).unwrap();

        let latest = db.latest_for_technician(b).unwrap().unwrap();
        assert_eq!(latest.message, "second");
    }

    #[test]
    fn deleting_the_sender_nulls_the_reference_but_keeps_the_snapshot() {
        let db = db();
        let a = add_tech(&db, "Alice Mwansa", "alice@techcorp.com");
        let b = add_tech(&db, "Brian Zulu", "brian@techcorp.com");
        db.append_message(&NewMessage {
            sender_id: a,
            sender_name: "Alice Mwansa".into(),
            recipient_id: Some(b),
            group_id: None,
            message: "hello".into(),
            timestamp: "2025-01-01 10:00:00".into(),
        })
        .unwrap();

        db.delete_technician(a).unwrap();

        let history = db.history_for_technician(b).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].sender_id, None);
        assert_eq!(history[0].sender_name, "Alice Mwansa");
    }
}
