//! Fan-out semantics: join/leave/disconnect membership, per-room ordering,
//! and the persist-before-broadcast rule, exercised against an in-memory
//! store.

use std::sync::Arc;

use tokio::sync::mpsc;

use fieldlink_db::Database;
use fieldlink_gateway::hub::{Hub, SessionId};
use fieldlink_types::error::ChatError;
use fieldlink_types::events::ChatEvent;
use fieldlink_types::models::NewMessage;
use fieldlink_types::room::Room;

struct Fixture {
    db: Arc<Database>,
    hub: Hub,
    alice: i64,
    brian: i64,
    ops: Room,
}

fn fixture() -> Fixture {
    let db = Database::open_in_memory().unwrap();
    let alice = db
        .create_technician("Alice Mwansa", "Network Engineer", "0977001122", "alice@techcorp.com", "hash")
        .unwrap();
    let brian = db
        .create_technician("Brian Zulu", "Systems Analyst", "0977012233", "brian@techcorp.com", "hash")
        .unwrap();
    let group = db.create_group("Ops", alice, &[brian]).unwrap();

    Fixture {
        db: Arc::new(db),
        hub: Hub::new(),
        alice,
        brian,
        ops: Room::Group(group.id),
    }
}

async fn join(hub: &Hub, room: Room) -> (SessionId, mpsc::UnboundedReceiver<ChatEvent>) {
    let session = SessionId::new_v4();
    let (tx, rx) = mpsc::unbounded_channel();
    hub.join(&room, session, tx).await;
    (session, rx)
}

fn group_message(fx: &Fixture, body: &str, ts: &str) -> NewMessage {
    NewMessage {
        sender_id: fx.alice,
        sender_name: "Alice Mwansa".to_string(),
        recipient_id: None,
        group_id: match fx.ops {
            Room::Group(id) => Some(id),
            Room::Direct(_) => unreachable!(),
        },
        message: body.to_string(),
        timestamp: ts.to_string(),
    }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ChatEvent>) -> Vec<ChatEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn message_bodies(events: &[ChatEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ChatEvent::Message { message, .. } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn sessions_receive_messages_in_persisted_order() {
    let fx = fixture();
    let (_s1, mut rx1) = join(&fx.hub, fx.ops).await;
    let (_s2, mut rx2) = join(&fx.hub, fx.ops).await;

    let first = fx
        .hub
        .publish(&fx.db, group_message(&fx, "first", "2025-01-01 10:00:00"))
        .await
        .unwrap();
    let second = fx
        .hub
        .publish(&fx.db, group_message(&fx, "second", "2025-01-01 10:00:01"))
        .await
        .unwrap();
    assert!(second.id > first.id);

    for rx in [&mut rx1, &mut rx2] {
        let events = drain(rx);
        assert_eq!(message_bodies(&events), vec!["first", "second"]);
    }
}

#[tokio::test]
async fn sender_gets_its_own_broadcast_back() {
    let fx = fixture();
    // Alice's own session joined to the group room: no echo suppression.
    let (_session, mut rx) = join(&fx.hub, fx.ops).await;

    fx.hub
        .publish(&fx.db, group_message(&fx, "hello ops", "2025-01-01 10:00:00"))
        .await
        .unwrap();

    let events = drain(&mut rx);
    assert_eq!(message_bodies(&events), vec!["hello ops"]);
}

#[tokio::test]
async fn leave_stops_delivery() {
    let fx = fixture();
    let (_s1, mut rx1) = join(&fx.hub, fx.ops).await;
    let (s2, mut rx2) = join(&fx.hub, fx.ops).await;

    fx.hub
        .publish(&fx.db, group_message(&fx, "before", "2025-01-01 10:00:00"))
        .await
        .unwrap();

    assert!(fx.hub.leave(&fx.ops, s2).await);

    fx.hub
        .publish(&fx.db, group_message(&fx, "after", "2025-01-01 10:00:01"))
        .await
        .unwrap();

    assert_eq!(message_bodies(&drain(&mut rx1)), vec!["before", "after"]);
    assert_eq!(message_bodies(&drain(&mut rx2)), vec!["before"]);
}

#[tokio::test]
async fn leave_without_join_is_a_noop() {
    let fx = fixture();
    let stranger = SessionId::new_v4();
    assert!(!fx.hub.leave(&fx.ops, stranger).await);
}

#[tokio::test]
async fn rejoin_is_idempotent_at_the_fanout_level() {
    let fx = fixture();
    let session = SessionId::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel();

    assert!(fx.hub.join(&fx.ops, session, tx.clone()).await);
    assert!(!fx.hub.join(&fx.ops, session, tx).await);

    fx.hub
        .publish(&fx.db, group_message(&fx, "once", "2025-01-01 10:00:00"))
        .await
        .unwrap();

    // Double-joined session still receives the message exactly once.
    assert_eq!(message_bodies(&drain(&mut rx)), vec!["once"]);
}

#[tokio::test]
async fn disconnect_removes_from_every_room_without_notices() {
    let fx = fixture();
    let direct = Room::Direct(fx.brian);

    let session = SessionId::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel();
    fx.hub.join(&fx.ops, session, tx.clone()).await;
    fx.hub.join(&direct, session, tx).await;

    let (_other, mut other_rx) = join(&fx.hub, fx.ops).await;

    fx.hub.disconnect(session).await;

    fx.hub
        .publish(&fx.db, group_message(&fx, "to group", "2025-01-01 10:00:00"))
        .await
        .unwrap();
    fx.hub
        .publish(
            &fx.db,
            NewMessage {
                sender_id: fx.alice,
                sender_name: "Alice Mwansa".to_string(),
                recipient_id: Some(fx.brian),
                group_id: None,
                message: "to brian".to_string(),
                timestamp: "2025-01-01 10:00:01".to_string(),
            },
        )
        .await
        .unwrap();

    // Disconnected session hears nothing, in any of its former rooms.
    assert!(drain(&mut rx).is_empty());
    // The remaining session sees only the message — no departure notice.
    let events = drain(&mut other_rx);
    assert_eq!(message_bodies(&events), vec!["to group"]);
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn failed_persist_broadcasts_nothing() {
    let fx = fixture();
    let (_session, mut rx) = join(&fx.hub, fx.ops).await;

    let mut bad = group_message(&fx, "ghost", "2025-01-01 10:00:00");
    bad.recipient_id = Some(fx.brian); // both targets set

    let err = fx.hub.publish(&fx.db, bad).await.unwrap_err();
    assert!(matches!(err, ChatError::InvalidAddressing));
    assert!(drain(&mut rx).is_empty());

    // The hub stays fully functional afterwards.
    fx.hub
        .publish(&fx.db, group_message(&fx, "still alive", "2025-01-01 10:00:01"))
        .await
        .unwrap();
    assert_eq!(message_bodies(&drain(&mut rx)), vec!["still alive"]);
}

#[tokio::test]
async fn direct_room_reaches_only_the_recipient_inbox() {
    let fx = fixture();
    let (_brian_session, mut brian_rx) = join(&fx.hub, Room::Direct(fx.brian)).await;
    let (_alice_session, mut alice_rx) = join(&fx.hub, Room::Direct(fx.alice)).await;

    fx.hub
        .publish(
            &fx.db,
            NewMessage {
                sender_id: fx.alice,
                sender_name: "Alice Mwansa".to_string(),
                recipient_id: Some(fx.brian),
                group_id: None,
                message: "direct".to_string(),
                timestamp: "2025-01-01 10:00:00".to_string(),
            },
        )
        .await
        .unwrap();

    assert_eq!(message_bodies(&drain(&mut brian_rx)), vec!["direct"]);
    assert!(drain(&mut alice_rx).is_empty());
}
