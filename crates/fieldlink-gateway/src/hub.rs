use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, mpsc};
use uuid::Uuid;

use fieldlink_db::Database;
use fieldlink_types::error::ChatError;
use fieldlink_types::events::ChatEvent;
use fieldlink_types::models::{ChatMessage, NewMessage};
use fieldlink_types::room::Room;

/// One live connection instance, independent of how many rooms it joined.
pub type SessionId = Uuid;

/// Manages live sessions' room membership and message fan-out.
///
/// Holds only transient join-state: a session is either fully in a room's
/// fan-out set or not, and everything here is rebuilt from the directory
/// on each session start. Durable membership lives in the stores.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    /// room -> (session -> sender). Mutations serialize through the write
    /// lock, so no observer ever sees a half-applied join or disconnect.
    rooms: RwLock<HashMap<Room, HashMap<SessionId, mpsc::UnboundedSender<ChatEvent>>>>,

    /// Serializes persist + fan-out so every room observes messages in
    /// persisted order. One global queue; per-room granularity is not
    /// justified at this scale.
    publish_lock: Mutex<()>,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                rooms: RwLock::new(HashMap::new()),
                publish_lock: Mutex::new(()),
            }),
        }
    }

    /// Add a session to a room's fan-out set. Idempotent per session/room
    /// pair: re-joining is a no-op at the fan-out level. Returns whether
    /// the session was newly added. The join notice is the caller's
    /// responsibility, and goes out on every join call — redundant
    /// re-joins included.
    pub async fn join(
        &self,
        room: &Room,
        session: SessionId,
        tx: mpsc::UnboundedSender<ChatEvent>,
    ) -> bool {
        let mut rooms = self.inner.rooms.write().await;
        rooms
            .entry(*room)
            .or_default()
            .insert(session, tx)
            .is_none()
    }

    /// Remove a session from a room's fan-out set. Returns whether it was
    /// joined; a leave for a room the session never joined is a no-op and
    /// the caller emits no departure notice for it.
    pub async fn leave(&self, room: &Room, session: SessionId) -> bool {
        let mut rooms = self.inner.rooms.write().await;
        let Some(members) = rooms.get_mut(room) else {
            return false;
        };
        let removed = members.remove(&session).is_some();
        if members.is_empty() {
            rooms.remove(room);
        }
        removed
    }

    /// Remove a session from every room it joined, without emitting
    /// departure notices — an abrupt disconnect is deliberately
    /// distinguishable from a graceful leave.
    pub async fn disconnect(&self, session: SessionId) {
        let mut rooms = self.inner.rooms.write().await;
        rooms.retain(|_, members| {
            members.remove(&session);
            !members.is_empty()
        });
    }

    /// Deliver an event to every session currently joined to a room.
    /// Send failures mean the receiving task is already gone; cleanup is
    /// best-effort and the failure is ignored.
    pub async fn broadcast(&self, room: &Room, event: ChatEvent) {
        let rooms = self.inner.rooms.read().await;
        if let Some(members) = rooms.get(room) {
            for tx in members.values() {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Deliver an event to every session in a room except one (used for
    /// join notices, which go to the *other* occupants).
    pub async fn broadcast_except(&self, room: &Room, except: SessionId, event: ChatEvent) {
        let rooms = self.inner.rooms.read().await;
        if let Some(members) = rooms.get(room) {
            for (session, tx) in members {
                if *session != except {
                    let _ = tx.send(event.clone());
                }
            }
        }
    }

    /// Persist a message, then fan it out to every session joined to the
    /// target room — the sender's own sessions included (no local-echo
    /// suppression; a sender relies on receiving its own broadcast back).
    ///
    /// A persistence failure aborts the broadcast: nothing unpersisted is
    /// ever fanned out, and the error goes to the calling session alone.
    pub async fn publish(
        &self,
        db: &Arc<Database>,
        msg: NewMessage,
    ) -> Result<ChatMessage, ChatError> {
        let _guard = self.inner.publish_lock.lock().await;

        let db = db.clone();
        let stored = tokio::task::spawn_blocking(move || db.append_message(&msg))
            .await
            .map_err(ChatError::persistence)??;

        if let Some(room) = stored.room() {
            self.broadcast(&room, ChatEvent::from_stored(&stored, room)).await;
        }

        Ok(stored)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
