use rusqlite::params;

use fieldlink_types::error::ChatError;
use fieldlink_types::room::Room;

use crate::{Database, StoreResultExt};

impl Database {
    /// Resolve the set of rooms a technician belongs to: exactly one direct
    /// room keyed by their own id, plus one room per current group
    /// membership. Recomputed from the directory on every call — no
    /// caching — so the result is never stale after a membership change.
    ///
    /// Callers use this both to authorize gateway joins and to build the
    /// room list shown to the client.
    pub fn rooms_for_technician(&self, technician_id: i64) -> Result<Vec<Room>, ChatError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT group_id FROM group_members
                     WHERE technician_id = ?1 ORDER BY group_id",
                )
                .store()?;

            let mut rooms = vec![Room::Direct(technician_id)];
            let group_rooms = stmt
                .query_map(params![technician_id], |row| row.get::<_, i64>(0))
                .store()?
                .collect::<Result<Vec<_>, _>>()
                .store()?;
            rooms.extend(group_rooms.into_iter().map(Room::Group));

            Ok(rooms)
        })
    }
}
