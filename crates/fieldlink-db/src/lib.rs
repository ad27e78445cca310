pub mod directory;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod reports;
pub mod rooms;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use fieldlink_types::error::ChatError;

/// Mutex-guarded SQLite handle shared by all stores.
///
/// A single connection serializes every write, which is what makes message
/// appends atomic and their rowids monotonic under concurrent senders.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, ChatError> {
        let conn = Connection::open(path).store()?;
        Self::init(conn, Some(path))
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self, ChatError> {
        let conn = Connection::open_in_memory().store()?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<&Path>) -> Result<Self, ChatError> {
        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL").store()?;
        conn.pragma_update(None, "foreign_keys", "ON").store()?;

        migrations::run(&conn)?;

        if let Some(path) = path {
            info!("Database opened at {}", path.display());
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ChatError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ChatError>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ChatError::persistence(format!("DB lock poisoned: {e}")))?;
        f(&mut conn)
    }
}

/// Maps rusqlite results into the shared error taxonomy.
pub(crate) trait StoreResultExt<T> {
    fn store(self) -> Result<T, ChatError>;
}

impl<T> StoreResultExt<T> for Result<T, rusqlite::Error> {
    fn store(self) -> Result<T, ChatError> {
        self.map_err(ChatError::persistence)
    }
}
