use rusqlite::Connection;
use tracing::info;

use fieldlink_types::error::ChatError;

use crate::StoreResultExt;

pub fn run(conn: &Connection) -> Result<(), ChatError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS technicians (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE,
            role        TEXT,
            contact     TEXT,
            email       TEXT UNIQUE,
            password    TEXT,
            photo       TEXT
        );

        CREATE TABLE IF NOT EXISTS groups (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL,
            creator_id  INTEGER REFERENCES technicians(id) ON DELETE SET NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS group_members (
            group_id        INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
            technician_id   INTEGER NOT NULL REFERENCES technicians(id) ON DELETE CASCADE,
            PRIMARY KEY (group_id, technician_id)
        );

        CREATE INDEX IF NOT EXISTS idx_group_members_technician
            ON group_members(technician_id);

        CREATE TABLE IF NOT EXISTS messages (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            sender_id       INTEGER REFERENCES technicians(id) ON DELETE SET NULL,
            sender_name     TEXT NOT NULL,
            recipient_id    INTEGER REFERENCES technicians(id) ON DELETE SET NULL,
            group_id        INTEGER REFERENCES groups(id) ON DELETE CASCADE,
            message         TEXT NOT NULL,
            timestamp       TEXT NOT NULL,
            CHECK ((recipient_id IS NULL) != (group_id IS NULL))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_recipient
            ON messages(recipient_id, timestamp);
        CREATE INDEX IF NOT EXISTS idx_messages_group
            ON messages(group_id, timestamp);

        CREATE TABLE IF NOT EXISTS reports (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            job_number      TEXT NOT NULL,
            technician_id   INTEGER REFERENCES technicians(id) ON DELETE SET NULL,
            technician_name TEXT NOT NULL,
            progress        INTEGER NOT NULL,
            challenges      TEXT,
            comments        TEXT,
            observations    TEXT,
            start_time      TEXT,
            end_time        TEXT,
            duration        TEXT,
            team            TEXT,
            files           TEXT,
            created_at      TEXT NOT NULL,
            job_id          TEXT NOT NULL UNIQUE
        );

        CREATE INDEX IF NOT EXISTS idx_reports_technician
            ON reports(technician_id, created_at);
        ",
    )
    .store()?;

    info!("Database migrations complete");
    Ok(())
}
