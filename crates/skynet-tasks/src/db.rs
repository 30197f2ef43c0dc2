use rusqlite::Connection;

use crate::error::Result;

/// Initialise the `tasks`, `messages`, and `pending_text_message_jobs` tables.
///
/// Task (not message) jobs carry no pending-delivery row — per the
/// at-most-one guarantee, only text-message jobs participate in that table
/// (see `DESIGN.md`, open question on task vs. message pending rows).
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tasks (
            task_id         TEXT NOT NULL PRIMARY KEY,
            user_id         TEXT NOT NULL,
            task_info       TEXT NOT NULL,   -- JSON-encoded key/value map
            status          TEXT NOT NULL DEFAULT 'pending',
            time_to_execute TEXT NOT NULL,   -- RFC3339, offset preserved
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_tasks_user_time
            ON tasks (user_id, time_to_execute);

        CREATE TABLE IF NOT EXISTS messages (
            chat_id    TEXT NOT NULL,
            message_id TEXT NOT NULL,
            sender_id  TEXT NOT NULL,
            content    TEXT NOT NULL,
            created_at TEXT NOT NULL,
            is_read    INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (chat_id, message_id)
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_messages_chat_created
            ON messages (chat_id, created_at);

        CREATE TABLE IF NOT EXISTS pending_text_message_jobs (
            user_id    TEXT NOT NULL,
            message_id TEXT NOT NULL,
            PRIMARY KEY (user_id, message_id)
        ) STRICT;
        ",
    )?;
    Ok(())
}
