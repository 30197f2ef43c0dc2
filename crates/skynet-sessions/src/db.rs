use rusqlite::Connection;

use crate::error::Result;

/// Initialise the sessions table.
///
/// Safe to call on every startup — uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            user_id             TEXT PRIMARY KEY,
            is_active           INTEGER NOT NULL DEFAULT 0,
            scratchpad_snapshot TEXT,
            created_at          TEXT NOT NULL,
            updated_at          TEXT NOT NULL
        );",
    )?;
    Ok(())
}
