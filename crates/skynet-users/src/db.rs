use rusqlite::{Connection, Result};

use crate::types::User;

/// Map a `users` SELECT row (column order from the queries in `resolver.rs`)
/// to a [`User`].
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        display_name: row.get(1)?,
        timezone: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// Initialise the `users` table. Safe to call on every startup —
/// `CREATE TABLE IF NOT EXISTS` makes it idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id           TEXT PRIMARY KEY NOT NULL,
            display_name TEXT NOT NULL,
            timezone     TEXT NOT NULL DEFAULT 'UTC',
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        );",
    )
}
