use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, instrument};

use crate::error::{Result, SessionError};
use crate::types::Session;

/// Thread-safe manager for the one-row-per-user session table.
///
/// Wraps a single SQLite connection in a `Mutex`, the same pattern used by
/// every other store crate in this workspace — sufficient for the
/// single-node deployment target.
pub struct SessionManager {
    db: Mutex<Connection>,
}

impl SessionManager {
    /// Wrap an already-open connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        crate::db::init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Return the session row for `user_id`, creating an inactive one if
    /// it doesn't exist yet.
    #[instrument(skip(self), fields(user_id))]
    pub fn get_or_create(&self, user_id: &str) -> Result<Session> {
        if let Some(session) = self.get(user_id)? {
            debug!("session row exists");
            return Ok(session);
        }

        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR IGNORE INTO sessions (user_id, is_active, scratchpad_snapshot, created_at, updated_at)
             VALUES (?1, 0, NULL, ?2, ?2)",
            rusqlite::params![user_id, now],
        )?;

        db.query_row(
            "SELECT user_id, is_active, scratchpad_snapshot, created_at, updated_at
             FROM sessions WHERE user_id = ?1",
            rusqlite::params![user_id],
            row_to_session,
        )
        .map_err(SessionError::Database)
    }

    /// Retrieve a session by user id, returning `None` if no row exists.
    #[instrument(skip(self), fields(user_id))]
    pub fn get(&self, user_id: &str) -> Result<Option<Session>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT user_id, is_active, scratchpad_snapshot, created_at, updated_at
             FROM sessions WHERE user_id = ?1",
            rusqlite::params![user_id],
            row_to_session,
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(SessionError::Database(e)),
        }
    }

    /// Flip `is_active`. Deactivating also clears the scratchpad snapshot
    /// column — it is a crash-recovery convenience, not a durable transcript.
    #[instrument(skip(self), fields(user_id, active))]
    pub fn set_active(&self, user_id: &str, active: bool) -> Result<()> {
        self.get_or_create(user_id)?;
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        if active {
            db.execute(
                "UPDATE sessions SET is_active = 1, updated_at = ?2 WHERE user_id = ?1",
                rusqlite::params![user_id, now],
            )?;
        } else {
            db.execute(
                "UPDATE sessions SET is_active = 0, scratchpad_snapshot = NULL, updated_at = ?2
                 WHERE user_id = ?1",
                rusqlite::params![user_id, now],
            )?;
        }
        Ok(())
    }

    /// Persist a crash-recovery scratchpad snapshot (JSON-encoded by the caller).
    #[instrument(skip(self, snapshot_json), fields(user_id))]
    pub fn save_scratchpad_snapshot(&self, user_id: &str, snapshot_json: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE sessions SET scratchpad_snapshot = ?2, updated_at = ?3 WHERE user_id = ?1",
            rusqlite::params![user_id, snapshot_json, now],
        )?;
        if n == 0 {
            return Err(SessionError::NotFound {
                key: user_id.to_string(),
            });
        }
        Ok(())
    }

    /// Whether any user currently holds an active session.
    #[instrument(skip(self), fields(user_id))]
    pub fn is_active(&self, user_id: &str) -> Result<bool> {
        Ok(self.get(user_id)?.map(|s| s.is_active).unwrap_or(false))
    }
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        user_id: row.get(0)?,
        is_active: row.get::<_, i64>(1)? != 0,
        scratchpad_snapshot: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        let conn = Connection::open_in_memory().unwrap();
        SessionManager::new(conn).unwrap()
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mgr = manager();
        let a = mgr.get_or_create("u-1").unwrap();
        let b = mgr.get_or_create("u-1").unwrap();
        assert_eq!(a.user_id, b.user_id);
        assert!(!a.is_active);
    }

    #[test]
    fn deactivate_clears_snapshot() {
        let mgr = manager();
        mgr.get_or_create("u-1").unwrap();
        mgr.set_active("u-1", true).unwrap();
        mgr.save_scratchpad_snapshot("u-1", "[]").unwrap();
        let active = mgr.get("u-1").unwrap().unwrap();
        assert!(active.is_active);
        assert_eq!(active.scratchpad_snapshot.as_deref(), Some("[]"));

        mgr.set_active("u-1", false).unwrap();
        let inactive = mgr.get("u-1").unwrap().unwrap();
        assert!(!inactive.is_active);
        assert_eq!(inactive.scratchpad_snapshot, None);
    }
}
