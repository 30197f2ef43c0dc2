use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use tracing::instrument;

use crate::db::{init_db, row_to_user};
use crate::error::{Result, UserError};
use crate::types::User;

/// Read-mostly profile store keyed directly by `user_id` — the system has
/// no per-channel identity mapping to resolve (authentication and
/// multi-tenant isolation beyond a user id are out of scope), so this is a
/// thin lookup/auto-create layer over a single `users` table.
pub struct UserResolver {
    db: Mutex<Connection>,
}

impl UserResolver {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { db: Mutex::new(conn) })
    }

    /// Fetch a profile by id, returning `None` if no row exists.
    #[instrument(skip(self), fields(user_id))]
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT id, display_name, timezone, created_at, updated_at FROM users WHERE id = ?1",
            [user_id],
            row_to_user,
        ) {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(UserError::Database(e)),
        }
    }

    /// Fetch a profile, creating a default one (UTC, id-derived display
    /// name) on first contact — the gateway and REST surface call this so
    /// a brand-new device id never blocks on manual provisioning.
    #[instrument(skip(self), fields(user_id))]
    pub fn get_or_create(&self, user_id: &str) -> Result<User> {
        if let Some(u) = self.get_user(user_id)? {
            return Ok(u);
        }
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR IGNORE INTO users (id, display_name, timezone, created_at, updated_at)
             VALUES (?1, ?2, 'UTC', ?3, ?3)",
            rusqlite::params![user_id, user_id, now],
        )?;
        db.query_row(
            "SELECT id, display_name, timezone, created_at, updated_at FROM users WHERE id = ?1",
            [user_id],
            row_to_user,
        )
        .map_err(UserError::Database)
    }

    /// Update the display name and/or timezone used to personalize a turn.
    #[instrument(skip(self), fields(user_id))]
    pub fn update_profile(
        &self,
        user_id: &str,
        display_name: Option<&str>,
        timezone: Option<&str>,
    ) -> Result<User> {
        let existing = self
            .get_user(user_id)?
            .ok_or_else(|| UserError::NotFound(user_id.to_string()))?;
        let display_name = display_name.unwrap_or(&existing.display_name);
        let timezone = timezone.unwrap_or(&existing.timezone);
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE users SET display_name = ?2, timezone = ?3, updated_at = ?4 WHERE id = ?1",
            rusqlite::params![user_id, display_name, timezone, now],
        )?;
        db.query_row(
            "SELECT id, display_name, timezone, created_at, updated_at FROM users WHERE id = ?1",
            [user_id],
            row_to_user,
        )
        .map_err(UserError::Database)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> UserResolver {
        UserResolver::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let r = resolver();
        let a = r.get_or_create("u-1").unwrap();
        let b = r.get_or_create("u-1").unwrap();
        assert_eq!(a.created_at, b.created_at);
        assert_eq!(a.timezone, "UTC");
    }

    #[test]
    fn update_profile_changes_timezone() {
        let r = resolver();
        r.get_or_create("u-1").unwrap();
        let updated = r
            .update_profile("u-1", Some("Alex"), Some("America/Los_Angeles"))
            .unwrap();
        assert_eq!(updated.display_name, "Alex");
        assert_eq!(updated.timezone, "America/Los_Angeles");
    }
}
