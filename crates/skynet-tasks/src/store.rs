use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, FixedOffset, Utc};
use rusqlite::Connection;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::init_db;
use crate::error::{Result, StoreError};
use crate::types::{Message, Task, TaskPatch, TaskStatus};

/// SQLite-backed store for tasks, messages, and pending text-message
/// delivery claims. Wraps a single connection in a `Mutex`, matching the
/// rest of this workspace's store crates.
pub struct TaskStore {
    db: Mutex<Connection>,
}

impl TaskStore {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    // --- tasks ---------------------------------------------------------

    /// Create a task. Rejects any `time_to_execute` at or before `now`
    /// rather than silently storing a past reminder.
    #[instrument(skip(self, info), fields(user_id))]
    pub fn create_task(
        &self,
        user_id: &str,
        info: HashMap<String, String>,
        time_to_execute: DateTime<FixedOffset>,
        now: DateTime<Utc>,
    ) -> Result<Task> {
        if time_to_execute <= now {
            return Err(StoreError::InvalidTime(format!(
                "{time_to_execute} is not strictly after now ({now})"
            )));
        }

        let task_id = Uuid::new_v4().to_string();
        let info_json = serde_json::to_string(&info)?;
        let now_str = now.to_rfc3339();

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO tasks (task_id, user_id, task_info, status, time_to_execute, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?5)",
            rusqlite::params![task_id, user_id, info_json, time_to_execute.to_rfc3339(), now_str],
        )?;

        info!(%task_id, user_id, "task created");
        Ok(Task {
            task_id,
            user_id: user_id.to_string(),
            info,
            status: TaskStatus::Pending,
            time_to_execute,
            created_at: now,
            updated_at: now,
        })
    }

    #[instrument(skip(self))]
    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT task_id, user_id, task_info, status, time_to_execute, created_at, updated_at
             FROM tasks WHERE task_id = ?1",
            [task_id],
            row_to_task,
        ) {
            Ok(t) => Ok(Some(t?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// List tasks for `user_id` whose `time_to_execute` instant falls within
    /// `[start, end]` inclusive, ordered by execution time.
    #[instrument(skip(self), fields(user_id))]
    pub fn list_tasks_in_range(
        &self,
        user_id: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<Task>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT task_id, user_id, task_info, status, time_to_execute, created_at, updated_at
             FROM tasks WHERE user_id = ?1
             ORDER BY time_to_execute",
        )?;
        let rows = stmt.query_map([user_id], row_to_task)?;
        let mut out = Vec::new();
        for r in rows {
            let task = r??;
            // Compare by instant, not by stored offset — offsets may differ
            // per task while still denoting the same moment.
            if task.time_to_execute >= start && task.time_to_execute <= end {
                out.push(task);
            }
        }
        Ok(out)
    }

    /// List all tasks for a user (used by `GET /tasks/{user_id}`).
    #[instrument(skip(self), fields(user_id))]
    pub fn list_tasks_for_user(&self, user_id: &str) -> Result<Vec<Task>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT task_id, user_id, task_info, status, time_to_execute, created_at, updated_at
             FROM tasks WHERE user_id = ?1
             ORDER BY time_to_execute",
        )?;
        let rows = stmt.query_map([user_id], row_to_task)?;
        rows.map(|r| r?).collect()
    }

    /// Apply a partial update. Rejects a patch that mixes a `completed`
    /// status change with an `info` or `time_to_execute` change — those must
    /// be applied as separate edits.
    #[instrument(skip(self, patch))]
    pub fn update_task(&self, task_id: &str, patch: TaskPatch) -> Result<Task> {
        if patch.status == Some(TaskStatus::Completed)
            && (patch.info.is_some() || patch.time_to_execute.is_some())
        {
            return Err(StoreError::InvalidPatch(
                "completing a task must not change info or time_to_execute in the same edit".into(),
            ));
        }

        let existing = self
            .get_task(task_id)?
            .ok_or_else(|| StoreError::TaskNotFound {
                task_id: task_id.to_string(),
            })?;

        let status = patch.status.unwrap_or(existing.status);
        let info = patch.info.unwrap_or(existing.info);
        let time_to_execute = patch.time_to_execute.unwrap_or(existing.time_to_execute);
        let now = Utc::now();
        let info_json = serde_json::to_string(&info)?;

        let db = self.db.lock().unwrap();
        let n = db.execute(
            "UPDATE tasks SET task_info = ?2, status = ?3, time_to_execute = ?4, updated_at = ?5
             WHERE task_id = ?1",
            rusqlite::params![
                task_id,
                info_json,
                status.to_string(),
                time_to_execute.to_rfc3339(),
                now.to_rfc3339()
            ],
        )?;
        if n == 0 {
            return Err(StoreError::TaskNotFound {
                task_id: task_id.to_string(),
            });
        }

        Ok(Task {
            task_id: task_id.to_string(),
            user_id: existing.user_id,
            info,
            status,
            time_to_execute,
            created_at: existing.created_at,
            updated_at: now,
        })
    }

    #[instrument(skip(self))]
    pub fn delete_task(&self, task_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let n = db.execute("DELETE FROM tasks WHERE task_id = ?1", [task_id])?;
        if n == 0 {
            return Err(StoreError::TaskNotFound {
                task_id: task_id.to_string(),
            });
        }
        Ok(())
    }

    // --- messages --------------------------------------------------------

    #[instrument(skip(self, content), fields(chat_id))]
    pub fn create_message(&self, chat_id: &str, sender_id: &str, content: &str) -> Result<Message> {
        let message_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO messages (chat_id, message_id, sender_id, content, created_at, is_read)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            rusqlite::params![chat_id, message_id, sender_id, content, now.to_rfc3339()],
        )?;
        Ok(Message {
            chat_id: chat_id.to_string(),
            message_id,
            sender_id: sender_id.to_string(),
            content: content.to_string(),
            created_at: now,
            is_read: false,
        })
    }

    #[instrument(skip(self), fields(chat_id))]
    pub fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT chat_id, message_id, sender_id, content, created_at, is_read
             FROM messages WHERE chat_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map([chat_id], row_to_message)?;
        rows.map(|r| r.map_err(StoreError::Database)).collect()
    }

    #[instrument(skip(self), fields(chat_id))]
    pub fn list_unread_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT chat_id, message_id, sender_id, content, created_at, is_read
             FROM messages WHERE chat_id = ?1 AND is_read = 0 ORDER BY created_at",
        )?;
        let rows = stmt.query_map([chat_id], row_to_message)?;
        rows.map(|r| r.map_err(StoreError::Database)).collect()
    }

    #[instrument(skip(self, message_ids), fields(chat_id))]
    pub fn mark_messages_read(&self, chat_id: &str, message_ids: &[String]) -> Result<()> {
        let db = self.db.lock().unwrap();
        for message_id in message_ids {
            db.execute(
                "UPDATE messages SET is_read = 1 WHERE chat_id = ?1 AND message_id = ?2",
                rusqlite::params![chat_id, message_id],
            )?;
        }
        Ok(())
    }

    // --- pending delivery --------------------------------------------------

    /// Conditional insert: returns `true` iff this call won the race and
    /// claimed the pending row for `user_id`, `false` if one already existed
    /// *for that user* (§4.1 "inserts (user, message) only when no row
    /// exists for that user"). The guard is on `user_id` alone, not the
    /// `(user_id, message_id)` pair — a second distinct message for a user
    /// who already has a pending claim must not win a second row, or the
    /// dispatcher would push two wake signals for one user.
    #[instrument(skip(self), fields(user_id, message_id))]
    pub fn try_claim_pending_delivery(&self, user_id: &str, message_id: &str) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let n = db.execute(
            "INSERT INTO pending_text_message_jobs (user_id, message_id)
             SELECT ?1, ?2 WHERE NOT EXISTS (
                 SELECT 1 FROM pending_text_message_jobs WHERE user_id = ?1
             )",
            rusqlite::params![user_id, message_id],
        )?;
        Ok(n == 1)
    }

    /// Release a claim without ever having surfaced the message — used when
    /// an ingress-side broker failure must not leave a stranded claim.
    #[instrument(skip(self), fields(user_id, message_id))]
    pub fn release_pending_delivery(&self, user_id: &str, message_id: &str) -> Result<()> {
        self.clear_pending_delivery(user_id, message_id)
    }

    /// Clears the pending-delivery row for `user_id`. The single row per
    /// user is the unit of the at-most-one guarantee, so this clears by
    /// `user_id` alone — `message_id` is accepted for call-site symmetry
    /// with the claim but is not part of the match.
    #[instrument(skip(self), fields(user_id, message_id))]
    pub fn clear_pending_delivery(&self, user_id: &str, message_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "DELETE FROM pending_text_message_jobs WHERE user_id = ?1",
            rusqlite::params![user_id],
        )?;
        Ok(())
    }
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Task>> {
    let task_id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let info_json: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let time_str: String = row.get(4)?;
    let created_str: String = row.get(5)?;
    let updated_str: String = row.get(6)?;

    Ok((|| -> Result<Task> {
        let info: HashMap<String, String> = serde_json::from_str(&info_json)?;
        let status: TaskStatus = status_str
            .parse()
            .map_err(|e: String| StoreError::InvalidPatch(e))?;
        let time_to_execute = DateTime::parse_from_rfc3339(&time_str)
            .map_err(|e| StoreError::InvalidTime(e.to_string()))?;
        let created_at = DateTime::parse_from_rfc3339(&created_str)
            .map_err(|e| StoreError::InvalidTime(e.to_string()))?
            .with_timezone(&Utc);
        let updated_at = DateTime::parse_from_rfc3339(&updated_str)
            .map_err(|e| StoreError::InvalidTime(e.to_string()))?
            .with_timezone(&Utc);
        Ok(Task {
            task_id,
            user_id,
            info,
            status,
            time_to_execute,
            created_at,
            updated_at,
        })
    })())
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let created_str: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    Ok(Message {
        chat_id: row.get(0)?,
        message_id: row.get(1)?,
        sender_id: row.get(2)?,
        content: row.get(3)?,
        created_at,
        is_read: row.get::<_, i64>(5)? != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> TaskStore {
        TaskStore::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn info(desc: &str) -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("description".to_string(), desc.to_string());
        m
    }

    #[test]
    fn create_then_get_roundtrips() {
        let s = store();
        let now = Utc::now();
        let fut = now.fixed_offset() + Duration::hours(1);
        let created = s.create_task("u1", info("brush teeth"), fut, now).unwrap();
        let fetched = s.get_task(&created.task_id).unwrap().unwrap();
        assert_eq!(fetched.description(), "brush teeth");
        assert_eq!(fetched.status, TaskStatus::Pending);
    }

    #[test]
    fn create_rejects_past_time() {
        let s = store();
        let now = Utc::now();
        let past = now.fixed_offset() - Duration::hours(1);
        let err = s.create_task("u1", info("x"), past, now).unwrap_err();
        assert_eq!(err.code(), "INVALID_TIME");
    }

    #[test]
    fn update_rejects_mixed_completion_patch() {
        let s = store();
        let now = Utc::now();
        let fut = now.fixed_offset() + Duration::hours(1);
        let created = s.create_task("u1", info("x"), fut, now).unwrap();
        let patch = TaskPatch {
            status: Some(TaskStatus::Completed),
            info: Some(info("y")),
            time_to_execute: None,
        };
        let err = s.update_task(&created.task_id, patch).unwrap_err();
        assert_eq!(err.code(), "INVALID_PATCH");
    }

    #[test]
    fn pending_delivery_claim_is_exclusive() {
        let s = store();
        assert!(s.try_claim_pending_delivery("u1", "m1").unwrap());
        assert!(!s.try_claim_pending_delivery("u1", "m1").unwrap());
        s.clear_pending_delivery("u1", "m1").unwrap();
        assert!(s.try_claim_pending_delivery("u1", "m1").unwrap());
    }

    #[test]
    fn pending_delivery_claim_is_per_user_not_per_message() {
        let s = store();
        assert!(s.try_claim_pending_delivery("u1", "m1").unwrap());
        // A second, distinct message for the same user must not win its own
        // row while the user's claim is still outstanding.
        assert!(!s.try_claim_pending_delivery("u1", "m2").unwrap());
        s.clear_pending_delivery("u1", "m1").unwrap();
        assert!(s.try_claim_pending_delivery("u1", "m2").unwrap());
    }
}
