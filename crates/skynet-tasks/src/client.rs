use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use skynet_sessions::{Session, SessionManager};
use skynet_users::{User, UserResolver};
use tracing::instrument;

use crate::error::Result;
use crate::store::TaskStore;
use crate::types::{Message, Task, TaskPatch};

/// The single entry point tool agents, REST handlers, and the session
/// gateway use to reach persisted state: tasks, sessions, messages, the
/// pending-delivery table, and the minimal user profile used to personalize
/// a turn. Composes three already-independent store crates behind one facade
/// rather than duplicating their schemas here.
pub struct TaskStoreClient {
    tasks: TaskStore,
    sessions: Arc<SessionManager>,
    users: Arc<UserResolver>,
}

impl TaskStoreClient {
    pub fn new(tasks: TaskStore, sessions: Arc<SessionManager>, users: Arc<UserResolver>) -> Self {
        Self {
            tasks,
            sessions,
            users,
        }
    }

    // --- tasks ---------------------------------------------------------

    #[instrument(skip(self, info), fields(user_id))]
    pub fn create_task(
        &self,
        user_id: &str,
        info: HashMap<String, String>,
        time_to_execute: DateTime<FixedOffset>,
    ) -> Result<Task> {
        self.tasks.create_task(user_id, info, time_to_execute, Utc::now())
    }

    pub fn get_task(&self, task_id: &str) -> Result<Option<Task>> {
        self.tasks.get_task(task_id)
    }

    pub fn list_tasks_by_user_in_range(
        &self,
        user_id: &str,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Result<Vec<Task>> {
        self.tasks.list_tasks_in_range(user_id, start, end)
    }

    pub fn list_tasks_for_user(&self, user_id: &str) -> Result<Vec<Task>> {
        self.tasks.list_tasks_for_user(user_id)
    }

    pub fn update_task(&self, task_id: &str, patch: TaskPatch) -> Result<Task> {
        self.tasks.update_task(task_id, patch)
    }

    pub fn delete_task(&self, task_id: &str) -> Result<()> {
        self.tasks.delete_task(task_id)
    }

    // --- sessions --------------------------------------------------------

    pub fn get_session(&self, user_id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(user_id)?)
    }

    pub fn create_session(&self, user_id: &str) -> Result<Session> {
        Ok(self.sessions.get_or_create(user_id)?)
    }

    pub fn set_session_active(&self, user_id: &str, active: bool) -> Result<()> {
        Ok(self.sessions.set_active(user_id, active)?)
    }

    pub fn is_session_active(&self, user_id: &str) -> Result<bool> {
        Ok(self.sessions.is_active(user_id)?)
    }

    pub fn save_scratchpad_snapshot(&self, user_id: &str, snapshot_json: &str) -> Result<()> {
        Ok(self.sessions.save_scratchpad_snapshot(user_id, snapshot_json)?)
    }

    // --- messages --------------------------------------------------------

    pub fn list_unread_messages_for_chat(&self, chat_id: &str) -> Result<Vec<Message>> {
        self.tasks.list_unread_messages(chat_id)
    }

    pub fn list_messages_for_chat(&self, chat_id: &str) -> Result<Vec<Message>> {
        self.tasks.list_messages(chat_id)
    }

    pub fn create_message(&self, chat_id: &str, sender_id: &str, content: &str) -> Result<Message> {
        self.tasks.create_message(chat_id, sender_id, content)
    }

    pub fn mark_messages_read(&self, chat_id: &str, message_ids: &[String]) -> Result<()> {
        self.tasks.mark_messages_read(chat_id, message_ids)
    }

    // --- pending delivery --------------------------------------------------

    pub fn try_claim_pending_delivery(&self, user_id: &str, message_id: &str) -> Result<bool> {
        self.tasks.try_claim_pending_delivery(user_id, message_id)
    }

    pub fn release_pending_delivery(&self, user_id: &str, message_id: &str) -> Result<()> {
        self.tasks.release_pending_delivery(user_id, message_id)
    }

    pub fn clear_pending_delivery(&self, user_id: &str, message_id: &str) -> Result<()> {
        self.tasks.clear_pending_delivery(user_id, message_id)
    }

    // --- user profile --------------------------------------------------

    /// Minimal user profile (display name, timezone) used to personalize a
    /// turn. No authentication, permissions, or quota semantics live here.
    pub fn get_user_profile(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users.get_user(user_id)?)
    }

    /// Same lookup, but materializes a default profile (display name equal
    /// to the id, UTC timezone) on first contact — the session gateway
    /// calls this on connect rather than `get_user_profile` since a device
    /// can open a session before any profile-provisioning step has run.
    pub fn get_or_create_user_profile(&self, user_id: &str) -> Result<User> {
        Ok(self.users.get_or_create(user_id)?)
    }
}
