use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a task.
///
/// Transitions are monotonic except via explicit edit: `pending -> completed`
/// or the reverse, never anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// A persisted reminder/task record.
///
/// `time_to_execute` keeps whatever UTC offset it arrived with — per the
/// system's timezone policy, conversion to a different zone happens only in
/// display-formatting helpers, never in storage or comparisons (comparisons
/// use the instant, which is offset-independent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub user_id: String,
    /// Free-form key/value payload; must at minimum contain a `description`.
    pub info: HashMap<String, String>,
    pub status: TaskStatus,
    pub time_to_execute: DateTime<FixedOffset>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Convenience accessor for the human description tool agents surface
    /// in replies; falls back to an empty string rather than panicking when
    /// a caller created a task without the conventional key.
    pub fn description(&self) -> &str {
        self.info.get("description").map(|s| s.as_str()).unwrap_or("")
    }
}

/// Partial update for [`Task`]. A "completed" status change must never be
/// mixed with an info or time change in the same patch — tool agents enforce
/// this before calling the store, but the store re-validates it too.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    pub status: Option<TaskStatus>,
    pub info: Option<HashMap<String, String>>,
    pub time_to_execute: Option<DateTime<FixedOffset>>,
}

/// A message row in a user-facing chat, delivered via REST ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub chat_id: String,
    pub message_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
}
