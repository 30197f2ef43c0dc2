use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why a deferred job exists. Mirrors the two producer surfaces: task
/// creation and pending user messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeReason {
    Task,
    TextMessage,
}

/// A queued job payload, as handed to the broker by the deferred dispatcher.
///
/// Task jobs carry `pending_task: true` and are scheduled for the task's
/// execution instant; text-message jobs carry `pending_message: true` and
/// are scheduled one minute after ingress.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueueJob {
    Task {
        task_id: String,
        user_id: String,
        title: String,
        description: String,
        pending_task: bool,
    },
    TextMessage {
        message_type: String,
        user_id: String,
        chat_id: String,
        pending_task: bool,
        pending_message: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
}

impl QueueJob {
    pub fn task(task_id: impl Into<String>, user_id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        QueueJob::Task {
            task_id: task_id.into(),
            user_id: user_id.into(),
            title: title.into(),
            description: description.into(),
            pending_task: true,
        }
    }

    pub fn text_message(user_id: impl Into<String>, chat_id: impl Into<String>, message_id: Option<String>) -> Self {
        QueueJob::TextMessage {
            message_type: "text_message".to_string(),
            user_id: user_id.into(),
            chat_id: chat_id.into(),
            pending_task: false,
            pending_message: true,
            message_id,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            QueueJob::Task { user_id, .. } => user_id,
            QueueJob::TextMessage { user_id, .. } => user_id,
        }
    }

    pub fn reason(&self) -> WakeReason {
        match self {
            QueueJob::Task { .. } => WakeReason::Task,
            QueueJob::TextMessage { .. } => WakeReason::TextMessage,
        }
    }
}

/// One-shot control-plane message pushed to the edge device over the
/// authenticated device channel (C8) to wake an inactive session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WakeSignal {
    pub command: String,
    pub reason: WakeReason,
    pub user_id: String,
    pub payload: Value,
}

impl WakeSignal {
    pub fn new(reason: WakeReason, user_id: impl Into<String>, payload: Value) -> Self {
        Self { command: "start_websocket".to_string(), reason, user_id: user_id.into(), payload }
    }
}

/// Decoded `turns` wake-up injection, as the device re-sends it on the new
/// session it opens in response to a [`WakeSignal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WakeInjection {
    pub reason: WakeReason,
    pub user_id: String,
    pub payload: Value,
}

impl WakeInjection {
    /// Parse a decoded `turns` object; returns `None` if it is not a
    /// recognized `command: "start_websocket"` wake-up shape.
    pub fn from_value(v: &Value) -> Option<Self> {
        let obj = v.as_object()?;
        if obj.get("command").and_then(Value::as_str) != Some("start_websocket") {
            return None;
        }
        let reason_str = obj.get("reason").and_then(Value::as_str)?;
        let reason = match reason_str {
            "task" => WakeReason::Task,
            "text_message" => WakeReason::TextMessage,
            _ => return None,
        };
        let has_flag = match reason {
            WakeReason::Task => obj.get("pending_task").and_then(Value::as_bool) == Some(true),
            WakeReason::TextMessage => obj.get("pending_messages").and_then(Value::as_bool) == Some(true)
                || obj.get("pending_message").and_then(Value::as_bool) == Some(true),
        };
        if !has_flag {
            return None;
        }
        let user_id = obj.get("user_id").and_then(Value::as_str)?.to_string();
        Some(Self { reason, user_id, payload: v.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_job_serializes_with_pending_task_flag() {
        let job = QueueJob::task("t1", "u1", "Pay rent", "due the 1st");
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["pending_task"], true);
        assert_eq!(json["task_id"], "t1");
    }

    #[test]
    fn text_message_job_serializes_without_message_id_when_absent() {
        let job = QueueJob::text_message("u1", "c1", None);
        let json = serde_json::to_string(&job).unwrap();
        assert!(!json.contains("message_id"));
        assert!(json.contains(r#""pending_message":true"#));
    }

    #[test]
    fn wake_injection_requires_matching_flag() {
        let v = serde_json::json!({"command":"start_websocket","reason":"task","user_id":"u1"});
        assert!(WakeInjection::from_value(&v).is_none());
        let v = serde_json::json!({"command":"start_websocket","reason":"task","pending_task":true,"user_id":"u1"});
        assert!(WakeInjection::from_value(&v).is_some());
    }

    #[test]
    fn wake_injection_accepts_text_message_reason() {
        let v = serde_json::json!({"command":"start_websocket","reason":"text_message","pending_messages":true,"user_id":"u1"});
        let w = WakeInjection::from_value(&v).unwrap();
        assert_eq!(w.reason, WakeReason::TextMessage);
    }
}
