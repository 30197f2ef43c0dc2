//! The `ToolAgent` trait (§4.3, §9 "Dynamic dispatch of tool agents") and
//! the shared per-turn context every concrete agent executes against.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::orchestration::scratchpad::ScratchpadEntry;
use crate::provider::LlmProvider;
use skynet_scheduler::SchedulerHandle;
use skynet_tasks::TaskStoreClient;
use skynet_users::User;

/// `{success, message}` plus whatever type-specific fields a given agent
/// wants to carry (task ids, status strings, counts). Always JSON-
/// serializable because it's appended to the scratchpad's `function_call`
/// entries as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Optional diagnostic/classification field (`"status"` in the spec's
    /// vocabulary: `"all_tasks_created"`, `"invalid_time"`, ...).
    pub fn status(&self) -> Option<&str> {
        self.extra.get("status").and_then(Value::as_str)
    }
}

/// Everything a tool agent needs to execute one turn: who the user is, the
/// current instant in their zone, the store, and the auxiliary LLM used for
/// structured extraction. Built fresh by the session gateway for each
/// invocation of the orchestrator.
pub struct TurnContext {
    pub user: User,
    /// Current instant, expressed with the user's zone's offset.
    pub now: DateTime<FixedOffset>,
    pub tasks: Arc<TaskStoreClient>,
    pub provider: Arc<dyn LlmProvider>,
    pub model: String,
    /// `None` disables deferred-delivery publishing (used by tests that
    /// don't want to stand up a scheduler engine).
    pub scheduler: Option<Arc<SchedulerHandle>>,
}

/// A single side-effecting (or, for compose-reply, purely read-only)
/// capability the Selector can choose. Mirrors the `name/description/
/// execute` shape this codebase's existing tool trait already uses
/// (`crate::tools::Tool`), generalized to the scratchpad-based argument
/// style this core needs instead of a raw JSON-args style.
#[async_trait]
pub trait ToolAgent: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// Any internal failure (extraction, store error, provider error) must
    /// be caught here and converted to `ToolResult::fail` — a tool agent
    /// never propagates an error out of `execute` (§4.5 failure semantics).
    async fn execute(&self, snapshot: &[ScratchpadEntry], ctx: &TurnContext) -> ToolResult;
}

/// The most recent `Text` entry from `source` in `snapshot`, if any.
pub fn latest_text(snapshot: &[ScratchpadEntry], source: crate::orchestration::scratchpad::Speaker) -> Option<&str> {
    snapshot.iter().rev().find_map(|entry| match entry {
        ScratchpadEntry::Text { source: s, content } if *s == source => Some(content.as_str()),
        _ => None,
    })
}

/// Index of the most recent `Text` entry from `source`, if any — used to
/// scope "only entries added after the most recent user turn" lookups.
pub fn latest_text_index(
    snapshot: &[ScratchpadEntry],
    source: crate::orchestration::scratchpad::Speaker,
) -> Option<usize> {
    snapshot.iter().enumerate().rev().find_map(|(i, entry)| match entry {
        ScratchpadEntry::Text { source: s, .. } if *s == source => Some(i),
        _ => None,
    })
}
