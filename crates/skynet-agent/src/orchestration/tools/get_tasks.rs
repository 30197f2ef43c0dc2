//! get-tasks agent (§4.3). Range resolution is deterministic (see
//! [`crate::orchestration::time_resolve::resolve_day_range_expression`]);
//! no auxiliary model call is needed since the range vocabulary is bounded.

use async_trait::async_trait;
use serde_json::json;

use crate::orchestration::scratchpad::{ScratchpadEntry, Speaker};
use crate::orchestration::time_resolve::resolve_day_range_expression;
use crate::orchestration::tool_agent::{latest_text, ToolAgent, ToolResult, TurnContext};

pub const NAME: &str = "get_tasks_tool";

pub struct GetTasksTool;

#[async_trait]
impl ToolAgent for GetTasksTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Looks up the user's reminders/tasks within a time range mentioned in their utterance."
    }

    async fn execute(&self, snapshot: &[ScratchpadEntry], ctx: &TurnContext) -> ToolResult {
        let user_text = latest_text(snapshot, Speaker::User).unwrap_or("");
        let (start, end) = resolve_day_range_expression(user_text, ctx.now);

        let tasks = match ctx.tasks.list_tasks_by_user_in_range(&ctx.user.id, start, end) {
            Ok(tasks) => tasks,
            Err(e) => return ToolResult::fail(format!("could not look up reminders: {e}")),
        };

        let total_count = tasks.len();
        let tasks_json: Vec<_> = tasks
            .iter()
            .map(|t| {
                json!({
                    "task_id": t.task_id,
                    "description": t.description(),
                    "status": t.status.to_string(),
                    "time_to_execute": t.time_to_execute.to_rfc3339(),
                })
            })
            .collect();

        // An empty list is a success, not an error (§4.3).
        ToolResult::ok(format!("found {total_count} reminder(s) in range"))
            .with("tasks", json!(tasks_json))
            .with("total_count", total_count as i64)
    }
}
