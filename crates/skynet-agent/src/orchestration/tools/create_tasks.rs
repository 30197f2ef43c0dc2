//! create-tasks agent (§4.3).

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::orchestration::dedup::normalize;
use crate::orchestration::extraction::extract_structured;
use crate::orchestration::scratchpad::{ScratchpadEntry, Speaker};
use crate::orchestration::time_resolve::{resolve_time_expression, TimeResolveError};
use crate::orchestration::tool_agent::{latest_text, latest_text_index, ToolAgent, ToolResult, TurnContext};

const SYSTEM_PROMPT: &str = "You extract reminder/task mentions from a single user utterance. \
Respond with nothing but a JSON object: {\"tasks\": [{\"description\": string, \"time_expression\": string}]}. \
List every distinct reminder the user mentioned, each with its own natural-language time phrase \
exactly as the user said it (e.g. \"6am\", \"tomorrow at 11am\", \"tonight at 9pm\"). \
If the utterance mentions no reminder at all, respond with {\"tasks\": []}.";

#[derive(Debug, Deserialize)]
struct TaskMention {
    description: String,
    time_expression: String,
}

#[derive(Debug, Deserialize)]
struct ExtractedTasks {
    tasks: Vec<TaskMention>,
}

pub struct CreateTasksTool;

pub const NAME: &str = "create_tasks_tool";

fn already_created_descriptions(snapshot: &[ScratchpadEntry], since: usize) -> std::collections::HashSet<String> {
    snapshot[since..]
        .iter()
        .filter_map(|entry| match entry {
            ScratchpadEntry::FunctionCall { name, response, .. } if name == NAME => {
                let response = response.as_ref()?;
                if response.get("success").and_then(|v| v.as_bool()) != Some(true) {
                    return None;
                }
                response
                    .get("description")
                    .and_then(|v| v.as_str())
                    .map(|s| normalize(s))
            }
            _ => None,
        })
        .collect()
}

#[async_trait]
impl ToolAgent for CreateTasksTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Creates one or more reminders/tasks from the user's most recent utterance."
    }

    async fn execute(&self, snapshot: &[ScratchpadEntry], ctx: &TurnContext) -> ToolResult {
        let Some(turn_start) = latest_text_index(snapshot, Speaker::User) else {
            return ToolResult::fail("no user utterance to extract a task from");
        };
        let Some(user_text) = latest_text(snapshot, Speaker::User) else {
            return ToolResult::fail("no user utterance to extract a task from");
        };

        let extracted: ExtractedTasks =
            match extract_structured(ctx.provider.as_ref(), &ctx.model, SYSTEM_PROMPT, user_text).await {
                Ok(e) => e,
                Err(e) => return ToolResult::fail(format!("task extraction failed: {e}")),
            };

        if extracted.tasks.is_empty() {
            return ToolResult::fail("no reminder found in the user's utterance");
        }

        let already_created = already_created_descriptions(snapshot, turn_start);
        let mention = extracted
            .tasks
            .into_iter()
            .find(|m| !already_created.contains(&normalize(&m.description)));

        let Some(mention) = mention else {
            return ToolResult::fail("every reminder in this utterance has already been created")
                .with("status", "all_tasks_created");
        };

        let time_to_execute = match resolve_time_expression(&mention.time_expression, ctx.now) {
            Ok(t) => t,
            Err(TimeResolveError::PastTime) => {
                return ToolResult::fail("that time has already passed").with("status", "invalid_time");
            }
            Err(TimeResolveError::Unparseable(_)) => {
                return ToolResult::fail("could not determine a time for that reminder")
                    .with("status", "invalid_time");
            }
        };

        let mut info = HashMap::new();
        info.insert("description".to_string(), mention.description.clone());

        let task = match ctx.tasks.create_task(&ctx.user.id, info, time_to_execute) {
            Ok(t) => t,
            Err(e) => return ToolResult::fail(format!("could not save the reminder: {e}")),
        };

        let mut result = ToolResult::ok(format!("created reminder \"{}\"", mention.description))
            .with("task_id", task.task_id.clone())
            .with("description", mention.description.clone())
            .with("time_to_execute", task.time_to_execute.to_rfc3339());

        if let Some(scheduler) = &ctx.scheduler {
            if let Err(e) = skynet_scheduler::publish_task_job(
                scheduler,
                &task.task_id,
                &ctx.user.id,
                &mention.description,
                &mention.description,
                task.time_to_execute,
            ) {
                tracing::warn!(task_id = %task.task_id, error = %e, "task created but deferred-delivery enqueue failed");
                result = result.with("enqueue_error", e.to_string());
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_created_descriptions_ignores_failed_and_other_tools() {
        let entries = vec![
            ScratchpadEntry::FunctionCall {
                source: Speaker::Agent,
                name: NAME.to_string(),
                call_id: "c1".into(),
                args: None,
                response: Some(serde_json::json!({"success": true, "description": "Brush teeth"})),
            },
            ScratchpadEntry::FunctionCall {
                source: Speaker::Agent,
                name: NAME.to_string(),
                call_id: "c2".into(),
                args: None,
                response: Some(serde_json::json!({"success": false, "description": "Pack bag"})),
            },
            ScratchpadEntry::FunctionCall {
                source: Speaker::Agent,
                name: "get_tasks_tool".to_string(),
                call_id: "c3".into(),
                args: None,
                response: Some(serde_json::json!({"success": true, "description": "Walk dog"})),
            },
        ];
        let set = already_created_descriptions(&entries, 0);
        assert!(set.contains("brush teeth"));
        assert!(!set.contains("pack bag"));
        assert!(!set.contains("walk dog"));
    }
}
