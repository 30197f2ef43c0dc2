//! compose-reply agent (§4.3). Pure consumer of the scratchpad; never
//! mutates state. Always terminates the orchestrator's loop.

use async_trait::async_trait;
use serde_json::Value;

use crate::orchestration::scratchpad::{ScratchpadEntry, Speaker};
use crate::orchestration::tool_agent::{latest_text, latest_text_index, ToolAgent, ToolResult, TurnContext};
use crate::provider::{ChatRequest, Message, Role};

pub const NAME: &str = "compose_reply_tool";

const SYSTEM_PROMPT: &str = "You compose the final spoken reply for one turn of a voice assistant. \
You are given the user's utterance and a summary of the tool results produced this turn. Rules: \
only mention reminders/tasks the summary explicitly shows were created, edited, or deleted — never \
invent one that isn't there; report an empty lookup as \"you have no tasks\" rather than implying \
an error occurred; if the user's utterance is an ambiguous acknowledgment (\"thanks\", \"okay\") and \
no tool result this turn confirms a completion or deferral, ask a brief clarifying question instead \
of assuming something happened. Respond with one short, natural, spoken-style sentence — no \
markdown, no JSON, no preamble.";

const FALLBACK_REPLY: &str = "Sorry, something went wrong on my end — could you try that again?";
const NO_TASKS_REPLY: &str = "You have no tasks scheduled.";

fn function_calls_since(snapshot: &[ScratchpadEntry], since: usize) -> Vec<(&str, &Value)> {
    snapshot[since..]
        .iter()
        .filter_map(|entry| match entry {
            ScratchpadEntry::FunctionCall { name, response: Some(r), .. } => Some((name.as_str(), r)),
            _ => None,
        })
        .collect()
}

fn summarize(calls: &[(&str, &Value)]) -> String {
    if calls.is_empty() {
        return "(no tool was called this turn)".to_string();
    }
    calls
        .iter()
        .map(|(name, result)| format!("- {name}: {result}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct ComposeReplyTool;

#[async_trait]
impl ToolAgent for ComposeReplyTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Produces the final, user-visible reply for this turn from the tool results gathered so far."
    }

    async fn execute(&self, snapshot: &[ScratchpadEntry], ctx: &TurnContext) -> ToolResult {
        let since = latest_text_index(snapshot, Speaker::User).unwrap_or(0);
        let user_text = latest_text(snapshot, Speaker::User).unwrap_or("");
        let calls = function_calls_since(snapshot, since);

        // Deterministic short-circuit for the common empty-lookup case
        // (S3) — no need for a model round-trip to say "you have none".
        if let [(name, result)] = calls.as_slice() {
            if *name == "get_tasks_tool" {
                let empty = result
                    .get("tasks")
                    .and_then(|v| v.as_array())
                    .map(|a| a.is_empty())
                    .unwrap_or(false);
                if empty {
                    return ToolResult::ok(NO_TASKS_REPLY);
                }
            }
        }

        let summary = summarize(&calls);
        let user_prompt = format!("User said: \"{user_text}\"\n\nTool results this turn:\n{summary}");

        let request = ChatRequest {
            model: ctx.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: Role::User,
                content: user_prompt,
            }],
            max_tokens: 256,
            stream: false,
            thinking: None,
            tools: Vec::new(),
        };

        match ctx.provider.send(&request).await {
            Ok(response) => ToolResult::ok(response.content.trim().to_string()),
            Err(e) => {
                tracing::warn!(error = %e, "compose-reply provider call failed; using fallback apology");
                ToolResult::ok(FALLBACK_REPLY)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_reports_no_tool_called() {
        assert_eq!(summarize(&[]), "(no tool was called this turn)");
    }

    #[test]
    fn function_calls_since_excludes_entries_before_the_cutoff() {
        let entries = vec![
            ScratchpadEntry::FunctionCall {
                source: Speaker::Agent,
                name: "get_tasks_tool".into(),
                call_id: "a".into(),
                args: None,
                response: Some(serde_json::json!({"tasks": []})),
            },
            ScratchpadEntry::Text {
                source: Speaker::User,
                content: "what about next week".into(),
            },
            ScratchpadEntry::FunctionCall {
                source: Speaker::Agent,
                name: "get_tasks_tool".into(),
                call_id: "b".into(),
                args: None,
                response: Some(serde_json::json!({"tasks": []})),
            },
        ];
        let calls = function_calls_since(&entries, 1);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "get_tasks_tool");
    }
}
