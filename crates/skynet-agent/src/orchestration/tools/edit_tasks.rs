//! edit-tasks agent (§4.3). Task identity is resolved entirely from the
//! scratchpad — this agent never does its own fresh lookup against the
//! store beyond the final `update_task` call.

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};

use crate::orchestration::scratchpad::{ScratchpadEntry, Speaker};
use crate::orchestration::tool_agent::{latest_text, ToolAgent, ToolResult, TurnContext};
use skynet_tasks::TaskPatch;

pub const NAME: &str = "edit_tasks_tool";

const CANDIDATE_SOURCE_NAMES: [&str; 3] =
    ["create_tasks_tool", "get_tasks_tool", "edit_tasks_tool"];

struct Candidate {
    task_id: String,
    description: String,
    time_to_execute: Option<DateTime<FixedOffset>>,
}

/// Scan the full scratchpad most-recent-first for tool results that name a
/// task, deduplicating by id and keeping the first (= most recent) one
/// seen. `get_tasks_tool` responses carry a `tasks` array rather than a
/// single id; each entry in it is a candidate too.
fn resolve_candidates(snapshot: &[ScratchpadEntry]) -> Vec<Candidate> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();

    for entry in snapshot.iter().rev() {
        let ScratchpadEntry::FunctionCall { name, response, .. } = entry else {
            continue;
        };
        if !CANDIDATE_SOURCE_NAMES.contains(&name.as_str()) {
            continue;
        }
        let Some(response) = response else { continue };

        if let Some(task_id) = response.get("task_id").and_then(|v| v.as_str()) {
            if seen.insert(task_id.to_string()) {
                out.push(Candidate {
                    task_id: task_id.to_string(),
                    description: response
                        .get("description")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    time_to_execute: response
                        .get("time_to_execute")
                        .and_then(|v| v.as_str())
                        .and_then(|s| DateTime::parse_from_rfc3339(s).ok()),
                });
            }
        }

        if let Some(tasks) = response.get("tasks").and_then(|v| v.as_array()) {
            for task in tasks {
                let Some(task_id) = task.get("task_id").and_then(|v| v.as_str()) else {
                    continue;
                };
                if seen.insert(task_id.to_string()) {
                    out.push(Candidate {
                        task_id: task_id.to_string(),
                        description: task
                            .get("description")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        time_to_execute: task
                            .get("time_to_execute")
                            .and_then(|v| v.as_str())
                            .and_then(|s| DateTime::parse_from_rfc3339(s).ok()),
                    });
                }
            }
        }
    }
    out
}

enum Intent {
    Defer,
    Complete,
    Unknown,
}

fn classify_intent(text: &str) -> Intent {
    let lower = text.to_lowercase();
    const DEFER_PHRASES: [&str; 4] = ["later", "not yet", "need more time", "give me a few"];
    const COMPLETE_PHRASES: [&str; 5] = ["done", "complete", "completed", "finished", "did it"];
    if DEFER_PHRASES.iter().any(|p| lower.contains(p)) {
        Intent::Defer
    } else if COMPLETE_PHRASES.iter().any(|p| lower.contains(p)) {
        Intent::Complete
    } else {
        Intent::Unknown
    }
}

/// Picks the single candidate matched by the user's latest turn: if the
/// turn mentions a candidate's description, use that one; if there's
/// exactly one candidate and the turn doesn't disambiguate, use it anyway.
fn disambiguate<'a>(candidates: &'a [Candidate], user_text: &str) -> Option<&'a Candidate> {
    let lower = user_text.to_lowercase();
    let by_description = candidates
        .iter()
        .find(|c| !c.description.is_empty() && lower.contains(&c.description.to_lowercase()));
    by_description.or(if candidates.len() == 1 {
        candidates.first()
    } else {
        None
    })
}

pub struct EditTasksTool;

#[async_trait]
impl ToolAgent for EditTasksTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Updates a reminder/task already visible in this conversation: deferring it, marking it done, or changing its details."
    }

    async fn execute(&self, snapshot: &[ScratchpadEntry], ctx: &TurnContext) -> ToolResult {
        let user_text = latest_text(snapshot, Speaker::User).unwrap_or("");
        let candidates = resolve_candidates(snapshot);

        let Some(candidate) = disambiguate(&candidates, user_text) else {
            return ToolResult::fail("could not determine which reminder you mean");
        };

        let patch = match classify_intent(user_text) {
            Intent::Defer => {
                let base = candidate.time_to_execute.unwrap_or(ctx.now).max(ctx.now);
                TaskPatch {
                    time_to_execute: Some(base + Duration::minutes(5)),
                    ..Default::default()
                }
            }
            Intent::Complete => TaskPatch {
                status: Some(skynet_tasks::TaskStatus::Completed),
                ..Default::default()
            },
            Intent::Unknown => {
                return ToolResult::fail(
                    "could not determine what change you want made to that reminder",
                );
            }
        };

        match ctx.tasks.update_task(&candidate.task_id, patch) {
            Ok(task) => ToolResult::ok(format!("updated reminder \"{}\"", task.description()))
                .with("task_id", task.task_id.clone())
                .with("description", task.description().to_string())
                .with("status", task.status.to_string())
                .with("time_to_execute", task.time_to_execute.to_rfc3339()),
            Err(e) => ToolResult::fail(format!("could not update the reminder: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defer_intent_is_recognized() {
        assert!(matches!(classify_intent("not yet, give me a bit"), Intent::Defer));
    }

    #[test]
    fn completion_intent_is_recognized() {
        assert!(matches!(classify_intent("yep all done"), Intent::Complete));
    }

    #[test]
    fn resolve_candidates_prefers_most_recent_and_dedups() {
        let entries = vec![
            ScratchpadEntry::FunctionCall {
                source: Speaker::Agent,
                name: "create_tasks_tool".into(),
                call_id: "1".into(),
                args: None,
                response: Some(serde_json::json!({"success": true, "task_id": "t1", "description": "brush teeth"})),
            },
            ScratchpadEntry::FunctionCall {
                source: Speaker::Agent,
                name: "edit_tasks_tool".into(),
                call_id: "2".into(),
                args: None,
                response: Some(serde_json::json!({"success": true, "task_id": "t1", "description": "brush teeth"})),
            },
        ];
        let candidates = resolve_candidates(&entries);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].task_id, "t1");
    }

    #[test]
    fn single_candidate_is_used_even_without_a_description_match() {
        let candidates = vec![Candidate {
            task_id: "t1".into(),
            description: "brush teeth".into(),
            time_to_execute: None,
        }];
        assert!(disambiguate(&candidates, "not yet").is_some());
    }
}
