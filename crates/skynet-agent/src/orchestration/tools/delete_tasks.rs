//! delete-tasks agent (§4.3). Same id-resolution discipline as edit-tasks,
//! plus a stricter disambiguation: when multiple candidates share a
//! description, the stored time must also match something the user said.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::orchestration::scratchpad::{ScratchpadEntry, Speaker};
use crate::orchestration::time_resolve::mentioned_clock_time;
use crate::orchestration::tool_agent::{latest_text, ToolAgent, ToolResult, TurnContext};

pub const NAME: &str = "delete_tasks_tool";

const CANDIDATE_SOURCE_NAMES: [&str; 3] =
    ["create_tasks_tool", "get_tasks_tool", "edit_tasks_tool"];

struct Candidate {
    task_id: String,
    description: String,
    time_to_execute: Option<DateTime<FixedOffset>>,
}

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

/// Candidates whose description the user's turn mentions. Disambiguation
/// beyond that (matching stored time too) only matters when more than one
/// survives this filter — with a single match there's nothing to
/// disambiguate against.
fn matching_candidates<'a>(candidates: &'a [Candidate], user_text: &str) -> Vec<&'a Candidate> {
    let lower = user_text.to_lowercase();
    let matches: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| !c.description.is_empty() && lower.contains(&c.description.to_lowercase()))
        .collect();
    if matches.is_empty() && candidates.len() == 1 {
        return vec![&candidates[0]];
    }
    if matches.len() > 1 {
        if let Some(by_time) = disambiguate_by_time(&matches, user_text) {
            return vec![by_time];
        }
    }
    matches
}

/// §4.3: "matches on both description and time to disambiguate when
/// multiple tasks share a description". Only called once the description
/// filter alone has left more than one candidate; picks the one candidate
/// whose stored clock time (in its own offset) matches the clock time the
/// user's turn mentions.
fn disambiguate_by_time<'a>(matches: &[&'a Candidate], user_text: &str) -> Option<&'a Candidate> {
    let stated = mentioned_clock_time(user_text)?;
    let mut hit = None;
    for candidate in matches {
        let Some(stored) = candidate.time_to_execute else {
            continue;
        };
        if stored.time() == stated {
            if hit.is_some() {
                // More than one candidate shares this clock time too —
                // still ambiguous, fall through to the error path.
                return None;
            }
            hit = Some(*candidate);
        }
    }
    hit
}

pub struct DeleteTasksTool;

#[async_trait]
impl ToolAgent for DeleteTasksTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Deletes a reminder/task already visible in this conversation."
    }

    async fn execute(&self, snapshot: &[ScratchpadEntry], ctx: &TurnContext) -> ToolResult {
        let user_text = latest_text(snapshot, Speaker::User).unwrap_or("");
        let candidates = resolve_candidates(snapshot);
        let matches = matching_candidates(&candidates, user_text);

        let candidate = match matches.as_slice() {
            [single] => single,
            [] => return ToolResult::fail("could not determine which reminder to delete"),
            _ => {
                return ToolResult::fail(
                    "more than one reminder matches that description; please say which one",
                )
            }
        };

        match ctx.tasks.delete_task(&candidate.task_id) {
            Ok(()) => ToolResult::ok(format!("deleted reminder \"{}\"", candidate.description))
                .with("task_id", candidate.task_id.clone()),
            Err(e) => ToolResult::fail(format!("could not delete the reminder: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, task_id: &str, description: &str) -> ScratchpadEntry {
        call_at(name, task_id, description, None)
    }

    fn call_at(name: &str, task_id: &str, description: &str, time: Option<&str>) -> ScratchpadEntry {
        let mut response = serde_json::json!({"success": true, "task_id": task_id, "description": description});
        if let Some(time) = time {
            response["time_to_execute"] = serde_json::json!(time);
        }
        ScratchpadEntry::FunctionCall {
            source: Speaker::Agent,
            name: name.to_string(),
            call_id: "c".into(),
            args: None,
            response: Some(response),
        }
    }

    #[test]
    fn ambiguous_description_across_two_candidates_is_rejected() {
        let entries = vec![
            call("create_tasks_tool", "t1", "call mom"),
            call("create_tasks_tool", "t2", "call mom"),
        ];
        let candidates = resolve_candidates(&entries);
        let matches = matching_candidates(&candidates, "delete the call mom reminder");
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn shared_description_is_disambiguated_by_stated_time() {
        let entries = vec![
            call_at("create_tasks_tool", "t1", "call mom", Some("2026-01-20T06:00:00-08:00")),
            call_at("create_tasks_tool", "t2", "call mom", Some("2026-01-20T18:00:00-08:00")),
        ];
        let candidates = resolve_candidates(&entries);
        let matches = matching_candidates(&candidates, "delete the 6pm call mom reminder");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].task_id, "t2");
    }

    #[test]
    fn shared_description_and_time_remains_ambiguous() {
        let entries = vec![
            call_at("create_tasks_tool", "t1", "call mom", Some("2026-01-20T06:00:00-08:00")),
            call_at("create_tasks_tool", "t2", "call mom", Some("2026-01-20T06:00:00-08:00")),
        ];
        let candidates = resolve_candidates(&entries);
        let matches = matching_candidates(&candidates, "delete the 6am call mom reminder");
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn shared_description_without_a_stated_time_stays_ambiguous() {
        let entries = vec![
            call_at("create_tasks_tool", "t1", "call mom", Some("2026-01-20T06:00:00-08:00")),
            call_at("create_tasks_tool", "t2", "call mom", Some("2026-01-20T18:00:00-08:00")),
        ];
        let candidates = resolve_candidates(&entries);
        let matches = matching_candidates(&candidates, "delete the call mom reminder");
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn single_unambiguous_candidate_resolves() {
        let entries = vec![call("create_tasks_tool", "t1", "call mom")];
        let candidates = resolve_candidates(&entries);
        let matches = matching_candidates(&candidates, "delete the call mom reminder");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].task_id, "t1");
    }
}
