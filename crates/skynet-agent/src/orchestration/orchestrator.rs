//! Orchestrator (C5): the bounded loop driving Selector → Tool →
//! Scratchpad until a terminal reply is produced.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::orchestration::dedup::normalize;
use crate::orchestration::scratchpad::{Scratchpad, ScratchpadEntry, Speaker};
use crate::orchestration::selector::Selector;
use crate::orchestration::tool_agent::{ToolAgent, ToolResult, TurnContext};
use crate::orchestration::tools::{compose_reply, create_tasks, default_registry, delete_tasks, edit_tasks, get_tasks};

/// Returned by [`Orchestrator::think`] without invoking any agent when the
/// precondition in §4.5 fires.
pub const ALREADY_PROCESSED_SENTINEL: &str = "already processed";

const APOLOGY_REPLY: &str =
    "I'm sorry, I wasn't able to process that request right now.";

const ACK_PHRASES: [&str; 8] = [
    "ok", "okay", "thanks", "thank you", "got it", "sure", "yup", "yep",
];

fn is_ack_phrase(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    normalized.len() < 50 && ACK_PHRASES.contains(&normalized.as_str())
}

fn short_circuits(name: &str, result: &ToolResult) -> bool {
    if name == get_tasks::NAME {
        // "well-formed result (including empty)" — our get-tasks agent
        // never returns success=false for a normal lookup, so this is
        // effectively unconditional, matching the rule's intent.
        true
    } else if name == edit_tasks::NAME || name == delete_tasks::NAME {
        result.success
    } else if name == create_tasks::NAME {
        result.success || matches!(result.status(), Some("all_tasks_created") | Some("invalid_time"))
    } else {
        false
    }
}

pub struct Orchestrator {
    registry: HashMap<String, Arc<dyn ToolAgent>>,
    selector: Selector,
    compose_reply_name: String,
    max_total_calls: u32,
    max_consecutive_same_tool: u32,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            registry: default_registry(),
            selector: Selector::new(),
            compose_reply_name: compose_reply::NAME.to_string(),
            max_total_calls: skynet_core::config::MAX_TOTAL_CALLS,
            max_consecutive_same_tool: skynet_core::config::MAX_CONSECUTIVE_SAME_TOOL,
        }
    }

    /// Override the structural bounds — used by tests that want to exercise
    /// the short-circuit/limit machinery without 10 real tool round-trips.
    pub fn with_limits(max_total_calls: u32, max_consecutive_same_tool: u32) -> Self {
        Self {
            max_total_calls,
            max_consecutive_same_tool,
            ..Self::new()
        }
    }

    /// `think(user_input, scratchpad, user_config) -> reply_string`,
    /// mutating `pad` in place rather than returning a separate updated
    /// copy (§9 "Scratchpad as opaque value vs shared reference" notes
    /// this as the cleaner alternative; the gateway owns `pad` and hands
    /// this an exclusive borrow for the duration of the call).
    pub async fn think(&self, user_input: &str, pad: &mut Scratchpad, ctx: &TurnContext) -> String {
        if self.already_processed(user_input, pad.snapshot()) {
            return ALREADY_PROCESSED_SENTINEL.to_string();
        }

        pad.append_text(Speaker::User, user_input);

        let mut total_calls = 0u32;
        let mut last_tool: Option<String> = None;
        let mut consecutive = 0u32;
        let mut forced_compose = false;

        loop {
            if forced_compose || total_calls >= self.max_total_calls {
                break;
            }

            let names = match self
                .selector
                .select(pad.snapshot(), &self.registry, &self.compose_reply_name, ctx)
                .await
            {
                Ok(names) => names,
                Err(_) => {
                    pad.append_text(Speaker::Agent, APOLOGY_REPLY);
                    return APOLOGY_REPLY.to_string();
                }
            };

            for name in names {
                if name == self.compose_reply_name {
                    forced_compose = true;
                    break;
                }
                if total_calls >= self.max_total_calls {
                    forced_compose = true;
                    break;
                }
                if last_tool.as_deref() == Some(name.as_str()) {
                    consecutive += 1;
                } else {
                    consecutive = 1;
                    last_tool = Some(name.clone());
                }
                if consecutive > self.max_consecutive_same_tool {
                    forced_compose = true;
                    break;
                }

                let Some(tool) = self.registry.get(&name) else {
                    continue;
                };
                let result = tool.execute(pad.snapshot(), ctx).await;
                total_calls += 1;

                let response_value = serde_json::to_value(&result).unwrap_or_else(|_| json!({}));
                pad.append_function_call(Speaker::Agent, name.clone(), Uuid::new_v4().to_string(), None, Some(response_value));

                if short_circuits(&name, &result) {
                    forced_compose = true;
                    break;
                }
            }
        }

        let reply = match self.registry.get(&self.compose_reply_name) {
            Some(tool) => tool.execute(pad.snapshot(), ctx).await,
            None => ToolResult::fail("compose-reply tool is not registered"),
        };
        pad.append_text(Speaker::Agent, reply.message.clone());
        reply.message
    }

    /// §4.5 precondition: a repeated, already-answered utterance short-
    /// circuits without invoking any agent. The most recent matching user
    /// turn is the one that matters; anything before it is moot.
    fn already_processed(&self, user_input: &str, snapshot: &[ScratchpadEntry]) -> bool {
        let target = normalize(user_input);
        let Some(idx) = snapshot.iter().rposition(|entry| {
            matches!(entry, ScratchpadEntry::Text { source: Speaker::User, content } if normalize(content) == target)
        }) else {
            return false;
        };

        snapshot[idx + 1..].iter().any(|entry| match entry {
            ScratchpadEntry::Text { source: Speaker::Agent, content } => !is_ack_phrase(content),
            ScratchpadEntry::FunctionCall { response: Some(r), .. } => {
                r.get("success").and_then(|v| v.as_bool()) == Some(true)
            }
            _ => false,
        })
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_phrases_are_not_substantive() {
        assert!(is_ack_phrase("ok"));
        assert!(is_ack_phrase("Thanks"));
        assert!(!is_ack_phrase("the reminder has been created for 6am"));
    }

    #[test]
    fn long_text_never_counts_as_an_ack_even_if_it_contains_one() {
        let long = "ok".repeat(30);
        assert!(!is_ack_phrase(&long));
    }

    #[test]
    fn short_circuit_fires_after_successful_get_tasks_even_when_empty() {
        let empty = ToolResult::ok("found 0 reminder(s) in range").with("tasks", json!([]));
        assert!(short_circuits(get_tasks::NAME, &empty));
    }

    #[test]
    fn short_circuit_does_not_fire_for_unrecognized_tool_names() {
        let result = ToolResult::ok("did something");
        assert!(!short_circuits("some_other_tool", &result));
    }

    #[test]
    fn short_circuit_fires_for_create_tasks_terminal_statuses() {
        let all_created = ToolResult::fail("nothing left").with("status", "all_tasks_created");
        let invalid_time = ToolResult::fail("bad time").with("status", "invalid_time");
        let other_failure = ToolResult::fail("store is down");
        assert!(short_circuits(create_tasks::NAME, &all_created));
        assert!(short_circuits(create_tasks::NAME, &invalid_time));
        assert!(!short_circuits(create_tasks::NAME, &other_failure));
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new()
    }

    #[test]
    fn already_processed_is_false_with_no_matching_prior_turn() {
        let pad = Scratchpad::new();
        assert!(!orchestrator().already_processed("remind me to call mom", pad.snapshot()));
    }

    #[test]
    fn already_processed_is_true_after_a_substantive_reply() {
        let mut pad = Scratchpad::new();
        pad.append_text(Speaker::User, "remind me to call mom at 6am");
        pad.append_text(Speaker::Agent, "I've set a reminder to call mom at 6am.");
        assert!(orchestrator().already_processed("remind me to call mom at 6am", pad.snapshot()));
    }

    #[test]
    fn already_processed_is_false_when_only_an_ack_followed() {
        let mut pad = Scratchpad::new();
        pad.append_text(Speaker::User, "remind me to call mom at 6am");
        pad.append_text(Speaker::Agent, "ok");
        assert!(!orchestrator().already_processed("remind me to call mom at 6am", pad.snapshot()));
    }
}
