//! Selector (C4): a constrained choice over the registered tool names.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::orchestration::error::{AgentError, Result};
use crate::orchestration::extraction::extract_structured;
use crate::orchestration::scratchpad::ScratchpadEntry;
use crate::orchestration::tool_agent::{ToolAgent, TurnContext};

#[derive(Debug, Deserialize)]
struct SelectorChoice {
    tools: Vec<String>,
}

pub struct Selector;

impl Selector {
    pub fn new() -> Self {
        Self
    }

    /// Ask the auxiliary model which tool(s) to run next, given the
    /// scratchpad so far. Unknown names are dropped; an empty result after
    /// filtering is a fatal selector failure for this turn (§4.5).
    pub async fn select(
        &self,
        snapshot: &[ScratchpadEntry],
        registry: &HashMap<String, Arc<dyn ToolAgent>>,
        compose_reply_name: &str,
        ctx: &TurnContext,
    ) -> Result<Vec<String>> {
        let system_prompt = build_system_prompt(registry, compose_reply_name);
        let transcript = render_transcript(snapshot);

        let choice: SelectorChoice =
            extract_structured(ctx.provider.as_ref(), &ctx.model, &system_prompt, &transcript).await?;

        let valid = filter_valid(choice.tools, registry);
        if valid.is_empty() {
            return Err(AgentError::SelectorExhausted);
        }
        Ok(valid)
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::new()
    }
}

fn build_system_prompt(registry: &HashMap<String, Arc<dyn ToolAgent>>, compose_reply_name: &str) -> String {
    let mut names: Vec<_> = registry.values().collect();
    names.sort_by_key(|a| a.name().to_string());
    let catalog = names
        .iter()
        .map(|a| format!("- {}: {}", a.name(), a.description()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You choose which tool(s) to invoke next for one turn of a voice assistant, given the \
        conversation so far. Available tools:\n{catalog}\n\nRespond with nothing but a JSON \
        object: {{\"tools\": [tool_name, ...]}}, naming one or more of the tools above in the \
        order they should run. If nothing further needs to happen this turn, name only \
        \"{compose_reply_name}\"."
    )
}

fn render_transcript(snapshot: &[ScratchpadEntry]) -> String {
    snapshot
        .iter()
        .map(|entry| match entry {
            ScratchpadEntry::Text { source, content } => format!("{source:?}: {content}"),
            ScratchpadEntry::Audio { source, content } => format!("{source:?} (spoken): {content}"),
            ScratchpadEntry::FunctionCall { name, response, .. } => {
                format!("[{name} result: {}]", response.as_ref().map(|r| r.to_string()).unwrap_or_default())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn filter_valid(names: Vec<String>, registry: &HashMap<String, Arc<dyn ToolAgent>>) -> Vec<String> {
    names.into_iter().filter(|n| registry.contains_key(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::tools::default_registry;

    #[test]
    fn filter_valid_drops_unknown_names_and_keeps_known_ones() {
        let registry = default_registry();
        let filtered = filter_valid(
            vec!["create_tasks_tool".to_string(), "not_a_real_tool".to_string()],
            &registry,
        );
        assert_eq!(filtered, vec!["create_tasks_tool".to_string()]);
    }

    #[test]
    fn filter_valid_empty_when_nothing_matches() {
        let registry = default_registry();
        let filtered = filter_valid(vec!["nope".to_string()], &registry);
        assert!(filtered.is_empty());
    }
}
