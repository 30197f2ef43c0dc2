//! Structured-argument extraction as an opaque capability (§9 "Structured
//! argument extraction"): given a prompt and an implicit schema description,
//! ask the auxiliary model for a record conforming to that schema. Tool
//! agents use this for everything that isn't deterministically parseable
//! (task descriptions, disambiguating which task a pronoun refers to);
//! relative-time phrases are resolved deterministically instead, see
//! [`crate::orchestration::time_resolve`].

use serde::de::DeserializeOwned;

use crate::orchestration::error::{AgentError, Result};
use crate::provider::{ChatRequest, LlmProvider, Message, Role};

/// Ask `provider` to produce JSON conforming to `T`, instructed by
/// `system_prompt`, given `user_prompt` as the turn to extract from.
/// Returns the first balanced `{...}` block in the response, parsed as
/// `T` — the auxiliary call is expected to return nothing but that object,
/// but real models sometimes wrap it in prose, so a response is scanned for
/// the JSON payload rather than parsed verbatim.
pub async fn extract_structured<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    model: &str,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<T> {
    let request = ChatRequest {
        model: model.to_string(),
        system: system_prompt.to_string(),
        messages: vec![Message {
            role: Role::User,
            content: user_prompt.to_string(),
        }],
        max_tokens: 1024,
        stream: false,
        thinking: None,
        tools: Vec::new(),
    };
    let response = provider.send(&request).await.map_err(AgentError::from)?;
    let json_block = extract_json_block(&response.content)
        .ok_or_else(|| AgentError::Extraction("no JSON object found in provider response".into()))?;
    serde_json::from_str(&json_block).map_err(|e| AgentError::Extraction(e.to_string()))
}

fn extract_json_block(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(text[start..=end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_wrapped_in_prose() {
        let text = "Sure, here you go:\n{\"description\":\"brush teeth\"}\nLet me know if anything's off.";
        let block = extract_json_block(text).unwrap();
        assert_eq!(block, "{\"description\":\"brush teeth\"}");
    }

    #[test]
    fn no_braces_yields_none() {
        assert!(extract_json_block("no json here").is_none());
    }
}
