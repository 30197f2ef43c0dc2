//! The two functions declared to the live model as callable tools (§6
//! "Model provider contract"). These are names and argument shapes only —
//! the model provider integration itself lives outside this workspace; the
//! session gateway declares these names when it opens a live model session
//! and recognizes them by name in the tool-call stream.

/// Routes free-form user intent to the orchestrator. The model calls this
/// whenever the user said something that isn't itself the tool response.
pub const THINK_AND_REPEAT_OUTPUT: &str = "think_and_repeat_output";

/// Ends the conversation after emitting a spoken goodbye.
pub const END_CONVERSATION: &str = "end_conversation";

/// Sentinel reply sent back to the model for a duplicate
/// `think_and_repeat_output` invocation within the same session, telling it
/// not to call the function again for this input.
pub fn duplicate_suppressed_reply() -> String {
    "[COMPLETED] this input was already handled; do not call this function again".to_string()
}

/// Prefix the orchestrator's reply is tagged with before it is handed back
/// to the model, so the model treats it as an async tool result rather than
/// a turn to speak immediately.
pub const WHEN_IDLE_TAG: &str = "WHEN_IDLE";

pub fn tag_when_idle(reply: &str) -> String {
    format!("{WHEN_IDLE_TAG}: {reply}")
}

#[derive(Debug, Clone)]
pub struct ThinkAndRepeatOutputArgs {
    pub user_input: String,
}

#[derive(Debug, Clone)]
pub struct EndConversationArgs {
    pub goodbye_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_idle_tag_prefixes_reply() {
        assert_eq!(tag_when_idle("ok"), "WHEN_IDLE: ok");
    }
}
