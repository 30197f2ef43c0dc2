use thiserror::Error;

/// Errors raised by the orchestration core (C3-C5) that don't fit inside a
/// `ToolResult` because they short-circuit the whole turn rather than one
/// tool call — a failed structured-argument extraction inside a tool agent
/// is *not* one of these; it's caught locally and turned into
/// `ToolResult::fail` (§7 "Tool-extraction-failed").
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("provider error: {0}")]
    Provider(#[from] crate::provider::ProviderError),

    #[error("could not parse structured output: {0}")]
    Extraction(String),

    #[error("selector returned no valid tool name")]
    SelectorExhausted,
}

impl AgentError {
    pub fn code(&self) -> &'static str {
        match self {
            AgentError::Provider(_) => "PROVIDER_ERROR",
            AgentError::Extraction(_) => "EXTRACTION_FAILED",
            AgentError::SelectorExhausted => "SELECTOR_EXHAUSTED",
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
