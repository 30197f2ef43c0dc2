//! `skynet-agent` — LLM provider abstraction and the task-orchestration
//! core (scratchpad, tool agents, selector, bounded orchestrator) described
//! in `SPEC_FULL.md` §4.3-4.5.
//!
//! The provider adapters (`anthropic`, `openai`, `ollama`) back the
//! auxiliary model calls the orchestration layer makes for structured
//! argument extraction, tool selection, and reply composition (§9
//! "Structured argument extraction"). They are a separate concern from the
//! full-duplex live model session the gateway drives directly against the
//! provider's realtime API (§4.6, §6) — that contract has no Rust-side
//! adapter here because it is an external collaborator, not a library call.

pub mod anthropic;
pub mod anthropic_stream;
pub mod ollama;
pub mod openai;
pub mod orchestration;
pub mod provider;
pub mod stream;
pub mod thinking;

pub use provider::{ChatRequest, ChatResponse, LlmProvider, Message, ProviderError, Role};
