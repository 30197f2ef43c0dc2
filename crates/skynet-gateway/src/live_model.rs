//! The live model session (§4.6/§6): the gateway's outbound full-duplex
//! connection to the generative model provider's realtime audio API.
//!
//! The provider's own implementation is an external collaborator outside
//! this specification's scope (§1 "Explicitly out of scope ... the
//! generative model provider itself") — this module owns only the
//! Rust-side contract the Session Gateway drives against it (§6 "Model
//! provider contract"), plus one concrete adapter realizing that contract
//! over a JSON-over-WebSocket transport, since the gateway needs something
//! to compile and run against.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::error::{GatewayError, Result};

/// One event surfaced by the live model session's downlink — the bullet
/// list the Session Gateway's downlink task switches on (§4.6).
#[derive(Debug, Clone)]
pub enum ModelEvent {
    /// A resumable session handle the model offered for later reconnection.
    SessionResumed { handle: String },
    /// The model warned it will disconnect in roughly this long.
    GoAway { time_left_secs: Option<u64> },
    /// The model wants to invoke one of the two declared tools.
    ToolCall {
        call_id: String,
        name: String,
        input: Value,
    },
    /// One inline PCM block at the gateway's configured receive rate.
    AudioChunk { data_b64: String },
    /// The model detected the user talking over it; discard buffered audio.
    Interrupted,
    /// One transcript fragment, either the user's speech or the model's own.
    Transcription {
        source: TranscriptSource,
        fragment: String,
    },
    /// The model's current turn has finished.
    TurnComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptSource {
    Input,
    Output,
}

/// Declares one of the two tools the live model session is configured with
/// (§4.6 point 3, §6 "The two declared tools").
#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

pub fn declared_tools() -> Vec<ToolDeclaration> {
    vec![
        ToolDeclaration {
            name: "think_and_repeat_output".to_string(),
            description:
                "Hand the user's utterance to the task-orchestration core and speak back its reply."
                    .to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "user_input": { "type": "string" } },
                "required": ["user_input"],
            }),
        },
        ToolDeclaration {
            name: "end_conversation".to_string(),
            description: "End the conversation after saying goodbye.".to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "goodbye_message": { "type": "string" } },
                "required": ["goodbye_message"],
            }),
        },
    ]
}

/// The half of the live model session the reader and uplink tasks hold —
/// both push into the model concurrently (§5 "these run concurrently"), so
/// every method takes `&self`.
#[async_trait]
pub trait LiveModelSink: Send + Sync {
    async fn send_audio(&self, pcm_b64: &str) -> Result<()>;
    async fn send_text_turn(&self, text: &str, turn_complete: bool) -> Result<()>;
    async fn send_tool_response(&self, call_id: &str, value: &Value) -> Result<()>;
}

/// An open live model session: a shared sink plus the owned downlink event
/// stream. Only the downlink task ever reads `events` — that is what makes
/// the scratchpad's single-owner invariant (§5) hold without a lock.
pub struct LiveModelSession {
    pub sink: Arc<dyn LiveModelSink>,
    pub events: mpsc::Receiver<ModelEvent>,
}

type TungsteniteSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

struct WsSink {
    tx: Mutex<TungsteniteSink>,
}

#[async_trait]
impl LiveModelSink for WsSink {
    async fn send_audio(&self, pcm_b64: &str) -> Result<()> {
        self.send(serde_json::json!({ "type": "input_audio", "data": pcm_b64 }))
            .await
    }

    async fn send_text_turn(&self, text: &str, turn_complete: bool) -> Result<()> {
        self.send(serde_json::json!({
            "type": "input_text",
            "text": text,
            "turn_complete": turn_complete,
        }))
        .await
    }

    async fn send_tool_response(&self, call_id: &str, value: &Value) -> Result<()> {
        self.send(serde_json::json!({
            "type": "tool_response",
            "call_id": call_id,
            "response": value,
        }))
        .await
    }
}

impl WsSink {
    async fn send(&self, frame: Value) -> Result<()> {
        let mut tx = self.tx.lock().await;
        tx.send(WsMessage::Text(frame.to_string().into()))
            .await
            .map_err(|e| GatewayError::LiveModel(e.to_string()))
    }
}

/// Open a live model session over a generic JSON-over-WebSocket transport:
/// one JSON text frame per direction, tagged by a `type` field. This is the
/// one outbound WebSocket client this workspace needs — the session
/// gateway's inbound side runs over axum instead.
///
/// `url` carries whatever query-string credentials the provider requires;
/// `system_prompt` primes the model with the user's profile and the
/// current local time (§4.6 point 2).
pub async fn connect(url: &str, system_prompt: &str) -> Result<LiveModelSession> {
    url::Url::parse(url).map_err(|e| GatewayError::LiveModel(format!("invalid live model url: {e}")))?;

    let (stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| GatewayError::LiveModel(e.to_string()))?;
    let (mut ws_tx, mut ws_rx) = stream.split();

    let setup = serde_json::json!({
        "type": "session.setup",
        "system_prompt": system_prompt,
        "tools": declared_tools(),
    });
    ws_tx
        .send(WsMessage::Text(setup.to_string().into()))
        .await
        .map_err(|e| GatewayError::LiveModel(e.to_string()))?;

    let (event_tx, event_rx) = mpsc::channel(256);
    let sink = Arc::new(WsSink {
        tx: Mutex::new(ws_tx),
    });

    tokio::spawn(async move {
        while let Some(msg) = ws_rx.next().await {
            let msg = match msg {
                Ok(m) => m,
                Err(e) => {
                    warn!(error = %e, "live model session transport error");
                    break;
                }
            };
            let WsMessage::Text(text) = msg else {
                continue;
            };
            match parse_downlink_frame(&text) {
                Some(event) => {
                    if event_tx.send(event).await.is_err() {
                        break;
                    }
                }
                None => debug!(frame = %text, "unrecognized live model frame, skipping"),
            }
        }
    });

    Ok(LiveModelSession {
        sink,
        events: event_rx,
    })
}

fn parse_downlink_frame(text: &str) -> Option<ModelEvent> {
    let v: Value = serde_json::from_str(text).ok()?;
    let kind = v.get("type")?.as_str()?;
    match kind {
        "session.resumed" => Some(ModelEvent::SessionResumed {
            handle: v.get("handle")?.as_str()?.to_string(),
        }),
        "go_away" => Some(ModelEvent::GoAway {
            time_left_secs: v.get("time_left_secs").and_then(Value::as_u64),
        }),
        "tool_call" => Some(ModelEvent::ToolCall {
            call_id: v.get("call_id")?.as_str()?.to_string(),
            name: v.get("name")?.as_str()?.to_string(),
            input: v.get("input").cloned().unwrap_or(Value::Null),
        }),
        "output_audio" => Some(ModelEvent::AudioChunk {
            data_b64: v.get("data")?.as_str()?.to_string(),
        }),
        "interrupted" => Some(ModelEvent::Interrupted),
        "input_transcript" => Some(ModelEvent::Transcription {
            source: TranscriptSource::Input,
            fragment: v.get("text")?.as_str()?.to_string(),
        }),
        "output_transcript" => Some(ModelEvent::Transcription {
            source: TranscriptSource::Output,
            fragment: v.get("text")?.as_str()?.to_string(),
        }),
        "turn_complete" => Some(ModelEvent::TurnComplete),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tool_call_frame() {
        let raw = r#"{"type":"tool_call","call_id":"c1","name":"end_conversation","input":{"goodbye_message":"bye"}}"#;
        match parse_downlink_frame(raw) {
            Some(ModelEvent::ToolCall { call_id, name, .. }) => {
                assert_eq!(call_id, "c1");
                assert_eq!(name, "end_conversation");
            }
            other => panic!("expected ToolCall, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_type_yields_none() {
        assert!(parse_downlink_frame(r#"{"type":"mystery"}"#).is_none());
    }

    #[test]
    fn declared_tools_names_match_the_spec_contract() {
        let names: Vec<&str> = declared_tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["think_and_repeat_output", "end_conversation"]);
    }
}
