use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → server frame, as received over the session gateway WebSocket.
///
/// The wire format is a flat JSON object whose *recognized fields* the
/// reader task inspects independently — a single frame is never expected to
/// carry more than one of these, but the gateway does not reject frames on
/// the basis of extra fields. Deserialize directly from the raw text frame,
/// then call [`ClientFrame::classify`] to get a single dispatchable kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientFrame {
    /// One base64-encoded PCM block at the gateway's configured send rate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    /// `true` to cancel current playback immediately.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt: Option<bool>,
    /// Plain textual user turn. Also used, by convention, to carry a stop
    /// phrase (`"... stop ..."`) as an alternative interrupt spelling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Alternate spelling for a textual user turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_text: Option<String>,
    /// Structured injection: either an object or a JSON-string-encoded
    /// object describing a pending-message or pending-task wake-up, or a
    /// plain message/task pair.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turns: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn_complete: Option<bool>,
}

/// A single dispatchable interpretation of a [`ClientFrame`], in the
/// priority order the reader task checks fields.
#[derive(Debug, Clone)]
pub enum ParsedClientFrame {
    Audio(String),
    Interrupt,
    /// `turns` decoded into a wake-up injection (`command: "start_websocket"`).
    WakeInjection(crate::dispatch::WakeInjection),
    /// `turns` present but not a recognized wake-up shape; carried through
    /// verbatim along with `turn_complete`.
    Turns {
        payload: Value,
        turn_complete: bool,
    },
    Text(String),
    Empty,
}

impl ClientFrame {
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Resolve the recognized-field precedence: audio first (it is the hot
    /// path), then interrupt, then structured turns, then text.
    pub fn classify(&self) -> ParsedClientFrame {
        if let Some(audio) = &self.audio {
            return ParsedClientFrame::Audio(audio.clone());
        }
        if self.interrupt == Some(true) {
            return ParsedClientFrame::Interrupt;
        }
        if let Some(turns) = &self.turns {
            let obj = decode_maybe_stringified(turns);
            if let Some(wake) = crate::dispatch::WakeInjection::from_value(&obj) {
                return ParsedClientFrame::WakeInjection(wake);
            }
            return ParsedClientFrame::Turns {
                payload: obj,
                turn_complete: self.turn_complete.unwrap_or(false),
            };
        }
        if let Some(text) = self.text.as_ref().or(self.input_text.as_ref()) {
            if text.trim().eq_ignore_ascii_case("stop") || text.contains("stop") {
                // A plain stop phrase is an alternative interrupt spelling;
                // anything else is a normal text turn.
                if looks_like_interrupt_phrase(text) {
                    return ParsedClientFrame::Interrupt;
                }
            }
            return ParsedClientFrame::Text(text.clone());
        }
        ParsedClientFrame::Empty
    }
}

fn looks_like_interrupt_phrase(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.split_whitespace().any(|w| w == "stop")
}

fn decode_maybe_stringified(v: &Value) -> Value {
    if let Value::String(s) = v {
        if let Ok(inner) = serde_json::from_str::<Value>(s) {
            return inner;
        }
    }
    v.clone()
}

/// Server → client frame, sent out over the session gateway WebSocket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interrupt: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_conversation: Option<bool>,
}

impl ServerFrame {
    pub fn audio(block_b64: impl Into<String>) -> Self {
        Self { audio: Some(block_b64.into()), ..Default::default() }
    }

    pub fn interrupt() -> Self {
        Self { interrupt: Some(true), ..Default::default() }
    }

    pub fn input_text(text: impl Into<String>) -> Self {
        Self { input_text: Some(text.into()), ..Default::default() }
    }

    pub fn output_text(text: impl Into<String>) -> Self {
        Self { output_text: Some(text.into()), ..Default::default() }
    }

    pub fn end_conversation() -> Self {
        Self { end_conversation: Some(true), ..Default::default() }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_audio_before_other_fields() {
        let f = ClientFrame::parse(r#"{"audio":"AAA","text":"ignored"}"#).unwrap();
        assert!(matches!(f.classify(), ParsedClientFrame::Audio(a) if a == "AAA"));
    }

    #[test]
    fn classifies_plain_interrupt() {
        let f = ClientFrame::parse(r#"{"interrupt":true}"#).unwrap();
        assert!(matches!(f.classify(), ParsedClientFrame::Interrupt));
    }

    #[test]
    fn classifies_stop_phrase_as_interrupt() {
        let f = ClientFrame::parse(r#"{"text":"please stop"}"#).unwrap();
        assert!(matches!(f.classify(), ParsedClientFrame::Interrupt));
    }

    #[test]
    fn classifies_wake_injection_from_stringified_turns() {
        let raw = r#"{"turns":"{\"command\":\"start_websocket\",\"reason\":\"task\",\"pending_task\":true,\"user_id\":\"u1\"}","turn_complete":true}"#;
        let f = ClientFrame::parse(raw).unwrap();
        match f.classify() {
            ParsedClientFrame::WakeInjection(w) => {
                assert_eq!(w.reason, crate::dispatch::WakeReason::Task);
                assert_eq!(w.user_id, "u1");
            }
            other => panic!("expected wake injection, got {other:?}"),
        }
    }

    #[test]
    fn server_frame_omits_absent_fields() {
        let json = ServerFrame::output_text("hi").to_json().unwrap();
        assert!(json.contains(r#""output_text":"hi""#));
        assert!(!json.contains("audio"));
    }
}
