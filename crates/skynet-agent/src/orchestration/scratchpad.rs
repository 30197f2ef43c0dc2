//! The append-only conversation log (C2). In-memory only — the session
//! gateway persists an opaque JSON snapshot of it to the `sessions` row for
//! crash recovery, but the scratchpad itself never touches the store.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which side of the conversation produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Agent,
}

/// One entry in the log. `Audio` entries are never appended directly —
/// they're produced by [`Scratchpad::commit_audio`] out of buffered
/// fragments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ScratchpadEntry {
    Text {
        source: Speaker,
        content: String,
    },
    Audio {
        source: Speaker,
        content: String,
    },
    FunctionCall {
        source: Speaker,
        name: String,
        call_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        args: Option<Value>,
        #[serde(skip_serializing_if = "Option::is_none")]
        response: Option<Value>,
    },
}

impl ScratchpadEntry {
    pub fn source(&self) -> Speaker {
        match self {
            ScratchpadEntry::Text { source, .. }
            | ScratchpadEntry::Audio { source, .. }
            | ScratchpadEntry::FunctionCall { source, .. } => *source,
        }
    }
}

/// Per-source audio fragments accumulate into a buffer and are promoted to
/// a single `Audio` entry exactly when a different source speaks, a
/// text/function entry is appended, or the session closes — never
/// interleaving fragments from overlapping speakers (§3, Testable Property 1).
#[derive(Debug, Default)]
pub struct Scratchpad {
    entries: Vec<ScratchpadEntry>,
    user_audio: Vec<String>,
    agent_audio: Vec<String>,
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    fn buffer_for(&mut self, source: Speaker) -> &mut Vec<String> {
        match source {
            Speaker::User => &mut self.user_audio,
            Speaker::Agent => &mut self.agent_audio,
        }
    }

    /// Buffer a streaming transcript fragment. Never emits an entry by
    /// itself.
    pub fn buffer_audio(&mut self, source: Speaker, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.buffer_for(source).push(fragment.to_string());
    }

    /// Promote the named source's buffer into at most one `Audio` entry.
    /// A no-op if the buffer is empty or whitespace-only.
    pub fn commit_audio(&mut self, source: Speaker) {
        let buf = self.buffer_for(source);
        if buf.is_empty() {
            return;
        }
        let joined = normalize_whitespace(&buf.join(" "));
        buf.clear();
        if !joined.is_empty() {
            self.entries.push(ScratchpadEntry::Audio {
                source,
                content: joined,
            });
        }
    }

    fn commit_both(&mut self) {
        self.commit_audio(Speaker::User);
        self.commit_audio(Speaker::Agent);
    }

    /// Append a complete textual turn, first committing both sources' audio
    /// buffers so an audio entry never straddles a textual turn.
    pub fn append_text(&mut self, source: Speaker, content: impl Into<String>) {
        self.commit_both();
        self.entries.push(ScratchpadEntry::Text {
            source,
            content: content.into(),
        });
    }

    /// Append a tool invocation record, first committing both audio
    /// buffers.
    pub fn append_function_call(
        &mut self,
        source: Speaker,
        name: impl Into<String>,
        call_id: impl Into<String>,
        args: Option<Value>,
        response: Option<Value>,
    ) {
        self.commit_both();
        self.entries.push(ScratchpadEntry::FunctionCall {
            source,
            name: name.into(),
            call_id: call_id.into(),
            args,
            response,
        });
    }

    /// Called when the gateway tears the session down — flushes any
    /// trailing audio fragments so nothing silently disappears.
    pub fn close(&mut self) {
        self.commit_both();
    }

    /// An ordered, immutable view. Consumers must not mutate it; that's
    /// enforced here by returning a borrowed slice rather than a handle
    /// into the underlying `Vec`.
    pub fn snapshot(&self) -> &[ScratchpadEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_audio_is_noop_on_empty_buffer() {
        let mut pad = Scratchpad::new();
        pad.commit_audio(Speaker::User);
        assert!(pad.snapshot().is_empty());
    }

    #[test]
    fn buffered_fragments_join_and_normalize_whitespace() {
        let mut pad = Scratchpad::new();
        pad.buffer_audio(Speaker::User, "hello  ");
        pad.buffer_audio(Speaker::User, " world");
        pad.commit_audio(Speaker::User);
        match &pad.snapshot()[0] {
            ScratchpadEntry::Audio { content, source } => {
                assert_eq!(content, "hello world");
                assert_eq!(*source, Speaker::User);
            }
            other => panic!("expected Audio entry, got {other:?}"),
        }
    }

    #[test]
    fn switching_speaker_commits_previous_buffer_without_mixing() {
        let mut pad = Scratchpad::new();
        pad.buffer_audio(Speaker::User, "are you there");
        pad.buffer_audio(Speaker::Agent, "yes I am here");
        // A real gateway would call commit_audio(User) before buffering the
        // agent's reply; simulate that explicitly since the scratchpad
        // itself never infers a source switch.
        pad.commit_audio(Speaker::User);
        pad.commit_audio(Speaker::Agent);
        assert_eq!(pad.snapshot().len(), 2);
        for entry in pad.snapshot() {
            match entry {
                ScratchpadEntry::Audio { content, .. } => {
                    assert!(!content.contains("yes") || !content.contains("there"));
                }
                _ => panic!("expected only Audio entries"),
            }
        }
    }

    #[test]
    fn append_text_commits_both_buffers_first() {
        let mut pad = Scratchpad::new();
        pad.buffer_audio(Speaker::User, "pending fragment");
        pad.append_text(Speaker::Agent, "a deliberate text turn");
        assert_eq!(pad.snapshot().len(), 2);
        assert!(matches!(pad.snapshot()[0], ScratchpadEntry::Audio { .. }));
        assert!(matches!(pad.snapshot()[1], ScratchpadEntry::Text { .. }));
    }

    #[test]
    fn append_function_call_commits_both_buffers_first() {
        let mut pad = Scratchpad::new();
        pad.buffer_audio(Speaker::Agent, "narrating a reminder");
        pad.append_function_call(
            Speaker::Agent,
            "get_tasks_tool",
            "call-1",
            None,
            Some(serde_json::json!({"success": true})),
        );
        assert_eq!(pad.snapshot().len(), 2);
        assert!(matches!(pad.snapshot()[0], ScratchpadEntry::Audio { .. }));
        assert!(matches!(
            pad.snapshot()[1],
            ScratchpadEntry::FunctionCall { .. }
        ));
    }

    #[test]
    fn close_flushes_trailing_audio() {
        let mut pad = Scratchpad::new();
        pad.buffer_audio(Speaker::User, "goodbye");
        pad.close();
        assert_eq!(pad.snapshot().len(), 1);
    }

    #[test]
    fn no_entry_interleaves_fragments_from_both_sources() {
        let mut pad = Scratchpad::new();
        pad.buffer_audio(Speaker::User, "user says hi");
        pad.append_text(Speaker::Agent, "unrelated");
        pad.buffer_audio(Speaker::Agent, "agent says hi back");
        pad.close();
        for entry in pad.snapshot() {
            if let ScratchpadEntry::Audio { content, source } = entry {
                let other_word = match source {
                    Speaker::User => "back",
                    Speaker::Agent => "user",
                };
                assert!(!content.contains(other_word));
            }
        }
    }
}
