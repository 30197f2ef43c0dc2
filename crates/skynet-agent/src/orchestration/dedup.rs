//! Session-scoped tool-call dedup set (§3, §4.6, §4.5 precondition, and
//! Testable Property 2). Both the gateway's downlink task and the
//! orchestrator's own precondition check share the same normalization rule
//! so they agree on what counts as "the same utterance".

use std::collections::HashSet;

/// Lowercase and collapse whitespace — the normalization the spec asks for
/// wherever "normalized user_input" is compared.
pub fn normalize(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A set of already-dispatched normalized utterances for one session.
/// Checked-and-inserted atomically within a single tool-call handler (§5).
#[derive(Debug, Default)]
pub struct DedupSet {
    seen: HashSet<String>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `input` had not been seen before (and is now
    /// recorded), `false` if it's a repeat.
    pub fn check_and_insert(&mut self, input: &str) -> bool {
        self.seen.insert(normalize(input))
    }

    pub fn contains(&self, input: &str) -> bool {
        self.seen.contains(&normalize(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_is_newly_inserted() {
        let mut set = DedupSet::new();
        assert!(set.check_and_insert("remind me to call mom"));
    }

    #[test]
    fn repeat_occurrence_is_rejected() {
        let mut set = DedupSet::new();
        assert!(set.check_and_insert("Remind me to call mom"));
        assert!(!set.check_and_insert("remind me to call mom"));
    }

    #[test]
    fn normalization_ignores_case_and_whitespace_runs() {
        assert_eq!(normalize("  Remind   ME to call Mom "), "remind me to call mom");
    }
}
