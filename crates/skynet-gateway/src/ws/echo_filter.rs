//! Echo filter (§4.6 "Echo filter"): discards input transcription fragments
//! that are really the model's own speech picked back up by the
//! microphone. Kept behind a named predicate, as §9 "Echo filter as policy,
//! not mechanism" suggests, so the overlap rule can be swapped later
//! without touching the downlink task.

use std::collections::VecDeque;

/// Ring of the most recent output transcription fragments, lowercased at
/// insertion time so every comparison downstream is case-insensitive.
pub struct EchoFilter {
    window: usize,
    recent_outputs: VecDeque<String>,
}

impl EchoFilter {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            recent_outputs: VecDeque::with_capacity(window),
        }
    }

    /// Record one output (model-spoken) transcript fragment.
    pub fn record_output(&mut self, fragment: &str) {
        if self.recent_outputs.len() == self.window {
            self.recent_outputs.pop_front();
        }
        self.recent_outputs.push_back(fragment.to_lowercase());
    }

    /// Whether `input` should be dropped as an echo of something the model
    /// just said: exact equality, a substring relation either direction, or
    /// >50% token (Jaccard-like, max-of-set-sizes denominator) overlap with
    /// any of the last `window` output fragments.
    pub fn should_drop_input(&self, input: &str) -> bool {
        let candidate = input.to_lowercase();
        if candidate.trim().is_empty() {
            return false;
        }
        self.recent_outputs.iter().any(|out| is_echo(out, &candidate))
    }
}

fn is_echo(output: &str, input: &str) -> bool {
    if output == input {
        return true;
    }
    if output.contains(input) || input.contains(output) {
        return true;
    }
    token_overlap_ratio(output, input) > 0.5
}

fn token_overlap_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: std::collections::HashSet<&str> = a.split_whitespace().collect();
    let tokens_b: std::collections::HashSet<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let shared = tokens_a.intersection(&tokens_b).count();
    let denom = tokens_a.len().max(tokens_b.len());
    shared as f64 / denom as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_is_dropped() {
        let mut f = EchoFilter::new(10);
        f.record_output("what time is your appointment");
        assert!(f.should_drop_input("What Time Is Your Appointment"));
    }

    #[test]
    fn substring_either_direction_is_dropped() {
        let mut f = EchoFilter::new(10);
        f.record_output("i have set your reminder for six am tomorrow");
        assert!(f.should_drop_input("set your reminder for six am"));

        let mut f2 = EchoFilter::new(10);
        f2.record_output("ok");
        assert!(f2.should_drop_input("ok thanks"));
    }

    #[test]
    fn majority_token_overlap_is_dropped() {
        let mut f = EchoFilter::new(10);
        f.record_output("brush my teeth at six in the morning");
        assert!(f.should_drop_input("brush my teeth six morning please"));
    }

    #[test]
    fn unrelated_fragment_is_kept() {
        let mut f = EchoFilter::new(10);
        f.record_output("your reminder has been created");
        assert!(!f.should_drop_input("what is the weather like today"));
    }

    #[test]
    fn window_evicts_oldest_fragment() {
        let mut f = EchoFilter::new(1);
        f.record_output("first fragment spoken by the model");
        f.record_output("second fragment spoken by the model");
        assert!(!f.should_drop_input("first fragment spoken by the model"));
        assert!(f.should_drop_input("second fragment spoken by the model"));
    }

    #[test]
    fn empty_input_is_never_dropped() {
        let mut f = EchoFilter::new(10);
        f.record_output("hello there");
        assert!(!f.should_drop_input("   "));
    }
}
