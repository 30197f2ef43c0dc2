use serde::{Deserialize, Serialize};

/// A persisted per-user session row.
///
/// One row per user: the session gateway flips `is_active` to `true` on
/// connect and back to `false` on disconnect, and at most one session can
/// be active for a given user at a time (enforced by the gateway, which
/// refuses a second concurrent connection rather than by a DB constraint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The user this session belongs to.
    pub user_id: String,
    /// Whether the user currently holds a live gateway connection.
    pub is_active: bool,
    /// Crash-recovery convenience: a JSON snapshot of the scratchpad taken
    /// while the session was active. Cleared on deactivation — this is not
    /// a durable transcript, just enough to resume a dropped connection.
    pub scratchpad_snapshot: Option<String>,
    /// RFC3339 creation timestamp.
    pub created_at: String,
    /// RFC3339 timestamp of the last update.
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_serializes_with_null_snapshot() {
        let s = Session {
            user_id: "u-1".into(),
            is_active: false,
            scratchpad_snapshot: None,
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"is_active\":false"));
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back.user_id, "u-1");
    }
}
