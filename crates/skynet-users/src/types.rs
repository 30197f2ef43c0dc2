use serde::{Deserialize, Serialize};

/// Minimal, read-mostly user profile.
///
/// Used only to personalize a turn: tool agents interpolate `display_name`
/// and resolve relative time phrases ("tomorrow", "tonight") against
/// `timezone`. Deliberately carries nothing else — no role, no capability
/// flags, no budget counters — per the specification's decision that
/// authentication, permissions, and quota semantics are out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: String,
    /// IANA timezone name, e.g. `"America/Los_Angeles"`.
    pub timezone: String,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_roundtrips_through_json() {
        let u = User {
            id: "u-1".into(),
            display_name: "Alex".into(),
            timezone: "America/Los_Angeles".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        };
        let json = serde_json::to_string(&u).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(back.timezone, "America/Los_Angeles");
    }
}
