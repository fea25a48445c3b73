use std::fmt;

use crate::types::Platform;

/// Correlation token threaded through the three-legged redirect chain.
///
/// Created at authorize time as `platform|caller_state`, carried opaquely
/// through the upstream provider, and consumed exactly once at callback time
/// to pick the final redirect target. The caller's own state component is
/// preserved byte-for-byte because the client compares it against what it
/// sent as its CSRF check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationState {
    pub platform: Platform,
    pub caller_state: String,
}

impl AuthorizationState {
    #[must_use]
    pub fn new(platform: Platform, caller_state: impl Into<String>) -> Self {
        Self {
            platform,
            caller_state: caller_state.into(),
        }
    }

    /// Parse the combined form, splitting on the FIRST `|` so a caller state
    /// containing `|` survives the round-trip.
    #[must_use]
    pub fn decode(combined: &str) -> Option<Self> {
        let (platform, caller_state) = combined.split_once('|')?;
        Some(Self {
            platform: platform.parse().ok()?,
            caller_state: caller_state.to_owned(),
        })
    }
}

impl fmt::Display for AuthorizationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.platform, self.caller_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_combined_form() {
        let state = AuthorizationState::new(Platform::Web, "abc123");
        let decoded = AuthorizationState::decode(&state.to_string()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn splits_on_the_first_pipe_only() {
        let decoded = AuthorizationState::decode("native|a|b|c").unwrap();
        assert_eq!(decoded.platform, Platform::Native);
        assert_eq!(decoded.caller_state, "a|b|c");
    }

    #[test]
    fn rejects_malformed_combined_state() {
        assert!(AuthorizationState::decode("no-pipe-here").is_none());
        assert!(AuthorizationState::decode("desktop|abc").is_none());
    }

    #[test]
    fn preserves_empty_caller_state() {
        let decoded = AuthorizationState::decode("web|").unwrap();
        assert_eq!(decoded.caller_state, "");
    }
}
