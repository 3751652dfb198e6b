use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::TokenPair;

/// The access/refresh token pair for the current session.
///
/// An access token is present only while the session is active. Fields are
/// private so the pair can only be replaced or cleared as a unit.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    issued_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// State holding both tokens from a sign-in or verification response
    pub fn from_pair(pair: TokenPair) -> Self {
        Self {
            access_token: Some(pair.access_token),
            refresh_token: pair.refresh_token,
            issued_at: Some(Utc::now()),
        }
    }

    /// State for responses that only carry an access token (registration,
    /// OTP login, password recovery)
    pub fn access_only(access_token: String) -> Self {
        Self {
            access_token: Some(access_token),
            refresh_token: None,
            issued_at: Some(Utc::now()),
        }
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn is_active(&self) -> bool {
        self.access_token.is_some()
    }

    /// Apply a refresh response. A response without a refresh token keeps
    /// the current one.
    pub(crate) fn apply_refresh(&mut self, pair: TokenPair) {
        self.access_token = Some(pair.access_token);
        if pair.refresh_token.is_some() {
            self.refresh_token = pair.refresh_token;
        }
        self.issued_at = Some(Utc::now());
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Drop a refresh token that has no access token next to it, e.g. from a
    /// hand-edited or partially written keychain entry.
    pub(crate) fn normalized(self) -> Self {
        if self.is_active() {
            self
        } else {
            Self::default()
        }
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |t: &Option<String>| t.as_ref().map(|_| "[redacted]");
        f.debug_struct("SessionState")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access: &str, refresh: Option<&str>) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: refresh.map(str::to_string),
        }
    }

    #[test]
    fn test_default_is_inactive() {
        let state = SessionState::default();
        assert!(!state.is_active());
        assert!(state.access_token().is_none());
        assert!(state.refresh_token().is_none());
    }

    #[test]
    fn test_apply_refresh_keeps_refresh_token_when_not_rotated() {
        let mut state = SessionState::from_pair(pair("A1", Some("R1")));
        state.apply_refresh(pair("A2", None));
        assert_eq!(state.access_token(), Some("A2"));
        assert_eq!(state.refresh_token(), Some("R1"));

        state.apply_refresh(pair("A3", Some("R2")));
        assert_eq!(state.access_token(), Some("A3"));
        assert_eq!(state.refresh_token(), Some("R2"));
    }

    #[test]
    fn test_clear_drops_both_tokens() {
        let mut state = SessionState::from_pair(pair("A1", Some("R1")));
        state.clear();
        assert_eq!(state, SessionState::default());
    }

    #[test]
    fn test_normalized_discards_orphan_refresh_token() {
        let orphan = SessionState {
            access_token: None,
            refresh_token: Some("R1".to_string()),
            issued_at: None,
        };
        assert_eq!(orphan.normalized(), SessionState::default());

        let active = SessionState::access_only("A1".to_string());
        assert_eq!(active.clone().normalized(), active);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let state = SessionState::from_pair(pair("access-secret", Some("refresh-secret")));
        let rendered = format!("{:?}", state);
        assert!(!rendered.contains("access-secret"));
        assert!(!rendered.contains("refresh-secret"));
        assert!(rendered.contains("[redacted]"));
    }
}
