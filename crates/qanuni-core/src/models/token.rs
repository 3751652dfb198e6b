use std::fmt;

use serde::{Deserialize, Serialize};

/// Tokens issued by `/Login`, `/Resend-Access-Token` and the WhatsApp code
/// verification endpoint.
///
/// `refreshToken` is optional because the refresh endpoint may keep the
/// existing refresh token instead of rotating it.
#[derive(Clone, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "token")]
    pub access_token: String,
    #[serde(rename = "refreshToken", default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[redacted]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// Responses that only carry an access token (registration, OTP login).
#[derive(Clone, Deserialize)]
pub struct AccessTokenResponse {
    pub token: String,
}

impl fmt::Debug for AccessTokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenResponse")
            .field("token", &"[redacted]")
            .finish()
    }
}

#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    pub refresh_token: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_response() {
        let json = r#"{"token": "A1", "refreshToken": "R1", "expiresIn": 900}"#;
        let pair: TokenPair = serde_json::from_str(json).expect("Failed to parse token pair");
        assert_eq!(pair.access_token, "A1");
        assert_eq!(pair.refresh_token.as_deref(), Some("R1"));
    }

    #[test]
    fn test_parse_refresh_response_without_rotation() {
        let pair: TokenPair =
            serde_json::from_str(r#"{"token": "A2"}"#).expect("Failed to parse token pair");
        assert_eq!(pair.access_token, "A2");
        assert!(pair.refresh_token.is_none());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let pair = TokenPair {
            access_token: "secret-access".to_string(),
            refresh_token: Some("secret-refresh".to_string()),
        };
        let rendered = format!("{:?}", pair);
        assert!(!rendered.contains("secret-access"));
        assert!(!rendered.contains("secret-refresh"));
    }

    #[test]
    fn test_refresh_request_shape() {
        let body = serde_json::to_value(RefreshRequest { refresh_token: "R1" })
            .expect("Failed to serialize refresh request");
        assert_eq!(body, serde_json::json!({"refreshToken": "R1"}));
    }
}
