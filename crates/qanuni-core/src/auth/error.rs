use thiserror::Error;

use crate::api::ApiError;

/// Errors surfaced by `SessionManager`.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The identity endpoint rejected the identity/password pair
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The backend rejected the submitted fields (400/422)
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// No usable session: never signed in, signed out, or the refresh token
    /// was rejected
    #[error("Session expired - please sign in again")]
    SessionExpired,

    #[error(transparent)]
    Api(ApiError),
}

impl From<ApiError> for AuthError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NetworkError(e) => AuthError::Transport(e),
            ApiError::BadRequest(body) => AuthError::Validation(body),
            other => AuthError::Api(other),
        }
    }
}

impl AuthError {
    /// Map a failed sign-in. 401 and 403 from the identity endpoint mean the
    /// credentials were wrong rather than a session problem.
    pub fn from_login(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized | ApiError::AccessDenied(_) => AuthError::InvalidCredentials,
            other => other.into(),
        }
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, AuthError::SessionExpired)
    }
}
