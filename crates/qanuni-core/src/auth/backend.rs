use async_trait::async_trait;

use crate::api::{ApiClient, ApiError};
use crate::models::{AccessTokenResponse, RegistrationForm, TokenPair};

use super::Credentials;

/// Token-issuing calls `SessionManager` depends on.
///
/// `ApiClient` is the production implementation; tests substitute their own.
#[async_trait]
pub trait AuthBackend: Send + Sync + 'static {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError>;

    async fn register(&self, form: &RegistrationForm) -> Result<AccessTokenResponse, ApiError>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError>;
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        ApiClient::login(self, credentials.identity(), credentials.password()).await
    }

    async fn register(&self, form: &RegistrationForm) -> Result<AccessTokenResponse, ApiError> {
        ApiClient::register(self, form).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        self.refresh_access_token(refresh_token).await
    }
}
