//! API client for the portal's authentication REST endpoints.
//!
//! Every method maps one endpoint. Authenticated endpoints take the bearer
//! token as an argument; keeping the token out of the client lets
//! `SessionManager` decide which token a call is made with.

use std::time::Duration;

use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::models::{
    AccessTokenResponse, ForgotPasswordRequest, ForgotPasswordResponse, IdentityRequest,
    LoginRequest, RefreshRequest, RegistrationForm, ResetPasswordRequest, TokenPair,
    VerifyCodeRequest,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/Login";
const LOGIN_OTP_PATH: &str = "/Login-OTP";
const REGISTER_PATH: &str = "/Register/User";
const REFRESH_PATH: &str = "/Resend-Access-Token";
const VERIFY_WHATSAPP_PATH: &str = "/Verify/Verify-WhatsApp-Code";
const FORGOT_PASSWORD_PATH: &str = "/Forget-Password";
const RESET_EMAIL_PATH: &str = "/Reset-Email-Password";
const RESET_WHATSAPP_PATH: &str = "/Reset-Whats-Password";
const RESET_PASSWORD_PATH: &str = "/Reset-Password";

/// API client for the portal backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client with the default timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let response = self.send_post(path, body, token).await?;
        Self::parse_json(response, path).await
    }

    /// POST to an endpoint whose response body carries nothing the client
    /// needs. Empty bodies are accepted.
    async fn post_ack<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<serde_json::Value, ApiError> {
        let response = self.send_post(path, body, token).await?;
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
    }

    async fn send_post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let mut request = self
            .client
            .post(self.url(path))
            .header(header::ACCEPT, "application/json")
            .json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        debug!(path = path, authenticated = token.is_some(), "POST");
        let response = request.send().await?;
        Self::check_response(response).await
    }

    // ===== Sign-in and sign-up =====

    /// Exchange identity and password for an access/refresh token pair
    pub async fn login(&self, identity: &str, password: &str) -> Result<TokenPair, ApiError> {
        self.post(LOGIN_PATH, &LoginRequest { identity, password }, None)
            .await
    }

    /// One-time-password login. The backend answers with a token that still
    /// has to be confirmed through the WhatsApp code endpoint.
    pub async fn login_otp(&self, identity: &str) -> Result<AccessTokenResponse, ApiError> {
        debug!(path = LOGIN_OTP_PATH, "POST");
        let response = self
            .client
            .post(self.url(LOGIN_OTP_PATH))
            .header(header::ACCEPT, "application/json")
            .query(&[("Identity", identity)])
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response, LOGIN_OTP_PATH).await
    }

    pub async fn register(&self, form: &RegistrationForm) -> Result<AccessTokenResponse, ApiError> {
        debug!(path = REGISTER_PATH, company = form.company.is_some(), "POST multipart");
        let response = self
            .client
            .post(self.url(REGISTER_PATH))
            .header(header::ACCEPT, "application/json")
            .multipart(form.to_multipart())
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        Self::parse_json(response, REGISTER_PATH).await
    }

    /// Mint a new access token from a refresh token
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenPair, ApiError> {
        self.post(REFRESH_PATH, &RefreshRequest { refresh_token }, None)
            .await
    }

    // ===== Verification and password recovery =====

    pub async fn verify_whatsapp_code(
        &self,
        token: &str,
        request: &VerifyCodeRequest,
    ) -> Result<TokenPair, ApiError> {
        self.post(VERIFY_WHATSAPP_PATH, request, Some(token)).await
    }

    pub async fn forgot_password(
        &self,
        request: &ForgotPasswordRequest,
    ) -> Result<ForgotPasswordResponse, ApiError> {
        self.post(FORGOT_PASSWORD_PATH, request, None).await
    }

    pub async fn reset_password_by_email(
        &self,
        request: &IdentityRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_ack(RESET_EMAIL_PATH, request, None).await
    }

    pub async fn reset_password_by_whatsapp(
        &self,
        token: &str,
        request: &IdentityRequest,
    ) -> Result<serde_json::Value, ApiError> {
        self.post_ack(RESET_WHATSAPP_PATH, request, Some(token)).await
    }

    pub async fn reset_password(
        &self,
        password: &str,
        confirm_password: &str,
    ) -> Result<serde_json::Value, ApiError> {
        let body = ResetPasswordRequest {
            password,
            confirm_password,
        };
        self.post_ack(RESET_PASSWORD_PATH, &body, None).await
    }
}
