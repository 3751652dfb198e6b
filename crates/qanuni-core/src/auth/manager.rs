//! Session manager: owns the token pair and serializes refreshes.
//!
//! Concurrent callers that see an expired access token share one refresh
//! call. The first caller creates a `Shared` refresh future and later callers
//! clone and await it. The slot only keeps a weak handle, so the waiters own
//! the future: if all of them are dropped the refresh is abandoned and the
//! next caller starts a fresh one. The future writes the new token into the
//! session before it resolves, so every waiter retries with the same token.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{
    ForgotPasswordRequest, IdentityRequest, RegistrationForm, VerificationPurpose,
    VerifyCodeRequest,
};

use super::{AuthBackend, AuthError, Credentials, SessionState};

/// Outcome of a refresh shared between waiters. The cause of a failure is
/// logged where it happens; waiters only need to know the session is gone.
#[derive(Debug, Clone, Copy)]
struct RefreshFailed;

type RefreshTask = BoxFuture<'static, Result<String, RefreshFailed>>;
type RefreshFuture = Shared<RefreshTask>;

/// Session plus a counter bumped whenever the session is replaced from
/// outside the refresh path (sign-in, sign-out, restore). A refresh that
/// started under an older epoch must not write its result.
#[derive(Default)]
struct Tracked {
    session: SessionState,
    epoch: u64,
}

struct Inner<B> {
    backend: B,
    state: RwLock<Tracked>,
    in_flight: Mutex<Option<WeakShared<RefreshTask>>>,
}

enum Refresh {
    /// Another caller already replaced the stale token
    Current(String),
    InFlight(RefreshFuture),
}

/// Owns the session's tokens. Clone is cheap and clones share the session.
pub struct SessionManager<B = ApiClient> {
    inner: Arc<Inner<B>>,
}

impl<B> Clone for SessionManager<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: AuthBackend> SessionManager<B> {
    /// Create a manager with an empty session
    pub fn new(backend: B) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                state: RwLock::new(Tracked::default()),
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// Snapshot of the current session
    pub async fn state(&self) -> SessionState {
        self.inner.state.read().await.session.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.state.read().await.session.is_active()
    }

    pub async fn access_token(&self) -> Option<String> {
        self.inner
            .state
            .read()
            .await
            .session
            .access_token()
            .map(str::to_owned)
    }

    /// Replace the session with a previously saved one
    pub async fn restore(&self, session: SessionState) {
        self.replace(session.normalized()).await;
    }

    async fn replace(&self, session: SessionState) {
        let mut tracked = self.inner.state.write().await;
        tracked.session = session;
        tracked.epoch += 1;
    }

    /// Sign in and store the issued token pair.
    ///
    /// Rejected credentials and transport failures are returned as-is; the
    /// current session is left untouched on failure.
    pub async fn login(&self, credentials: &Credentials) -> Result<SessionState, AuthError> {
        let pair = self
            .inner
            .backend
            .login(credentials)
            .await
            .map_err(AuthError::from_login)?;

        let session = SessionState::from_pair(pair);
        self.replace(session.clone()).await;
        info!(has_refresh_token = session.refresh_token().is_some(), "Signed in");
        Ok(session)
    }

    /// Register an account and store the access token it returns
    pub async fn register(&self, form: &RegistrationForm) -> Result<SessionState, AuthError> {
        let response = self.inner.backend.register(form).await?;

        let session = SessionState::access_only(response.token);
        self.replace(session.clone()).await;
        info!(company = form.company.is_some(), "Registered account");
        Ok(session)
    }

    /// Clear the session. Safe to call when already signed out.
    pub async fn logout(&self) {
        let mut tracked = self.inner.state.write().await;
        if tracked.session.is_active() {
            info!("Signed out");
        }
        tracked.session.clear();
        tracked.epoch += 1;
    }

    /// Refresh the access token, joining a refresh that is already running.
    ///
    /// On failure the session is cleared and `SessionExpired` is returned.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        match self.begin_refresh(None).await {
            Refresh::Current(token) => Ok(token),
            Refresh::InFlight(flight) => flight.await.map_err(|_| AuthError::SessionExpired),
        }
    }

    /// Refresh after `stale` was rejected. If a completed refresh already
    /// replaced `stale`, the current token is returned without a network call.
    async fn refresh_after(&self, stale: &str) -> Result<String, AuthError> {
        match self.begin_refresh(Some(stale)).await {
            Refresh::Current(token) => Ok(token),
            Refresh::InFlight(flight) => flight.await.map_err(|_| AuthError::SessionExpired),
        }
    }

    async fn begin_refresh(&self, stale: Option<&str>) -> Refresh {
        let mut slot = self.inner.in_flight.lock().await;

        if let Some(flight) = slot.as_ref().and_then(WeakShared::upgrade) {
            debug!("Joining in-flight token refresh");
            return Refresh::InFlight(flight);
        }

        if let Some(stale) = stale {
            let tracked = self.inner.state.read().await;
            if let Some(current) = tracked.session.access_token() {
                if current != stale {
                    debug!("Access token already refreshed by another caller");
                    return Refresh::Current(current.to_owned());
                }
            }
        }

        let inner = Arc::clone(&self.inner);
        let flight = async move { inner.run_refresh().await }.boxed().shared();
        *slot = flight.downgrade();
        Refresh::InFlight(flight)
    }

    /// Run `request` with the current access token.
    ///
    /// If the backend answers that the token expired, the token is refreshed
    /// and `request` is retried exactly once with the new token. An expired
    /// answer to the retry is reported as `SessionExpired`. Without an active
    /// session this fails with `SessionExpired` before `request` is called.
    pub async fn authenticated_request<T, F, Fut>(&self, mut request: F) -> Result<T, AuthError>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let token = self.access_token().await.ok_or(AuthError::SessionExpired)?;

        match request(token.clone()).await {
            Err(err) if err.is_token_expired() => {
                debug!("Access token rejected, refreshing before retry");
            }
            other => return other.map_err(AuthError::from),
        }

        let token = self.refresh_after(&token).await?;

        match request(token).await {
            Err(err) if err.is_token_expired() => {
                warn!("Refreshed access token was rejected");
                Err(AuthError::SessionExpired)
            }
            other => other.map_err(AuthError::from),
        }
    }
}

impl<B: AuthBackend> Inner<B> {
    async fn run_refresh(&self) -> Result<String, RefreshFailed> {
        let (refresh_token, epoch) = {
            let tracked = self.state.read().await;
            (
                tracked.session.refresh_token().map(str::to_owned),
                tracked.epoch,
            )
        };

        let outcome = match refresh_token {
            Some(ref refresh_token) => {
                debug!("Requesting new access token");
                self.backend.refresh(refresh_token).await.map_err(Some)
            }
            None => Err(None),
        };

        let result = {
            let mut tracked = self.state.write().await;
            if tracked.epoch != epoch {
                debug!("Session replaced during refresh, discarding refresh result");
                tracked
                    .session
                    .access_token()
                    .map(str::to_owned)
                    .ok_or(RefreshFailed)
            } else {
                match outcome {
                    Ok(pair) => {
                        tracked.session.apply_refresh(pair);
                        info!(
                            rotated = tracked.session.refresh_token() != refresh_token.as_deref(),
                            "Access token refreshed"
                        );
                        tracked
                            .session
                            .access_token()
                            .map(str::to_owned)
                            .ok_or(RefreshFailed)
                    }
                    Err(cause) => {
                        match cause {
                            Some(err) => warn!(error = %err, "Token refresh failed, ending session"),
                            None => warn!("No refresh token available, ending session"),
                        }
                        tracked.session.clear();
                        tracked.epoch += 1;
                        Err(RefreshFailed)
                    }
                }
            }
        };

        self.in_flight.lock().await.take();
        result
    }
}

impl SessionManager<ApiClient> {
    /// Sign in with a one-time password sent to the account's phone. The
    /// returned token only authorizes the WhatsApp code verification.
    pub async fn fast_login(&self, identity: &str) -> Result<SessionState, AuthError> {
        let response = self
            .backend()
            .login_otp(identity)
            .await
            .map_err(AuthError::from_login)?;

        let session = SessionState::access_only(response.token);
        self.replace(session.clone()).await;
        info!("One-time password requested");
        Ok(session)
    }

    /// Confirm a WhatsApp code with the pending token and store the full
    /// token pair the backend issues for it.
    pub async fn verify_whatsapp_code(
        &self,
        request: &VerifyCodeRequest,
    ) -> Result<SessionState, AuthError> {
        let api = self.backend();
        let pair = self
            .authenticated_request(move |token| async move {
                api.verify_whatsapp_code(&token, request).await
            })
            .await?;

        let session = SessionState::from_pair(pair);
        self.replace(session.clone()).await;
        info!("WhatsApp code verified");
        Ok(session)
    }

    /// Start password recovery. The backend answers with a token for the
    /// verification step, which replaces the current session.
    pub async fn forgot_password(
        &self,
        request: &ForgotPasswordRequest,
    ) -> Result<VerificationPurpose, AuthError> {
        let response = self.backend().forgot_password(request).await?;

        self.replace(SessionState::access_only(response.token)).await;
        info!(channel = %request.channel, "Password recovery started");
        Ok(VerificationPurpose(response.purpose))
    }

    pub async fn reset_password_by_email(
        &self,
        request: &IdentityRequest,
    ) -> Result<serde_json::Value, AuthError> {
        Ok(self.backend().reset_password_by_email(request).await?)
    }

    pub async fn reset_password_by_whatsapp(
        &self,
        request: &IdentityRequest,
    ) -> Result<serde_json::Value, AuthError> {
        let api = self.backend();
        self.authenticated_request(move |token| async move {
            api.reset_password_by_whatsapp(&token, request).await
        })
        .await
    }

    pub async fn reset_password(&self, password: &str) -> Result<serde_json::Value, AuthError> {
        Ok(self.backend().reset_password(password, password).await?)
    }
}
