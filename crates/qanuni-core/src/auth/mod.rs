//! Authentication module for managing the session's tokens.
//!
//! This module provides:
//! - `SessionManager`: owns the access/refresh token pair, retries requests
//!   after an expired token and coalesces concurrent refreshes into one call
//! - `SessionState`: the token pair itself
//! - `AuthBackend`: the token-issuing calls the manager depends on
//! - `TokenStore`: OS keychain persistence of the token pair
//!
//! An HTTP 401 from an authenticated call is treated as an expired access
//! token.

pub mod backend;
pub mod credentials;
pub mod error;
pub mod manager;
pub mod session;
pub mod store;

pub use backend::AuthBackend;
pub use credentials::Credentials;
pub use error::AuthError;
pub use manager::SessionManager;
pub use session::SessionState;
pub use store::TokenStore;
