//! Core library for qanuni, a client for the legal-services portal API.
//!
//! - `api`: REST client for the portal's auth endpoints
//! - `auth`: session and token lifecycle
//! - `models`: request and response types
//! - `config`: base URL and timeout configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthBackend, AuthError, Credentials, SessionManager, SessionState, TokenStore};
pub use config::Config;
