//! REST API client module for the legal-services portal.
//!
//! This module provides the `ApiClient` for the portal's authentication
//! endpoints: sign-in, registration, token refresh, WhatsApp code
//! verification and password recovery.
//!
//! Authenticated endpoints use JWT bearer tokens issued by `/Login` and
//! renewed through `/Resend-Access-Token`.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
