//! Request and response models for the portal's auth endpoints.
//!
//! - `TokenPair`, `AccessTokenResponse`: token-bearing responses
//! - `LoginRequest`, `RegistrationForm`, `CompanyDetails`: sign-in and sign-up
//! - Password recovery types: `ForgotPasswordRequest`, `VerifyCodeRequest`, etc.

pub mod account;
pub mod password;
pub mod token;

pub use account::{CompanyDetails, LoginRequest, RegistrationForm};
pub use password::{
    ForgotPasswordRequest, ForgotPasswordResponse, IdentityRequest, ResetChannel,
    ResetPasswordRequest, VerificationPurpose, VerifyCodeRequest,
};
pub use token::{AccessTokenResponse, RefreshRequest, TokenPair};
