use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Marker the backend puts in `typeOfGender` when the pending code belongs to
/// a password reset rather than a sign-in.
const PASSWORD_RESET_PURPOSE: &str = "ForgetPassword";

/// Channel used to deliver a password-reset code or link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetChannel {
    Email,
    WhatsApp,
}

impl FromStr for ResetChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "email" => Ok(ResetChannel::Email),
            "whatsapp" => Ok(ResetChannel::WhatsApp),
            other => Err(format!("unknown reset channel: {}", other)),
        }
    }
}

impl fmt::Display for ResetChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetChannel::Email => write!(f, "Email"),
            ResetChannel::WhatsApp => write!(f, "WhatsApp"),
        }
    }
}

/// Body of `POST /Forget-Password`.
#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest {
    pub identity: String,
    #[serde(rename = "type")]
    pub channel: ResetChannel,
}

/// Response of `POST /Forget-Password`: a short-lived token for the
/// verification step and the purpose marker to echo back with the code.
#[derive(Clone, Deserialize)]
pub struct ForgotPasswordResponse {
    pub token: String,
    #[serde(rename = "typeOfGender", default)]
    pub purpose: Option<String>,
}

impl fmt::Debug for ForgotPasswordResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForgotPasswordResponse")
            .field("token", &"[redacted]")
            .field("purpose", &self.purpose)
            .finish()
    }
}

/// Purpose of a pending WhatsApp verification code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationPurpose(pub Option<String>);

impl VerificationPurpose {
    pub fn is_password_reset(&self) -> bool {
        self.0.as_deref() == Some(PASSWORD_RESET_PURPOSE)
    }
}

/// Body of `POST /Verify/Verify-WhatsApp-Code`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyCodeRequest {
    #[serde(rename = "typeOfGenerate")]
    pub purpose: Option<String>,
    pub code: String,
}

/// Body of `/Reset-Email-Password` and `/Reset-Whats-Password`.
#[derive(Debug, Clone, Serialize)]
pub struct IdentityRequest {
    pub identity: String,
}

/// Body of `POST /Reset-Password`.
#[derive(Serialize)]
pub struct ResetPasswordRequest<'a> {
    pub password: &'a str,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: &'a str,
}
