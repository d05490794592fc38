//! Wire contract with the auth endpoints and response normalization.
//!
//! Every server response, however malformed, collapses into one of the
//! `AuthOutcome` variants; nothing past this module inspects raw HTTP.

use serde::{Deserialize, Serialize};

use crate::capabilities::http::{HttpError, HttpResult};
use crate::event::{DisplayName, Email, VerificationCode};
use crate::{AppError, ErrorKind};

pub const REGISTER_PATH: &str = "/api/auth/register";
pub const LOGIN_PATH: &str = "/api/auth/login";
pub const VERIFY_PATH: &str = "/api/auth/verify-email";

/// Server code distinguishing "this email already has an account" from
/// other conflicts.
pub const EMAIL_EXISTS_CODE: &str = "EMAIL_ALREADY_EXISTS";

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyRequest<'a> {
    pub email: &'a str,
    pub code: &'a str,
    pub action: &'a str,
}

/// Loose envelope the backend wraps every auth response in. Everything is
/// optional so a missing field never kills parsing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Which endpoint a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthOp {
    Login,
    Register,
    Verify,
    Resend,
}

/// What the server hints the user should do instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestionKind {
    TryLogin,
    TryRegister,
}

impl SuggestionKind {
    fn from_hint(hint: &str) -> Option<Self> {
        match hint {
            "login" => Some(Self::TryLogin),
            "register" => Some(Self::TryRegister),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Login or register accepted; a code is on its way.
    CodeSent {
        message: String,
        user_name: Option<String>,
    },
    /// Registration refused because the address already has an account.
    EmailExists {
        message: String,
        suggestion: Option<SuggestionKind>,
    },
    /// Verification accepted; the session is established server-side.
    Verified {
        message: String,
        user: Option<UserProfile>,
    },
    /// The server answered and said no.
    Rejected {
        message: String,
        suggestion: Option<SuggestionKind>,
    },
    /// Transport failure, timeout, or a body we could not make sense of.
    Failed(AppError),
}

/// Collapse a raw transport result into an outcome.
pub fn normalize(op: AuthOp, result: HttpResult) -> AuthOutcome {
    let output = match result {
        Ok(output) => output,
        Err(HttpError::Timeout) => {
            return AuthOutcome::Failed(AppError::new(ErrorKind::Timeout, "request timed out"));
        }
        Err(err) => {
            return AuthOutcome::Failed(AppError::new(ErrorKind::Connection, err.to_string()));
        }
    };

    let envelope: AuthEnvelope = match output.body_json() {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(status = output.status, "unparseable auth response body");
            return AuthOutcome::Failed(AppError::new(ErrorKind::Serialization, err.to_string()));
        }
    };

    let message = envelope.message.unwrap_or_default();
    let suggestion = envelope.suggestion.as_deref().and_then(SuggestionKind::from_hint);

    if output.status == 409 && envelope.code.as_deref() == Some(EMAIL_EXISTS_CODE) {
        return AuthOutcome::EmailExists {
            message: if message.is_empty() {
                "An account with this email already exists.".to_string()
            } else {
                message
            },
            suggestion,
        };
    }

    if output.is_success() && envelope.success {
        return match op {
            AuthOp::Verify => AuthOutcome::Verified {
                message: if message.is_empty() {
                    "Email verified. Welcome!".to_string()
                } else {
                    message
                },
                user: envelope.user,
            },
            AuthOp::Login | AuthOp::Register | AuthOp::Resend => AuthOutcome::CodeSent {
                message: if message.is_empty() {
                    "We sent a verification code to your email.".to_string()
                } else {
                    message
                },
                user_name: envelope.user_name,
            },
        };
    }

    AuthOutcome::Rejected {
        message: if message.is_empty() {
            "The request could not be completed.".to_string()
        } else {
            message
        },
        suggestion,
    }
}

impl<'a> VerifyRequest<'a> {
    #[must_use]
    pub fn new(email: &'a Email, code: &'a VerificationCode, action: &'a str) -> Self {
        Self {
            email: email.as_str(),
            code: code.as_str(),
            action,
        }
    }
}

impl<'a> RegisterRequest<'a> {
    #[must_use]
    pub fn new(name: &'a DisplayName, email: &'a Email) -> Self {
        Self {
            name: name.as_str(),
            email: email.as_str(),
        }
    }
}

impl<'a> LoginRequest<'a> {
    #[must_use]
    pub fn new(email: &'a Email) -> Self {
        Self {
            email: email.as_str(),
        }
    }
}
