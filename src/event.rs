use serde::{Deserialize, Serialize};

use crate::auth::AuthOp;
use crate::capabilities::http::HttpResult;
use crate::{AppError, ErrorKind, CODE_LENGTH, MAX_EMAIL_LENGTH, MAX_NAME_LENGTH};

/// A trimmed, plausibly-deliverable email address.
///
/// Full RFC validation belongs to the server; the core only refuses input
/// that cannot possibly be an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::new(
                ErrorKind::Validation,
                "Please enter your email address.",
            ));
        }
        if trimmed.len() > MAX_EMAIL_LENGTH {
            return Err(AppError::new(
                ErrorKind::Validation,
                "That email address is too long.",
            ));
        }
        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(AppError::new(
                ErrorKind::Validation,
                "Please enter a valid email address.",
            ));
        };
        if local.is_empty()
            || domain.is_empty()
            || !domain.contains('.')
            || trimmed.chars().any(char::is_whitespace)
            || trimmed.matches('@').count() != 1
        {
            return Err(AppError::new(
                ErrorKind::Validation,
                "Please enter a valid email address.",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A trimmed, non-empty display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AppError::new(
                ErrorKind::Validation,
                "Please enter your name.",
            ));
        }
        if trimmed.len() > MAX_NAME_LENGTH {
            return Err(AppError::new(
                ErrorKind::Validation,
                "That name is too long.",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An exactly-six-digit verification code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationCode(String);

impl VerificationCode {
    /// Keeps only digits and caps at the code length. Applied on every
    /// keystroke so pasted codes with spaces or dashes still land.
    #[must_use]
    pub fn sanitize(raw: &str) -> String {
        raw.chars()
            .filter(char::is_ascii_digit)
            .take(CODE_LENGTH)
            .collect()
    }

    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if raw.len() != CODE_LENGTH || !raw.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::new(
                ErrorKind::Validation,
                "Please enter the 6-digit code from your email.",
            ));
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What a finished delay was armed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelayPurpose {
    /// Success alert shown, move Login/Register to Verification.
    ShowVerification,
    /// Verified alert shown, close the modal and reload.
    ReloadPage,
    /// Pull-to-refresh spinner time elapsed, reload.
    RefreshReload,
    /// Request watchdog fired for the dispatch with this sequence number.
    SubmitTimeout { seq: u64 },
    /// Connection banner lifetime elapsed.
    BannerExpired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    AppStarted,

    // Modal navigation
    ModalOpened,
    ModalClosed,
    LoginSelected,
    RegisterSelected,
    BackToSelection,

    // Form input
    LoginEmailChanged(String),
    RegisterNameChanged(String),
    RegisterEmailChanged(String),
    CodeChanged(String),

    // Submission
    LoginSubmitted,
    RegisterSubmitted,
    CodeSubmitted,
    ResendRequested,

    // Conflict recovery
    SwitchToLoginWithEmail,
    ClearRegisterForm,

    AlertDismissed,

    // Capability callbacks
    AuthResponded {
        op: AuthOp,
        seq: u64,
        result: Box<HttpResult>,
    },
    Delayed(DelayPurpose),

    // PWA
    NetworkStatusChanged { online: bool },
    InstallPromptAvailable,
    InstallAccepted,
    InstallDismissed,
    PullStarted { y: f64 },
    PullMoved { y: f64 },
    PullEnded,
    KeyPressed { key: String, ctrl: bool, meta: bool },
    BackNavigationAttempted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_trims_and_accepts() {
        let email = Email::parse("  ana@example.com  ").unwrap();
        assert_eq!(email.as_str(), "ana@example.com");
    }

    #[test]
    fn email_rejects_malformed() {
        assert!(Email::parse("").is_err());
        assert!(Email::parse("   ").is_err());
        assert!(Email::parse("no-at-sign").is_err());
        assert!(Email::parse("@nodomain").is_err());
        assert!(Email::parse("nolocal@").is_err());
        assert!(Email::parse("a@b").is_err());
        assert!(Email::parse("two@@example.com").is_err());
        assert!(Email::parse("spa ce@example.com").is_err());
    }

    #[test]
    fn email_rejects_oversized() {
        let long = format!("{}@example.com", "a".repeat(MAX_EMAIL_LENGTH));
        assert!(Email::parse(&long).is_err());
    }

    #[test]
    fn display_name_trims_and_bounds() {
        assert_eq!(DisplayName::parse("  Ana  ").unwrap().as_str(), "Ana");
        assert!(DisplayName::parse("   ").is_err());
        assert!(DisplayName::parse(&"x".repeat(MAX_NAME_LENGTH + 1)).is_err());
    }

    #[test]
    fn code_sanitize_strips_and_truncates() {
        assert_eq!(VerificationCode::sanitize("12 34-56"), "123456");
        assert_eq!(VerificationCode::sanitize("abc123def456789"), "123456");
        assert_eq!(VerificationCode::sanitize("12"), "12");
    }

    #[test]
    fn code_parse_requires_exactly_six_digits() {
        assert!(VerificationCode::parse("123456").is_ok());
        assert!(VerificationCode::parse("12345").is_err());
        assert!(VerificationCode::parse("1234567").is_err());
        assert!(VerificationCode::parse("12345a").is_err());
        assert!(VerificationCode::parse("").is_err());
    }

    proptest::proptest! {
        #[test]
        fn sanitize_output_is_bounded_and_digits_only(input in ".{0,40}") {
            let sanitized = VerificationCode::sanitize(&input);
            proptest::prop_assert!(sanitized.len() <= CODE_LENGTH);
            proptest::prop_assert!(sanitized.chars().all(|c| c.is_ascii_digit()));
        }

        #[test]
        fn sanitize_is_idempotent(input in ".{0,40}") {
            let once = VerificationCode::sanitize(&input);
            proptest::prop_assert_eq!(VerificationCode::sanitize(&once), once.clone());
        }

        #[test]
        fn six_digit_inputs_survive_sanitize_and_parse(code in "[0-9]{6}") {
            let sanitized = VerificationCode::sanitize(&code);
            proptest::prop_assert_eq!(&sanitized, &code);
            proptest::prop_assert!(VerificationCode::parse(&sanitized).is_ok());
        }
    }
}
