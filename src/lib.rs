// Shared core of the Fotos de Familia PWA: modal auth flow, email
// verification client, offline cache router, and the small PWA utilities.
// Compiled to WASM for the web and worker shells, native for tests.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod auth;
pub mod capabilities;
pub mod event;
pub mod model;
pub mod pwa;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use app::{App, Capabilities, Effect};
pub use event::Event;
pub use model::{Model, ViewModel};
pub use worker::{WorkerApp, WorkerCapabilities, WorkerEffect, WorkerEvent};

/// Verification codes are always exactly this many digits.
pub const CODE_LENGTH: usize = 6;

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Watchdog for auth requests; expiry surfaces a connection alert.
pub const REQUEST_TIMEOUT_MS: u64 = 15_000;
/// Pause on the success alert before switching to the verification step.
pub const SHOW_VERIFICATION_DELAY_MS: u64 = 1_500;
/// Pause on the verified alert before closing the modal and reloading.
pub const RELOAD_DELAY_MS: u64 = 2_000;
/// Spinner time granted to a completed pull-to-refresh before reload.
pub const REFRESH_RELOAD_DELAY_MS: u64 = 500;
/// Lifetime of the online/offline banner.
pub const BANNER_DURATION_MS: u64 = 3_000;

/// Pull distance that arms a refresh.
pub const PULL_TRIGGER_PX: f64 = 80.0;
/// Pull distance at which the indicator stops growing.
pub const PULL_MAX_PX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Connection,
    Timeout,
    Server,
    InvalidState,
    Serialization,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Conflict => "CONFLICT",
            Self::Connection => "CONNECTION_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Server => "SERVER_ERROR",
            Self::InvalidState => "INVALID_STATE",
            Self::Serialization => "SERIALIZATION_ERROR",
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Connection | Self::Timeout | Self::Server)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppError {
    pub kind: ErrorKind,
    pub message: String,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Message safe to render to the user; server detail stays in `message`
    /// for the logs.
    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Validation => self.message.clone(),
            ErrorKind::Conflict => self.message.clone(),
            ErrorKind::Connection => {
                "Connection error. Please check your internet and try again.".into()
            }
            ErrorKind::Timeout => "The request took too long. Please try again.".into(),
            ErrorKind::Server => "Something went wrong on our side. Please try again.".into(),
            ErrorKind::InvalidState => self.message.clone(),
            ErrorKind::Serialization => {
                "We received an unexpected response. Please try again.".into()
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.message)
    }
}

impl std::error::Error for AppError {}
