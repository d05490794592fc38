use serde::{Deserialize, Serialize};

use crate::auth::{SuggestionKind, UserProfile};
use crate::event::{DisplayName, Email};
use crate::pwa::{ConnectionBanner, InstallPromptState, PullToRefresh};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModalStep {
    #[default]
    Closed,
    Selection,
    Login,
    Register,
    Verification,
}

impl ModalStep {
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            ModalStep::Closed => "",
            ModalStep::Selection => "Welcome",
            ModalStep::Login => "Sign In",
            ModalStep::Register => "Create Account",
            ModalStep::Verification => "Email Verification",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingAction {
    Login,
    Register,
}

impl PendingAction {
    /// The `action` field the verify endpoint expects.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PendingAction::Login => "login",
            PendingAction::Register => "register",
        }
    }
}

/// What we are waiting to verify. Lives only in memory; a reload starts the
/// flow over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDraft {
    pub email: Email,
    pub name: Option<DisplayName>,
    pub pending_action: PendingAction,
}

/// The validated input of a dispatched login or register call, held until
/// the server accepts it and it becomes the draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSubmission {
    pub action: PendingAction,
    pub email: Email,
    pub name: Option<DisplayName>,
}

impl PendingSubmission {
    #[must_use]
    pub fn into_draft(self) -> SessionDraft {
        SessionDraft {
            email: self.email,
            name: self.name,
            pending_action: self.action,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    Success,
    Error,
    Info,
}

/// Structured recovery affordances rendered next to an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryOptions {
    /// Registration conflict: offer "sign in with this email" and
    /// "use a different email".
    EmailExists { email: String },
    /// Server hinted which flow to try instead.
    Hint(SuggestionKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    pub recovery: Option<RecoveryOptions>,
}

impl Alert {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Success,
            message: message.into(),
            recovery: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Error,
            message: message.into(),
            recovery: None,
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Info,
            message: message.into(),
            recovery: None,
        }
    }

    #[must_use]
    pub fn with_recovery(mut self, recovery: RecoveryOptions) -> Self {
        self.recovery = Some(recovery);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub step: ModalStep,
    pub is_loading: bool,
    pub alert: Option<Alert>,
    pub draft: Option<SessionDraft>,
    pub pending_submission: Option<PendingSubmission>,

    // Raw field mirrors; validated on submit.
    pub login_email: String,
    pub register_name: String,
    pub register_email: String,
    pub code_input: String,

    /// Sequence number of the in-flight auth request; bumped on every
    /// dispatch so stale responses and stale watchdogs can be told apart.
    pub inflight_seq: u64,

    pub authenticated_user: Option<UserProfile>,

    // PWA state
    pub online: bool,
    pub banner: Option<ConnectionBanner>,
    pub install: InstallPromptState,
    pub pull: PullToRefresh,
    pub refreshing: bool,
}

impl Model {
    /// Full reset back to the selection step: fields, draft, alert, loading.
    pub fn reset_modal(&mut self) {
        self.step = ModalStep::Selection;
        self.is_loading = false;
        self.alert = None;
        self.draft = None;
        self.pending_submission = None;
        self.login_email.clear();
        self.register_name.clear();
        self.register_email.clear();
        self.code_input.clear();
    }

    pub fn close_modal(&mut self) {
        self.reset_modal();
        self.step = ModalStep::Closed;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertView {
    pub kind: AlertKind,
    pub message: String,
    pub recovery: Option<RecoveryOptions>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub step: ModalStep,
    pub title: String,
    pub is_loading: bool,
    pub alert: Option<AlertView>,
    pub login_email: String,
    pub register_name: String,
    pub register_email: String,
    pub code_input: String,
    /// Address shown on the verification step.
    pub verification_email: Option<String>,
    pub authenticated_user: Option<UserProfile>,
    pub online: bool,
    pub banner_message: Option<String>,
    pub install: InstallPromptState,
    pub pull_progress: f64,
    pub refreshing: bool,
}

impl From<&Model> for ViewModel {
    fn from(model: &Model) -> Self {
        Self {
            step: model.step,
            title: model.step.title().to_string(),
            is_loading: model.is_loading,
            alert: model.alert.as_ref().map(|a| AlertView {
                kind: a.kind,
                message: a.message.clone(),
                recovery: a.recovery.clone(),
            }),
            login_email: model.login_email.clone(),
            register_name: model.register_name.clone(),
            register_email: model.register_email.clone(),
            code_input: model.code_input.clone(),
            verification_email: model
                .draft
                .as_ref()
                .map(|d| d.email.as_str().to_string()),
            authenticated_user: model.authenticated_user.clone(),
            online: model.online,
            banner_message: model.banner.map(|b| b.message().to_string()),
            install: model.install,
            pull_progress: model.pull.progress(),
            refreshing: model.refreshing,
        }
    }
}
