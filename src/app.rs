//! The page core: modal state machine, verification client, and PWA glue.

use crux_core::render::Render;
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::{
    self, AuthOp, AuthOutcome, LoginRequest, RegisterRequest, VerifyRequest,
};
use crate::capabilities::{Delay, Http, HttpRequest, Platform};
use crate::event::{DelayPurpose, DisplayName, Email, Event, VerificationCode};
use crate::model::{
    Alert, ModalStep, Model, PendingAction, PendingSubmission, RecoveryOptions, ViewModel,
};
use crate::pwa::{shortcut_for, BannerKind, ConnectionBanner, InstallPromptState, Shortcut};
use crate::{
    AppError, ErrorKind, BANNER_DURATION_MS, REFRESH_RELOAD_DELAY_MS, RELOAD_DELAY_MS,
    REQUEST_TIMEOUT_MS, SHOW_VERIFICATION_DELAY_MS,
};

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub render: Render<Event>,
    pub http: Http<Event>,
    pub delay: Delay<Event>,
    pub platform: Platform<Event>,
}

#[derive(Default)]
pub struct App;

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        match event {
            Event::AppStarted => {
                // Arm the back-button trap so popstate closes overlays
                // instead of leaving the app.
                caps.platform.push_history_state();
            }

            Event::ModalOpened => {
                model.reset_modal();
            }
            Event::ModalClosed => {
                model.close_modal();
            }
            Event::LoginSelected => {
                model.step = ModalStep::Login;
                model.alert = None;
            }
            Event::RegisterSelected => {
                model.step = ModalStep::Register;
                model.alert = None;
            }
            Event::BackToSelection => {
                model.reset_modal();
            }

            Event::LoginEmailChanged(value) => {
                model.login_email = value;
            }
            Event::RegisterNameChanged(value) => {
                model.register_name = value;
            }
            Event::RegisterEmailChanged(value) => {
                model.register_email = value;
            }
            Event::CodeChanged(value) => {
                model.code_input = VerificationCode::sanitize(&value);
            }

            Event::LoginSubmitted => {
                if model.is_loading {
                    return;
                }
                match Email::parse(&model.login_email) {
                    Ok(email) => self.submit_login(&email, model, caps),
                    Err(err) => model.alert = Some(Alert::error(err.user_facing_message())),
                }
            }

            Event::RegisterSubmitted => {
                if model.is_loading {
                    return;
                }
                let parsed = DisplayName::parse(&model.register_name)
                    .and_then(|name| Ok((name, Email::parse(&model.register_email)?)));
                match parsed {
                    Ok((name, email)) => self.submit_register(&name, &email, model, caps),
                    Err(err) => model.alert = Some(Alert::error(err.user_facing_message())),
                }
            }

            Event::CodeSubmitted => {
                if model.is_loading {
                    return;
                }
                let Some(draft) = model.draft.clone() else {
                    model.alert = Some(Alert::error(
                        AppError::new(
                            ErrorKind::InvalidState,
                            "Your session expired. Please start over.",
                        )
                        .user_facing_message(),
                    ));
                    return;
                };
                match VerificationCode::parse(&model.code_input) {
                    Ok(code) => {
                        let body =
                            VerifyRequest::new(&draft.email, &code, draft.pending_action.as_str());
                        self.dispatch(auth::VERIFY_PATH, &body, AuthOp::Verify, model, caps);
                    }
                    Err(err) => model.alert = Some(Alert::error(err.user_facing_message())),
                }
            }

            Event::ResendRequested => {
                if model.is_loading {
                    return;
                }
                let Some(draft) = model.draft.clone() else {
                    model.alert = Some(Alert::error(
                        AppError::new(
                            ErrorKind::InvalidState,
                            "Nothing to resend. Please start over.",
                        )
                        .user_facing_message(),
                    ));
                    return;
                };
                // Replays the original call with the same payload.
                match (&draft.pending_action, &draft.name) {
                    (PendingAction::Register, Some(name)) => {
                        let body = RegisterRequest::new(name, &draft.email);
                        self.dispatch(auth::REGISTER_PATH, &body, AuthOp::Resend, model, caps);
                    }
                    _ => {
                        let body = LoginRequest::new(&draft.email);
                        self.dispatch(auth::LOGIN_PATH, &body, AuthOp::Resend, model, caps);
                    }
                }
            }

            Event::SwitchToLoginWithEmail => {
                model.login_email = model.register_email.clone();
                model.register_name.clear();
                model.register_email.clear();
                model.alert = None;
                model.step = ModalStep::Login;
            }
            Event::ClearRegisterForm => {
                model.register_name.clear();
                model.register_email.clear();
                model.alert = None;
            }

            Event::AlertDismissed => {
                model.alert = None;
            }

            Event::AuthResponded { op, seq, result } => {
                if seq != model.inflight_seq || !model.is_loading {
                    debug!(seq, current = model.inflight_seq, "ignoring stale auth response");
                    return;
                }
                model.is_loading = false;
                self.apply_outcome(op, auth::normalize(op, *result), model, caps);
            }

            Event::Delayed(purpose) => match purpose {
                DelayPurpose::ShowVerification => {
                    if model.draft.is_some()
                        && matches!(model.step, ModalStep::Login | ModalStep::Register)
                    {
                        model.step = ModalStep::Verification;
                        model.alert = None;
                    }
                }
                DelayPurpose::ReloadPage => {
                    model.close_modal();
                    caps.platform.reload_page();
                }
                DelayPurpose::RefreshReload => {
                    model.refreshing = false;
                    caps.platform.reload_page();
                }
                DelayPurpose::SubmitTimeout { seq } => {
                    if model.is_loading && seq == model.inflight_seq {
                        warn!(seq, "auth request watchdog fired");
                        model.is_loading = false;
                        model.pending_submission = None;
                        model.alert = Some(Alert::error(
                            AppError::new(ErrorKind::Connection, "request watchdog expired")
                                .user_facing_message(),
                        ));
                    }
                }
                DelayPurpose::BannerExpired => {
                    model.banner = None;
                }
            },

            Event::NetworkStatusChanged { online } => {
                model.online = online;
                model.banner = Some(ConnectionBanner {
                    kind: if online {
                        BannerKind::BackOnline
                    } else {
                        BannerKind::Offline
                    },
                });
                caps.delay.start(BANNER_DURATION_MS, || {
                    Event::Delayed(DelayPurpose::BannerExpired)
                });
            }

            Event::InstallPromptAvailable => {
                model.install = InstallPromptState::Available;
            }
            Event::InstallAccepted => {
                model.install = InstallPromptState::Installed;
            }
            Event::InstallDismissed => {
                model.install = InstallPromptState::Hidden;
            }

            Event::PullStarted { y } => {
                model.pull.begin(y);
            }
            Event::PullMoved { y } => {
                model.pull.update(y);
            }
            Event::PullEnded => {
                if model.pull.finish() {
                    model.refreshing = true;
                    caps.delay.start(REFRESH_RELOAD_DELAY_MS, || {
                        Event::Delayed(DelayPurpose::RefreshReload)
                    });
                }
            }

            Event::KeyPressed { key, ctrl, meta } => match shortcut_for(&key, ctrl, meta) {
                Some(Shortcut::FocusSearch) => caps.platform.focus_search_field(),
                Some(Shortcut::UploadPhoto) => caps.platform.trigger_photo_upload(),
                Some(Shortcut::CloseOverlays) => {
                    if model.step != ModalStep::Closed {
                        model.close_modal();
                    }
                }
                None => return,
            },

            Event::BackNavigationAttempted => {
                if model.step != ModalStep::Closed {
                    model.close_modal();
                }
                // Re-arm: the browser consumed the trap entry.
                caps.platform.push_history_state();
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::from(model)
    }
}

impl App {
    fn submit_login(&self, email: &Email, model: &mut Model, caps: &Capabilities) {
        model.pending_submission = Some(PendingSubmission {
            action: PendingAction::Login,
            email: email.clone(),
            name: None,
        });
        let body = LoginRequest::new(email);
        self.dispatch(auth::LOGIN_PATH, &body, AuthOp::Login, model, caps);
    }

    fn submit_register(
        &self,
        name: &DisplayName,
        email: &Email,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        model.pending_submission = Some(PendingSubmission {
            action: PendingAction::Register,
            email: email.clone(),
            name: Some(name.clone()),
        });
        let body = RegisterRequest::new(name, email);
        self.dispatch(auth::REGISTER_PATH, &body, AuthOp::Register, model, caps);
    }

    fn dispatch<T: Serialize>(
        &self,
        path: &str,
        body: &T,
        op: AuthOp,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        let request = HttpRequest::post(path)
            .and_then(|r| r.with_json(body))
            .and_then(|r| r.with_timeout_ms(REQUEST_TIMEOUT_MS));

        match request {
            Ok(request) => {
                model.inflight_seq += 1;
                let seq = model.inflight_seq;
                model.is_loading = true;
                model.alert = None;
                debug!(path, seq, "dispatching auth request");
                caps.http.send(request, move |result| Event::AuthResponded {
                    op,
                    seq,
                    result: Box::new(result),
                });
                caps.delay.start(REQUEST_TIMEOUT_MS, move || {
                    Event::Delayed(DelayPurpose::SubmitTimeout { seq })
                });
            }
            Err(err) => {
                model.pending_submission = None;
                model.alert = Some(Alert::error(
                    AppError::new(ErrorKind::Serialization, err.to_string())
                        .user_facing_message(),
                ));
            }
        }
    }

    fn apply_outcome(
        &self,
        op: AuthOp,
        outcome: AuthOutcome,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        match outcome {
            AuthOutcome::CodeSent { message, user_name } => {
                if let Some(submission) = model.pending_submission.take() {
                    model.draft = Some(submission.into_draft());
                }
                let greeting = match user_name {
                    Some(name) => format!("{message} Welcome back, {name}!"),
                    None => message,
                };
                model.alert = Some(Alert::success(greeting));
                // Resends stay on the verification step.
                if matches!(model.step, ModalStep::Login | ModalStep::Register) {
                    caps.delay.start(SHOW_VERIFICATION_DELAY_MS, || {
                        Event::Delayed(DelayPurpose::ShowVerification)
                    });
                }
            }

            AuthOutcome::EmailExists { message, .. } => {
                model.pending_submission = None;
                let email = model.register_email.trim().to_string();
                model.alert = Some(
                    Alert::error(message).with_recovery(RecoveryOptions::EmailExists { email }),
                );
            }

            AuthOutcome::Verified { message, user } => {
                debug!("verification accepted");
                model.draft = None;
                model.authenticated_user = user;
                model.alert = Some(Alert::success(message));
                caps.delay.start(RELOAD_DELAY_MS, || {
                    Event::Delayed(DelayPurpose::ReloadPage)
                });
            }

            AuthOutcome::Rejected { message, suggestion } => {
                if op != AuthOp::Resend {
                    model.pending_submission = None;
                }
                let mut alert = Alert::error(message);
                if let Some(hint) = suggestion {
                    alert = alert.with_recovery(RecoveryOptions::Hint(hint));
                }
                model.alert = Some(alert);
            }

            AuthOutcome::Failed(err) => {
                warn!(code = err.code(), "auth request failed: {err}");
                if op != AuthOp::Resend {
                    model.pending_submission = None;
                }
                model.alert = Some(Alert::error(err.user_facing_message()));
            }
        }
    }
}
