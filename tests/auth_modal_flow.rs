use crux_core::testing::AppTester;
use crux_core::Request;

use fotofam_core::capabilities::delay::DelayOperation;
use fotofam_core::capabilities::http::{HttpOperation, HttpOutput, HttpResult};
use fotofam_core::capabilities::platform::PlatformOperation;
use fotofam_core::event::DelayPurpose;
use fotofam_core::model::{AlertKind, ModalStep, RecoveryOptions};
use fotofam_core::{App, Effect, Event, Model, REQUEST_TIMEOUT_MS};

fn tester() -> AppTester<App, Effect> {
    AppTester::<App, Effect>::default()
}

fn ok_json(status: u16, body: &str) -> HttpResult {
    Ok(HttpOutput {
        status,
        headers: vec![("Content-Type".into(), "application/json".into())],
        body: body.as_bytes().to_vec(),
    })
}

fn take_http(effects: &mut Vec<Effect>) -> Request<HttpOperation> {
    let position = effects
        .iter()
        .position(|e| matches!(e, Effect::Http(_)))
        .expect("expected an http effect");
    match effects.remove(position) {
        Effect::Http(request) => request,
        _ => unreachable!(),
    }
}

fn take_delay(effects: &mut Vec<Effect>, millis: u64) -> Request<DelayOperation> {
    let position = effects
        .iter()
        .position(|e| matches!(e, Effect::Delay(r) if r.operation.millis == millis))
        .unwrap_or_else(|| panic!("expected a {millis} ms delay effect"));
    match effects.remove(position) {
        Effect::Delay(request) => request,
        _ => unreachable!(),
    }
}

fn http_body(request: &Request<HttpOperation>) -> serde_json::Value {
    let HttpOperation::Execute(inner) = &request.operation;
    serde_json::from_slice(inner.body().expect("request should have a body")).unwrap()
}

fn http_url(request: &Request<HttpOperation>) -> String {
    let HttpOperation::Execute(inner) = &request.operation;
    inner.url().as_str().to_string()
}

/// Drives one event and feeds any produced follow-up events back in.
fn settle(app: &AppTester<App, Effect>, event: Event, model: &mut Model) -> Vec<Effect> {
    let update = app.update(event, model);
    let mut effects = update.effects;
    for event in update.events {
        effects.extend(settle(app, event, model));
    }
    effects
}

#[test]
fn modal_opens_on_selection_and_navigates() {
    let app = tester();
    let mut model = Model::default();

    app.update(Event::ModalOpened, &mut model);
    assert_eq!(model.step, ModalStep::Selection);

    app.update(Event::LoginSelected, &mut model);
    assert_eq!(model.step, ModalStep::Login);

    app.update(Event::BackToSelection, &mut model);
    assert_eq!(model.step, ModalStep::Selection);

    app.update(Event::ModalClosed, &mut model);
    assert_eq!(model.step, ModalStep::Closed);
}

#[test]
fn empty_login_email_is_rejected_without_a_request() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::ModalOpened, &mut model);
    app.update(Event::LoginSelected, &mut model);

    let update = app.update(Event::LoginSubmitted, &mut model);

    assert!(!model.is_loading);
    let alert = model.alert.as_ref().expect("expected a validation alert");
    assert_eq!(alert.kind, AlertKind::Error);
    assert!(!update.effects.iter().any(|e| matches!(e, Effect::Http(_))));
}

#[test]
fn malformed_register_input_is_rejected_without_a_request() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::ModalOpened, &mut model);
    app.update(Event::RegisterSelected, &mut model);
    app.update(Event::RegisterNameChanged("Ana".into()), &mut model);
    app.update(Event::RegisterEmailChanged("not-an-email".into()), &mut model);

    let update = app.update(Event::RegisterSubmitted, &mut model);

    assert!(model.alert.is_some());
    assert!(!update.effects.iter().any(|e| matches!(e, Effect::Http(_))));
}

#[test]
fn login_happy_path_reaches_verification() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::ModalOpened, &mut model);
    app.update(Event::LoginSelected, &mut model);
    app.update(Event::LoginEmailChanged("ana@example.com".into()), &mut model);

    let update = app.update(Event::LoginSubmitted, &mut model);
    assert!(model.is_loading);

    let mut effects = update.effects;
    let mut http = take_http(&mut effects);
    assert_eq!(http_url(&http), "/api/auth/login");
    assert_eq!(http_body(&http), serde_json::json!({ "email": "ana@example.com" }));
    // watchdog armed alongside the request
    take_delay(&mut effects, REQUEST_TIMEOUT_MS);

    let update = app
        .resolve(
            &mut http,
            ok_json(200, r#"{"success":true,"message":"Code sent","user_name":"Ana"}"#),
        )
        .unwrap();

    let mut effects = Vec::new();
    for event in update.events {
        effects.extend(settle(&app, event, &mut model));
    }

    assert!(!model.is_loading);
    let alert = model.alert.as_ref().expect("expected a success alert");
    assert_eq!(alert.kind, AlertKind::Success);
    assert!(alert.message.contains("Ana"));
    assert!(model.draft.is_some());
    // still on the login step until the pause elapses
    assert_eq!(model.step, ModalStep::Login);

    let mut pause = take_delay(&mut effects, 1_500);
    let update = app.resolve(&mut pause, ()).unwrap();
    for event in update.events {
        settle(&app, event, &mut model);
    }

    assert_eq!(model.step, ModalStep::Verification);
    assert!(model.alert.is_none());
}

#[test]
fn register_conflict_offers_both_recoveries() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::ModalOpened, &mut model);
    app.update(Event::RegisterSelected, &mut model);
    app.update(Event::RegisterNameChanged("Ana".into()), &mut model);
    app.update(Event::RegisterEmailChanged("ana@example.com".into()), &mut model);

    let update = app.update(Event::RegisterSubmitted, &mut model);
    let mut effects = update.effects;
    let mut http = take_http(&mut effects);
    assert_eq!(http_url(&http), "/api/auth/register");

    let update = app
        .resolve(
            &mut http,
            ok_json(
                409,
                r#"{"success":false,"code":"EMAIL_ALREADY_EXISTS","message":"Already registered","suggestion":"login"}"#,
            ),
        )
        .unwrap();
    for event in update.events {
        settle(&app, event, &mut model);
    }

    assert_eq!(model.step, ModalStep::Register);
    assert!(!model.is_loading);
    let alert = model.alert.as_ref().expect("expected a conflict alert");
    assert_eq!(alert.kind, AlertKind::Error);
    assert_eq!(
        alert.recovery,
        Some(RecoveryOptions::EmailExists {
            email: "ana@example.com".into()
        })
    );

    // first affordance: switch to login with the same email
    app.update(Event::SwitchToLoginWithEmail, &mut model);
    assert_eq!(model.step, ModalStep::Login);
    assert_eq!(model.login_email, "ana@example.com");
    assert!(model.register_email.is_empty());
    assert!(model.alert.is_none());
}

#[test]
fn clear_register_form_stays_on_register() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::ModalOpened, &mut model);
    app.update(Event::RegisterSelected, &mut model);
    app.update(Event::RegisterNameChanged("Ana".into()), &mut model);
    app.update(Event::RegisterEmailChanged("ana@example.com".into()), &mut model);

    app.update(Event::ClearRegisterForm, &mut model);

    assert_eq!(model.step, ModalStep::Register);
    assert!(model.register_name.is_empty());
    assert!(model.register_email.is_empty());
}

#[test]
fn code_input_is_sanitized_as_it_changes() {
    let app = tester();
    let mut model = Model::default();

    app.update(Event::CodeChanged("12 34-56x789".into()), &mut model);
    assert_eq!(model.code_input, "123456");

    app.update(Event::CodeChanged("12a".into()), &mut model);
    assert_eq!(model.code_input, "12");
}

#[test]
fn verify_success_closes_and_reloads() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::ModalOpened, &mut model);
    app.update(Event::LoginSelected, &mut model);
    app.update(Event::LoginEmailChanged("ana@example.com".into()), &mut model);

    // reach verification
    let mut effects = app.update(Event::LoginSubmitted, &mut model).effects;
    let mut http = take_http(&mut effects);
    let update = app
        .resolve(&mut http, ok_json(200, r#"{"success":true,"message":"Code sent"}"#))
        .unwrap();
    let mut effects = Vec::new();
    for event in update.events {
        effects.extend(settle(&app, event, &mut model));
    }
    let mut pause = take_delay(&mut effects, 1_500);
    let update = app.resolve(&mut pause, ()).unwrap();
    for event in update.events {
        settle(&app, event, &mut model);
    }
    assert_eq!(model.step, ModalStep::Verification);

    // submit the code
    app.update(Event::CodeChanged("123456".into()), &mut model);
    let mut effects = app.update(Event::CodeSubmitted, &mut model).effects;
    let mut http = take_http(&mut effects);
    assert_eq!(http_url(&http), "/api/auth/verify-email");
    assert_eq!(
        http_body(&http),
        serde_json::json!({
            "email": "ana@example.com",
            "code": "123456",
            "action": "login"
        })
    );

    let update = app
        .resolve(
            &mut http,
            ok_json(
                200,
                r#"{"success":true,"message":"Welcome","user":{"name":"Ana","email":"ana@example.com"}}"#,
            ),
        )
        .unwrap();
    let mut effects = Vec::new();
    for event in update.events {
        effects.extend(settle(&app, event, &mut model));
    }

    assert!(model.draft.is_none());
    assert_eq!(
        model.authenticated_user.as_ref().map(|u| u.name.as_str()),
        Some("Ana")
    );

    // after the pause: modal closed and a reload instruction
    let mut pause = take_delay(&mut effects, 2_000);
    let update = app.resolve(&mut pause, ()).unwrap();
    let mut effects = Vec::new();
    for event in update.events {
        effects.extend(settle(&app, event, &mut model));
    }
    assert_eq!(model.step, ModalStep::Closed);
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Platform(r) if r.operation == PlatformOperation::ReloadPage
    )));
}

#[test]
fn code_submit_without_a_draft_is_an_error() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::CodeChanged("123456".into()), &mut model);

    let update = app.update(Event::CodeSubmitted, &mut model);

    assert!(model.alert.is_some());
    assert!(!update.effects.iter().any(|e| matches!(e, Effect::Http(_))));
}

#[test]
fn resend_replays_the_original_payload() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::ModalOpened, &mut model);
    app.update(Event::RegisterSelected, &mut model);
    app.update(Event::RegisterNameChanged("Ana".into()), &mut model);
    app.update(Event::RegisterEmailChanged("ana@example.com".into()), &mut model);

    let mut effects = app.update(Event::RegisterSubmitted, &mut model).effects;
    let mut http = take_http(&mut effects);
    let original_body = http_body(&http);
    let update = app
        .resolve(&mut http, ok_json(200, r#"{"success":true,"message":"Code sent"}"#))
        .unwrap();
    let mut effects = Vec::new();
    for event in update.events {
        effects.extend(settle(&app, event, &mut model));
    }
    let mut pause = take_delay(&mut effects, 1_500);
    let update = app.resolve(&mut pause, ()).unwrap();
    for event in update.events {
        settle(&app, event, &mut model);
    }
    assert_eq!(model.step, ModalStep::Verification);

    // two resends produce identical register payloads
    for _ in 0..2 {
        let mut effects = app.update(Event::ResendRequested, &mut model).effects;
        let mut http = take_http(&mut effects);
        assert_eq!(http_url(&http), "/api/auth/register");
        assert_eq!(http_body(&http), original_body);
        let update = app
            .resolve(&mut http, ok_json(200, r#"{"success":true,"message":"Code sent"}"#))
            .unwrap();
        for event in update.events {
            settle(&app, event, &mut model);
        }
        // resend never leaves the verification step
        assert_eq!(model.step, ModalStep::Verification);
        assert!(model.draft.is_some());
    }
}

#[test]
fn resend_without_a_draft_makes_no_request() {
    let app = tester();
    let mut model = Model::default();

    let update = app.update(Event::ResendRequested, &mut model);

    assert!(model.alert.is_some());
    assert!(!update.effects.iter().any(|e| matches!(e, Effect::Http(_))));
}

#[test]
fn submits_are_ignored_while_loading() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::ModalOpened, &mut model);
    app.update(Event::LoginSelected, &mut model);
    app.update(Event::LoginEmailChanged("ana@example.com".into()), &mut model);

    let first = app.update(Event::LoginSubmitted, &mut model);
    assert!(first.effects.iter().any(|e| matches!(e, Effect::Http(_))));
    assert!(model.is_loading);

    let second = app.update(Event::LoginSubmitted, &mut model);
    assert!(!second.effects.iter().any(|e| matches!(e, Effect::Http(_))));
}

#[test]
fn transport_failure_surfaces_a_connection_alert() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::ModalOpened, &mut model);
    app.update(Event::LoginSelected, &mut model);
    app.update(Event::LoginEmailChanged("ana@example.com".into()), &mut model);

    let mut effects = app.update(Event::LoginSubmitted, &mut model).effects;
    let mut http = take_http(&mut effects);
    let update = app
        .resolve(
            &mut http,
            Err(fotofam_core::capabilities::http::HttpError::Network {
                message: "offline".into(),
            }),
        )
        .unwrap();
    for event in update.events {
        settle(&app, event, &mut model);
    }

    assert!(!model.is_loading);
    let alert = model.alert.as_ref().expect("expected a connection alert");
    assert_eq!(alert.kind, AlertKind::Error);
    assert_eq!(model.step, ModalStep::Login);
}

#[test]
fn watchdog_expiry_clears_loading_and_late_responses_are_ignored() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::ModalOpened, &mut model);
    app.update(Event::LoginSelected, &mut model);
    app.update(Event::LoginEmailChanged("ana@example.com".into()), &mut model);

    let mut effects = app.update(Event::LoginSubmitted, &mut model).effects;
    let mut http = take_http(&mut effects);
    let mut watchdog = take_delay(&mut effects, REQUEST_TIMEOUT_MS);

    // watchdog fires first
    let update = app.resolve(&mut watchdog, ()).unwrap();
    for event in update.events {
        settle(&app, event, &mut model);
    }
    assert!(!model.is_loading);
    let timeout_alert = model.alert.clone().expect("expected a timeout alert");
    assert_eq!(timeout_alert.kind, AlertKind::Error);

    // the response straggles in afterwards and must change nothing
    let update = app
        .resolve(&mut http, ok_json(200, r#"{"success":true,"message":"Code sent"}"#))
        .unwrap();
    for event in update.events {
        settle(&app, event, &mut model);
    }
    assert_eq!(model.alert, Some(timeout_alert));
    assert_eq!(model.step, ModalStep::Login);
    assert!(model.draft.is_none());
}

#[test]
fn escape_closes_the_modal_and_shortcuts_dispatch() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::ModalOpened, &mut model);

    app.update(
        Event::KeyPressed {
            key: "Escape".into(),
            ctrl: false,
            meta: false,
        },
        &mut model,
    );
    assert_eq!(model.step, ModalStep::Closed);

    let update = app.update(
        Event::KeyPressed {
            key: "k".into(),
            ctrl: true,
            meta: false,
        },
        &mut model,
    );
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::Platform(r) if r.operation == PlatformOperation::FocusSearchField
    )));

    let update = app.update(
        Event::KeyPressed {
            key: "u".into(),
            ctrl: false,
            meta: true,
        },
        &mut model,
    );
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::Platform(r) if r.operation == PlatformOperation::TriggerPhotoUpload
    )));
}

#[test]
fn connection_banner_appears_and_expires() {
    let app = tester();
    let mut model = Model::default();

    let mut effects = app
        .update(Event::NetworkStatusChanged { online: false }, &mut model)
        .effects;
    assert!(!model.online);
    assert!(model.banner.is_some());

    let mut banner_delay = take_delay(&mut effects, 3_000);
    let update = app.resolve(&mut banner_delay, ()).unwrap();
    for event in update.events {
        settle(&app, event, &mut model);
    }
    assert!(model.banner.is_none());
}

#[test]
fn pull_to_refresh_triggers_reload_past_threshold() {
    let app = tester();
    let mut model = Model::default();

    app.update(Event::PullStarted { y: 0.0 }, &mut model);
    app.update(Event::PullMoved { y: 50.0 }, &mut model);
    let update = app.update(Event::PullEnded, &mut model);
    assert!(!model.refreshing);
    assert!(!update.effects.iter().any(|e| matches!(e, Effect::Delay(_))));

    app.update(Event::PullStarted { y: 0.0 }, &mut model);
    app.update(Event::PullMoved { y: 90.0 }, &mut model);
    let mut effects = app.update(Event::PullEnded, &mut model).effects;
    assert!(model.refreshing);

    let mut spin = take_delay(&mut effects, 500);
    let update = app.resolve(&mut spin, ()).unwrap();
    let mut effects = Vec::new();
    for event in update.events {
        effects.extend(settle(&app, event, &mut model));
    }
    assert!(!model.refreshing);
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Platform(r) if r.operation == PlatformOperation::ReloadPage
    )));
}

#[test]
fn back_navigation_closes_the_modal_and_rearms_the_trap() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::ModalOpened, &mut model);

    let update = app.update(Event::BackNavigationAttempted, &mut model);

    assert_eq!(model.step, ModalStep::Closed);
    assert!(update.effects.iter().any(|e| matches!(
        e,
        Effect::Platform(r) if r.operation == PlatformOperation::PushHistoryState
    )));
}

#[test]
fn rejected_code_shows_the_server_message() {
    let app = tester();
    let mut model = Model::default();
    app.update(Event::ModalOpened, &mut model);
    app.update(Event::LoginSelected, &mut model);
    app.update(Event::LoginEmailChanged("ana@example.com".into()), &mut model);

    let mut effects = app.update(Event::LoginSubmitted, &mut model).effects;
    let mut http = take_http(&mut effects);
    let update = app
        .resolve(&mut http, ok_json(200, r#"{"success":true,"message":"Code sent"}"#))
        .unwrap();
    let mut effects = Vec::new();
    for event in update.events {
        effects.extend(settle(&app, event, &mut model));
    }
    let mut pause = take_delay(&mut effects, 1_500);
    let update = app.resolve(&mut pause, ()).unwrap();
    for event in update.events {
        settle(&app, event, &mut model);
    }

    app.update(Event::CodeChanged("000000".into()), &mut model);
    let mut effects = app.update(Event::CodeSubmitted, &mut model).effects;
    let mut http = take_http(&mut effects);
    let update = app
        .resolve(
            &mut http,
            ok_json(400, r#"{"success":false,"message":"Invalid or expired code"}"#),
        )
        .unwrap();
    for event in update.events {
        settle(&app, event, &mut model);
    }

    // still on verification, draft intact, server message shown
    assert_eq!(model.step, ModalStep::Verification);
    assert!(model.draft.is_some());
    let alert = model.alert.as_ref().expect("expected a rejection alert");
    assert_eq!(alert.message, "Invalid or expired code");
}

#[test]
fn delayed_purposes_round_trip_through_serde() {
    let purpose = DelayPurpose::SubmitTimeout { seq: 4 };
    let json = serde_json::to_string(&purpose).unwrap();
    let back: DelayPurpose = serde_json::from_str(&json).unwrap();
    assert_eq!(purpose, back);
}
