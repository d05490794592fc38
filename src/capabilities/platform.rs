use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use super::cache::CachedResponse;

pub const NOTIFICATION_ICON: &str = "/static/icons/icon-192x192.png";
pub const NOTIFICATION_BADGE: &str = "/static/icons/icon-72x72.png";

/// How the worker answers an intercepted fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchReply {
    /// Let the browser perform the request itself.
    Passthrough,
    /// Serve this captured response.
    Response(CachedResponse),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSpec {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub primary_key: Option<u64>,
    pub actions: Vec<NotificationAction>,
}

impl NotificationSpec {
    /// The standard shape for incoming push messages.
    #[must_use]
    pub fn for_push(title: String, body: String, primary_key: Option<u64>) -> Self {
        Self {
            title,
            body,
            icon: NOTIFICATION_ICON.to_string(),
            badge: NOTIFICATION_BADGE.to_string(),
            vibrate: vec![100, 50, 100],
            primary_key,
            actions: vec![
                NotificationAction {
                    action: "explore".to_string(),
                    title: "View photos".to_string(),
                    icon: NOTIFICATION_ICON.to_string(),
                },
                NotificationAction {
                    action: "close".to_string(),
                    title: "Close".to_string(),
                    icon: NOTIFICATION_ICON.to_string(),
                },
            ],
        }
    }
}

/// Fire-and-forget instructions to the hosting shell. None of these produce
/// a response, so they travel over `notify_shell`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "data")]
pub enum PlatformOperation {
    /// Resolve an intercepted fetch held open by the worker shell.
    CompleteFetch { request_id: u64, reply: FetchReply },
    SkipWaiting,
    ClaimClients,
    /// Answer a `GET_VERSION` message over the client's reply port.
    PostVersion { port: u64, version: String },
    ShowNotification(NotificationSpec),
    OpenWindow { url: String },
    ReloadPage,
    /// Push a history entry so the hardware back button stays trapped.
    PushHistoryState,
    FocusSearchField,
    TriggerPhotoUpload,
}

impl Operation for PlatformOperation {
    type Output = ();
}

pub struct Platform<Ev> {
    context: CapabilityContext<PlatformOperation, Ev>,
}

impl<Ev> Capability<Ev> for Platform<Ev> {
    type Operation = PlatformOperation;
    type MappedSelf<MappedEv> = Platform<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Platform::new(self.context.map_event(f))
    }
}

impl<Ev> Platform<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<PlatformOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn complete_fetch(&self, request_id: u64, reply: FetchReply) {
        self.notify(PlatformOperation::CompleteFetch { request_id, reply });
    }

    pub fn skip_waiting(&self) {
        self.notify(PlatformOperation::SkipWaiting);
    }

    pub fn claim_clients(&self) {
        self.notify(PlatformOperation::ClaimClients);
    }

    pub fn post_version(&self, port: u64, version: impl Into<String>) {
        self.notify(PlatformOperation::PostVersion {
            port,
            version: version.into(),
        });
    }

    pub fn show_notification(&self, spec: NotificationSpec) {
        self.notify(PlatformOperation::ShowNotification(spec));
    }

    pub fn open_window(&self, url: impl Into<String>) {
        self.notify(PlatformOperation::OpenWindow { url: url.into() });
    }

    pub fn reload_page(&self) {
        self.notify(PlatformOperation::ReloadPage);
    }

    pub fn push_history_state(&self) {
        self.notify(PlatformOperation::PushHistoryState);
    }

    pub fn focus_search_field(&self) {
        self.notify(PlatformOperation::FocusSearchField);
    }

    pub fn trigger_photo_upload(&self) {
        self.notify(PlatformOperation::TriggerPhotoUpload);
    }

    fn notify(&self, operation: PlatformOperation) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.notify_shell(operation).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_notification_shape() {
        let spec = NotificationSpec::for_push("New photo".into(), "Ana shared a photo".into(), Some(7));
        assert_eq!(spec.icon, NOTIFICATION_ICON);
        assert_eq!(spec.badge, NOTIFICATION_BADGE);
        assert_eq!(spec.vibrate, vec![100, 50, 100]);
        assert_eq!(spec.actions.len(), 2);
        assert_eq!(spec.actions[0].action, "explore");
        assert_eq!(spec.actions[1].action, "close");
        assert_eq!(spec.primary_key, Some(7));
    }

    #[test]
    fn operation_round_trips_through_serde() {
        let op = PlatformOperation::PostVersion {
            port: 3,
            version: "fotos-familia-v1.0.0".into(),
        };
        let json = serde_json::to_string(&op).unwrap();
        let back: PlatformOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);
    }
}
