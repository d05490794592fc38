//! The worker core: service-worker lifecycle and the offline cache router.

use std::collections::HashMap;

use crux_core::render::Render;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::capabilities::cache::{CacheOutput, CacheResult, CachedResponse};
use crate::capabilities::http::{HttpRequest, HttpResult};
use crate::capabilities::platform::NotificationSpec;
use crate::capabilities::{Caches, FetchReply, Http, Platform};

use super::fallback;
use super::routes::{
    self, app_version, current_cache_names, dynamic_cache_name, install_manifest,
    static_cache_name, Environment, FetchRequest, RouteDecision,
};

/// Messages clients post to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
    #[serde(rename = "GET_VERSION")]
    GetVersion { port: u64 },
}

/// Payload of an incoming push message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default, rename = "primaryKey")]
    pub primary_key: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationAction {
    Explore,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerEvent {
    Started { host: String },

    // Lifecycle
    InstallRequested,
    PrecacheCompleted { result: CacheResult },
    ActivateRequested,
    CacheNamesListed { result: CacheResult },
    StaleCacheDeleted { name: String, result: CacheResult },

    // Fetch routing
    FetchRequested { request_id: u64, request: FetchRequest },
    CacheLookupCompleted { request_id: u64, result: CacheResult },
    NetworkFetchCompleted { request_id: u64, result: Box<HttpResult> },
    CacheWriteCompleted { url: String, result: CacheResult },

    // Control
    MessageReceived(ClientMessage),
    PushReceived(PushPayload),
    NotificationClicked { action: Option<NotificationAction> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Lifecycle {
    #[default]
    Parked,
    Installing,
    Installed,
    Activating,
    Active,
}

/// Where an in-flight fetch currently waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum FetchPhase {
    AwaitingCache,
    AwaitingNetwork,
    /// Network-first request failed; trying the dynamic cache before the
    /// offline page.
    AwaitingCacheFallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct InFlightFetch {
    request: FetchRequest,
    decision: RouteDecision,
    phase: FetchPhase,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterStats {
    pub served_from_cache: u64,
    pub served_from_network: u64,
    pub passthroughs: u64,
    pub fallbacks: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerModel {
    pub host: String,
    pub environment: Option<Environment>,
    pub lifecycle: Lifecycle,
    in_flight: HashMap<u64, InFlightFetch>,
    pending_deletes: usize,
    pub stats: RouterStats,
}

impl WorkerModel {
    fn environment(&self) -> Environment {
        self.environment.unwrap_or(Environment::Production)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerViewModel {
    pub lifecycle: Lifecycle,
    pub version: String,
    pub in_flight: usize,
    pub stats: RouterStats,
}

#[derive(crux_core::macros::Effect)]
#[effect(name = "WorkerEffect", app = "WorkerApp")]
pub struct WorkerCapabilities {
    pub render: Render<WorkerEvent>,
    pub http: Http<WorkerEvent>,
    pub caches: Caches<WorkerEvent>,
    pub platform: Platform<WorkerEvent>,
}

#[derive(Default)]
pub struct WorkerApp;

impl crux_core::App for WorkerApp {
    type Event = WorkerEvent;
    type Model = WorkerModel;
    type ViewModel = WorkerViewModel;
    type Capabilities = WorkerCapabilities;

    fn update(&self, event: WorkerEvent, model: &mut WorkerModel, caps: &WorkerCapabilities) {
        match event {
            WorkerEvent::Started { host } => {
                model.environment = Some(Environment::from_host(&host));
                model.host = host;
            }

            WorkerEvent::InstallRequested => {
                model.lifecycle = Lifecycle::Installing;
                let manifest = install_manifest(model.environment());
                debug!(urls = manifest.len(), "precaching static assets");
                caps.caches.add_all(static_cache_name(), manifest, |result| {
                    WorkerEvent::PrecacheCompleted { result }
                });
            }

            WorkerEvent::PrecacheCompleted { result } => {
                match result {
                    Ok(CacheOutput::Precached { failed }) if failed.is_empty() => {
                        debug!("precache complete");
                    }
                    Ok(CacheOutput::Precached { failed }) => {
                        // Install proceeds; the misses will be filled on
                        // first fetch.
                        warn!(failed = failed.len(), "some assets failed to precache");
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!("precache failed entirely: {err}");
                    }
                }
                model.lifecycle = Lifecycle::Installed;
                caps.platform.skip_waiting();
            }

            WorkerEvent::ActivateRequested => {
                model.lifecycle = Lifecycle::Activating;
                caps.caches
                    .list_names(|result| WorkerEvent::CacheNamesListed { result });
            }

            WorkerEvent::CacheNamesListed { result } => {
                let names = match result {
                    Ok(CacheOutput::Names(names)) => names,
                    Ok(_) => Vec::new(),
                    Err(err) => {
                        warn!("could not list caches: {err}");
                        Vec::new()
                    }
                };
                let current = current_cache_names();
                let stale: Vec<String> = names
                    .into_iter()
                    .filter(|name| !current.contains(name))
                    .collect();
                model.pending_deletes = stale.len();
                if stale.is_empty() {
                    model.lifecycle = Lifecycle::Active;
                    caps.platform.claim_clients();
                } else {
                    for name in stale {
                        let cache = crate::capabilities::cache::CacheName::from_const(&name);
                        let deleted_name = name.clone();
                        caps.caches.delete(cache, move |result| {
                            WorkerEvent::StaleCacheDeleted {
                                name: deleted_name,
                                result,
                            }
                        });
                    }
                }
            }

            WorkerEvent::StaleCacheDeleted { name, result } => {
                match result {
                    Ok(CacheOutput::Deleted(true)) => debug!(%name, "stale cache removed"),
                    Ok(_) => {}
                    Err(err) => warn!(%name, "stale cache delete failed: {err}"),
                }
                model.pending_deletes = model.pending_deletes.saturating_sub(1);
                if model.pending_deletes == 0 && model.lifecycle == Lifecycle::Activating {
                    model.lifecycle = Lifecycle::Active;
                    caps.platform.claim_clients();
                }
            }

            WorkerEvent::FetchRequested { request_id, request } => {
                let decision = routes::route(&request, model.environment(), &model.host);
                debug!(request_id, url = %request.url, ?decision, "routing fetch");
                match decision {
                    RouteDecision::Passthrough => {
                        model.stats.passthroughs += 1;
                        caps.platform.complete_fetch(request_id, FetchReply::Passthrough);
                    }
                    RouteDecision::StaticCacheFirst | RouteDecision::ImageCacheFirst => {
                        let cache = if decision == RouteDecision::StaticCacheFirst {
                            static_cache_name()
                        } else {
                            dynamic_cache_name()
                        };
                        let url = request.url.clone();
                        model.in_flight.insert(
                            request_id,
                            InFlightFetch {
                                request,
                                decision,
                                phase: FetchPhase::AwaitingCache,
                            },
                        );
                        caps.caches.match_url(cache, url, move |result| {
                            WorkerEvent::CacheLookupCompleted { request_id, result }
                        });
                    }
                    RouteDecision::PageNetworkFirst => {
                        let url = request.url.clone();
                        model.in_flight.insert(
                            request_id,
                            InFlightFetch {
                                request,
                                decision,
                                phase: FetchPhase::AwaitingNetwork,
                            },
                        );
                        self.fetch_from_network(request_id, &url, model, caps);
                    }
                }
            }

            WorkerEvent::CacheLookupCompleted { request_id, result } => {
                let Some(entry) = model.in_flight.get(&request_id).cloned() else {
                    return;
                };
                let hit = match result {
                    Ok(CacheOutput::Matched(found)) => found,
                    Ok(_) => None,
                    Err(err) => {
                        warn!(request_id, "cache lookup failed: {err}");
                        None
                    }
                };

                match (entry.phase, hit) {
                    (_, Some(response)) => {
                        model.stats.served_from_cache += 1;
                        model.in_flight.remove(&request_id);
                        caps.platform
                            .complete_fetch(request_id, FetchReply::Response(response));
                    }
                    (FetchPhase::AwaitingCache, None) => {
                        if let Some(entry) = model.in_flight.get_mut(&request_id) {
                            entry.phase = FetchPhase::AwaitingNetwork;
                        }
                        self.fetch_from_network(request_id, &entry.request.url, model, caps);
                    }
                    (FetchPhase::AwaitingCacheFallback, None) => {
                        model.stats.fallbacks += 1;
                        model.in_flight.remove(&request_id);
                        caps.platform.complete_fetch(
                            request_id,
                            FetchReply::Response(fallback::offline_page_response()),
                        );
                    }
                    (FetchPhase::AwaitingNetwork, None) => {
                        // A lookup reply in the network phase means events
                        // crossed; drop it and let the network reply settle.
                        debug!(request_id, "out-of-order cache reply ignored");
                    }
                }
            }

            WorkerEvent::NetworkFetchCompleted { request_id, result } => {
                let Some(entry) = model.in_flight.get(&request_id).cloned() else {
                    return;
                };

                match *result {
                    Ok(output) => {
                        let response = CachedResponse::from(output);
                        if response.is_success() {
                            let cache = match entry.decision {
                                RouteDecision::StaticCacheFirst => static_cache_name(),
                                _ => dynamic_cache_name(),
                            };
                            let url = entry.request.url.clone();
                            let written_url = url.clone();
                            caps.caches.put(cache, url, response.clone(), move |result| {
                                WorkerEvent::CacheWriteCompleted {
                                    url: written_url,
                                    result,
                                }
                            });
                        }
                        model.stats.served_from_network += 1;
                        model.in_flight.remove(&request_id);
                        caps.platform
                            .complete_fetch(request_id, FetchReply::Response(response));
                    }
                    Err(err) => {
                        debug!(request_id, "network fetch failed: {err}");
                        match entry.decision {
                            RouteDecision::PageNetworkFirst => {
                                if let Some(entry) = model.in_flight.get_mut(&request_id) {
                                    entry.phase = FetchPhase::AwaitingCacheFallback;
                                }
                                caps.caches.match_url(
                                    dynamic_cache_name(),
                                    entry.request.url.clone(),
                                    move |result| WorkerEvent::CacheLookupCompleted {
                                        request_id,
                                        result,
                                    },
                                );
                            }
                            RouteDecision::ImageCacheFirst => {
                                model.stats.fallbacks += 1;
                                model.in_flight.remove(&request_id);
                                caps.platform.complete_fetch(
                                    request_id,
                                    FetchReply::Response(fallback::offline_image_response()),
                                );
                            }
                            RouteDecision::StaticCacheFirst | RouteDecision::Passthrough => {
                                model.stats.fallbacks += 1;
                                model.in_flight.remove(&request_id);
                                caps.platform.complete_fetch(
                                    request_id,
                                    FetchReply::Response(fallback::unavailable_response()),
                                );
                            }
                        }
                    }
                }
            }

            WorkerEvent::CacheWriteCompleted { url, result } => {
                if let Err(err) = result {
                    warn!(%url, "cache write failed: {err}");
                }
            }

            WorkerEvent::MessageReceived(message) => match message {
                ClientMessage::SkipWaiting => caps.platform.skip_waiting(),
                ClientMessage::GetVersion { port } => {
                    caps.platform.post_version(port, app_version());
                }
            },

            WorkerEvent::PushReceived(payload) => {
                let title = payload.title.unwrap_or_else(|| "Family Photos".to_string());
                let body = payload
                    .body
                    .unwrap_or_else(|| "Something new in your family album".to_string());
                caps.platform
                    .show_notification(NotificationSpec::for_push(title, body, payload.primary_key));
            }

            WorkerEvent::NotificationClicked { action } => match action {
                Some(NotificationAction::Explore) => caps.platform.open_window("/selector_fotos"),
                Some(NotificationAction::Close) => {}
                None => caps.platform.open_window("/"),
            },
        }

        caps.render.render();
    }

    fn view(&self, model: &WorkerModel) -> WorkerViewModel {
        WorkerViewModel {
            lifecycle: model.lifecycle,
            version: app_version(),
            in_flight: model.in_flight.len(),
            stats: model.stats,
        }
    }
}

impl WorkerApp {
    fn fetch_from_network(
        &self,
        request_id: u64,
        url: &str,
        model: &mut WorkerModel,
        caps: &WorkerCapabilities,
    ) {
        match HttpRequest::get(url) {
            Ok(request) => {
                caps.http.send(request, move |result| {
                    WorkerEvent::NetworkFetchCompleted {
                        request_id,
                        result: Box::new(result),
                    }
                });
            }
            Err(err) => {
                warn!(request_id, "unroutable URL: {err}");
                model.in_flight.remove(&request_id);
                model.stats.passthroughs += 1;
                caps.platform.complete_fetch(request_id, FetchReply::Passthrough);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_from_the_wire_shape() {
        let skip: ClientMessage = serde_json::from_str(r#"{"type":"SKIP_WAITING"}"#).unwrap();
        assert_eq!(skip, ClientMessage::SkipWaiting);

        let version: ClientMessage =
            serde_json::from_str(r#"{"type":"GET_VERSION","port":2}"#).unwrap();
        assert_eq!(version, ClientMessage::GetVersion { port: 2 });
    }

    #[test]
    fn push_payload_tolerates_missing_fields() {
        let payload: PushPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(payload.title, None);
        assert_eq!(payload.primary_key, None);

        let payload: PushPayload =
            serde_json::from_str(r#"{"title":"New photo","body":"From Ana","primaryKey":9}"#)
                .unwrap();
        assert_eq!(payload.primary_key, Some(9));
    }
}
