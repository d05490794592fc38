//! Service-worker core: lifecycle, fetch routing, and cache maintenance.

pub mod app;
pub mod fallback;
pub mod routes;

pub use app::{
    ClientMessage, Lifecycle, NotificationAction, PushPayload, RouterStats, WorkerApp,
    WorkerCapabilities, WorkerEffect, WorkerEvent, WorkerModel, WorkerViewModel,
};
pub use routes::{
    route, Destination, Environment, FetchRequest, RouteDecision, CACHE_VERSION,
};
