//! Custom capabilities shared by the page core and the worker core.
//!
//! Each capability is a typed request surface: the core emits an operation,
//! the shell performs the side effect and (for request/response operations)
//! resolves it with the declared output.

pub mod cache;
pub mod delay;
pub mod http;
pub mod platform;

pub use cache::{CacheName, CacheOperation, CacheOutput, CacheResult, CachedResponse, Caches};
pub use delay::{Delay, DelayOperation};
pub use http::{
    Http, HttpError, HttpMethod, HttpOperation, HttpOutput, HttpRequest, HttpResult, RequestUrl,
};
pub use platform::{
    FetchReply, NotificationAction, NotificationSpec, Platform, PlatformOperation,
};
