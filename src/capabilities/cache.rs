use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::http::HttpOutput;

pub const MAX_CACHE_NAME_LENGTH: usize = 128;

/// A validated cache namespace identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheName(String);

impl CacheName {
    pub fn new(name: impl Into<String>) -> Result<Self, CacheError> {
        let name = name.into();
        if name.is_empty() || name.len() > MAX_CACHE_NAME_LENGTH {
            return Err(CacheError::InvalidName { name });
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        {
            return Err(CacheError::InvalidName { name });
        }
        Ok(Self(name))
    }

    /// For compile-time constant names already known to satisfy `new`.
    /// Falls back to a sanitized form rather than failing.
    #[must_use]
    pub(crate) fn from_const(name: &str) -> Self {
        match Self::new(name) {
            Ok(valid) => valid,
            Err(_) => Self(
                name.chars()
                    .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
                    .take(MAX_CACHE_NAME_LENGTH)
                    .collect(),
            ),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A captured response suitable for storing in or serving from a cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl From<HttpOutput> for CachedResponse {
    fn from(output: HttpOutput) -> Self {
        Self {
            status: output.status,
            headers: output.headers,
            body: output.body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "data")]
pub enum CacheOperation {
    /// Fetch and store every URL in one batch (install-time precache).
    AddAll { cache: CacheName, urls: Vec<String> },
    Match { cache: CacheName, url: String },
    Put {
        cache: CacheName,
        url: String,
        response: CachedResponse,
    },
    Delete { cache: CacheName },
    ListNames,
}

impl Operation for CacheOperation {
    type Output = CacheResult;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum CacheOutput {
    /// URLs that could not be fetched during `AddAll`; empty means all stored.
    Precached { failed: Vec<String> },
    Matched(Option<CachedResponse>),
    Stored,
    Deleted(bool),
    Names(Vec<String>),
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum CacheError {
    #[error("invalid cache name: {name}")]
    InvalidName { name: String },

    #[error("cache storage unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("cache storage quota exceeded")]
    QuotaExceeded,

    #[error("cache operation failed: {message}")]
    Failed { message: String },
}

pub type CacheResult = Result<CacheOutput, CacheError>;

pub struct Caches<Ev> {
    context: CapabilityContext<CacheOperation, Ev>,
}

impl<Ev> Capability<Ev> for Caches<Ev> {
    type Operation = CacheOperation;
    type MappedSelf<MappedEv> = Caches<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Caches::new(self.context.map_event(f))
    }
}

impl<Ev> Caches<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<CacheOperation, Ev>) -> Self {
        Self { context }
    }

    pub fn add_all<F>(&self, cache: CacheName, urls: Vec<String>, make_event: F)
    where
        F: FnOnce(CacheResult) -> Ev + Send + 'static,
    {
        self.request(CacheOperation::AddAll { cache, urls }, make_event);
    }

    pub fn match_url<F>(&self, cache: CacheName, url: impl Into<String>, make_event: F)
    where
        F: FnOnce(CacheResult) -> Ev + Send + 'static,
    {
        self.request(
            CacheOperation::Match {
                cache,
                url: url.into(),
            },
            make_event,
        );
    }

    pub fn put<F>(
        &self,
        cache: CacheName,
        url: impl Into<String>,
        response: CachedResponse,
        make_event: F,
    ) where
        F: FnOnce(CacheResult) -> Ev + Send + 'static,
    {
        self.request(
            CacheOperation::Put {
                cache,
                url: url.into(),
                response,
            },
            make_event,
        );
    }

    pub fn delete<F>(&self, cache: CacheName, make_event: F)
    where
        F: FnOnce(CacheResult) -> Ev + Send + 'static,
    {
        self.request(CacheOperation::Delete { cache }, make_event);
    }

    pub fn list_names<F>(&self, make_event: F)
    where
        F: FnOnce(CacheResult) -> Ev + Send + 'static,
    {
        self.request(CacheOperation::ListNames, make_event);
    }

    fn request<F>(&self, operation: CacheOperation, make_event: F)
    where
        F: FnOnce(CacheResult) -> Ev + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let result = context.request_from_shell(operation).await;
            context.update_app(make_event(result));
        });
    }
}
