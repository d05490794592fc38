//! Pure routing: which caching strategy an intercepted request gets.

use serde::{Deserialize, Serialize};

use crate::capabilities::cache::CacheName;
use crate::capabilities::http::HttpMethod;

/// Bumping this token is the cache invalidation mechanism: activation
/// deletes every namespace carrying an older token.
pub const CACHE_VERSION: &str = "v1.0.0";

pub const APP_NAME: &str = "fotos-familia";

/// Prefixes that must never enter any cache. Auth and session traffic stays
/// strictly network-only.
pub const EXCLUDED_PREFIXES: &[&str] = &["/api/", "/logout", "/auth", "/verify"];

/// Navigable pages served network-first with an offline fallback.
pub const PAGE_ROUTES: &[&str] = &["/", "/dashboard", "/perfil", "/selector_fotos"];

pub const STATIC_PREFIX: &str = "/static/";

/// Third-party assets precached in every environment.
pub const CDN_ASSETS: &[&str] = &[
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css",
    "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/js/bootstrap.bundle.min.js",
    "https://unpkg.com/htmx.org@1.9.10",
    "https://unpkg.com/alpinejs@3.x.x/dist/cdn.min.js",
    "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.0.0-beta3/css/all.min.css",
];

/// First-party shell assets, precached only in production. In development
/// these come from a dev server that rewrites them constantly.
pub const APP_SHELL_ASSETS: &[&str] = &[
    "/",
    "/static/css/styles.css",
    "/static/js/store.js",
    "/static/js/paginacion.js",
    "/static/manifest.json",
    "/static/icons/icon-192x192.png",
    "/static/icons/icon-512x512.png",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn from_host(host: &str) -> Self {
        let host = host.split(':').next().unwrap_or(host);
        if host == "localhost" || host == "127.0.0.1" {
            Self::Development
        } else {
            Self::Production
        }
    }
}

#[must_use]
pub fn static_cache_name() -> CacheName {
    CacheName::from_const(&format!("static-{CACHE_VERSION}"))
}

#[must_use]
pub fn dynamic_cache_name() -> CacheName {
    CacheName::from_const(&format!("dynamic-{CACHE_VERSION}"))
}

/// Identifier reported to `GET_VERSION` clients.
#[must_use]
pub fn app_version() -> String {
    format!("{APP_NAME}-{CACHE_VERSION}")
}

/// Cache namespaces the current worker owns; anything else found at
/// activation is stale.
#[must_use]
pub fn current_cache_names() -> Vec<String> {
    vec![
        static_cache_name().as_str().to_string(),
        dynamic_cache_name().as_str().to_string(),
    ]
}

/// URLs pre-populated into the static cache at install time.
#[must_use]
pub fn install_manifest(env: Environment) -> Vec<String> {
    match env {
        Environment::Development => CDN_ASSETS.iter().map(ToString::to_string).collect(),
        Environment::Production => APP_SHELL_ASSETS
            .iter()
            .chain(CDN_ASSETS)
            .map(ToString::to_string)
            .collect(),
    }
}

/// What kind of resource the request is for, as reported by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Destination {
    Document,
    Style,
    Script,
    Font,
    Image,
    #[default]
    Other,
}

/// An intercepted fetch, reduced to what routing needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub method: HttpMethod,
    pub url: String,
    pub destination: Destination,
}

impl FetchRequest {
    /// Path component if same-origin relative to `origin_host`, else `None`.
    fn same_origin_path<'a>(&'a self, origin_host: &str) -> Option<&'a str> {
        if self.url.starts_with('/') {
            return Some(&self.url);
        }
        let rest = self
            .url
            .strip_prefix("https://")
            .or_else(|| self.url.strip_prefix("http://"))?;
        let (host, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };
        let host = host.split(':').next().unwrap_or(host);
        let origin = origin_host.split(':').next().unwrap_or(origin_host);
        (host.eq_ignore_ascii_case(origin)).then_some(path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteDecision {
    /// Do not intervene; the browser performs the request.
    Passthrough,
    /// Static namespace, serve from cache, fill from network on miss.
    StaticCacheFirst,
    /// Dynamic namespace, prefer fresh content, fall back to cache then to
    /// the offline page.
    PageNetworkFirst,
    /// Dynamic namespace, like static-cache-first but misses degrade to a
    /// placeholder image.
    ImageCacheFirst,
}

fn path_only(path: &str) -> &str {
    match path.find(['?', '#']) {
        Some(idx) => &path[..idx],
        None => path,
    }
}

// Raw prefix match: auth-adjacent paths like "/authstyle.css" or
// "/verify-email.png" stay network-only.
fn is_excluded(path: &str) -> bool {
    let path = path_only(path);
    EXCLUDED_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

fn is_page_route(path: &str) -> bool {
    let path = path_only(path);
    PAGE_ROUTES.iter().any(|route| {
        if *route == "/" {
            path == "/"
        } else {
            path.starts_with(route)
        }
    })
}

/// Decide the strategy for one intercepted request.
#[must_use]
pub fn route(request: &FetchRequest, env: Environment, origin_host: &str) -> RouteDecision {
    if request.method != HttpMethod::Get {
        return RouteDecision::Passthrough;
    }

    let same_origin_path = request.same_origin_path(origin_host);

    // Development: never cache our own churning assets, but keep CDN
    // libraries cached so offline dev still loads the frame.
    if env == Environment::Development {
        return match same_origin_path {
            Some(_) => RouteDecision::Passthrough,
            None => RouteDecision::StaticCacheFirst,
        };
    }

    if let Some(path) = same_origin_path {
        if is_excluded(path) {
            return RouteDecision::Passthrough;
        }
    }

    let is_static_destination = matches!(
        request.destination,
        Destination::Style | Destination::Script | Destination::Font
    );
    let under_static = same_origin_path
        .is_some_and(|path| path_only(path).starts_with(STATIC_PREFIX));
    if is_static_destination || under_static {
        return RouteDecision::StaticCacheFirst;
    }

    if let Some(path) = same_origin_path {
        if is_page_route(path) {
            return RouteDecision::PageNetworkFirst;
        }
    }

    if request.destination == Destination::Image {
        return RouteDecision::ImageCacheFirst;
    }

    RouteDecision::Passthrough
}
