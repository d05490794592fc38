//! Synthesized responses served when both the network and the caches fail.

use crate::capabilities::cache::CachedResponse;

/// Self-contained offline page: inline styles only, no external fetches.
const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Family Photos - Offline</title>
<style>
body { font-family: system-ui, sans-serif; background: #f8f9fa; color: #212529;
       display: flex; align-items: center; justify-content: center;
       min-height: 100vh; margin: 0; text-align: center; }
.card { padding: 2rem; max-width: 22rem; }
h1 { font-size: 1.5rem; }
p { color: #6c757d; }
button { background: #0d6efd; color: #fff; border: 0; border-radius: .375rem;
         padding: .5rem 1.25rem; font-size: 1rem; cursor: pointer; }
</style>
</head>
<body>
<div class="card">
<h1>You are offline</h1>
<p>This page is not available right now. Check your connection and try again.</p>
<button onclick="location.reload()">Retry</button>
</div>
</body>
</html>
"#;

/// Grey placeholder shown where a photo could not be loaded.
const OFFLINE_IMAGE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="300" viewBox="0 0 400 300">
<rect width="400" height="300" fill="#e9ecef"/>
<g fill="#adb5bd">
<circle cx="200" cy="120" r="36"/>
<path d="M120 230 l60 -60 40 40 30 -30 60 60 z"/>
</g>
<text x="200" y="270" font-family="sans-serif" font-size="16" fill="#6c757d" text-anchor="middle">Image unavailable offline</text>
</svg>
"##;

/// Served (status 200) when a page is unreachable and not cached.
#[must_use]
pub fn offline_page_response() -> CachedResponse {
    CachedResponse {
        status: 200,
        headers: vec![
            ("Content-Type".to_string(), "text/html; charset=utf-8".to_string()),
            ("Cache-Control".to_string(), "no-store".to_string()),
        ],
        body: OFFLINE_PAGE.as_bytes().to_vec(),
    }
}

/// Served when an image is unreachable and not cached.
#[must_use]
pub fn offline_image_response() -> CachedResponse {
    CachedResponse {
        status: 200,
        headers: vec![
            ("Content-Type".to_string(), "image/svg+xml".to_string()),
            ("Cache-Control".to_string(), "no-store".to_string()),
        ],
        body: OFFLINE_IMAGE.as_bytes().to_vec(),
    }
}

/// Served when a static asset is unreachable and not cached. Unlike pages
/// there is nothing sensible to render, so this is an honest 503.
#[must_use]
pub fn unavailable_response() -> CachedResponse {
    CachedResponse {
        status: 503,
        headers: vec![
            ("Content-Type".to_string(), "text/plain; charset=utf-8".to_string()),
            ("Cache-Control".to_string(), "no-store".to_string()),
        ],
        body: b"Service unavailable while offline".to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_page_is_self_contained_html() {
        let response = offline_page_response();
        assert_eq!(response.status, 200);
        let body = String::from_utf8(response.body).unwrap();
        assert!(body.contains("You are offline"));
        // no external fetches from the fallback page
        assert!(!body.contains("http://"));
        assert!(!body.contains("https://"));
        assert!(response
            .headers
            .iter()
            .any(|(n, v)| n == "Content-Type" && v.starts_with("text/html")));
    }

    #[test]
    fn offline_image_is_svg() {
        let response = offline_image_response();
        assert_eq!(response.status, 200);
        assert!(response.body.starts_with(b"<svg"));
        assert!(response
            .headers
            .iter()
            .any(|(n, v)| n == "Content-Type" && v == "image/svg+xml"));
    }

    #[test]
    fn offline_image_keeps_its_full_markup() {
        let body = String::from_utf8(offline_image_response().body).unwrap();
        assert!(body.contains(r##"fill="#e9ecef""##));
        assert!(body.contains(r##"fill="#adb5bd""##));
        assert!(body.contains("Image unavailable offline"));
        assert!(body.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn static_fallback_is_a_503() {
        let response = unavailable_response();
        assert_eq!(response.status, 503);
        assert!(!response.is_success());
    }

    #[test]
    fn fallbacks_are_never_cacheable() {
        for response in [
            offline_page_response(),
            offline_image_response(),
            unavailable_response(),
        ] {
            assert!(response
                .headers
                .iter()
                .any(|(n, v)| n == "Cache-Control" && v == "no-store"));
        }
    }
}
