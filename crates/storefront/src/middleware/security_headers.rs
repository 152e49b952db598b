//! Response hardening for the storefront.
//!
//! Pages and the JSON API share one locked-down header set. Only caching
//! differs: cart, session and order responses must never be stored, while
//! files under `/static` may be cached briefly.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, header},
    middleware::Next,
    response::Response,
};

/// Scripts, styles and fetches are same-origin (`cart.js` calls `/api`).
/// Product images may come from any HTTPS host.
const CONTENT_SECURITY_POLICY: &str = "default-src 'none'; \
     script-src 'self'; \
     style-src 'self'; \
     img-src 'self' https:; \
     connect-src 'self'; \
     object-src 'none'; \
     base-uri 'self'; \
     form-action 'self'; \
     frame-ancestors 'none'";

/// Browser features the storefront never needs, payment included: checkout
/// is a plain form post.
const PERMISSIONS_POLICY: &str = "camera=(), geolocation=(), microphone=(), payment=(), \
     usb=(), interest-cohort=(), browsing-topics=()";

const STATIC_CACHE: &str = "public, max-age=3600";
const NO_STORE: &str = "no-store";

/// Headers added to every response.
const HARDENING: [(&str, &str); 7] = [
    ("content-security-policy", CONTENT_SECURITY_POLICY),
    ("permissions-policy", PERMISSIONS_POLICY),
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "same-origin"),
    ("cross-origin-opener-policy", "same-origin"),
    // Catalog images are served from CDNs without CORP headers
    ("cross-origin-embedder-policy", "credentialless"),
];

/// `Cache-Control` for a request path.
fn cache_policy(path: &str) -> &'static str {
    if path.starts_with("/static/") {
        STATIC_CACHE
    } else {
        NO_STORE
    }
}

/// Add the hardening headers and a path-dependent `Cache-Control`.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let cache = cache_policy(request.uri().path());
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in HARDENING {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache));

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_static_files_are_cacheable() {
        assert_eq!(cache_policy("/static/app.css"), STATIC_CACHE);
        assert_eq!(cache_policy("/api/cart"), NO_STORE);
        assert_eq!(cache_policy("/cart"), NO_STORE);
        assert_eq!(cache_policy("/staticky"), NO_STORE);
    }

    #[test]
    fn test_header_values_are_valid() {
        for (name, value) in HARDENING {
            assert!(HeaderName::from_bytes(name.as_bytes()).is_ok(), "{name}");
            assert!(HeaderValue::from_str(value).is_ok(), "{name}");
        }
    }
}
