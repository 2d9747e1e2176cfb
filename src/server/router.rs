use axum::http::{request, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Build the application router with CORS and request tracing.
pub fn router(state: Arc<AppState>, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/tarot", post(handlers::tarot))
        .layer(build_cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let patterns: Arc<[String]> = origins.iter().cloned().collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &request::Parts| {
                origin
                    .to_str()
                    .map(|o| patterns.iter().any(|p| origin_matches(p, o)))
                    .unwrap_or(false)
            },
        ))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// `pattern` is an exact origin, `*`, or `scheme://*.suffix`.
pub fn origin_matches(pattern: &str, origin: &str) -> bool {
    if pattern == "*" || pattern == origin {
        return true;
    }
    let Some((scheme, host_pattern)) = pattern.split_once("://") else {
        return false;
    };
    let Some(suffix) = host_pattern.strip_prefix("*.") else {
        return false;
    };
    let Some(host) = origin.strip_prefix(scheme).and_then(|r| r.strip_prefix("://")) else {
        return false;
    };
    host.strip_suffix(suffix)
        .and_then(|sub| sub.strip_suffix('.'))
        .is_some_and(|sub| !sub.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_origin_matches() {
        assert!(origin_matches("http://localhost:3000", "http://localhost:3000"));
        assert!(!origin_matches("http://localhost:3000", "http://localhost:3001"));
    }

    #[test]
    fn wildcard_subdomain_matches() {
        assert!(origin_matches("https://*.vercel.app", "https://tarot.vercel.app"));
        assert!(origin_matches("https://*.vercel.app", "https://a.b.vercel.app"));
        assert!(!origin_matches("https://*.vercel.app", "https://vercel.app"));
        assert!(!origin_matches("https://*.vercel.app", "http://tarot.vercel.app"));
        assert!(!origin_matches("https://*.vercel.app", "https://evilvercel.app"));
    }

    #[test]
    fn star_matches_anything() {
        assert!(origin_matches("*", "https://example.com"));
    }
}
