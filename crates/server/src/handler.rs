//! HTTP front end.
//!
//! Every request, whatever its method or path, is converted into a
//! `ProxyRequest` and handed to the dispatcher. Origin-form targets are
//! resolved against the configured origin; absolute-form targets (forward
//! proxy requests) are kept as-is.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::{Request, State},
    http::header,
    response::Response,
};
use waypost_client::fetch::{is_hop_by_hop, resolve};
use waypost_client::{Dispatcher, ProxyRequest, ProxyResponse, Route};

use crate::error::ProxyError;

#[derive(Clone)]
struct ProxyState {
    dispatcher: Arc<Dispatcher>,
    max_body_bytes: usize,
}

/// Router that sends every request through the dispatcher.
pub fn router(dispatcher: Arc<Dispatcher>, max_body_bytes: usize) -> Router {
    Router::new()
        .fallback(proxy)
        .with_state(ProxyState { dispatcher, max_body_bytes })
}

async fn proxy(State(state): State<ProxyState>, request: Request) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    let target = parts.uri.to_string();
    let url = resolve(state.dispatcher.origin(), &target).map_err(|e| ProxyError::InvalidRequest(e.to_string()))?;
    let body = to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| ProxyError::InvalidRequest(format!("failed to read request body: {e}")))?;

    let request = ProxyRequest::new(parts.method, url)
        .with_headers(parts.headers)
        .with_body(body);

    let dispatched = state.dispatcher.dispatch(request).await?;
    let route = match dispatched.route {
        Route::Intercepted(category) => category.as_str(),
        Route::Passthrough => "passthrough",
    };
    tracing::debug!(
        route,
        source = dispatched.response.source.as_str(),
        status = dispatched.response.status.as_u16(),
        "responded"
    );

    Ok(into_response(dispatched.response))
}

/// Relay a response, dropping hop-by-hop headers and letting the server
/// recompute the body length.
fn into_response(response: ProxyResponse) -> Response {
    let mut headers = response.headers;
    let drop: Vec<_> = headers
        .keys()
        .filter(|name| is_hop_by_hop(name) || **name == header::CONTENT_LENGTH)
        .cloned()
        .collect();
    for name in drop {
        headers.remove(name);
    }

    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = response.status;
    *out.headers_mut() = headers;
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use tower::ServiceExt;
    use waypost_client::{Backends, FetchClient, FetchConfig, Phase};
    use waypost_core::{AppConfig, CacheDb, CacheKey, CacheStore};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::app::App;

    struct Harness {
        app: App,
        store: CacheDb,
        router: Router,
    }

    async fn harness(origin: &str, manifest: &[&str]) -> Harness {
        let config = AppConfig {
            origin: origin.to_string(),
            precache_manifest: manifest.iter().map(|p| p.to_string()).collect(),
            timeout_ms: 500,
            ..Default::default()
        };
        let store = CacheDb::open_in_memory().await.unwrap();
        let network = FetchClient::new(FetchConfig::from(&config)).unwrap();
        let app = App::from_config(&config, Backends::new(Arc::new(store.clone()), Arc::new(network))).unwrap();
        app.start().await.unwrap();
        let router = router(app.dispatcher(), config.max_bytes);
        Harness { app, store, router }
    }

    async fn send(router: &Router, method: Method, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
        let request = axum::http::Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        relay(router, request).await
    }

    async fn relay(router: &Router, request: Request) -> (StatusCode, axum::http::HeaderMap, String) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    fn key(server: &MockServer, path: &str) -> CacheKey {
        CacheKey::get(format!("{}{}", server.uri(), path))
    }

    fn closed_origin() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_boot_precaches_and_activates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/static/css/style.css"))
            .respond_with(ResponseTemplate::new(200).set_body_string("body{}"))
            .mount(&server)
            .await;

        let h = harness(&server.uri(), &["/static/css/style.css", "/offline/"]).await;

        assert_eq!(h.app.lifecycle().phase(), Phase::Active);
        assert_eq!(h.store.list_keys("waypost-static-v1").await.unwrap(), vec![key(&server, "/static/css/style.css")]);
    }

    #[tokio::test]
    async fn test_static_asset_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/static/img/logo.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("PNG")
                    .insert_header("content-type", "image/png"),
            )
            .mount(&server)
            .await;

        let h = harness(&server.uri(), &[]).await;

        let (status, headers, body) = send(&h.router, Method::GET, "/static/img/logo.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(body, "PNG");

        server.reset().await;

        let (status, _, body) = send(&h.router, Method::GET, "/static/img/logo.png").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "PNG");
    }

    #[tokio::test]
    async fn test_api_falls_back_to_stored_copy_then_503() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cart"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"items":2}"#))
            .mount(&server)
            .await;

        let h = harness(&server.uri(), &[]).await;

        let (status, _, body) = send(&h.router, Method::GET, "/api/cart").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"items":2}"#);

        server.reset().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(2)))
            .mount(&server)
            .await;

        let (status, _, body) = send(&h.router, Method::GET, "/api/cart").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"items":2}"#);

        let (status, headers, body) = send(&h.router, Method::GET, "/api/orders").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(body, "You are offline. Please try again later.");
    }

    #[tokio::test]
    async fn test_upstream_error_status_relayed_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cart"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let h = harness(&server.uri(), &[]).await;

        let (status, _, body) = send(&h.router, Method::GET, "/api/cart").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, "boom");
        assert!(h.store.get_entry(&key(&server, "/api/cart"), None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_post_is_passed_through_uncached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cart"))
            .respond_with(ResponseTemplate::new(201).set_body_string("created"))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&server.uri(), &[]).await;

        let (status, _, body) = send(&h.router, Method::POST, "/api/cart").await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, "created");
        assert!(h.store.names().await.unwrap().iter().all(|g| g.as_str() != "waypost-dynamic-v1"));
    }

    #[tokio::test]
    async fn test_uncached_asset_with_origin_down_is_bad_gateway() {
        let h = harness(&closed_origin(), &[]).await;

        let (status, headers, _) = send(&h.router, Method::GET, "/static/js/main.js").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[tokio::test]
    async fn test_range_reply_does_not_poison_full_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/static/video.mp4"))
            .and(wiremock::matchers::header_exists("range"))
            .respond_with(ResponseTemplate::new(206).set_body_string("ABCD"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/static/video.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ABCDEFGH"))
            .mount(&server)
            .await;

        let h = harness(&server.uri(), &[]).await;

        let ranged = axum::http::Request::builder()
            .uri("/static/video.mp4")
            .header(header::RANGE, "bytes=0-3")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = relay(&h.router, ranged).await;
        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(body, "ABCD");

        let (status, _, body) = send(&h.router, Method::GET, "/static/video.mp4").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ABCDEFGH");
    }

    #[tokio::test]
    async fn test_scheme_relative_path_stays_on_origin() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("from origin"))
            .expect(1)
            .mount(&server)
            .await;

        let h = harness(&server.uri(), &[]).await;

        let (status, _, body) = send(&h.router, Method::GET, "//evil.test/static/x.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "from origin");
    }

    #[tokio::test]
    async fn test_absolute_form_to_private_address_is_forbidden() {
        let server = MockServer::start().await;
        let h = harness(&server.uri(), &[]).await;

        let (status, headers, _) = send(&h.router, Method::GET, "http://10.0.0.5/admin").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain; charset=utf-8");

        let (status, _, _) = send(&h.router, Method::GET, &format!("{}/api/cart", closed_origin())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
