//! Local edge emulator.
//!
//! # Responsibilities
//! - Run the request hook on every viewer request
//! - Forward surviving requests to the origin, stripping query parameters
//!   and cookies the cache policy would not forward
//! - Run the response hook on origin responses
//! - Wire up middleware (tracing, timeout, request ID)

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{
        header,
        uri::{Authority, PathAndQuery, Scheme},
        HeaderValue, Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::bundle::EdgeBundle;
use crate::cache::CachePolicyDescriptor;
use crate::config::PreviewConfig;
use crate::edge::{RequestHandler, RequestOutcome, ResponseHandler};
use crate::observability::metrics::{self, FaultStage};

pub const X_REQUEST_ID: &str = "x-request-id";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid origin '{0}'")]
    InvalidOrigin(String),

    #[error("failed to build origin request: {0}")]
    OriginRequest(#[from] axum::http::Error),

    #[error("origin request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub request: Arc<RequestHandler>,
    pub response: Arc<ResponseHandler>,
    pub cache_policy: Arc<CachePolicyDescriptor>,
    pub origin: Authority,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server emulating the edge in front of an origin.
pub struct EdgeServer {
    router: Router,
}

impl EdgeServer {
    /// Create a server for `bundle`, forwarding to `preview.origin`.
    pub fn new(bundle: EdgeBundle, preview: &PreviewConfig) -> Result<Self, ServerError> {
        let origin: Authority = preview
            .origin
            .parse()
            .map_err(|_| ServerError::InvalidOrigin(preview.origin.clone()))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            request: Arc::new(bundle.request),
            response: Arc::new(bundle.response),
            cache_policy: Arc::new(bundle.cache_policy),
            origin,
            client,
        };

        let router = Self::build_router(preview, state);
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(preview: &PreviewConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(edge_handler))
            .route("/", any(edge_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(preview.request_timeout_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The configured router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` completes.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Edge emulator starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Edge emulator stopped");
        Ok(())
    }
}

/// Request hook → origin fetch → response hook.
async fn edge_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let viewer_path = request.uri().path().to_string();

    let forwarded = match state.request.handle(request) {
        RequestOutcome::Respond(response) => {
            tracing::debug!(request_id = %request_id, path = %viewer_path, status = %response.status(), "Answered at edge");
            return response;
        }
        RequestOutcome::Forward(request) => request,
    };

    tracing::debug!(
        request_id = %request_id,
        viewer_path = %viewer_path,
        origin_path = %forwarded.uri().path(),
        cache_key = %state.cache_policy.cache_key(&forwarded),
        "Forwarding to origin"
    );

    let origin_request = match origin_request(&state, forwarded) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build origin request");
            metrics::record_fault(FaultStage::Origin);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response();
        }
    };

    match state.client.request(origin_request).await {
        Ok(upstream) => {
            metrics::record_origin_response(upstream.status().as_u16());
            let (parts, body) = upstream.into_parts();
            let response = Response::from_parts(parts, Body::new(body));
            state.response.apply(&viewer_path, response)
        }
        Err(e) => {
            let e = ServerError::from(e);
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_origin_response(StatusCode::BAD_GATEWAY.as_u16());
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

/// Point a forwarded request at the origin, applying the cache policy's
/// query string and cookie selectors.
fn origin_request(state: &AppState, request: Request<Body>) -> Result<Request<Body>, ServerError> {
    let (mut parts, body) = request.into_parts();

    let path_and_query = match state.cache_policy.forwarded_query(parts.uri.query()) {
        Some(query) => format!("{}?{}", parts.uri.path(), query),
        None => parts.uri.path().to_string(),
    };

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.origin.clone());
    uri_parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).map_err(axum::http::Error::from)?);
    parts.uri = Uri::from_parts(uri_parts).map_err(axum::http::Error::from)?;

    let cookies = state.cache_policy.forwarded_cookies(&parts.headers);
    parts.headers.remove(header::COOKIE);
    if let Some(cookies) = cookies {
        let value = HeaderValue::from_str(&cookies).map_err(axum::http::Error::from)?;
        parts.headers.insert(header::COOKIE, value);
    }

    Ok(Request::from_parts(parts, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EdgeConfig, RuleConfig};
    use tower::ServiceExt;

    fn server(config: EdgeConfig) -> EdgeServer {
        let bundle = EdgeBundle::compile(&config).unwrap().bundle;
        EdgeServer::new(bundle, &config.preview).unwrap()
    }

    #[tokio::test]
    async fn test_redirect_answered_without_origin() {
        let config = EdgeConfig {
            redirects: vec![RuleConfig::new("/old/:slug", "/new/:slug")],
            ..EdgeConfig::default()
        };
        let response = server(config)
            .router()
            .oneshot(
                Request::builder()
                    .uri("/old/page")
                    .header("host", "site.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "https://site.test/new/page");
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_unreachable_origin_is_bad_gateway() {
        let mut config = EdgeConfig::default();
        config.preview.origin = "127.0.0.1:1".to_string();
        let response = server(config)
            .router()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_origin() {
        let mut preview = PreviewConfig::default();
        preview.origin = "not an origin".to_string();
        assert!(matches!(
            EdgeServer::new(EdgeBundle::compile(&EdgeConfig::default()).unwrap().bundle, &preview),
            Err(ServerError::InvalidOrigin(_))
        ));
    }

    #[test]
    fn test_origin_request_applies_cache_policy() {
        let mut config = EdgeConfig::default();
        config.cache_policy.allow_cookies = vec!["session".to_string()];
        config.cache_policy.deny_query_params = vec!["utm_source".to_string()];
        let bundle = EdgeBundle::compile(&config).unwrap().bundle;
        let state = AppState {
            request: Arc::new(bundle.request),
            response: Arc::new(bundle.response),
            cache_policy: Arc::new(bundle.cache_policy),
            origin: "127.0.0.1:3000".parse().unwrap(),
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
        };

        let request = Request::builder()
            .uri("/docs/index.html?utm_source=x&lang=en")
            .header(header::COOKIE, "theme=dark; session=abc")
            .body(Body::empty())
            .unwrap();
        let forwarded = origin_request(&state, request).unwrap();

        assert_eq!(forwarded.uri().to_string(), "http://127.0.0.1:3000/docs/index.html?lang=en");
        assert_eq!(forwarded.headers()[header::COOKIE], "session=abc");
    }
}
