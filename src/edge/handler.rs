//! The two edge hooks.
//!
//! # Responsibilities
//! - Request hook (before cache lookup): redirect → rewrite → default URI
//! - Response hook (before returning to viewer): header injection
//!
//! # Design Decisions
//! - Each hook owns only the compiled rules it needs; nothing is shared
//!   between them except the viewer path carried on the request
//! - Fail closed: if a redirect or a rewritten URI can't be built, the
//!   request passes through unmodified

use axum::body::Body;
use axum::http::uri::PathAndQuery;
use axum::http::{header, Request, Response, Uri};
use serde::{Deserialize, Serialize};

use crate::config::EdgeConfig;
use crate::edge::headers::HeaderInjector;
use crate::edge::normalize::default_uri;
use crate::edge::redirect::{redirect_response, Redirect, RedirectEvaluator};
use crate::edge::rewrite::RewriteEvaluator;
use crate::observability::metrics::{self, FaultStage};
use crate::rules::CompilationError;

/// Path the viewer originally requested, attached to forwarded requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerPath(pub String);

/// Where a request path ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Terminal redirect.
    Redirect(Redirect),
    /// Continue to cache/origin with this path.
    Forward { path: String, rewritten: bool },
}

/// Result of the request hook.
#[derive(Debug)]
pub enum RequestOutcome<B> {
    /// Continue to cache lookup / origin with this (possibly rewritten) request.
    Forward(Request<B>),
    /// Return this response to the viewer immediately.
    Respond(Response<Body>),
}

/// Request hook: redirects, rewrites and the default URI normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestHandler {
    redirects: RedirectEvaluator,
    rewrites: RewriteEvaluator,
    spa_fallback: bool,
}

impl Default for RequestHandler {
    fn default() -> Self {
        Self::new(RedirectEvaluator::default(), RewriteEvaluator::default(), true)
    }
}

impl RequestHandler {
    pub fn new(redirects: RedirectEvaluator, rewrites: RewriteEvaluator, spa_fallback: bool) -> Self {
        Self {
            redirects,
            rewrites,
            spa_fallback,
        }
    }

    pub fn compile(config: &EdgeConfig) -> Result<Self, CompilationError> {
        Ok(Self::new(
            RedirectEvaluator::compile(&config.redirects)?,
            RewriteEvaluator::compile(&config.rewrites)?,
            config.defaults.spa_fallback,
        ))
    }

    pub fn redirects(&self) -> &RedirectEvaluator {
        &self.redirects
    }

    pub fn rewrites(&self) -> &RewriteEvaluator {
        &self.rewrites
    }

    /// Run the pipeline over a path without touching any request.
    pub fn resolve(&self, path: &str) -> Resolution {
        if let Some(redirect) = self.redirects.evaluate(path) {
            return Resolution::Redirect(redirect);
        }

        let rewritten = self.rewrites.evaluate(path);
        let effective = rewritten.as_deref().unwrap_or(path);
        let path = if self.spa_fallback {
            default_uri(effective).into_owned()
        } else {
            effective.to_string()
        };

        Resolution::Forward {
            path,
            rewritten: rewritten.is_some(),
        }
    }

    /// Apply the request hook to a viewer request.
    pub fn handle<B>(&self, mut request: Request<B>) -> RequestOutcome<B> {
        let viewer_path = request.uri().path().to_string();

        match self.resolve(&viewer_path) {
            Resolution::Redirect(redirect) => {
                let Some(host) = request_host(&request) else {
                    tracing::warn!(path = %viewer_path, "Redirect matched but request has no host; passing through");
                    metrics::record_fault(FaultStage::Request);
                    return RequestOutcome::Forward(request);
                };

                match redirect_response(&host, &redirect.path) {
                    Ok(response) => {
                        tracing::debug!(
                            rule = %self.redirects.rules()[redirect.rule].source(),
                            from = %viewer_path,
                            to = %redirect.path,
                            "Redirect matched"
                        );
                        metrics::record_redirect();
                        RequestOutcome::Respond(response)
                    }
                    Err(e) => {
                        tracing::error!(path = %viewer_path, error = %e, "Failed to build redirect; passing through");
                        metrics::record_fault(FaultStage::Request);
                        RequestOutcome::Forward(request)
                    }
                }
            }
            Resolution::Forward { path, rewritten } => {
                if rewritten {
                    metrics::record_rewrite();
                }
                if path != viewer_path {
                    if let Err(e) = replace_path(&mut request, &path) {
                        tracing::error!(from = %viewer_path, to = %path, error = %e, "Failed to rewrite URI; passing through");
                        metrics::record_fault(FaultStage::Request);
                        return RequestOutcome::Forward(request);
                    }
                }
                request.extensions_mut().insert(ViewerPath(viewer_path));
                RequestOutcome::Forward(request)
            }
        }
    }
}

/// Response hook: header injection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseHandler {
    headers: HeaderInjector,
}

impl ResponseHandler {
    pub fn new(headers: HeaderInjector) -> Self {
        Self { headers }
    }

    pub fn compile(config: &EdgeConfig) -> Result<Self, CompilationError> {
        Ok(Self::new(HeaderInjector::compile(&config.defaults, &config.headers)?))
    }

    pub fn headers(&self) -> &HeaderInjector {
        &self.headers
    }

    /// Inject headers for the path the viewer asked for.
    pub fn apply<R>(&self, viewer_path: &str, mut response: Response<R>) -> Response<R> {
        let applied = self.headers.apply(viewer_path, response.headers_mut());
        metrics::record_headers_applied(applied);
        response
    }

    /// Apply the response hook. Uses the [`ViewerPath`] left by the request
    /// hook when present, otherwise the request's own path.
    pub fn handle<B, R>(&self, request: &Request<B>, response: Response<R>) -> Response<R> {
        let path = request
            .extensions()
            .get::<ViewerPath>()
            .map(|p| p.0.as_str())
            .unwrap_or_else(|| request.uri().path());
        self.apply(path, response)
    }
}

fn request_host<B>(request: &Request<B>) -> Option<String> {
    request
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| request.uri().authority().map(|a| a.as_str()))
        .filter(|host| !host.is_empty())
        .map(str::to_string)
}

/// Swap the path of `request`'s URI, keeping its query.
fn replace_path<B>(request: &mut Request<B>, path: &str) -> Result<(), axum::http::Error> {
    let path_and_query = match request.uri().query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };
    let mut parts = request.uri().clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    *request.uri_mut() = Uri::from_parts(parts)?;
    Ok(())
}
