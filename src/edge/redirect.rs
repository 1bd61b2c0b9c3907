//! Redirect rule evaluation.
//!
//! # Responsibilities
//! - Test the request path against redirect rules in declaration order
//! - Build the terminal 301 response for the first match
//!
//! # Design Decisions
//! - Terminal: a match ends the request, nothing else runs
//! - Runs before cache lookup so a cached copy of the old path can't mask it
//! - `Location` is always absolute `https://{host}{path}`

use axum::body::Body;
use axum::http::{header, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::RuleConfig;
use crate::rules::{compile_rule, first_match, CompilationError, CompiledRule};

/// The first redirect rule that matched a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Index of the rule in declaration order.
    pub rule: usize,
    /// Substituted destination path.
    pub path: String,
}

/// Ordered redirect rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RedirectEvaluator {
    rules: Vec<CompiledRule>,
}

impl RedirectEvaluator {
    pub fn new(rules: Vec<CompiledRule>) -> Self {
        Self { rules }
    }

    pub fn compile(rules: &[RuleConfig]) -> Result<Self, CompilationError> {
        let rules = rules
            .iter()
            .map(|rule| compile_rule(&rule.source, &rule.destination))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Find the first rule matching `path`.
    pub fn evaluate(&self, path: &str) -> Option<Redirect> {
        first_match(&self.rules, path).map(|(rule, path)| Redirect { rule, path })
    }
}

/// Absolute redirect target for `host` and a substituted path.
pub fn location(host: &str, path: &str) -> String {
    format!("https://{host}{path}")
}

/// Build the permanent redirect response.
pub fn redirect_response(host: &str, path: &str) -> Result<Response<Body>, axum::http::Error> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(header::LOCATION, location(host, path))
        .body(Body::empty())
}
