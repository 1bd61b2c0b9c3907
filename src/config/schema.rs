//! Configuration schema definitions.
//!
//! This module defines the complete configuration surface for the edge rules.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration: the rule tables plus the settings of the tooling around them.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EdgeConfig {
    /// Redirect rules, evaluated first-match-wins; a match ends the request.
    pub redirects: Vec<RuleConfig>,

    /// Rewrite rules, evaluated first-match-wins; a match changes the origin path.
    pub rewrites: Vec<RuleConfig>,

    /// Response header rules; every matching rule applies.
    pub headers: Vec<HeaderRuleConfig>,

    /// Which request attributes take part in the cache key.
    pub cache_policy: CacheKeyPolicy,

    /// Built-in behaviour toggles.
    pub defaults: DefaultsConfig,

    /// Local edge emulator settings.
    pub preview: PreviewConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// A redirect or rewrite rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuleConfig {
    /// Path pattern (`/blog/:year/*`).
    pub source: String,

    /// Destination path, may reference the source's parameters and wildcards.
    pub destination: String,
}

impl RuleConfig {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// A response header rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderRuleConfig {
    /// Header glob (`/**/*.{js,css}`).
    pub path: String,

    /// Header name (case-insensitive).
    pub name: String,

    /// Header value.
    pub value: String,
}

impl HeaderRuleConfig {
    pub fn new(path: impl Into<String>, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Cache key allow/deny lists. Empty lists count as absent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CacheKeyPolicy {
    pub allow_headers: Vec<String>,
    pub allow_cookies: Vec<String>,
    /// Takes precedence over `deny_query_params` when non-empty.
    pub allow_query_params: Vec<String>,
    pub deny_query_params: Vec<String>,
}

/// Built-in behaviour toggles.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Inject the default security headers on every response.
    pub security_headers: bool,

    /// Inject the default CORS headers on every response.
    pub cors: bool,

    /// Complete directory-like paths with `index.html`.
    pub spa_fallback: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            security_headers: true,
            cors: true,
            spa_fallback: true,
        }
    }
}

/// Local edge emulator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind_address: String,

    /// Origin authority requests are forwarded to (e.g., "127.0.0.1:3000").
    pub origin: String,

    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            origin: "127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
