//! Response header injection.
//!
//! # Responsibilities
//! - Compile header rules (glob + name + value)
//! - Provide the built-in security and CORS defaults
//! - Apply every matching rule to an outgoing response
//!
//! # Design Decisions
//! - Not first-match-wins: all matching rules apply, in order
//! - Setting a header replaces any earlier value, so later (user) rules
//!   override earlier (default or broader) ones
//! - Defaults come first and match every path

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::config::{DefaultsConfig, HeaderRuleConfig};
use crate::rules::{compile_glob, CompilationError, CompiledGlob};

/// Glob the built-in defaults are attached to.
pub const MATCH_ALL: &str = "**";

pub const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains; preload"),
    (
        "content-security-policy",
        "default-src 'self'; base-uri 'self'; object-src 'none'; frame-ancestors 'none'; upgrade-insecure-requests",
    ),
    ("x-xss-protection", "1; mode=block"),
];

pub const CORS_HEADERS: [(&str, &str); 5] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, HEAD, OPTIONS"),
    ("access-control-allow-headers", "*"),
    ("access-control-max-age", "600"),
    ("access-control-allow-credentials", "false"),
];

/// A compiled header rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "HeaderRuleData", into = "HeaderRuleData")]
pub struct HeaderRule {
    glob: CompiledGlob,
    name: HeaderName,
    value: HeaderValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HeaderRuleData {
    glob: CompiledGlob,
    name: String,
    value: String,
}

impl HeaderRule {
    /// Compile a header rule, validating the glob, name and value.
    pub fn compile(path: &str, name: &str, value: &str) -> Result<Self, CompilationError> {
        let glob = compile_glob(path)?;
        Self::from_parts(glob, name, value)
    }

    fn from_parts(glob: CompiledGlob, name: &str, value: &str) -> Result<Self, CompilationError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| CompilationError::InvalidHeaderName(name.to_string()))?;
        let value = HeaderValue::from_str(value).map_err(|_| CompilationError::InvalidHeaderValue {
            name: name.to_string(),
        })?;
        Ok(Self { glob, name, value })
    }

    pub fn glob(&self) -> &CompiledGlob {
        &self.glob
    }

    pub fn name(&self) -> &HeaderName {
        &self.name
    }

    pub fn value(&self) -> &HeaderValue {
        &self.value
    }
}

impl TryFrom<HeaderRuleData> for HeaderRule {
    type Error = CompilationError;

    fn try_from(data: HeaderRuleData) -> Result<Self, Self::Error> {
        Self::from_parts(data.glob, &data.name, &data.value)
    }
}

impl From<HeaderRule> for HeaderRuleData {
    fn from(rule: HeaderRule) -> Self {
        Self {
            glob: rule.glob,
            name: rule.name.as_str().to_string(),
            value: String::from_utf8_lossy(rule.value.as_bytes()).into_owned(),
        }
    }
}

/// Built-in rules enabled by `defaults`, in application order.
pub fn default_rules(defaults: &DefaultsConfig) -> Result<Vec<HeaderRule>, CompilationError> {
    let mut groups: Vec<&[(&str, &str)]> = Vec::new();
    if defaults.security_headers {
        groups.push(&SECURITY_HEADERS);
    }
    if defaults.cors {
        groups.push(&CORS_HEADERS);
    }

    groups
        .into_iter()
        .flatten()
        .map(|(name, value)| HeaderRule::compile(MATCH_ALL, name, value))
        .collect()
}

/// Ordered header rules applied to every response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeaderInjector {
    rules: Vec<HeaderRule>,
}

impl HeaderInjector {
    pub fn new(rules: Vec<HeaderRule>) -> Self {
        Self { rules }
    }

    /// Compile the enabled defaults followed by the user rules.
    pub fn compile(defaults: &DefaultsConfig, rules: &[HeaderRuleConfig]) -> Result<Self, CompilationError> {
        let mut compiled = default_rules(defaults)?;
        for rule in rules {
            compiled.push(HeaderRule::compile(&rule.path, &rule.name, &rule.value)?);
        }
        Ok(Self::new(compiled))
    }

    pub fn rules(&self) -> &[HeaderRule] {
        &self.rules
    }

    /// Set every rule matching `path` on `headers`. Returns how many applied.
    pub fn apply(&self, path: &str, headers: &mut HeaderMap) -> usize {
        let mut applied = 0;
        for rule in self.rules.iter().filter(|rule| rule.glob.is_match(path)) {
            headers.insert(rule.name.clone(), rule.value.clone());
            applied += 1;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn injector(rules: &[HeaderRuleConfig]) -> HeaderInjector {
        HeaderInjector::compile(&DefaultsConfig::default(), rules).unwrap()
    }

    #[test]
    fn test_defaults_apply_everywhere() {
        let injector = injector(&[]);
        for path in ["/", "/index.html", "/a/b/c"] {
            let mut headers = HeaderMap::new();
            assert_eq!(injector.apply(path, &mut headers), 10);
            assert_eq!(headers["x-frame-options"], "DENY");
            assert_eq!(headers["x-content-type-options"], "nosniff");
            assert_eq!(
                headers["strict-transport-security"],
                "max-age=31536000; includeSubDomains; preload"
            );
            assert_eq!(headers["access-control-allow-origin"], "*");
            assert_eq!(headers["access-control-allow-methods"], "GET, HEAD, OPTIONS");
            assert_eq!(headers["access-control-max-age"], "600");
            assert_eq!(headers["access-control-allow-credentials"], "false");
        }
    }

    #[test]
    fn test_defaults_can_be_disabled() {
        let defaults = DefaultsConfig {
            security_headers: false,
            cors: true,
            spa_fallback: true,
        };
        let injector = HeaderInjector::compile(&defaults, &[]).unwrap();
        let mut headers = HeaderMap::new();
        injector.apply("/", &mut headers);
        assert!(headers.get("x-frame-options").is_none());
        assert_eq!(headers["access-control-allow-origin"], "*");
    }

    #[test]
    fn test_later_rule_overrides_default_case_insensitively() {
        let injector = injector(&[HeaderRuleConfig::new("/embed/*", "X-Frame-Options", "SAMEORIGIN")]);

        let mut headers = HeaderMap::new();
        injector.apply("/embed/widget", &mut headers);
        assert_eq!(headers.get_all("x-frame-options").iter().count(), 1);
        assert_eq!(headers["x-frame-options"], "SAMEORIGIN");

        let mut headers = HeaderMap::new();
        injector.apply("/other", &mut headers);
        assert_eq!(headers["x-frame-options"], "DENY");
    }

    #[test]
    fn test_all_matching_rules_apply_in_order() {
        let injector = injector(&[
            HeaderRuleConfig::new("/**", "Cache-Control", "no-cache"),
            HeaderRuleConfig::new("/**/*.{js,css}", "Cache-Control", "max-age=31536000"),
            HeaderRuleConfig::new("/static/*", "X-Static", "1"),
        ]);

        let mut headers = HeaderMap::new();
        injector.apply("/static/app.js", &mut headers);
        assert_eq!(headers["cache-control"], "max-age=31536000");
        assert_eq!(headers["x-static"], "1");

        let mut headers = HeaderMap::new();
        injector.apply("/about", &mut headers);
        assert_eq!(headers["cache-control"], "no-cache");
        assert!(headers.get("x-static").is_none());
    }

    #[test]
    fn test_overwrites_origin_header() {
        let injector = injector(&[HeaderRuleConfig::new("/**", "Cache-Control", "no-store")]);
        let mut headers = HeaderMap::new();
        headers.insert("cache-control", HeaderValue::from_static("max-age=60"));
        injector.apply("/", &mut headers);
        assert_eq!(headers["cache-control"], "no-store");
    }

    #[test]
    fn test_invalid_header_rules() {
        assert!(matches!(
            HeaderRule::compile("/**", "bad name", "x"),
            Err(CompilationError::InvalidHeaderName(_))
        ));
        assert!(matches!(
            HeaderRule::compile("/**", "x-ok", "line\nbreak"),
            Err(CompilationError::InvalidHeaderValue { .. })
        ));
    }
}
