//! Applying a composed cache policy to a request.
//!
//! The CDN does this itself in production; the edge emulator uses it to log
//! cache keys and to strip what the policy would not forward to the origin.

use axum::http::{header, HeaderMap, Request};

use crate::cache::policy::{CachePolicyDescriptor, QuerySelector, Selector};

impl Selector {
    pub fn includes(&self, name: &str) -> bool {
        match self {
            Selector::None => false,
            Selector::AllowList(names) => names.iter().any(|n| n == name),
        }
    }
}

impl QuerySelector {
    pub fn includes(&self, name: &str) -> bool {
        match self {
            QuerySelector::None => false,
            QuerySelector::AllowList(names) => names.iter().any(|n| n == name),
            QuerySelector::AllExcept(names) => !names.iter().any(|n| n == name),
        }
    }
}

impl CachePolicyDescriptor {
    /// Query string forwarded to the origin, `None` when nothing survives.
    ///
    /// Parameter order and encoding are preserved.
    pub fn forwarded_query(&self, query: Option<&str>) -> Option<String> {
        let kept: Vec<&str> = query_pairs(query?)
            .filter(|(name, _)| self.query_strings.includes(name))
            .map(|(_, pair)| pair)
            .collect();
        if kept.is_empty() {
            None
        } else {
            Some(kept.join("&"))
        }
    }

    /// `Cookie` header forwarded to the origin, `None` when nothing survives.
    pub fn forwarded_cookies(&self, headers: &HeaderMap) -> Option<String> {
        let kept: Vec<&str> = cookie_pairs(headers)
            .filter(|(name, _)| self.cookies.includes(name))
            .map(|(_, pair)| pair)
            .collect();
        if kept.is_empty() {
            None
        } else {
            Some(kept.join("; "))
        }
    }

    /// Deterministic cache key: the path plus every selected attribute, sorted.
    pub fn cache_key<B>(&self, request: &Request<B>) -> String {
        let mut key = request.uri().path().to_string();

        let mut headers: Vec<String> = request
            .headers()
            .keys()
            .filter(|name| self.headers.includes(name.as_str()))
            .map(|name| {
                let values: Vec<String> = request
                    .headers()
                    .get_all(name)
                    .iter()
                    .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
                    .collect();
                format!("{}={}", name.as_str(), values.join(","))
            })
            .collect();
        push_section(&mut key, 'h', &mut headers, ";");

        let mut cookies: Vec<String> = cookie_pairs(request.headers())
            .filter(|(name, _)| self.cookies.includes(name))
            .map(|(_, pair)| pair.to_string())
            .collect();
        push_section(&mut key, 'c', &mut cookies, ";");

        let mut params: Vec<String> = request
            .uri()
            .query()
            .into_iter()
            .flat_map(query_pairs)
            .filter(|(name, _)| self.query_strings.includes(name))
            .map(|(_, pair)| pair.to_string())
            .collect();
        push_section(&mut key, 'q', &mut params, "&");

        key
    }
}

fn push_section(key: &mut String, tag: char, entries: &mut [String], separator: &str) {
    if entries.is_empty() {
        return;
    }
    entries.sort();
    key.push('|');
    key.push(tag);
    key.push(':');
    key.push_str(&entries.join(separator));
}

/// `(name, raw pair)` for each non-empty `&`-separated query component.
fn query_pairs(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| (pair.split('=').next().unwrap_or(pair), pair))
}

/// `(name, raw pair)` for each cookie across all `Cookie` headers.
fn cookie_pairs(headers: &HeaderMap) -> impl Iterator<Item = (&str, &str)> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| (pair.split('=').next().unwrap_or(pair).trim(), pair))
}
