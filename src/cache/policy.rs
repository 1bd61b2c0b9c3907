//! Cache key policy composition.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CacheKeyPolicy;

/// Header or cookie selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "behavior", content = "items", rename_all = "camelCase")]
pub enum Selector {
    /// Nothing is keyed or forwarded.
    None,
    /// Only the listed names are keyed and forwarded.
    AllowList(Vec<String>),
}

/// Query parameter selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "behavior", content = "items", rename_all = "camelCase")]
pub enum QuerySelector {
    /// All parameters are stripped before lookup and forwarding.
    None,
    /// Only the listed parameters take part.
    AllowList(Vec<String>),
    /// Every parameter except the listed ones takes part.
    AllExcept(Vec<String>),
}

/// Cache key selectors consumed by the CDN's cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicyDescriptor {
    pub headers: Selector,
    pub cookies: Selector,
    pub query_strings: QuerySelector,
}

impl Default for CachePolicyDescriptor {
    fn default() -> Self {
        Self {
            headers: Selector::None,
            cookies: Selector::None,
            query_strings: QuerySelector::None,
        }
    }
}

/// Non-fatal build-time finding about a cache key policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationDiagnostic {
    #[error("allow_query_params and deny_query_params are both set; the deny list {ignored:?} is ignored")]
    QueryDenyListIgnored { ignored: Vec<String> },

    #[error("{list} lists '{name}' more than once")]
    DuplicateEntry { list: &'static str, name: String },
}

/// Result of composing a policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub descriptor: CachePolicyDescriptor,
    pub diagnostics: Vec<ConfigurationDiagnostic>,
}

/// Derive the cache key selectors from allow/deny lists.
///
/// Each diagnostic is also logged at `warn`.
pub fn compose(policy: &CacheKeyPolicy) -> Composition {
    let mut diagnostics = Vec::new();

    let headers = allow_list(
        "allow_headers",
        policy.allow_headers.iter().map(|h| h.to_ascii_lowercase()),
        &mut diagnostics,
    );
    let cookies = allow_list("allow_cookies", policy.allow_cookies.iter().cloned(), &mut diagnostics);
    let allow_query = dedup(
        "allow_query_params",
        policy.allow_query_params.iter().cloned(),
        &mut diagnostics,
    );
    let deny_query = dedup(
        "deny_query_params",
        policy.deny_query_params.iter().cloned(),
        &mut diagnostics,
    );

    let query_strings = match (allow_query.is_empty(), deny_query.is_empty()) {
        (false, deny_empty) => {
            if !deny_empty {
                diagnostics.push(ConfigurationDiagnostic::QueryDenyListIgnored { ignored: deny_query });
            }
            QuerySelector::AllowList(allow_query)
        }
        (true, false) => QuerySelector::AllExcept(deny_query),
        (true, true) => QuerySelector::None,
    };

    for diagnostic in &diagnostics {
        tracing::warn!(diagnostic = %diagnostic, "Cache key policy diagnostic");
    }

    Composition {
        descriptor: CachePolicyDescriptor {
            headers,
            cookies,
            query_strings,
        },
        diagnostics,
    }
}

fn allow_list(
    list: &'static str,
    names: impl Iterator<Item = String>,
    diagnostics: &mut Vec<ConfigurationDiagnostic>,
) -> Selector {
    let names = dedup(list, names, diagnostics);
    if names.is_empty() {
        Selector::None
    } else {
        Selector::AllowList(names)
    }
}

/// Drop repeated names, keeping first occurrences in order.
fn dedup(
    list: &'static str,
    names: impl Iterator<Item = String>,
    diagnostics: &mut Vec<ConfigurationDiagnostic>,
) -> Vec<String> {
    let mut unique: Vec<String> = Vec::new();
    for name in names {
        if unique.contains(&name) {
            diagnostics.push(ConfigurationDiagnostic::DuplicateEntry { list, name });
        } else {
            unique.push(name);
        }
    }
    unique
}
