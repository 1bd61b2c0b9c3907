//! Default URI normalization (SPA fallback).
//!
//! Applied once, after rewrites:
//! - `/docs/` → `/docs/index.html`
//! - `/docs` (no `.` anywhere) → `/docs/index.html`
//! - anything else is left alone, so a rewrite to a file is never re-mutated

use std::borrow::Cow;

pub const INDEX_DOCUMENT: &str = "index.html";

/// Complete a directory-like path with the index document.
pub fn default_uri(path: &str) -> Cow<'_, str> {
    if path.ends_with('/') {
        Cow::Owned(format!("{path}{INDEX_DOCUMENT}"))
    } else if !path.contains('.') {
        Cow::Owned(format!("{path}/{INDEX_DOCUMENT}"))
    } else {
        Cow::Borrowed(path)
    }
}
