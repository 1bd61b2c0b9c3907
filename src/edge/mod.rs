//! Edge request/response evaluation.
//!
//! # Data Flow
//! ```text
//! Viewer request (before cache lookup)
//!     → redirect.rs (first match → 301, stop)
//!     → rewrite.rs (first match → new origin path)
//!     → normalize.rs (SPA fallback: append index.html)
//!     → [cache lookup / origin fetch, keyed by cache::policy]
//!
//! Response (before returning to viewer)
//!     → headers.rs (defaults, then every matching user rule)
//! ```
//!
//! # Design Decisions
//! - Evaluators only match and substitute; every rule was validated at build time
//! - Rules are read-only; a handler can be shared across any number of requests
//! - Deterministic: declaration order decides every tie

pub mod handler;
pub mod headers;
pub mod normalize;
pub mod redirect;
pub mod rewrite;

pub use handler::{RequestHandler, RequestOutcome, Resolution, ResponseHandler, ViewerPath};
