//! Cache key policy subsystem.
//!
//! # Data Flow
//! ```text
//! Build time:
//!     CacheKeyPolicy (allow/deny lists)
//!     → policy.rs (compose selectors, emit diagnostics)
//!     → CachePolicyDescriptor (handed to the CDN's cache configuration)
//!
//! Request time (edge emulator only):
//!     CachePolicyDescriptor + request
//!     → key.rs (cache key string, query/cookies forwarded to origin)
//! ```
//!
//! # Design Decisions
//! - Headers, cookies and query parameters are three independent selectors
//! - A non-empty query allow-list wins over the deny-list outright (no merge)
//! - Conflicts are diagnostics, never fatal

pub mod key;
pub mod policy;

pub use policy::{compose, CachePolicyDescriptor, Composition, ConfigurationDiagnostic, QuerySelector, Selector};
