//! Edge request-routing rule compiler.
//!
//! Compiles declarative redirect, rewrite and response-header rules into the
//! data two generic edge hooks run on, plus the cache key policy a CDN uses
//! to decide which request attributes fragment its cache.

pub mod bundle;
pub mod cache;
pub mod config;
pub mod edge;
pub mod http;
pub mod observability;
pub mod rules;

pub use bundle::EdgeBundle;
pub use config::EdgeConfig;
pub use edge::{RequestHandler, ResponseHandler};
pub use http::EdgeServer;
