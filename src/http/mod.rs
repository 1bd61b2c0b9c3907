//! HTTP edge emulator subsystem.
//!
//! # Data Flow
//! ```text
//! Viewer request
//!     → server.rs (request ID, tracing, timeout)
//!     → edge::RequestHandler (redirect / rewrite / default URI)
//!     → cache::CachePolicyDescriptor (query + cookie forwarding)
//!     → origin (hyper-util client)
//!     → edge::ResponseHandler (header injection)
//!     → Send to viewer
//! ```

pub mod server;

pub use server::{EdgeServer, ServerError, X_REQUEST_ID};
