//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Build time:
//!     → logging.rs (compiled rule counts, configuration diagnostics)
//!
//! Request time (edge emulator):
//!     → logging.rs (rule hits at debug, fail-closed faults at error)
//!     → metrics.rs (redirects, rewrites, header injections, faults)
//! ```
//!
//! # Design Decisions
//! - Structured fields on every event (rule source, path, request id)
//! - Metrics are cheap counter increments; exporting them is optional

pub mod logging;
pub mod metrics;
