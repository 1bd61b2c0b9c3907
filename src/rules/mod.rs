//! Rule compilation subsystem.
//!
//! # Data Flow
//! ```text
//! Build time (once per deployment):
//!     redirects / rewrites {source, destination}
//!     → pattern.rs (escape literals, capture :params and *, validate destination)
//!     → CompiledRule (regex, capture order, destination template)
//!
//!     headers {path, name, value}
//!     → glob.rs (*, **, {a,b})
//!     → CompiledGlob (anchored boolean matcher)
//! ```
//!
//! # Design Decisions
//! - All validation happens here; evaluators only match and substitute
//! - Literal text is always regex-escaped before it reaches an expression
//! - Compiled values are immutable and serialize as plain data

pub mod error;
pub mod glob;
pub mod pattern;

pub use error::CompilationError;
pub use glob::{compile_glob, CompiledGlob};
pub use pattern::{compile_rule, first_match, CaptureSlot, CompiledRule, TemplatePart};
