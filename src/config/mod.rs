//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (compile every rule, check settings)
//!     → EdgeConfig (validated, immutable)
//!     → bundle.rs compiles it into the deployable artifact
//! ```
//!
//! # Design Decisions
//! - Rules are fixed at build time; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::CacheKeyPolicy;
pub use schema::DefaultsConfig;
pub use schema::EdgeConfig;
pub use schema::HeaderRuleConfig;
pub use schema::ObservabilityConfig;
pub use schema::PreviewConfig;
pub use schema::RuleConfig;
pub use validation::ValidationError;
