//! Build-time compilation errors.

use thiserror::Error;

/// Fatal error raised while compiling a rule.
///
/// Every variant aborts the build; nothing compiled from a configuration
/// containing one of these is ever deployed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    #[error("pattern '{pattern}' must be an absolute path without query or fragment")]
    InvalidPath { pattern: String },

    #[error("pattern '{pattern}' has an unterminated parameter at byte {position}")]
    UnterminatedParameter { pattern: String, position: usize },

    #[error("pattern '{pattern}' declares parameter ':{name}' more than once")]
    DuplicateParameter { pattern: String, name: String },

    #[error("destination '{destination}' references ':{name}', which source '{source_pattern}' does not define")]
    UndefinedParameter {
        source_pattern: String,
        destination: String,
        name: String,
    },

    #[error("destination '{destination}' uses {used} wildcard(s) but source '{source_pattern}' defines {defined}")]
    ExcessWildcards {
        source_pattern: String,
        destination: String,
        used: usize,
        defined: usize,
    },

    #[error("glob '{glob}' has an unbalanced brace at byte {position}")]
    UnbalancedBrace { glob: String, position: usize },

    #[error("glob '{glob}' has an empty or nested alternation at byte {position}")]
    InvalidAlternation { glob: String, position: usize },

    #[error("invalid header name '{0}'")]
    InvalidHeaderName(String),

    #[error("invalid value for header '{name}'")]
    InvalidHeaderValue { name: String },

    #[error("compiled expression rejected: {0}")]
    Regex(String),

    #[error("compiled rule is inconsistent: {0}")]
    Inconsistent(String),
}

impl From<regex::Error> for CompilationError {
    fn from(err: regex::Error) -> Self {
        CompilationError::Regex(err.to_string())
    }
}
