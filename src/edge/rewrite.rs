//! Rewrite rule evaluation.
//!
//! Same matching as redirects, but non-terminal: the first match replaces the
//! path used for cache lookup and origin fetch. The viewer never sees it.

use serde::{Deserialize, Serialize};

use crate::config::RuleConfig;
use crate::rules::{compile_rule, first_match, CompilationError, CompiledRule};

/// Ordered rewrite rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewriteEvaluator {
    rules: Vec<CompiledRule>,
}

impl RewriteEvaluator {
    pub fn new(rules: Vec<CompiledRule>) -> Self {
        Self { rules }
    }

    pub fn compile(rules: &[RuleConfig]) -> Result<Self, CompilationError> {
        let rules = rules
            .iter()
            .map(|rule| compile_rule(&rule.source, &rule.destination))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    /// Rewritten path for the first matching rule, `None` to keep `path` as is.
    pub fn evaluate(&self, path: &str) -> Option<String> {
        first_match(&self.rules, path).map(|(rule, rewritten)| {
            tracing::debug!(source = %self.rules[rule].source(), from = %path, to = %rewritten, "Rewrite matched");
            rewritten
        })
    }
}
