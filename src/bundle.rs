//! The deployable edge bundle.
//!
//! # Responsibilities
//! - Compile a validated [`EdgeConfig`] into the data both edge hooks run on
//! - Serialize it as plain JSON (regex sources, capture orders, templates,
//!   header names/values, cache selectors)
//! - Re-validate every compiled value when a bundle is loaded
//!
//! # Design Decisions
//! - One generic interpreter parameterized by data; no code is generated
//! - The bundle is read-only after it is built

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{compose, CachePolicyDescriptor, ConfigurationDiagnostic};
use crate::config::EdgeConfig;
use crate::edge::{RequestHandler, ResponseHandler};
use crate::rules::CompilationError;

/// Format version written into every bundle.
pub const BUNDLE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid bundle: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported bundle version {found} (expected {})", BUNDLE_VERSION)]
    UnsupportedVersion { found: u32 },
}

/// Compiled rules and cache policy for one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeBundle {
    pub version: u32,
    pub request: RequestHandler,
    pub response: ResponseHandler,
    pub cache_policy: CachePolicyDescriptor,
}

/// A compiled bundle plus the non-fatal findings made while building it.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub bundle: EdgeBundle,
    pub diagnostics: Vec<ConfigurationDiagnostic>,
}

impl EdgeBundle {
    /// Compile every rule in `config`. Fails on the first compilation error.
    pub fn compile(config: &EdgeConfig) -> Result<BuildOutput, CompilationError> {
        let request = RequestHandler::compile(config)?;
        let response = ResponseHandler::compile(config)?;
        let composition = compose(&config.cache_policy);

        tracing::info!(
            redirects = request.redirects().rules().len(),
            rewrites = request.rewrites().rules().len(),
            header_rules = response.headers().rules().len(),
            diagnostics = composition.diagnostics.len(),
            "Edge rules compiled"
        );

        Ok(BuildOutput {
            bundle: Self {
                version: BUNDLE_VERSION,
                request,
                response,
                cache_policy: composition.descriptor,
            },
            diagnostics: composition.diagnostics,
        })
    }

    pub fn to_json(&self) -> Result<String, BundleError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, BundleError> {
        let bundle: Self = serde_json::from_str(json)?;
        if bundle.version != BUNDLE_VERSION {
            return Err(BundleError::UnsupportedVersion { found: bundle.version });
        }
        Ok(bundle)
    }

    pub fn read_from(path: &Path) -> Result<Self, BundleError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), BundleError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
