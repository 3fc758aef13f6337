//! Structured error types with stable machine-readable codes
//!
//! Rebuild failures are deliberately non-fatal: a component that fails to
//! refresh keeps serving its previous model, so most variants here are
//! reported and logged rather than propagated to the process boundary.

use std::fmt;

/// Engine error types with proper categorization
#[derive(Debug)]
pub enum RecoError {
    // Query errors: the caller referenced something the current model
    // does not know about
    ProductNotFound(u64),

    // Rebuild errors: the previous model stays live
    RebuildFailed {
        component: String,
        source: anyhow::Error,
    },
    RebuildTimeout {
        component: String,
        waited_secs: u64,
    },

    // Similarity computation over an empty or all-zero interaction matrix.
    // Recovered during rebuild; queries then return empty results.
    DegenerateSimilarity,

    // Generic wrapper for external errors
    Internal(anyhow::Error),
}

impl RecoError {
    /// Create a rebuild failure for a named component
    pub fn rebuild(component: &str, source: anyhow::Error) -> Self {
        Self::RebuildFailed {
            component: component.to_string(),
            source,
        }
    }

    /// Get error code for client identification
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::RebuildFailed { .. } => "REBUILD_FAILED",
            Self::RebuildTimeout { .. } => "REBUILD_TIMEOUT",
            Self::DegenerateSimilarity => "DEGENERATE_SIMILARITY",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the engine keeps serving after this error
    ///
    /// Rebuild and similarity failures leave the previous model live, so the
    /// engine remains fully operational. An unknown product is a caller
    /// error and carries no state impact either way.
    pub fn recoverable(&self) -> bool {
        match self {
            Self::ProductNotFound(_) => true,
            Self::RebuildFailed { .. } => true,
            Self::RebuildTimeout { .. } => true,
            Self::DegenerateSimilarity => true,
            Self::Internal(_) => false,
        }
    }

    /// Get detailed error message
    pub fn message(&self) -> String {
        match self {
            Self::ProductNotFound(id) => format!("Product not found: {id}"),
            Self::RebuildFailed { component, source } => {
                format!("Rebuild of '{component}' failed: {source}")
            }
            Self::RebuildTimeout {
                component,
                waited_secs,
            } => {
                format!("Rebuild of '{component}' exceeded {waited_secs}s and was abandoned")
            }
            Self::DegenerateSimilarity => {
                "Similarity matrix is degenerate (no users or no interactions)".to_string()
            }
            Self::Internal(err) => format!("Internal error: {err}"),
        }
    }
}

impl fmt::Display for RecoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for RecoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RebuildFailed { source, .. } | Self::Internal(source) => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }
}

/// Convert from anyhow::Error to RecoError
impl From<anyhow::Error> for RecoError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

/// Type alias for Results using RecoError
pub type Result<T> = std::result::Result<T, RecoError>;
