//! The pipeline error taxonomy.
//!
//! End-of-sequence is not an error: producers signal it with `Ok(None)`.

use thiserror::Error;

use crate::failure::CohortFailure;

/// Result type for pipeline operations.
pub type PipeResult<T> = Result<T, PipeError>;

/// Errors raised while building or pulling from a pipeline.
#[derive(Debug, Error)]
pub enum PipeError {
    /// `chain()` was called with a name nothing is registered under.
    #[error("no such operation: {0}")]
    NoSuchOperation(String),

    /// The name is registered, but for different item or output types.
    #[error("operation '{name}' is not registered for {expected}")]
    ChainSignature {
        /// Operation name.
        name: String,
        /// The `input -> output` signature the caller asked for.
        expected: String,
    },

    /// A chain factory could not extract one of its arguments.
    #[error("operation '{name}', argument {index}: {reason}")]
    ChainArgument {
        /// Operation name.
        name: String,
        /// Position of the offending argument.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Re-registration of an existing name while duplicates are rejected.
    #[error("operation already registered: {0}")]
    DuplicateOperation(String),

    /// One or more transforms in a concurrent map failed.
    #[error(transparent)]
    Cohort(#[from] CohortFailure),

    /// A producer implementation failed for its own reasons.
    #[error("upstream failed: {0:#}")]
    Upstream(anyhow::Error),
}

impl PipeError {
    /// Wrap an arbitrary error raised by a custom producer.
    pub fn upstream(err: impl Into<anyhow::Error>) -> Self {
        PipeError::Upstream(err.into())
    }

    /// Returns the aggregated failure if this is a cohort failure.
    pub fn as_cohort(&self) -> Option<&CohortFailure> {
        match self {
            PipeError::Cohort(failure) => Some(failure),
            _ => None,
        }
    }

    /// True for lookups of unregistered chain operations.
    pub fn is_no_such_operation(&self) -> bool {
        matches!(self, PipeError::NoSuchOperation(_))
    }
}
