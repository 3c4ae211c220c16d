//! Transform failures and their per-cohort aggregate.

use std::fmt;

/// One transform invocation that failed.
#[derive(Debug)]
pub struct TransformFailure {
    /// Spawn position of the item whose transform failed.
    pub index: usize,
    /// The error the transform returned (or a description of its panic).
    pub error: anyhow::Error,
}

impl TransformFailure {
    /// Create a failure for the item at `index`.
    pub fn new(index: usize, error: impl Into<anyhow::Error>) -> Self {
        Self {
            index,
            error: error.into(),
        }
    }
}

impl fmt::Display for TransformFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item {}: {:#}", self.index, self.error)
    }
}

impl std::error::Error for TransformFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

/// Every failure from one cohort, in the order they were encountered.
///
/// Always non-empty. Reported as a single error even when only one task
/// failed, so callers handle one shape regardless of how many went wrong.
#[derive(Debug)]
pub struct CohortFailure {
    failures: Vec<TransformFailure>,
}

impl CohortFailure {
    /// Aggregate `failures`, which must be in encounter order.
    pub fn new(failures: Vec<TransformFailure>) -> Self {
        debug_assert!(!failures.is_empty(), "a cohort failure needs at least one failure");
        Self { failures }
    }

    /// The underlying failures in encounter order.
    pub fn failures(&self) -> &[TransformFailure] {
        &self.failures
    }

    /// Spawn indices of the failed items, in encounter order.
    pub fn indices(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.index).collect()
    }

    /// Number of failed transforms.
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Consume the aggregate, yielding the individual failures.
    pub fn into_failures(self) -> Vec<TransformFailure> {
        self.failures
    }
}

impl fmt::Display for CohortFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of the cohort's transforms failed: [", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", failure)?;
        }
        write!(f, "]")
    }
}

impl std::error::Error for CohortFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.failures
            .first()
            .map(|f| f as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_lists_every_failure() {
        let failure = CohortFailure::new(vec![
            TransformFailure::new(2, anyhow::anyhow!("timeout")),
            TransformFailure::new(0, anyhow::anyhow!("bad input")),
        ]);
        assert_eq!(
            failure.to_string(),
            "2 of the cohort's transforms failed: [item 2: timeout, item 0: bad input]"
        );
        assert_eq!(failure.indices(), vec![2, 0]);
    }

    #[test]
    fn test_source_is_first_failure() {
        use std::error::Error;

        let failure = CohortFailure::new(vec![TransformFailure::new(
            5,
            anyhow::anyhow!("first"),
        )]);
        let source = failure.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("item 5: first"));
    }

    #[test]
    fn test_into_failures_preserves_order() {
        let failure = CohortFailure::new(vec![
            TransformFailure::new(3, anyhow::anyhow!("a")),
            TransformFailure::new(1, anyhow::anyhow!("b")),
        ]);
        assert_eq!(failure.len(), 2);
        let indices: Vec<_> = failure.into_failures().into_iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![3, 1]);
    }
}
