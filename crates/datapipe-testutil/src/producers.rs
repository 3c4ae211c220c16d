//! Producers with observable behavior.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use datapipe_core::{PipeError, PipeResult, Producer};

/// Counts upward from zero, sleeping before every pull.
///
/// The shared counter records how many items were handed out, so tests can
/// see how far a consumer drained.
pub struct PacedSource {
    next: u64,
    end: u64,
    delay: Duration,
    pulled: Arc<AtomicUsize>,
}

impl PacedSource {
    /// Yield `0..end`, waiting `delay` before each item.
    pub fn new(end: u64, delay: Duration) -> Self {
        Self {
            next: 0,
            end,
            delay,
            pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle on the number of items yielded so far.
    pub fn pulled(&self) -> Arc<AtomicUsize> {
        self.pulled.clone()
    }
}

#[async_trait]
impl Producer for PacedSource {
    type Item = u64;

    async fn pull(&mut self) -> PipeResult<Option<u64>> {
        if self.next >= self.end {
            return Ok(None);
        }
        tokio::time::sleep(self.delay).await;
        let item = self.next;
        self.next += 1;
        self.pulled.fetch_add(1, Ordering::SeqCst);
        Ok(Some(item))
    }
}

/// Yields the given items, then fails once, then ends.
pub struct FailingSource<T> {
    items: std::vec::IntoIter<T>,
    message: String,
    failed: bool,
}

impl<T> FailingSource<T> {
    pub fn new(items: Vec<T>, message: impl Into<String>) -> Self {
        Self {
            items: items.into_iter(),
            message: message.into(),
            failed: false,
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Producer for FailingSource<T> {
    type Item = T;

    async fn pull(&mut self) -> PipeResult<Option<T>> {
        if let Some(item) = self.items.next() {
            return Ok(Some(item));
        }
        if self.failed {
            return Ok(None);
        }
        self.failed = true;
        Err(PipeError::upstream(anyhow::anyhow!(self.message.clone())))
    }
}
