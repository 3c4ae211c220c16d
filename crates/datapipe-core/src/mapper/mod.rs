//! The concurrent map stage.
//!
//! A [`ConcurrentMapper`] wraps an upstream producer and an async transform.
//! On the first pull it runs one traversal:
//!
//! ```text
//!   upstream ──pull──▶ item₀ ──spawn──▶ task₀ ─┐
//!            ──pull──▶ item₁ ──spawn──▶ task₁ ─┤  Cohort
//!            ──pull──▶ ...                     │  (first failure cancels all)
//!            ──pull──▶ end   (cohort closed)   │
//!                                              ▼
//!                                 join: all ok ──▶ buffer, deliver in spawn order
//!                                       any err ──▶ one CohortFailure, then end
//! ```
//!
//! Upstream pulls are strictly sequential; tasks run while later items are
//! still being pulled. Nothing is delivered until the whole cohort has
//! resolved, so memory use is O(n) in the upstream length and concurrency is
//! unbounded. Both are known ceilings of this stage.
//!
//! There is no timeout: a transform that never completes stalls the cohort.
//! Callers may impose one from outside (`tokio::time::timeout` around a pull);
//! dropping a pull mid-traversal aborts the cohort and leaves the mapper
//! [`Failed`](ProducerState::Failed), since drained items cannot be recovered.

mod cohort;

use std::collections::VecDeque;
use std::future::Future;

use async_trait::async_trait;

use datapipe_types::{PipeError, PipeResult, ProducerState};

use crate::producer::Producer;

use cohort::Cohort;

/// Single-pass state of a mapper.
enum MapperState<U> {
    /// No traversal has run yet.
    Pending,
    /// The cohort succeeded; results waiting to be pulled.
    Delivering(VecDeque<U>),
    Exhausted,
    Failed,
}

/// Applies an async transform to every upstream item concurrently.
///
/// Results come back in upstream order no matter which transform finishes
/// first. If any transform fails, the rest are cancelled and the first pull
/// returns a single [`PipeError::Cohort`] listing every failure; no items are
/// delivered and every later pull returns `Ok(None)`.
///
/// ```
/// use std::time::Duration;
/// use datapipe_core::{ConcurrentMapper, Producer, SourceAdapter};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> datapipe_core::PipeResult<()> {
/// let mut mapper = ConcurrentMapper::new(SourceAdapter::new([0.3, 0.1, 0.2]), |secs: f64| async move {
///     tokio::time::sleep(Duration::from_secs_f64(secs / 100.0)).await;
///     Ok::<_, anyhow::Error>(secs * 2.0)
/// });
/// assert_eq!(mapper.pull().await?, Some(0.6));
/// assert_eq!(mapper.pull().await?, Some(0.2));
/// assert_eq!(mapper.pull().await?, Some(0.4));
/// assert_eq!(mapper.pull().await?, None);
/// # Ok(())
/// # }
/// ```
pub struct ConcurrentMapper<P, F, U> {
    upstream: P,
    transform: F,
    state: MapperState<U>,
}

impl<P, F, U> ConcurrentMapper<P, F, U> {
    /// Create a mapper. Nothing runs until the first pull.
    pub fn new(upstream: P, transform: F) -> Self {
        Self {
            upstream,
            transform,
            state: MapperState::Pending,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProducerState {
        match self.state {
            MapperState::Pending | MapperState::Delivering(_) => ProducerState::Active,
            MapperState::Exhausted => ProducerState::Exhausted,
            MapperState::Failed => ProducerState::Failed,
        }
    }
}

impl<P, F, Fut, U, E> ConcurrentMapper<P, F, U>
where
    P: Producer,
    F: Fn(P::Item) -> Fut + Send + Sync,
    Fut: Future<Output = Result<U, E>> + Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
    U: Send + 'static,
{
    /// Drain upstream into a cohort, then resolve it.
    #[tracing::instrument(level = "debug", skip_all, fields(upstream = %self.upstream.describe()))]
    async fn traverse(&mut self) -> PipeResult<Vec<U>> {
        let mut cohort = Cohort::new();

        loop {
            if cohort.is_cancelled() {
                tracing::debug!(spawned = cohort.len(), "failure during drain, closing cohort early");
                break;
            }
            match self.upstream.pull().await {
                Ok(Some(item)) => {
                    cohort.spawn((self.transform)(item));
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::debug!(spawned = cohort.len(), error = %err, "upstream failed, cancelling cohort");
                    cohort.cancel();
                    // Settle before reporting; the upstream error takes precedence.
                    if let Err(failure) = cohort.join().await {
                        tracing::debug!(%failure, "discarding transform failures behind upstream error");
                    }
                    return Err(err);
                }
            }
        }

        let spawned = cohort.len();
        tracing::debug!(spawned, "cohort closed");

        let results = cohort.join().await?;
        tracing::debug!(delivered = results.len(), "cohort settled");
        Ok(results)
    }
}

#[async_trait]
impl<P, F, Fut, U, E> Producer for ConcurrentMapper<P, F, U>
where
    P: Producer,
    F: Fn(P::Item) -> Fut + Send + Sync,
    Fut: Future<Output = Result<U, E>> + Send + 'static,
    E: Into<anyhow::Error> + Send + 'static,
    U: Send + 'static,
{
    type Item = U;

    async fn pull(&mut self) -> PipeResult<Option<U>> {
        if let MapperState::Pending = self.state {
            // Leave `Pending` before the first await: if this pull is dropped
            // mid-traversal the mapper stays failed instead of starting over.
            self.state = MapperState::Failed;
            let results = self.traverse().await?;
            self.state = MapperState::Delivering(results.into());
        }

        let MapperState::Delivering(buffer) = &mut self.state else {
            return Ok(None);
        };
        match buffer.pop_front() {
            Some(item) => Ok(Some(item)),
            None => {
                self.state = MapperState::Exhausted;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::producer::ProducerExt;
    use crate::source::SourceAdapter;

    #[tokio::test(start_paused = true)]
    async fn test_reorders_to_spawn_order() {
        // Later items finish first.
        let mut mapper = SourceAdapter::new(0u64..5).map(|x| async move {
            tokio::time::sleep(Duration::from_millis(50 - x * 10)).await;
            Ok::<_, anyhow::Error>(x * 10)
        });
        assert_eq!(mapper.state(), ProducerState::Active);

        let mut seen = Vec::new();
        while let Some(v) = mapper.pull().await.unwrap() {
            seen.push(v);
        }
        assert_eq!(seen, vec![0, 10, 20, 30, 40]);
        assert_eq!(mapper.state(), ProducerState::Exhausted);
        assert_eq!(mapper.pull().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failure_yields_nothing_then_ends() {
        let mut mapper = SourceAdapter::new([3, 4, 5]).map(|x: i32| async move {
            if x == 4 {
                anyhow::bail!("Some problem with {x}");
            }
            Ok(x)
        });

        let err = mapper.pull().await.unwrap_err();
        let failure = err.as_cohort().expect("cohort failure");
        assert_eq!(failure.indices(), vec![1]);
        assert_eq!(failure.failures()[0].error.to_string(), "Some problem with 4");
        assert_eq!(mapper.state(), ProducerState::Failed);

        // Terminal: no fresh aggregation, no restart.
        assert_eq!(mapper.pull().await.unwrap(), None);
        assert_eq!(mapper.pull().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_upstream() {
        let mut mapper = SourceAdapter::new(Vec::<i32>::new())
            .map(|x| async move { Ok::<_, anyhow::Error>(x) });
        assert_eq!(mapper.pull().await.unwrap(), None);
        assert_eq!(mapper.state(), ProducerState::Exhausted);
    }

    #[tokio::test]
    async fn test_transform_runs_once_per_item() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mapper = SourceAdapter::new(0..10).map(move |x: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, anyhow::Error>(x) }
        });
        let items = mapper.collect_vec().await.unwrap();
        assert_eq!(items.len(), 10);
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_describe() {
        let mapper = SourceAdapter::new([1]).map(|x: i32| async move { Ok::<_, anyhow::Error>(x) });
        assert_eq!(mapper.describe(), "ConcurrentMapper");
    }
}
