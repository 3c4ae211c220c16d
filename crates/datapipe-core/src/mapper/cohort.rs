//! Cohort — a fail-fast task group with ordered results.
//!
//! ```text
//!   spawn(fut) ──▶ handles[i] ──┐
//!                               ├── every task races its future against
//!   CancellationToken ──────────┘   the shared token
//!
//!   first failure ──▶ token.cancel() ──▶ siblings stop at next await
//!   join()        ──▶ await every handle in spawn order
//!                 ──▶ Ok(results in spawn order) | Err(failures in encounter order)
//! ```
//!
//! The failing task cancels the token itself, so siblings stop as soon as the
//! scheduler reaches their next suspension point, regardless of which handle
//! `join` happens to be awaiting. Each failure takes a ticket from a shared
//! counter when it happens; sorting by ticket restores encounter order.
//!
//! A cohort dropped before `join` finishes (a timed-out or abandoned pull)
//! cancels the token and aborts every handle it still holds.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use datapipe_types::{CohortFailure, TransformFailure};

/// How a single task ended.
enum TaskOutcome<U> {
    Done(U),
    Failed { ticket: usize, error: anyhow::Error },
    Cancelled,
}

/// Tasks spawned during one traversal, supervised together.
pub(crate) struct Cohort<U> {
    handles: Vec<JoinHandle<TaskOutcome<U>>>,
    cancel: CancellationToken,
    tickets: Arc<AtomicUsize>,
}

impl<U: Send + 'static> Cohort<U> {
    pub(crate) fn new() -> Self {
        Self {
            handles: Vec::new(),
            cancel: CancellationToken::new(),
            tickets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Spawn `fut` at the next slot. Returns its spawn index.
    ///
    /// If the cohort is already cancelled, the future is dropped without
    /// ever being polled.
    pub(crate) fn spawn<Fut, E>(&mut self, fut: Fut) -> usize
    where
        Fut: Future<Output = Result<U, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
    {
        let index = self.handles.len();
        let cancel = self.cancel.clone();
        let tickets = self.tickets.clone();

        let handle = tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return TaskOutcome::Cancelled,
                result = AssertUnwindSafe(fut).catch_unwind() => result,
            };

            let error = match result {
                Ok(Ok(value)) => return TaskOutcome::Done(value),
                Ok(Err(err)) => err.into(),
                Err(panic) => anyhow::anyhow!("transform panicked: {}", panic_message(&*panic)),
            };

            // Only the first failure counts as the trigger; later ones still report.
            let ticket = tickets.fetch_add(1, Ordering::SeqCst);
            cancel.cancel();
            tracing::debug!(index, ticket, error = %error, "transform failed");
            TaskOutcome::Failed { ticket, error }
        });

        self.handles.push(handle);
        tracing::trace!(index, "spawned transform");
        index
    }

    /// Number of tasks spawned so far.
    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    /// True once any task has failed (or the cohort was cancelled explicitly).
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel every task that has not finished yet.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for every task to settle.
    ///
    /// On success the results are in spawn order. Otherwise every failure that
    /// was not caused by cancellation is returned, in encounter order. After an
    /// explicit [`cancel`](Self::cancel) with no failures, only the tasks that
    /// finished first contribute results.
    ///
    /// The handles stay owned by the cohort while they are awaited, so dropping
    /// the `join` future part-way aborts every task still in flight.
    pub(crate) async fn join(mut self) -> Result<Vec<U>, CohortFailure> {
        let mut results = Vec::with_capacity(self.handles.len());
        let mut failures = Vec::new();

        for (index, handle) in self.handles.iter_mut().enumerate() {
            match handle.await {
                Ok(TaskOutcome::Done(value)) => results.push(value),
                Ok(TaskOutcome::Failed { ticket, error }) => {
                    failures.push((ticket, TransformFailure::new(index, error)));
                }
                Ok(TaskOutcome::Cancelled) => {}
                Err(err) => {
                    // The runtime tore the task down (shutdown); the item has no result.
                    self.cancel.cancel();
                    let ticket = self.tickets.fetch_add(1, Ordering::SeqCst);
                    let error = anyhow::anyhow!("transform task aborted: {}", err);
                    failures.push((ticket, TransformFailure::new(index, error)));
                }
            }
        }

        // Every handle has resolved; nothing is left for `Drop` to abort.
        self.handles.clear();

        if failures.is_empty() {
            return Ok(results);
        }

        failures.sort_by_key(|(ticket, _)| *ticket);
        Err(CohortFailure::new(
            failures.into_iter().map(|(_, failure)| failure).collect(),
        ))
    }
}

impl<U> Drop for Cohort<U> {
    fn drop(&mut self) {
        // Unjoined handles mean the traversal was abandoned mid-flight.
        if self.handles.is_empty() {
            return;
        }
        self.cancel.cancel();
        for handle in &self.handles {
            handle.abort();
        }
        tracing::debug!(tasks = self.handles.len(), "cohort dropped before settling, aborted");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_results_in_spawn_order() {
        let mut cohort = Cohort::new();
        for (i, delay) in [30u64, 10, 20].into_iter().enumerate() {
            cohort.spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok::<_, anyhow::Error>(i)
            });
        }
        assert_eq!(cohort.len(), 3);
        assert_eq!(cohort.join().await.unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_failure_cancels_siblings() {
        let finished = Arc::new(AtomicU32::new(0));
        let mut cohort: Cohort<()> = Cohort::new();

        cohort.spawn(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Err(anyhow::anyhow!("boom"))
        });
        for _ in 0..4 {
            let finished = finished.clone();
            cohort.spawn(async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(())
            });
        }

        let failure = cohort.join().await.unwrap_err();
        assert_eq!(failure.indices(), vec![0]);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_sibling_is_cancelled_not_failed() {
        let mut cohort: Cohort<()> = Cohort::new();
        // Both wake at the same instant; the second observes the cancellation first.
        for name in ["first", "second"] {
            cohort.spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Err(anyhow::anyhow!(name))
            });
        }

        let failure = cohort.join().await.unwrap_err();
        assert_eq!(failure.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_simultaneous_failures_are_all_reported() {
        let arrived = Arc::new(AtomicUsize::new(0));
        let mut cohort: Cohort<()> = Cohort::new();

        for i in 0..2 {
            let arrived = arrived.clone();
            cohort.spawn(async move {
                // Hold both workers inside the transform so neither sees the other's cancel.
                arrived.fetch_add(1, Ordering::SeqCst);
                let deadline = std::time::Instant::now() + Duration::from_secs(5);
                while arrived.load(Ordering::SeqCst) < 2 && std::time::Instant::now() < deadline {
                    std::thread::yield_now();
                }
                Err(anyhow::anyhow!("failure {i}"))
            });
        }

        let failure = cohort.join().await.unwrap_err();
        let mut indices = failure.indices();
        indices.sort();
        assert_eq!(indices, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_panic_is_reported_as_failure() {
        let mut cohort: Cohort<u8> = Cohort::new();
        cohort.spawn(async { Ok::<_, anyhow::Error>(1) });
        cohort.spawn(async {
            if true {
                panic!("exploded");
            }
            Ok::<_, anyhow::Error>(2)
        });

        let failure = cohort.join().await.unwrap_err();
        assert_eq!(failure.indices(), vec![1]);
        assert!(failure.failures()[0].error.to_string().contains("exploded"));
    }

    #[tokio::test]
    async fn test_spawn_after_cancel_never_runs() {
        let ran = Arc::new(AtomicU32::new(0));
        let mut cohort: Cohort<()> = Cohort::new();
        cohort.cancel();
        assert!(cohort.is_cancelled());

        let counter = ran.clone();
        cohort.spawn(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(())
        });

        // Cancelled tasks are not failures.
        assert_eq!(cohort.join().await.unwrap(), Vec::<()>::new());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_join_aborts_in_flight_tasks() {
        let finished = Arc::new(AtomicU32::new(0));
        let mut cohort: Cohort<()> = Cohort::new();
        for _ in 0..3 {
            let finished = finished.clone();
            cohort.spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(())
            });
        }

        let timed_out = tokio::time::timeout(Duration::from_millis(10), cohort.join()).await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_cohort_aborts_unjoined_tasks() {
        let finished = Arc::new(AtomicU32::new(0));
        {
            let mut cohort: Cohort<()> = Cohort::new();
            let counter = finished.clone();
            cohort.spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(())
            });
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_cohort_joins_immediately() {
        let cohort: Cohort<i32> = Cohort::new();
        assert!(cohort.join().await.unwrap().is_empty());
    }
}
