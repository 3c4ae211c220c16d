//! The producer contract and its fluent extension methods.
//!
//! A producer yields a lazy, single-pass async sequence. Consumers drive it by
//! calling [`Producer::pull`] until it returns `Ok(None)` (end-of-sequence) or
//! an error. Once a producer has ended it keeps ending: it never restarts.

use std::future::Future;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use datapipe_types::{short_type_name, PipeResult};

use crate::chain::{ChainArgs, ChainRegistry};
use crate::mapper::ConcurrentMapper;

/// A type-erased producer, as built by chain factories.
pub type BoxProducer<T> = Box<dyn Producer<Item = T>>;

/// A single-pass asynchronous sequence of items.
#[async_trait]
pub trait Producer: Send {
    /// The item type handed to the consumer on each pull.
    type Item: Send + 'static;

    /// Produce the next item, `Ok(None)` at end-of-sequence.
    ///
    /// After `Ok(None)` (or an error), every later call must return `Ok(None)`.
    async fn pull(&mut self) -> PipeResult<Option<Self::Item>>;

    /// The concrete type's bare name, for diagnostics.
    fn describe(&self) -> String {
        short_type_name::<Self>().to_string()
    }
}

#[async_trait]
impl<P> Producer for Box<P>
where
    P: Producer + ?Sized,
{
    type Item = P::Item;

    async fn pull(&mut self) -> PipeResult<Option<Self::Item>> {
        (**self).pull().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Fluent composition on top of [`Producer`].
///
/// Implemented for every `'static` producer.
#[async_trait]
pub trait ProducerExt: Producer + Sized + 'static {
    /// Erase the concrete producer type.
    fn boxed(self) -> BoxProducer<Self::Item> {
        Box::new(self)
    }

    /// Apply an async transform to every item concurrently.
    ///
    /// See [`ConcurrentMapper`] for the ordering and failure rules.
    fn map<U, F, Fut, E>(self, transform: F) -> ConcurrentMapper<Self, F, U>
    where
        F: Fn(Self::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<U, E>> + Send + 'static,
        E: Into<anyhow::Error> + Send + 'static,
        U: Send + 'static,
    {
        ConcurrentMapper::new(self, transform)
    }

    /// Build the stage registered under `name` in the process-wide registry.
    ///
    /// Fails with [`PipeError::NoSuchOperation`](datapipe_types::PipeError::NoSuchOperation)
    /// if nothing is registered under `name`.
    fn chain<U>(self, name: &str, args: ChainArgs) -> PipeResult<BoxProducer<U>>
    where
        U: Send + 'static,
    {
        self.chain_with(ChainRegistry::global(), name, args)
    }

    /// Like [`chain`](Self::chain), resolving against an explicit registry.
    fn chain_with<U>(
        self,
        registry: &ChainRegistry,
        name: &str,
        args: ChainArgs,
    ) -> PipeResult<BoxProducer<U>>
    where
        U: Send + 'static,
    {
        registry.build(name, self.boxed(), args)
    }

    /// Pull every item into a `Vec`, stopping at the first error.
    async fn collect_vec(mut self) -> PipeResult<Vec<Self::Item>> {
        let mut items = Vec::new();
        while let Some(item) = self.pull().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Adapt into a [`Stream`](futures::Stream).
    ///
    /// An error is yielded once, after which the stream ends.
    fn into_stream(self) -> BoxStream<'static, PipeResult<Self::Item>> {
        stream::unfold(Some(self), |state| async move {
            let mut producer = state?;
            match producer.pull().await {
                Ok(Some(item)) => Some((Ok(item), Some(producer))),
                Ok(None) => None,
                Err(err) => Some((Err(err), None)),
            }
        })
        .boxed()
    }
}

impl<P> ProducerExt for P where P: Producer + 'static {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceAdapter;

    #[tokio::test]
    async fn test_describe_is_bare_type_name() {
        let source = SourceAdapter::new(vec![1, 2, 3]);
        assert_eq!(source.describe(), "SourceAdapter");

        let boxed = SourceAdapter::new(vec![1]).boxed();
        assert_eq!(boxed.describe(), "SourceAdapter");
    }

    #[tokio::test]
    async fn test_boxed_producer_forwards_pull() {
        let mut boxed: BoxProducer<i32> = SourceAdapter::new(vec![7, 8]).boxed();
        assert_eq!(boxed.pull().await.unwrap(), Some(7));
        assert_eq!(boxed.pull().await.unwrap(), Some(8));
        assert_eq!(boxed.pull().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_into_stream_yields_all_items() {
        let items: Vec<i32> = SourceAdapter::new(0..4)
            .into_stream()
            .map(|r| r.unwrap())
            .collect()
            .await;
        assert_eq!(items, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_into_stream_ends_after_error() {
        let results: Vec<_> = SourceAdapter::new(vec![3, 4, 5])
            .map(|x: i32| async move {
                if x == 4 {
                    anyhow::bail!("Some problem with {x}");
                }
                Ok(x)
            })
            .into_stream()
            .collect()
            .await;
        assert_eq!(results.len(), 1);
        assert!(results[0].as_ref().is_err_and(|e| e.as_cohort().is_some()));
    }
}
