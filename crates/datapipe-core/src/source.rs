//! Adapters that turn plain sequences into producers.
//!
//! Both adapters forward items 1:1 in input order and keep reporting
//! end-of-sequence once the underlying sequence is exhausted, even if it
//! would otherwise resume (a non-fused iterator or stream).

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};

use datapipe_types::PipeResult;

use crate::producer::Producer;

/// Wraps any iterator, finite or infinite.
///
/// ```
/// use datapipe_core::{Producer, SourceAdapter};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> datapipe_core::PipeResult<()> {
/// let mut source = SourceAdapter::new([3, 6, 9]);
/// assert_eq!(source.pull().await?, Some(3));
/// assert_eq!(source.pull().await?, Some(6));
/// assert_eq!(source.pull().await?, Some(9));
/// assert_eq!(source.pull().await?, None);
/// # Ok(())
/// # }
/// ```
pub struct SourceAdapter<I> {
    iter: I,
    done: bool,
}

impl<I: Iterator> SourceAdapter<I> {
    /// Wrap anything iterable.
    pub fn new<S>(iterable: S) -> Self
    where
        S: IntoIterator<IntoIter = I>,
    {
        Self {
            iter: iterable.into_iter(),
            done: false,
        }
    }
}

#[async_trait]
impl<I> Producer for SourceAdapter<I>
where
    I: Iterator + Send,
    I::Item: Send + 'static,
{
    type Item = I::Item;

    async fn pull(&mut self) -> PipeResult<Option<Self::Item>> {
        if self.done {
            return Ok(None);
        }
        let next = self.iter.next();
        if next.is_none() {
            self.done = true;
        }
        Ok(next)
    }
}

/// Wraps an async stream. Pulls suspend whenever the stream does.
///
/// Streams that are not `Unpin` can be wrapped after `Box::pin`.
pub struct StreamSource<S> {
    stream: S,
    done: bool,
}

impl<S> StreamSource<S>
where
    S: Stream + Send + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            done: false,
        }
    }
}

#[async_trait]
impl<S> Producer for StreamSource<S>
where
    S: Stream + Send + Unpin,
    S::Item: Send + 'static,
{
    type Item = S::Item;

    async fn pull(&mut self) -> PipeResult<Option<Self::Item>> {
        if self.done {
            return Ok(None);
        }
        let next = self.stream.next().await;
        if next.is_none() {
            self.done = true;
        }
        Ok(next)
    }
}
