//! The built-in `map` operation for the chain registry.
//!
//! Registries are typed per item/output pair, so `map` is installed once for
//! each pair a program uses:
//!
//! ```
//! use datapipe_core::{register_map, transform, ChainArgs, ChainRegistry, ProducerExt, SourceAdapter};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> datapipe_core::PipeResult<()> {
//! let registry = ChainRegistry::new();
//! register_map::<u32, u32>(&registry, "map")?;
//!
//! let times_two = transform(|x: u32| async move { Ok::<_, anyhow::Error>(x * 2) });
//! let doubled = SourceAdapter::new([1u32, 2, 3])
//!     .chain_with::<u32>(&registry, "map", ChainArgs::new().with(times_two))?
//!     .collect_vec()
//!     .await?;
//! assert_eq!(doubled, vec![2, 4, 6]);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use datapipe_types::PipeResult;

use crate::mapper::ConcurrentMapper;
use crate::producer::{BoxProducer, ProducerExt};

use super::args::ChainArgs;
use super::registry::ChainRegistry;

/// A type-erased async transform, the argument form `map` expects.
pub type Transform<T, U> = Arc<dyn Fn(T) -> BoxFuture<'static, anyhow::Result<U>> + Send + Sync>;

/// Erase an async function into a [`Transform`].
pub fn transform<T, U, F, Fut, E>(f: F) -> Transform<T, U>
where
    T: 'static,
    U: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<U, E>> + Send + 'static,
    E: Into<anyhow::Error> + 'static,
{
    Arc::new(move |item| f(item).map(|result| result.map_err(Into::into)).boxed())
}

const MAP_DESCRIPTION: &str =
    "Apply an async function to each item concurrently; results keep upstream order";

/// Register the concurrent `map` stage under `name` for `T -> U`.
///
/// The stage takes one argument, a [`Transform<T, U>`].
pub fn register_map<T, U>(registry: &ChainRegistry, name: &str) -> PipeResult<()>
where
    T: Send + 'static,
    U: Send + 'static,
{
    registry.register(
        name,
        MAP_DESCRIPTION,
        |upstream: BoxProducer<T>, mut args: ChainArgs| {
            let f: Transform<T, U> = args.take(0)?;
            Ok(ConcurrentMapper::new(upstream, move |item| f(item)).boxed())
        },
    )
}
