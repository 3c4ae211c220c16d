//! Canned transforms.

use std::time::Duration;

use futures::future::BoxFuture;

/// The future type returned by the closure-producing fixtures.
pub type TransformFuture<T> = BoxFuture<'static, anyhow::Result<T>>;

/// Sleep 200ms, then double.
pub async fn times_two(x: i64) -> anyhow::Result<i64> {
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(x * 2)
}

/// Sleep 300ms, then triple.
pub async fn times_three(x: i64) -> anyhow::Result<i64> {
    tokio::time::sleep(Duration::from_millis(300)).await;
    Ok(x * 3)
}

/// After 100ms, fail for `bad` and pass every other value through.
pub fn fail_on(bad: i64) -> impl Fn(i64) -> TransformFuture<i64> + Clone + Send + Sync + 'static {
    move |x| -> TransformFuture<i64> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if x == bad {
                anyhow::bail!("Some problem with {x}");
            }
            Ok(x)
        })
    }
}

/// Sleep for `latency(x)` milliseconds, then return `x` unchanged.
pub fn sleep_then<F>(latency: F) -> impl Fn(u64) -> TransformFuture<u64> + Send + Sync + 'static
where
    F: Fn(u64) -> u64 + Send + Sync + 'static,
{
    move |x| -> TransformFuture<u64> {
        let delay = Duration::from_millis(latency(x));
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(x)
        })
    }
}
