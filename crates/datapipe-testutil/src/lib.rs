//! Shared fixtures for datapipe tests.
//!
//! - [`init_tracing`]: route `tracing` output through the test harness
//! - [`transforms`]: canned async transforms (delayed arithmetic, targeted failures)
//! - [`producers`]: producers with observable pulls and scripted failures

pub mod producers;
pub mod transforms;

pub use producers::{FailingSource, PacedSource};
pub use transforms::{fail_on, sleep_then, times_three, times_two};

/// Install a test-friendly subscriber once per process.
///
/// Respects `RUST_LOG`; silent by default. Safe to call from every test.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init();
}
