//! datapipe-core: lazy, pull-based async pipelines.
//!
//! This crate provides:
//!
//! - **Producer**: the single-pass async sequence contract every stage implements
//! - **Sources**: adapters turning iterators and streams into producers
//! - **ConcurrentMapper**: fans each upstream item out to its own task, fails
//!   fast as a cohort, and delivers results in upstream order
//! - **Chain registry**: named stage factories for `producer.chain("name", args)`
//! - **Config**: TOML-backed settings for the registry
//!
//! # Example
//!
//! ```
//! use datapipe_core::{ProducerExt, SourceAdapter};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> datapipe_core::PipeResult<()> {
//! let doubled = SourceAdapter::new(vec![1, 2, 3])
//!     .map(|x: i32| async move { Ok::<_, anyhow::Error>(x * 2) })
//!     .collect_vec()
//!     .await?;
//! assert_eq!(doubled, vec![2, 4, 6]);
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod config;
pub mod mapper;
pub mod producer;
pub mod source;

pub use chain::{
    register_map, transform, ChainArgs, ChainFactory, ChainInfo, ChainRegistry, Transform,
};
pub use config::{DatapipeConfig, DuplicatePolicy, RegistryConfig};
pub use mapper::ConcurrentMapper;
pub use producer::{BoxProducer, Producer, ProducerExt};
pub use source::{SourceAdapter, StreamSource};

// ═══════════════════════════════════════════════════════════════════════════
// Error and state types (from datapipe-types)
// ═══════════════════════════════════════════════════════════════════════════

pub use datapipe_types::{
    short_type_name, CohortFailure, PipeError, PipeResult, ProducerState, TransformFailure,
};
