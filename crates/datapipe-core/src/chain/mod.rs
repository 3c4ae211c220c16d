//! Named stage factories for fluent composition.
//!
//! Any stage can be made available as `producer.chain("name", args)` by
//! registering a factory under that name. Lookups go through a
//! [`ChainRegistry`], usually the process-wide one.
//!
//! # Architecture
//!
//! ```text
//! ChainRegistry (RwLock<HashMap<name, ChainEntry>>)
//! ├── description   (for help output)
//! ├── signature     (item type -> output type)
//! └── factory       (BoxProducer<T>, ChainArgs) -> BoxProducer<U>
//! ```
//!
//! Factories are typed on their item and output types. Asking for a name
//! with other types fails with `ChainSignature` rather than panicking.

mod args;
mod builtin;
mod registry;

pub use args::ChainArgs;
pub use builtin::{register_map, transform, Transform};
pub use registry::{ChainFactory, ChainInfo, ChainRegistry};
