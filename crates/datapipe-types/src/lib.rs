//! Pure data types for datapipe — errors, transform failures, producer state.
//!
//! This crate is a leaf dependency with no async runtime. It exists so that
//! code which only inspects pipeline outcomes (reporting, retries built on top
//! of a pipeline) can match on errors without pulling in tokio.

pub mod error;
pub mod failure;
pub mod state;

// Flat re-exports for convenience
pub use error::*;
pub use failure::*;
pub use state::*;
