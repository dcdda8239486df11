//! Engine abstraction and the single engine-affine execution thread

pub mod executor;
pub mod mock;
pub mod traits;

#[cfg(test)]
mod tests;

pub use executor::{CancelToken, EngineThreadExecutor};
pub use traits::{Engine, LoadEvent, View, ViewId};
