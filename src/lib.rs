//! Oxidriver: blocking automation core for an embedded rendering engine
//!
//! This library marshals driver commands onto the single engine-affine
//! thread, synchronizes page loads with bounded waits, and generates
//! time-zone spoofing scripts for injection into page contexts.

pub mod error;
pub mod config;

pub mod driver;
pub mod engine;
pub mod session;
pub mod timezone;

// Re-exports
pub use config::{Settings, Timeouts};
pub use driver::Driver;
pub use error::{Error, Result};

/// Oxidriver library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
