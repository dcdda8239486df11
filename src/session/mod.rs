//! Session management: windows, load signals, navigation control

pub mod context;
pub mod load;
pub mod navigation;
pub mod window;

#[cfg(test)]
mod tests;

pub use context::Context;
pub use load::{LoadObserver, LoadStatus, LoadStatusSignal};
pub use navigation::NavigationController;
pub use window::Window;
