//! Unified error types for Oxidriver

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Oxidriver
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Page load did not settle within the configured budget
    #[error("Navigation timeout: {timeout_ms}ms reached")]
    NavigationTimeout { timeout_ms: u64 },

    /// Engine operation did not finish within the caller's budget
    #[error("Engine operation timeout: {timeout_ms}ms reached")]
    ExecutorTimeout { timeout_ms: u64 },

    /// Command issued against a session with no open window
    #[error("No such window: session has no open window")]
    NoActiveWindow,

    /// Switch or close against a handle that is not in the registry
    #[error("No such window: {0}")]
    UnknownWindowHandle(String),

    /// Script execution failed
    #[error("Script execution failed: {0}")]
    ScriptExecution(String),

    /// A blocking wait ended without a result (engine thread gone)
    #[error("Engine wait interrupted: {0}")]
    Interrupted(String),

    /// Time zone identifier not in the zone registry
    #[error("Unknown time zone: {0}")]
    UnknownTimezone(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new navigation timeout error
    pub fn navigation_timeout(timeout_ms: u64) -> Self {
        Error::NavigationTimeout { timeout_ms }
    }

    /// Create a new executor timeout error
    pub fn executor_timeout(timeout_ms: u64) -> Self {
        Error::ExecutorTimeout { timeout_ms }
    }

    /// Create a new unknown-window error
    pub fn unknown_window<S: Into<String>>(handle: S) -> Self {
        Error::UnknownWindowHandle(handle.into())
    }

    /// Create a new script execution error
    pub fn script_execution<S: Into<String>>(msg: S) -> Self {
        Error::ScriptExecution(msg.into())
    }

    /// Create a new interrupted error
    pub fn interrupted<S: Into<String>>(msg: S) -> Self {
        Error::Interrupted(msg.into())
    }

    /// Create a new unknown time zone error
    pub fn unknown_timezone<S: Into<String>>(id: S) -> Self {
        Error::UnknownTimezone(id.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }
}
