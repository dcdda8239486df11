//! Configuration management for Oxidriver

use crate::{Error, Result};
use serde::Deserialize;
use std::env;

/// One generation of session timeouts, in milliseconds. Zero means unbounded.
///
/// A generation is immutable once configured; `reset` and `set_timeouts`
/// replace it wholesale.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Page-load timeout for `get` and the pending-load waits
    pub page_load_ms: u64,

    /// Budget for script evaluation on the engine thread
    pub script_ms: u64,

    /// Implicit wait used by element lookup collaborators
    pub implicit_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page_load_ms: 0,
            script_ms: 30_000,
            implicit_ms: 0,
        }
    }
}

/// Driver settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Initial timeout generation
    pub timeouts: Timeouts,

    /// IANA identifier of the spoofed time zone, e.g. "America/New_York".
    /// When set, the generated override script is injected into every new
    /// window before page scripts run.
    pub timezone: Option<String>,

    /// Log level
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            timezone: None,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from environment variables
    pub fn from_env() -> Result<Self> {
        let mut settings = Settings::default();

        if let Ok(timeout) = env::var("OXIDRIVER_PAGE_LOAD_TIMEOUT") {
            settings.timeouts.page_load_ms = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid OXIDRIVER_PAGE_LOAD_TIMEOUT"))?;
        }

        if let Ok(timeout) = env::var("OXIDRIVER_SCRIPT_TIMEOUT") {
            settings.timeouts.script_ms = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid OXIDRIVER_SCRIPT_TIMEOUT"))?;
        }

        if let Ok(timeout) = env::var("OXIDRIVER_IMPLICIT_WAIT") {
            settings.timeouts.implicit_ms = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid OXIDRIVER_IMPLICIT_WAIT"))?;
        }

        if let Ok(timezone) = env::var("OXIDRIVER_TIMEZONE") {
            settings.timezone = Some(timezone);
        }

        if let Ok(log_level) = env::var("OXIDRIVER_LOG_LEVEL") {
            settings.log_level = log_level;
        }

        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read settings file: {}", e)))?;

        let settings: Settings = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse settings: {}", e)))?;

        Ok(settings)
    }
}
