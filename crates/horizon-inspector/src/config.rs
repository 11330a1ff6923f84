//! Display configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```
//! use horizon_inspector::DisplayConfig;
//!
//! let config = DisplayConfig::from_toml_str(r#"
//!     poll_interval_ms = 20
//!
//!     [window]
//!     title = "Physics debug"
//! "#).unwrap();
//!
//! assert_eq!(config.poll_interval_ms, 20);
//! assert_eq!(config.window.min_width, 1024);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level configuration of a [`Display`](crate::Display).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Name handed to the toolkit when creating the application context.
    pub app_name: String,
    /// Name of the background UI thread.
    pub thread_name: String,
    /// Sleep between iterations of the steady-state UI loop.
    pub poll_interval_ms: u64,
    /// Sleep between visibility checks in `block_for_close`.
    pub close_poll_interval_ms: u64,
    /// How often the parked UI thread re-checks whether it should exit.
    pub shutdown_poll_ms: u64,
    /// Main window settings.
    pub window: WindowConfig,
    /// Tree view settings.
    pub tree: TreeConfig,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            app_name: "DisplayInterface".to_string(),
            thread_name: "inspector-ui".to_string(),
            poll_interval_ms: 10,
            close_poll_interval_ms: 500,
            shutdown_poll_ms: 50,
            window: WindowConfig::default(),
            tree: TreeConfig::default(),
        }
    }
}

impl DisplayConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Read and parse a TOML configuration file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn close_poll_interval(&self) -> Duration {
        Duration::from_millis(self.close_poll_interval_ms.max(1))
    }

    pub fn shutdown_poll(&self) -> Duration {
        Duration::from_millis(self.shutdown_poll_ms.max(1))
    }
}

/// Main window settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Display Interface".to_string(),
            min_width: 1024,
            min_height: 768,
        }
    }
}

/// Tree view settings.
///
/// The width fields are in logical pixels and only feed the first-column
/// width computation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Label of the synthetic root row.
    pub root_label: String,
    /// Horizontal offset per tree level.
    pub indentation: f32,
    /// Width of one grapheme of label text.
    pub char_width: f32,
    /// Width reserved for the check box.
    pub checkbox_width: f32,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            root_label: "All Displayed Items".to_string(),
            indentation: 20.0,
            char_width: 7.0,
            checkbox_width: 20.0,
        }
    }
}
