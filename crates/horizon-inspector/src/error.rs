//! Error types for the inspector crate.

use std::path::PathBuf;

use horizon_inspector_core::SceneError;
use thiserror::Error;

/// Errors raised by [`DisplayTree`](crate::DisplayTree) operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// No render widget has been attached, so there is no root handle.
    #[error("display tree has no render widget")]
    NoWidget,

    /// A path segment resolved to an existing handle whose node cannot hold
    /// children.
    #[error("{name} already exists as a non-group ({class_name})")]
    NotAGroup {
        name: String,
        class_name: &'static str,
    },

    /// The handle does not belong to this tree.
    #[error("unknown display handle")]
    UnknownHandle,

    /// A render widget is already attached.
    #[error("display tree already has a render widget")]
    AlreadyAttached,
}

/// Result type for tree operations.
pub type TreeResult<T> = std::result::Result<T, TreeError>;

/// Errors reported by a [`UiBackend`](crate::UiBackend) while constructing
/// toolkit objects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The toolkit application context could not be created.
    #[error("failed to create application context: {0}")]
    Context(String),

    /// The main window could not be created.
    #[error("failed to create main window: {0}")]
    Window(String),

    /// The render widget could not be created.
    #[error("failed to create render widget: {0}")]
    Widget(String),
}

/// Why the lazy window bootstrap did not produce a window.
///
/// Cloned into every thread waiting on the readiness latch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    /// The backend failed to construct a toolkit object.
    #[error("no main window: {0}")]
    Backend(#[from] BackendError),

    /// The freshly built tree refused the render widget.
    #[error("no main window: {0}")]
    Tree(#[from] TreeError),

    /// The display was dropped before the bootstrap could run.
    #[error("display is shutting down")]
    ShuttingDown,

    /// The UI thread is gone.
    #[error("UI thread exited")]
    ThreadExited,
}

/// Errors raised while loading a [`DisplayConfig`](crate::DisplayConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML text did not describe a valid configuration.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Umbrella error for the inspector crate.
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The UI thread could not be spawned.
    #[error("failed to spawn UI thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Result type for inspector operations.
pub type Result<T> = std::result::Result<T, DisplayError>;
