//! Logging facilities for Horizon Inspector.
//!
//! Horizon Inspector uses the `tracing` crate for instrumentation and never
//! installs a subscriber itself. To see logs, install one in your
//! application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt::init();
//!     // ...
//! }
//! ```
//!
//! Every event carries one of the [`targets`] so subsystems can be filtered
//! individually, e.g. `RUST_LOG=horizon_inspector::bootstrap=debug`.

/// Target names for log filtering.
pub mod targets {
    /// Core crate target.
    pub const CORE: &str = "horizon_inspector_core";
    /// Access lock target.
    pub const SYNC: &str = "horizon_inspector_core::sync";
    /// Signal dispatch target.
    pub const SIGNAL: &str = "horizon_inspector_core::signal";
    /// Pause gate target.
    pub const PAUSE: &str = "horizon_inspector_core::pause";
    /// Scene-graph target.
    pub const SCENE: &str = "horizon_inspector_core::scene";
    /// Display tree target.
    pub const TREE: &str = "horizon_inspector::tree";
    /// Façade target.
    pub const DISPLAY: &str = "horizon_inspector::display";
    /// Lazy window bootstrap target.
    pub const BOOTSTRAP: &str = "horizon_inspector::bootstrap";
    /// Background UI loop target.
    pub const UI_LOOP: &str = "horizon_inspector::ui_loop";
    /// Input handler registry target.
    pub const INPUT: &str = "horizon_inspector::input";
    /// Headless backend target.
    pub const HEADLESS: &str = "horizon_inspector::headless";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Useful for timing multi-step operations such as a window bootstrap.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a new performance span named `name`.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_inspector::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Trace-level event on the core target.
#[macro_export]
macro_rules! inspector_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "horizon_inspector_core", $($arg)*)
    };
}

/// Debug-level event on the core target.
#[macro_export]
macro_rules! inspector_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "horizon_inspector_core", $($arg)*)
    };
}

/// Info-level event on the core target.
#[macro_export]
macro_rules! inspector_info {
    ($($arg:tt)*) => {
        tracing::info!(target: "horizon_inspector_core", $($arg)*)
    };
}

/// Warn-level event on the core target.
#[macro_export]
macro_rules! inspector_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "horizon_inspector_core", $($arg)*)
    };
}

/// Error-level event on the core target.
#[macro_export]
macro_rules! inspector_error {
    ($($arg:tt)*) => {
        tracing::error!(target: "horizon_inspector_core", $($arg)*)
    };
}
