//! Horizon Inspector: a live tree-view and 3D viewport overlay for
//! inspecting scene graphs during development.
//!
//! Application code registers scene-graph nodes, input handlers and camera
//! tracking targets with a [`Display`]. The first registration lazily opens
//! the inspector window on a background UI thread; every registration after
//! that goes straight to the window's [`DisplayTree`] or render widget.
//!
//! The window toolkit is pluggable through [`UiBackend`]. The bundled
//! [`headless`] backend runs without any windows.
//!
//! # Example
//!
//! ```
//! use horizon_inspector::prelude::*;
//! use horizon_inspector::headless::HeadlessBackend;
//! use horizon_inspector_core::scene::Shape;
//!
//! let display = Display::new(HeadlessBackend::new()).unwrap();
//!
//! // Groups "Robot" and "Arm" are created on the way to "Gripper".
//! let gripper = Shape::new_ref("gripper");
//! assert!(display.add("Robot::Arm::Gripper", gripper.clone()));
//!
//! // Unchecking "Robot" hides the whole subtree.
//! let tree = display.tree().unwrap();
//! let robot = tree.find("Robot").unwrap();
//! tree.toggle(robot);
//! assert_eq!(gripper.node_mask(), 0);
//!
//! assert!(display.add_key_handler('r', |_| true, "reset"));
//! ```

mod config;
pub mod debug;
mod display;
mod error;
pub mod headless;
mod input;
pub mod prelude;
mod tree;
mod widget;

pub use horizon_inspector_core::logging;

pub use config::{DisplayConfig, TreeConfig, WindowConfig};
pub use debug::{TreeDebug, TreeFormatOptions, TreeStyle};
pub use display::{Display, DisplayBuilder, DisplayState, SceneAccess};
pub use error::{
    BackendError, BootstrapError, ConfigError, DisplayError, Result, TreeError, TreeResult,
};
pub use input::{
    DEFAULT_TRACK_CENTER, DEFAULT_TRACK_EYE, DEFAULT_TRACK_UP, HandlerRegistry, InputBinding,
    InputEvent, InputHandler, KeySymbol, MouseButtonMask, TrackingTarget, run_handlers,
};
pub use tree::{
    AddOptions, CheckState, DisplayItem, DisplayTree, HandleId, HandleKind, ItemCallback,
    PATH_SEPARATOR, RowView, TreeSignals,
};
pub use widget::{EventPump, MainWindow, RenderWidget, UiBackend, ViewInteraction};
