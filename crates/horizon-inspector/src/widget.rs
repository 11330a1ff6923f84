//! The seam between the inspector and a windowing toolkit.
//!
//! The inspector owns no toolkit code. A [`UiBackend`] builds the three
//! toolkit objects the display needs, on the background UI thread, in
//! dependency order:
//!
//! 1. the application context, returned as an [`EventPump`];
//! 2. the [`MainWindow`];
//! 3. the [`RenderWidget`] hosted by that window.
//!
//! # Locks
//!
//! Two [`AccessLock`]s guard toolkit state:
//!
//! - the render widget's *scene lock* guards the scene graph it draws;
//! - the main window's *window lock* guards the window's own widget tree.
//!
//! The UI loop only ever try-locks them, scene lock first. The display tree
//! takes the scene lock (never the window lock) while already holding its own
//! tree lock. An [`EventPump`] therefore must not block on the tree lock while
//! pumping; a tree view should read rows with
//! [`DisplayTree::try_visible_rows`] and report clicks as [`ViewInteraction`]s,
//! which the UI loop applies after releasing both locks.

use std::sync::Arc;

use horizon_inspector_core::{AccessLock, NodeRef};

use crate::config::WindowConfig;
use crate::error::BackendError;
use crate::input::{InputBinding, InputHandler, TrackingTarget};
use crate::tree::{DisplayTree, HandleId};

/// A 3D viewport rendering a scene graph.
pub trait RenderWidget: Send + Sync {
    /// Lock guarding the scene graph against the render traversal.
    fn scene_lock(&self) -> &AccessLock;

    /// Root of the rendered scene graph.
    fn root_group(&self) -> NodeRef;

    /// Replace the root of the rendered scene graph.
    fn set_root_group(&self, root: NodeRef);

    /// Register an input handler. Returns `false` if the widget rejected it.
    fn add_input_handler(
        &self,
        binding: InputBinding,
        handler: InputHandler,
        description: &str,
    ) -> bool;

    /// Point the camera at a node and follow it.
    fn track_node(&self, target: TrackingTarget) -> bool;
}

/// The top-level window hosting the render widget and the tree view.
pub trait MainWindow: Send + Sync {
    /// Lock guarding the window's widget tree.
    fn window_lock(&self) -> &AccessLock;

    fn is_visible(&self) -> bool;

    /// Ask the window to close. Returns `false` if it refused.
    fn close(&self) -> bool;

    /// Place the render widget in the window.
    fn set_render_widget(&self, widget: Arc<dyn RenderWidget>);

    /// Place the tree view in the window.
    fn set_tree_view(&self, tree: Arc<DisplayTree>);
}

/// A user interaction with a tree view row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewInteraction {
    /// The row's check box was flipped.
    Toggled(HandleId),
    /// The row was clicked without changing its check box.
    Clicked(HandleId),
    Expanded(HandleId),
    Collapsed(HandleId),
}

/// The toolkit's event loop, driven one batch at a time.
///
/// Created and used only on the UI thread.
pub trait EventPump {
    /// Process pending toolkit events.
    ///
    /// Called with the scene lock and the window lock held. Returns the tree
    /// interactions that occurred, in order.
    fn process_events(&mut self) -> Vec<ViewInteraction>;
}

/// Factory for the toolkit objects the display needs.
pub trait UiBackend: Send + Sync {
    /// Create the toolkit application context.
    fn create_context(&self, app_name: &str) -> Result<Box<dyn EventPump>, BackendError>;

    /// Create the main window.
    fn create_main_window(
        &self,
        config: &WindowConfig,
    ) -> Result<Arc<dyn MainWindow>, BackendError>;

    /// Create the render widget that will live in `window`.
    fn create_render_widget(
        &self,
        window: &Arc<dyn MainWindow>,
    ) -> Result<Arc<dyn RenderWidget>, BackendError>;

    /// Ask the toolkit application to exit.
    fn request_exit(&self);
}
