//! A windowless toolkit backend.
//!
//! [`HeadlessBackend`] implements the toolkit seam without any real windows.
//! It is useful for running an inspector-instrumented program on a machine
//! without a display, and it is the toolkit double used by the tests:
//!
//! - [`HeadlessStats`] counts every toolkit object built and every event
//!   batch pumped;
//! - [`HeadlessBackend::set_failure`] makes the bootstrap fail at a chosen
//!   stage;
//! - [`HeadlessController`] scripts UI events (tree interactions, input,
//!   closing the window) that the next pump delivers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use horizon_inspector_core::logging::targets;
use horizon_inspector_core::scene::Group;
use horizon_inspector_core::{AccessLock, NodeRef};
use parking_lot::{Mutex, RwLock};

use crate::config::WindowConfig;
use crate::error::BackendError;
use crate::input::{
    HandlerRegistry, InputBinding, InputEvent, InputHandler, TrackingTarget, run_handlers,
};
use crate::tree::{DisplayTree, RowView};
use crate::widget::{EventPump, MainWindow, RenderWidget, UiBackend, ViewInteraction};

/// Bootstrap stage at which a [`HeadlessBackend`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    Context,
    Window,
    Widget,
}

/// A scripted UI event.
#[derive(Debug, Clone)]
pub enum HeadlessEvent {
    Interaction(ViewInteraction),
    Input(InputEvent),
    CloseWindow,
}

/// Construction and activity counters.
#[derive(Debug, Default)]
pub struct HeadlessStats {
    contexts: AtomicUsize,
    windows: AtomicUsize,
    widgets: AtomicUsize,
    exit_requests: AtomicUsize,
    batches: AtomicUsize,
}

impl HeadlessStats {
    pub fn contexts_created(&self) -> usize {
        self.contexts.load(Ordering::SeqCst)
    }

    pub fn windows_created(&self) -> usize {
        self.windows.load(Ordering::SeqCst)
    }

    pub fn widgets_created(&self) -> usize {
        self.widgets.load(Ordering::SeqCst)
    }

    pub fn exit_requests(&self) -> usize {
        self.exit_requests.load(Ordering::SeqCst)
    }

    /// Event batches pumped by the UI loop.
    pub fn batches_pumped(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

struct BackendShared {
    stats: HeadlessStats,
    failure: Mutex<Option<BootstrapStage>>,
    window: Mutex<Option<Arc<HeadlessWindow>>>,
    widget: Mutex<Option<Arc<HeadlessWidget>>>,
    events_tx: Sender<HeadlessEvent>,
    events_rx: Receiver<HeadlessEvent>,
}

/// A [`UiBackend`] that builds invisible toolkit objects.
///
/// Clones share state, so a test can keep one clone and hand another to the
/// display.
#[derive(Clone)]
pub struct HeadlessBackend {
    shared: Arc<BackendShared>,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            shared: Arc::new(BackendShared {
                stats: HeadlessStats::default(),
                failure: Mutex::new(None),
                window: Mutex::new(None),
                widget: Mutex::new(None),
                events_tx,
                events_rx,
            }),
        }
    }

    pub fn stats(&self) -> &HeadlessStats {
        &self.shared.stats
    }

    /// Fail every bootstrap at `stage` until cleared with `None`.
    pub fn set_failure(&self, stage: Option<BootstrapStage>) {
        *self.shared.failure.lock() = stage;
    }

    /// A handle for scripting UI events.
    pub fn controller(&self) -> HeadlessController {
        HeadlessController {
            events: self.shared.events_tx.clone(),
        }
    }

    /// The most recently created window.
    pub fn window(&self) -> Option<Arc<HeadlessWindow>> {
        self.shared.window.lock().clone()
    }

    /// The most recently created render widget.
    pub fn widget(&self) -> Option<Arc<HeadlessWidget>> {
        self.shared.widget.lock().clone()
    }

    fn check_failure(&self, stage: BootstrapStage) -> Result<(), BackendError> {
        if *self.shared.failure.lock() != Some(stage) {
            return Ok(());
        }
        let reason = "headless backend configured to fail".to_string();
        Err(match stage {
            BootstrapStage::Context => BackendError::Context(reason),
            BootstrapStage::Window => BackendError::Window(reason),
            BootstrapStage::Widget => BackendError::Widget(reason),
        })
    }
}

impl UiBackend for HeadlessBackend {
    fn create_context(&self, app_name: &str) -> Result<Box<dyn EventPump>, BackendError> {
        self.check_failure(BootstrapStage::Context)?;
        self.shared.stats.contexts.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(target: targets::HEADLESS, app_name, "created context");
        Ok(Box::new(HeadlessPump {
            backend: self.shared.clone(),
        }))
    }

    fn create_main_window(
        &self,
        config: &WindowConfig,
    ) -> Result<Arc<dyn MainWindow>, BackendError> {
        self.check_failure(BootstrapStage::Window)?;
        self.shared.stats.windows.fetch_add(1, Ordering::SeqCst);
        let window = Arc::new(HeadlessWindow::new(config.clone()));
        *self.shared.window.lock() = Some(window.clone());
        Ok(window)
    }

    fn create_render_widget(
        &self,
        _window: &Arc<dyn MainWindow>,
    ) -> Result<Arc<dyn RenderWidget>, BackendError> {
        self.check_failure(BootstrapStage::Widget)?;
        self.shared.stats.widgets.fetch_add(1, Ordering::SeqCst);
        let widget = Arc::new(HeadlessWidget::new());
        *self.shared.widget.lock() = Some(widget.clone());
        Ok(widget)
    }

    fn request_exit(&self) {
        self.shared.stats.exit_requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Sends scripted events to a [`HeadlessBackend`].
#[derive(Debug, Clone)]
pub struct HeadlessController {
    events: Sender<HeadlessEvent>,
}

impl HeadlessController {
    pub fn send(&self, event: HeadlessEvent) {
        // the receiver lives as long as the backend
        let _ = self.events.send(event);
    }

    pub fn interact(&self, interaction: ViewInteraction) {
        self.send(HeadlessEvent::Interaction(interaction));
    }

    pub fn input(&self, event: InputEvent) {
        self.send(HeadlessEvent::Input(event));
    }

    pub fn close_window(&self) {
        self.send(HeadlessEvent::CloseWindow);
    }
}

struct HeadlessPump {
    backend: Arc<BackendShared>,
}

impl EventPump for HeadlessPump {
    fn process_events(&mut self) -> Vec<ViewInteraction> {
        self.backend.stats.batches.fetch_add(1, Ordering::SeqCst);
        let window = self.backend.window.lock().clone();
        let widget = self.backend.widget.lock().clone();

        let mut interactions = Vec::new();
        for event in self.backend.events_rx.try_iter() {
            match event {
                HeadlessEvent::Interaction(interaction) => interactions.push(interaction),
                HeadlessEvent::Input(input) => {
                    if let Some(widget) = &widget {
                        widget.dispatch(&input);
                    }
                }
                HeadlessEvent::CloseWindow => {
                    if let Some(window) = &window {
                        window.close();
                    }
                }
            }
        }

        if let Some(window) = &window {
            window.refresh_rows();
        }
        interactions
    }
}

/// An invisible main window.
pub struct HeadlessWindow {
    config: WindowConfig,
    window_lock: AccessLock,
    visible: AtomicBool,
    refuse_close: AtomicBool,
    widget: Mutex<Option<Arc<dyn RenderWidget>>>,
    tree: Mutex<Option<Arc<DisplayTree>>>,
    rows: Mutex<Vec<RowView>>,
}

impl HeadlessWindow {
    fn new(config: WindowConfig) -> Self {
        Self {
            config,
            window_lock: AccessLock::new("window"),
            visible: AtomicBool::new(true),
            refuse_close: AtomicBool::new(false),
            widget: Mutex::new(None),
            tree: Mutex::new(None),
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Make `close()` fail.
    pub fn set_refuse_close(&self, refuse: bool) {
        self.refuse_close.store(refuse, Ordering::SeqCst);
    }

    pub fn has_render_widget(&self) -> bool {
        self.widget.lock().is_some()
    }

    pub fn tree(&self) -> Option<Arc<DisplayTree>> {
        self.tree.lock().clone()
    }

    /// Rows shown by the tree view as of the last pumped batch.
    pub fn rows(&self) -> Vec<RowView> {
        self.rows.lock().clone()
    }

    fn refresh_rows(&self) {
        let Some(tree) = self.tree() else {
            return;
        };
        // keep the previous rows if an application thread holds the tree
        if let Some(rows) = tree.try_visible_rows() {
            *self.rows.lock() = rows;
        }
    }
}

impl MainWindow for HeadlessWindow {
    fn window_lock(&self) -> &AccessLock {
        &self.window_lock
    }

    fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    fn close(&self) -> bool {
        if self.refuse_close.load(Ordering::SeqCst) {
            return false;
        }
        self.visible.store(false, Ordering::SeqCst);
        true
    }

    fn set_render_widget(&self, widget: Arc<dyn RenderWidget>) {
        *self.widget.lock() = Some(widget);
    }

    fn set_tree_view(&self, tree: Arc<DisplayTree>) {
        *self.tree.lock() = Some(tree);
    }
}

/// An invisible render widget with an in-memory root group.
pub struct HeadlessWidget {
    scene_lock: AccessLock,
    root: RwLock<NodeRef>,
    handlers: Mutex<HandlerRegistry>,
    tracking: Mutex<Option<TrackingTarget>>,
}

impl Default for HeadlessWidget {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessWidget {
    pub fn new() -> Self {
        Self {
            scene_lock: AccessLock::new("scene"),
            root: RwLock::new(Group::new_ref()),
            handlers: Mutex::new(HandlerRegistry::new()),
            tracking: Mutex::new(None),
        }
    }

    /// Route an input event to the registered handlers.
    ///
    /// The handlers run after the registry lock is released.
    pub fn dispatch(&self, event: &InputEvent) -> bool {
        let handlers = self.handlers.lock().matching(event);
        run_handlers(&handlers, event)
    }

    pub fn handler_descriptions(&self) -> Vec<(InputBinding, String)> {
        self.handlers.lock().descriptions()
    }

    /// The node the camera currently follows.
    pub fn tracking(&self) -> Option<TrackingTarget> {
        self.tracking.lock().clone()
    }
}

impl RenderWidget for HeadlessWidget {
    fn scene_lock(&self) -> &AccessLock {
        &self.scene_lock
    }

    fn root_group(&self) -> NodeRef {
        self.root.read().clone()
    }

    fn set_root_group(&self, root: NodeRef) {
        *self.root.write() = root;
    }

    fn add_input_handler(
        &self,
        binding: InputBinding,
        handler: InputHandler,
        description: &str,
    ) -> bool {
        self.handlers.lock().register(binding, handler, description);
        true
    }

    fn track_node(&self, target: TrackingTarget) -> bool {
        *self.tracking.lock() = Some(target);
        true
    }
}
