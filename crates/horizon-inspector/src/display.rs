//! The display façade and its background UI thread.
//!
//! A [`Display`] owns one background UI thread for its whole lifetime. The
//! thread stays parked until an application thread registers something (a
//! node, an input handler, a tracking target) or asks for the scene lock.
//! That first request *bootstraps* the display: the UI thread builds the
//! application context, the main window, the render widget and the tree, in
//! that order, and publishes the outcome through a [`ReadinessLatch`]. Every
//! caller waiting on the latch sees the same outcome, and a successful
//! bootstrap happens-before every successful registration.
//!
//! # Bootstrap protocol
//!
//! ```text
//! application thread                    UI thread
//! ------------------                    ---------
//! window exists? -> done                parked on the doorbell
//! state = BootstrapPending
//! latch = current latch
//! ring doorbell ------------------->    wake
//! latch.wait()                          build context, window, widget, tree
//!                                       state = Ready
//!       <-------------------------      latch.open(Ok)
//!                                       steady-state loop
//! ```
//!
//! A failed bootstrap opens the latch with the error, installs a fresh latch
//! and parks the UI thread again, so a later registration retries.
//!
//! # Steady-state loop
//!
//! The UI thread never blocks on a lock. Each iteration it try-locks the
//! render widget's scene lock, then the main window's lock, and only with both
//! held pumps one batch of toolkit events. Tree interactions reported by the
//! batch are applied after both locks are released, so the UI thread takes
//! the tree lock before the scene lock, like every application thread. It
//! then sleeps for the poll interval whether or not it got the locks.
//! Application threads holding the scene lock for a long multi-step edit
//! therefore delay the UI by at most one poll interval after they release it,
//! and are never stuck behind the UI thread.

use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use glam::DVec3;
use horizon_inspector_core::logging::targets;
use horizon_inspector_core::{NodeRef, PauseGate, PerfSpan, ReadinessLatch};
use parking_lot::Mutex;

use crate::config::DisplayConfig;
use crate::error::{BootstrapError, DisplayError, Result};
use crate::input::{
    InputBinding, InputEvent, InputHandler, KeySymbol, MouseButtonMask, TrackingTarget,
};
use crate::tree::{AddOptions, DisplayTree};
use crate::widget::{EventPump, MainWindow, RenderWidget, UiBackend};

/// Lifecycle of a [`Display`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayState {
    /// Nothing registered yet; the UI thread is parked.
    Uninitialized,
    /// A bootstrap has been requested and not yet completed.
    BootstrapPending,
    /// Window, render widget and tree exist.
    Ready,
    /// The display is being dropped.
    ShuttingDown,
    /// The UI thread has been joined.
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BootSignal {
    DataAvailable,
    Shutdown,
}

type BootstrapLatch = ReadinessLatch<std::result::Result<(), BootstrapError>>;

#[derive(Default)]
struct Slots {
    window: Option<Arc<dyn MainWindow>>,
    widget: Option<Arc<dyn RenderWidget>>,
    tree: Option<Arc<DisplayTree>>,
}

/// State shared between the façade and the UI thread.
struct Shared {
    config: DisplayConfig,
    backend: Arc<dyn UiBackend>,
    have_data: AtomicBool,
    should_run: AtomicBool,
    state: Mutex<DisplayState>,
    slots: Mutex<Slots>,
    latch: Mutex<Arc<BootstrapLatch>>,
    doorbell: Sender<BootSignal>,
    pause: PauseGate,
}

/// Toolkit objects the UI thread drives once bootstrapped.
struct UiSession {
    pump: Box<dyn EventPump>,
    window: Arc<dyn MainWindow>,
    widget: Arc<dyn RenderWidget>,
    tree: Arc<DisplayTree>,
}

impl Shared {
    fn state(&self) -> DisplayState {
        *self.state.lock()
    }

    /// Move to `next` unless the display is already shutting down.
    fn advance(&self, next: DisplayState) {
        let mut state = self.state.lock();
        if !matches!(*state, DisplayState::ShuttingDown | DisplayState::Stopped) {
            *state = next;
        }
    }

    fn bootstrap(&self) -> std::result::Result<UiSession, BootstrapError> {
        let _span = PerfSpan::new("display_bootstrap");
        tracing::info!(target: targets::BOOTSTRAP, app_name = %self.config.app_name, "bootstrapping main window");

        let pump = self.backend.create_context(&self.config.app_name)?;
        let window = self.backend.create_main_window(&self.config.window)?;
        let (widget, tree) = match self.build_contents(&window) {
            Ok(contents) => contents,
            Err(err) => {
                window.close();
                return Err(err);
            }
        };

        {
            let mut slots = self.slots.lock();
            slots.window = Some(window.clone());
            slots.widget = Some(widget.clone());
            slots.tree = Some(tree.clone());
        }
        self.advance(DisplayState::Ready);
        tracing::info!(target: targets::BOOTSTRAP, "main window ready");

        Ok(UiSession {
            pump,
            window,
            widget,
            tree,
        })
    }

    /// Build the render widget and the tree and place them in `window`.
    fn build_contents(
        &self,
        window: &Arc<dyn MainWindow>,
    ) -> std::result::Result<(Arc<dyn RenderWidget>, Arc<DisplayTree>), BootstrapError> {
        let widget = self.backend.create_render_widget(window)?;
        window.set_render_widget(widget.clone());

        let tree = Arc::new(DisplayTree::new(self.config.tree.clone()));
        tree.attach_widget(widget.clone())?;
        window.set_tree_view(tree.clone());
        Ok((widget, tree))
    }

    /// Park until a bootstrap succeeds. Returns `None` on shutdown.
    fn wait_for_bootstrap(&self, doorbell: &Receiver<BootSignal>) -> Option<UiSession> {
        loop {
            if !self.should_run.load(Ordering::Acquire) {
                return None;
            }
            match doorbell.recv_timeout(self.config.shutdown_poll()) {
                Ok(BootSignal::DataAvailable) => {}
                Ok(BootSignal::Shutdown) | Err(RecvTimeoutError::Disconnected) => return None,
                Err(RecvTimeoutError::Timeout) => continue,
            }
            if !self.should_run.load(Ordering::Acquire) {
                return None;
            }

            let latch = self.latch.lock().clone();
            match self.bootstrap() {
                Ok(session) => {
                    latch.open(Ok(()));
                    return Some(session);
                }
                Err(err) => {
                    tracing::error!(target: targets::BOOTSTRAP, %err, "bootstrap failed");
                    {
                        let mut state = self.state.lock();
                        if *state == DisplayState::BootstrapPending {
                            *state = DisplayState::Uninitialized;
                        }
                    }
                    *self.latch.lock() = Arc::new(ReadinessLatch::new());
                    latch.open(Err(err));
                }
            }
        }
    }

    /// One steady-state iteration. Returns without pumping if either lock
    /// is busy.
    fn pump_once(&self, session: &mut UiSession) {
        let interactions = {
            let Some(_scene) = session.widget.scene_lock().try_guard() else {
                tracing::trace!(target: targets::UI_LOOP, "scene lock busy");
                return;
            };
            let Some(_window) = session.window.window_lock().try_guard() else {
                tracing::trace!(target: targets::UI_LOOP, "window lock busy");
                return;
            };
            session.pump.process_events()
        };

        for interaction in interactions {
            session.tree.apply_interaction(interaction);
        }
    }
}

fn ui_thread_main(shared: Arc<Shared>, doorbell: Receiver<BootSignal>) {
    tracing::debug!(target: targets::UI_LOOP, "UI thread parked");
    let Some(mut session) = shared.wait_for_bootstrap(&doorbell) else {
        tracing::debug!(target: targets::UI_LOOP, "UI thread exiting before bootstrap");
        return;
    };

    // the display may have been dropped while the bootstrap ran
    if !shared.should_run.load(Ordering::Acquire) {
        if !session.window.close() {
            tracing::error!(target: targets::UI_LOOP, "main window refused to close");
        }
        return;
    }

    let poll_interval = shared.config.poll_interval();
    while shared.should_run.load(Ordering::Acquire) {
        shared.pump_once(&mut session);
        thread::sleep(poll_interval);
    }
    tracing::debug!(target: targets::UI_LOOP, "UI thread exiting");
}

/// An RAII hold on the render widget's scene lock.
///
/// Obtained from [`Display::scene_access`]. Released on drop.
#[must_use = "the scene lock is released when the guard is dropped"]
pub struct SceneAccess {
    widget: Arc<dyn RenderWidget>,
    _not_send: PhantomData<*const ()>,
}

impl SceneAccess {
    /// Root of the rendered scene graph.
    pub fn root_group(&self) -> NodeRef {
        self.widget.root_group()
    }
}

impl Drop for SceneAccess {
    fn drop(&mut self) {
        self.widget.scene_lock().unlock();
    }
}

static GLOBAL: Mutex<Option<Arc<Display>>> = Mutex::new(None);

/// The inspector façade.
///
/// Construct one with [`Display::new`] or [`DisplayBuilder`], or share one
/// process-wide with [`Display::get_or_init`]. Every registration method
/// bootstraps the window on first use and returns `false` if there is no
/// window to register with.
///
/// # Example
///
/// ```
/// use horizon_inspector::Display;
/// use horizon_inspector::headless::HeadlessBackend;
/// use horizon_inspector_core::scene::Shape;
///
/// let display = Display::new(HeadlessBackend::new()).unwrap();
/// assert!(display.add("Robot::Arm", Shape::new_ref("arm")));
/// assert!(display.running());
/// ```
pub struct Display {
    shared: Arc<Shared>,
    ui_thread: Mutex<Option<JoinHandle<()>>>,
}

static_assertions::assert_impl_all!(Display: Send, Sync);

impl Display {
    /// Create a display with the default configuration.
    pub fn new<B: UiBackend + 'static>(backend: B) -> Result<Self> {
        Self::with_config(backend, DisplayConfig::default())
    }

    /// Create a display and spawn its (parked) UI thread.
    pub fn with_config<B: UiBackend + 'static>(backend: B, config: DisplayConfig) -> Result<Self> {
        Self::from_parts(Arc::new(backend), config)
    }

    fn from_parts(backend: Arc<dyn UiBackend>, config: DisplayConfig) -> Result<Self> {
        let (doorbell, bell_rx) = bounded(1);
        let thread_name = config.thread_name.clone();
        let shared = Arc::new(Shared {
            config,
            backend,
            have_data: AtomicBool::new(false),
            should_run: AtomicBool::new(true),
            state: Mutex::new(DisplayState::Uninitialized),
            slots: Mutex::new(Slots::default()),
            latch: Mutex::new(Arc::new(ReadinessLatch::new())),
            doorbell,
            pause: PauseGate::new(),
        });

        let thread_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || ui_thread_main(thread_shared, bell_rx))
            .map_err(DisplayError::Spawn)?;

        Ok(Self {
            shared,
            ui_thread: Mutex::new(Some(handle)),
        })
    }

    /// The process-wide display, created by `init` on first call.
    ///
    /// Concurrent first calls run `init` once; the others wait for it and
    /// share the result.
    pub fn get_or_init<F>(init: F) -> Result<Arc<Display>>
    where
        F: FnOnce() -> Result<Display>,
    {
        let mut global = GLOBAL.lock();
        if let Some(display) = global.as_ref() {
            return Ok(display.clone());
        }
        let display = Arc::new(init()?);
        *global = Some(display.clone());
        Ok(display)
    }

    /// The process-wide display, if one has been created.
    pub fn global() -> Option<Arc<Display>> {
        GLOBAL.lock().clone()
    }

    /// Remove the process-wide display. It shuts down once the returned
    /// reference and every other clone are dropped.
    pub fn release_global() -> Option<Arc<Display>> {
        GLOBAL.lock().take()
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.shared.config
    }

    pub fn state(&self) -> DisplayState {
        self.shared.state()
    }

    /// The display tree, once bootstrapped.
    pub fn tree(&self) -> Option<Arc<DisplayTree>> {
        self.shared.slots.lock().tree.clone()
    }

    fn widget(&self) -> Option<Arc<dyn RenderWidget>> {
        self.shared.slots.lock().widget.clone()
    }

    fn window(&self) -> Option<Arc<dyn MainWindow>> {
        self.shared.slots.lock().window.clone()
    }

    /// Make sure the window exists, bootstrapping it if needed.
    fn setup_main_window(&self) -> std::result::Result<(), BootstrapError> {
        if self.window().is_some() {
            return Ok(());
        }
        if !self.shared.should_run.load(Ordering::Acquire) {
            return Err(BootstrapError::ShuttingDown);
        }

        let latch = {
            let mut state = self.shared.state.lock();
            if *state == DisplayState::Uninitialized {
                *state = DisplayState::BootstrapPending;
            }
            self.shared.latch.lock().clone()
        };

        match self.shared.doorbell.try_send(BootSignal::DataAvailable) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => return Err(BootstrapError::ThreadExited),
        }
        tracing::debug!(target: targets::BOOTSTRAP, "waiting for main window");
        latch.wait()
    }

    /// Record that data is being registered and bootstrap.
    fn require_window(&self) -> bool {
        self.shared.have_data.store(true, Ordering::Release);
        match self.setup_main_window() {
            Ok(()) => true,
            Err(err) => {
                self.shared.have_data.store(false, Ordering::Release);
                tracing::error!(target: targets::DISPLAY, %err, "no main window");
                false
            }
        }
    }

    fn require_widget(&self) -> Option<Arc<dyn RenderWidget>> {
        if !self.require_window() {
            return None;
        }
        self.widget()
    }

    /// Show `node` in the tree under the `::`-separated `name` and attach it
    /// to the rendered scene.
    pub fn add(&self, name: &str, node: NodeRef) -> bool {
        self.add_with(name, node, AddOptions::new())
    }

    /// Like [`add`](Self::add) with explicit tree options.
    pub fn add_with(&self, name: &str, node: NodeRef, options: AddOptions) -> bool {
        if !self.require_window() {
            return false;
        }
        let Some(tree) = self.tree() else {
            return false;
        };
        tree.add(name, node, options).is_ok()
    }

    /// Register an input handler with the render widget.
    pub fn add_input_handler<F>(&self, binding: InputBinding, handler: F, description: &str) -> bool
    where
        F: Fn(&InputEvent) -> bool + Send + Sync + 'static,
    {
        let Some(widget) = self.require_widget() else {
            return false;
        };
        let handler: InputHandler = Arc::new(handler);
        widget.add_input_handler(binding, handler, description)
    }

    /// Register a keyboard handler. `key` may be a `char`.
    pub fn add_key_handler<K, F>(&self, key: K, handler: F, description: &str) -> bool
    where
        K: Into<KeySymbol>,
        F: Fn(&InputEvent) -> bool + Send + Sync + 'static,
    {
        self.add_input_handler(InputBinding::Key(key.into()), handler, description)
    }

    /// Register a mouse button handler.
    pub fn add_click_handler<F>(&self, buttons: MouseButtonMask, handler: F, description: &str) -> bool
    where
        F: Fn(&InputEvent) -> bool + Send + Sync + 'static,
    {
        self.add_input_handler(InputBinding::Button(buttons), handler, description)
    }

    /// Register a handler that sees every pointer motion.
    pub fn add_motion_handler<F>(&self, handler: F, description: &str) -> bool
    where
        F: Fn(&InputEvent) -> bool + Send + Sync + 'static,
    {
        self.add_input_handler(InputBinding::Motion, handler, description)
    }

    /// Make the camera follow `node` from `eye`, looking at `center`.
    pub fn track(&self, node: NodeRef, eye: DVec3, center: DVec3, up: DVec3) -> bool {
        self.track_target(TrackingTarget::new(node).with_view(eye, center, up))
    }

    /// Make the camera follow `node` with the default view.
    pub fn track_default(&self, node: NodeRef) -> bool {
        self.track_target(TrackingTarget::new(node))
    }

    pub fn track_target(&self, target: TrackingTarget) -> bool {
        let Some(widget) = self.require_widget() else {
            return false;
        };
        widget.track_node(target)
    }

    /// Acquire the scene lock, bootstrapping first if needed.
    ///
    /// Must be paired with [`unlock`](Self::unlock) on the same thread. While
    /// it is held, other threads adding to the display will wait.
    pub fn lock(&self) -> bool {
        let Some(widget) = self.require_widget() else {
            return false;
        };
        widget.scene_lock().lock();
        true
    }

    /// Try to acquire the scene lock. `false` if it is busy or no widget
    /// exists yet; never bootstraps.
    pub fn try_lock(&self) -> bool {
        self.widget().is_some_and(|w| w.scene_lock().try_lock())
    }

    /// Release the scene lock. `false` if no widget exists yet or this
    /// thread does not hold it.
    pub fn unlock(&self) -> bool {
        self.widget().is_some_and(|w| w.scene_lock().unlock())
    }

    /// Hold the scene lock until the returned guard is dropped.
    pub fn scene_access(&self) -> Option<SceneAccess> {
        let widget = self.require_widget()?;
        widget.scene_lock().lock();
        Some(SceneAccess {
            widget,
            _not_send: PhantomData,
        })
    }

    /// Block until some thread calls [`unpause`](Self::unpause).
    pub fn pause(&self) {
        self.shared.pause.pause();
    }

    /// Wake every thread blocked in [`pause`](Self::pause). Has no effect on
    /// later `pause()` calls.
    pub fn unpause(&self) {
        self.shared.pause.unpause();
    }

    /// Block while the main window is open. Returns at once if nothing was
    /// ever registered.
    pub fn block_for_close(&self) {
        if !self.shared.have_data.load(Ordering::Acquire) {
            return;
        }
        tracing::info!(target: targets::DISPLAY, "waiting for main window to close");
        let interval = self.shared.config.close_poll_interval();
        while self.shared.have_data.load(Ordering::Acquire) && self.running() {
            thread::sleep(interval);
        }
    }

    /// Like [`block_for_close`](Self::block_for_close) but gives up after
    /// `timeout`. Returns `true` if the window closed.
    pub fn block_for_close_timeout(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        let interval = self.shared.config.close_poll_interval();
        while self.shared.have_data.load(Ordering::Acquire) && self.running() {
            let now = std::time::Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(interval.min(deadline - now));
        }
        true
    }

    /// Whether the main window exists and is visible.
    pub fn running(&self) -> bool {
        self.window().is_some_and(|w| w.is_visible())
    }

    /// Root of the rendered scene graph, once a widget exists.
    pub fn root_group(&self) -> Option<NodeRef> {
        self.widget().map(|w| w.root_group())
    }

    /// Replace the root of the rendered scene graph. The tree keeps its rows.
    pub fn set_root_group(&self, root: NodeRef) -> bool {
        match self.widget() {
            Some(widget) => {
                widget.set_root_group(root);
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for Display {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Display")
            .field("state", &self.state())
            .field("have_data", &self.shared.have_data.load(Ordering::Relaxed))
            .field("running", &self.running())
            .finish()
    }
}

impl Drop for Display {
    fn drop(&mut self) {
        let shared = &self.shared;
        *shared.state.lock() = DisplayState::ShuttingDown;
        tracing::debug!(target: targets::DISPLAY, "shutting down display");

        shared.backend.request_exit();
        if let Some(window) = self.window()
            && !window.close()
        {
            tracing::error!(target: targets::DISPLAY, "main window refused to close");
        }

        shared.have_data.store(true, Ordering::Release);
        shared.should_run.store(false, Ordering::Release);
        shared.latch.lock().open(Err(BootstrapError::ShuttingDown));
        let _ = shared.doorbell.try_send(BootSignal::Shutdown);

        if let Some(handle) = self.ui_thread.lock().take() {
            if handle.thread().id() == thread::current().id() {
                tracing::warn!(target: targets::DISPLAY, "display dropped on its own UI thread");
            } else if handle.join().is_err() {
                tracing::error!(target: targets::DISPLAY, "UI thread panicked");
            }
        }
        *shared.state.lock() = DisplayState::Stopped;
    }
}

/// Builder for [`Display`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use horizon_inspector::DisplayBuilder;
/// use horizon_inspector::headless::HeadlessBackend;
///
/// let display = DisplayBuilder::new()
///     .app_name("PhysicsDebug")
///     .poll_interval(Duration::from_millis(5))
///     .min_window_size(800, 600)
///     .build(HeadlessBackend::new())
///     .unwrap();
/// assert_eq!(display.config().window.min_width, 800);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DisplayBuilder {
    config: DisplayConfig,
}

impl DisplayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: DisplayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.config.app_name = name.into();
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn close_poll_interval(mut self, interval: Duration) -> Self {
        self.config.close_poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn shutdown_poll(mut self, interval: Duration) -> Self {
        self.config.shutdown_poll_ms = interval.as_millis() as u64;
        self
    }

    pub fn window_title(mut self, title: impl Into<String>) -> Self {
        self.config.window.title = title.into();
        self
    }

    pub fn min_window_size(mut self, width: u32, height: u32) -> Self {
        self.config.window.min_width = width;
        self.config.window.min_height = height;
        self
    }

    pub fn root_label(mut self, label: impl Into<String>) -> Self {
        self.config.tree.root_label = label.into();
        self
    }

    /// Build the display around `backend`.
    pub fn build<B: UiBackend + 'static>(self, backend: B) -> Result<Display> {
        Display::with_config(backend, self.config)
    }
}
