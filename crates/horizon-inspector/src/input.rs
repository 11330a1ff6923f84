//! Input handlers and camera tracking targets.
//!
//! A render widget keeps a [`HandlerRegistry`]: keyboard handlers keyed by
//! [`KeySymbol`], mouse handlers keyed by [`MouseButtonMask`], and a list of
//! generic motion handlers. Every registration carries a human-readable
//! description that the window shows to the user.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use glam::DVec3;
use horizon_inspector_core::NodeRef;
use horizon_inspector_core::logging::targets;

/// A toolkit-independent key code.
///
/// Printable keys use their Unicode scalar value, so `KeySymbol::from('r')`
/// names the R key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeySymbol(pub u32);

impl From<char> for KeySymbol {
    fn from(c: char) -> Self {
        Self(c as u32)
    }
}

impl From<u32> for KeySymbol {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl fmt::Display for KeySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match char::from_u32(self.0).filter(|c| !c.is_control()) {
            Some(c) => write!(f, "'{c}'"),
            None => write!(f, "key {:#x}", self.0),
        }
    }
}

/// A set of mouse buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MouseButtonMask(pub u32);

impl MouseButtonMask {
    pub const NONE: Self = Self(0);
    pub const LEFT: Self = Self(1);
    pub const MIDDLE: Self = Self(2);
    pub const RIGHT: Self = Self(4);

    /// Whether every button in `other` is also in `self`.
    pub fn contains(self, other: Self) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl BitOr for MouseButtonMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// What an input handler is registered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputBinding {
    Key(KeySymbol),
    Button(MouseButtonMask),
    Motion,
}

impl From<KeySymbol> for InputBinding {
    fn from(key: KeySymbol) -> Self {
        Self::Key(key)
    }
}

impl From<MouseButtonMask> for InputBinding {
    fn from(buttons: MouseButtonMask) -> Self {
        Self::Button(buttons)
    }
}

/// An input event delivered to the render widget.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyPress {
        key: KeySymbol,
    },
    ButtonPress {
        buttons: MouseButtonMask,
        x: f32,
        y: f32,
    },
    Motion {
        buttons: MouseButtonMask,
        x: f32,
        y: f32,
    },
}

/// An input handler. Returns `true` if it consumed the event.
pub type InputHandler = Arc<dyn Fn(&InputEvent) -> bool + Send + Sync>;

#[derive(Clone)]
struct Registered {
    handler: InputHandler,
    description: String,
}

/// Input handlers keyed by what triggers them.
///
/// Registering a second handler for the same key or button set replaces the
/// first. Motion handlers accumulate and all see every motion event.
#[derive(Default)]
pub struct HandlerRegistry {
    keys: BTreeMap<KeySymbol, Registered>,
    buttons: BTreeMap<MouseButtonMask, Registered>,
    motion: Vec<Registered>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `binding`.
    ///
    /// Returns `true` if an existing handler was replaced.
    pub fn register(
        &mut self,
        binding: InputBinding,
        handler: InputHandler,
        description: impl Into<String>,
    ) -> bool {
        let entry = Registered {
            handler,
            description: description.into(),
        };
        tracing::debug!(
            target: targets::INPUT,
            ?binding,
            description = %entry.description,
            "registering input handler"
        );
        match binding {
            InputBinding::Key(key) => self.keys.insert(key, entry).is_some(),
            InputBinding::Button(buttons) => self.buttons.insert(buttons, entry).is_some(),
            InputBinding::Motion => {
                self.motion.push(entry);
                false
            }
        }
    }

    /// Handlers that `event` triggers, in the order they run.
    ///
    /// Callers that share the registry behind a lock take this snapshot,
    /// release the lock, and then hand it to [`run_handlers`], so a handler
    /// may register further handlers.
    pub fn matching(&self, event: &InputEvent) -> Vec<InputHandler> {
        match event {
            InputEvent::KeyPress { key } => self
                .keys
                .get(key)
                .map(|entry| entry.handler.clone())
                .into_iter()
                .collect(),
            InputEvent::ButtonPress { buttons, .. } => self
                .buttons
                .iter()
                .filter(|(mask, _)| buttons.contains(**mask))
                .map(|(_, entry)| entry.handler.clone())
                .collect(),
            InputEvent::Motion { .. } => {
                self.motion.iter().map(|entry| entry.handler.clone()).collect()
            }
        }
    }

    /// Route `event` to the matching handlers.
    ///
    /// Returns `true` if any handler consumed it.
    pub fn dispatch(&self, event: &InputEvent) -> bool {
        run_handlers(&self.matching(event), event)
    }

    /// Bindings and their descriptions, keys first, then buttons, then
    /// motion handlers in registration order.
    pub fn descriptions(&self) -> Vec<(InputBinding, String)> {
        let keys = self
            .keys
            .iter()
            .map(|(k, e)| (InputBinding::Key(*k), e.description.clone()));
        let buttons = self
            .buttons
            .iter()
            .map(|(b, e)| (InputBinding::Button(*b), e.description.clone()));
        let motion = self
            .motion
            .iter()
            .map(|e| (InputBinding::Motion, e.description.clone()));
        keys.chain(buttons).chain(motion).collect()
    }

    pub fn len(&self) -> usize {
        self.keys.len() + self.buttons.len() + self.motion.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Call every handler in `handlers` with `event`.
///
/// All handlers run even after one consumes the event. Returns `true` if any
/// of them consumed it.
pub fn run_handlers(handlers: &[InputHandler], event: &InputEvent) -> bool {
    let handled = handlers
        .iter()
        .fold(false, |handled, handler| handler(event) | handled);
    tracing::trace!(target: targets::INPUT, ?event, handled, "dispatched input event");
    handled
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("keys", &self.keys.len())
            .field("buttons", &self.buttons.len())
            .field("motion", &self.motion.len())
            .finish()
    }
}

/// Default camera position when tracking a node.
pub const DEFAULT_TRACK_EYE: DVec3 = DVec3::new(20.0, 20.0, 40.0);
/// Default look-at point when tracking a node.
pub const DEFAULT_TRACK_CENTER: DVec3 = DVec3::ZERO;
/// Default up direction when tracking a node.
pub const DEFAULT_TRACK_UP: DVec3 = DVec3::Z;

/// A node the camera follows, with the view relative to it.
#[derive(Clone)]
pub struct TrackingTarget {
    pub node: NodeRef,
    pub eye: DVec3,
    pub center: DVec3,
    pub up: DVec3,
}

impl TrackingTarget {
    /// Track `node` with the default view.
    pub fn new(node: NodeRef) -> Self {
        Self {
            node,
            eye: DEFAULT_TRACK_EYE,
            center: DEFAULT_TRACK_CENTER,
            up: DEFAULT_TRACK_UP,
        }
    }

    pub fn with_view(mut self, eye: DVec3, center: DVec3, up: DVec3) -> Self {
        self.eye = eye;
        self.center = center;
        self.up = up;
        self
    }
}

impl fmt::Debug for TrackingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackingTarget")
            .field("node", &self.node.class_name())
            .field("eye", &self.eye)
            .field("center", &self.center)
            .field("up", &self.up)
            .finish()
    }
}
