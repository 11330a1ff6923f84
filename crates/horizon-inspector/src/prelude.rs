//! Commonly used types.
//!
//! ```
//! use horizon_inspector::prelude::*;
//! ```

pub use crate::{
    AddOptions, CheckState, Display, DisplayBuilder, DisplayConfig, DisplayTree, HandleId,
    InputEvent, KeySymbol, MouseButtonMask, TrackingTarget, ViewInteraction,
};
pub use glam::DVec3;
pub use horizon_inspector_core::{GroupNode, NodeMask, NodeRef, SceneNode};
