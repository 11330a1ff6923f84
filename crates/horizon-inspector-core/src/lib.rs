//! Core primitives for Horizon Inspector.
//!
//! This crate provides the toolkit-independent building blocks of the
//! inspector overlay:
//!
//! - **Scene contract**: the narrow view of an external scene graph the
//!   inspector needs (visibility masks, group membership)
//! - **Access locks**: re-entrant locks with split `lock()`/`unlock()` calls,
//!   shared between application threads and the UI thread
//! - **Readiness latch**: a one-shot latch that publishes the outcome of the
//!   lazy window bootstrap to every waiting thread
//! - **Pause gate**: a cooperative, non-sticky pause/unpause rendezvous
//! - **Signal/Slot System**: direct-dispatch notifications
//!
//! # Scene Example
//!
//! ```
//! use horizon_inspector_core::scene::{require_group, Group, Shape, SceneNode};
//!
//! let root = Group::new_ref();
//! let leaf = Shape::new_ref("teapot");
//!
//! require_group(&root).unwrap().add_child(leaf.clone());
//! leaf.set_node_mask(0);
//! assert_eq!(leaf.node_mask(), 0);
//! ```

mod error;
pub mod latch;
pub mod logging;
pub mod pause;
pub mod scene;
pub mod signal;
pub mod sync;

pub use error::{SceneError, SceneResult};
pub use latch::ReadinessLatch;
pub use logging::PerfSpan;
pub use pause::PauseGate;
pub use scene::{
    GroupNode, NODE_MASK_ALL, NODE_MASK_HIDDEN, NodeMask, NodeRef, SceneNode, require_group,
    same_node,
};
pub use signal::{ConnectionId, Signal};
pub use sync::{AccessGuard, AccessLock};
