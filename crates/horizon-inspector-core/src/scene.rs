//! The scene-graph node contract.
//!
//! The inspector never renders anything itself. It only needs a narrow view of
//! the 3D scene graph it mirrors:
//!
//! - every node is reference counted ([`NodeRef`]) and carries an integer
//!   visibility mask ([`NodeMask`], zero means hidden);
//! - some nodes are groups ([`GroupNode`]) that can gain and lose children.
//!
//! Scene-graph libraries implement [`SceneNode`] for their node types. This
//! module also ships a small in-memory scene graph ([`Group`] and [`Shape`])
//! which is enough for headless use and for tests.
//!
//! Node methods take `&self`: scene graphs are shared between threads and
//! mutate through interior mutability. Callers are expected to hold the owning
//! render widget's scene lock while mutating.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;

use crate::error::SceneError;
use crate::logging::targets;

/// A visibility bitmask. Zero hides the node.
pub type NodeMask = u32;

/// Mask value that hides a node.
pub const NODE_MASK_HIDDEN: NodeMask = 0;

/// Mask value of a freshly created node: visible to every traversal.
pub const NODE_MASK_ALL: NodeMask = !0;

/// Shared reference to a scene-graph node.
pub type NodeRef = Arc<dyn SceneNode>;

/// A node in an external scene graph.
pub trait SceneNode: Send + Sync {
    /// Current visibility mask.
    fn node_mask(&self) -> NodeMask;

    /// Replace the visibility mask.
    fn set_node_mask(&self, mask: NodeMask);

    /// Name of the concrete node type, used in diagnostics.
    fn class_name(&self) -> &'static str;

    /// View this node as a group, if it can hold children.
    fn as_group(&self) -> Option<&dyn GroupNode> {
        None
    }
}

/// A scene-graph node that can hold children.
pub trait GroupNode: Send + Sync {
    /// Append a child. Returns `false` if the group refused it.
    fn add_child(&self, child: NodeRef) -> bool;

    /// Remove the first occurrence of `child`. Returns `false` if absent.
    fn remove_child(&self, child: &NodeRef) -> bool;

    /// Number of direct children.
    fn num_children(&self) -> usize;

    /// Child at `index`.
    fn child(&self, index: usize) -> Option<NodeRef>;

    /// Whether `child` is a direct child of this group.
    fn contains(&self, child: &NodeRef) -> bool {
        (0..self.num_children()).any(|i| self.child(i).is_some_and(|c| same_node(&c, child)))
    }
}

/// Identity comparison of two node references.
pub fn same_node(a: &NodeRef, b: &NodeRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// View `node` as a group or report its class.
pub fn require_group(node: &NodeRef) -> Result<&dyn GroupNode, SceneError> {
    node.as_group().ok_or(SceneError::NotAGroup {
        class_name: node.class_name(),
    })
}

/// An in-memory group node.
pub struct Group {
    mask: AtomicU32,
    children: RwLock<Vec<NodeRef>>,
}

impl Group {
    /// Create an empty, fully visible group.
    pub fn new() -> Self {
        Self {
            mask: AtomicU32::new(NODE_MASK_ALL),
            children: RwLock::new(Vec::new()),
        }
    }

    /// Create an empty group behind a [`NodeRef`].
    pub fn new_ref() -> NodeRef {
        Arc::new(Self::new())
    }

    /// Snapshot of the current children.
    pub fn children(&self) -> Vec<NodeRef> {
        self.children.read().clone()
    }
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("mask", &self.node_mask())
            .field("children", &self.num_children())
            .finish()
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneNode for Group {
    fn node_mask(&self) -> NodeMask {
        self.mask.load(Ordering::Acquire)
    }

    fn set_node_mask(&self, mask: NodeMask) {
        self.mask.store(mask, Ordering::Release);
    }

    fn class_name(&self) -> &'static str {
        "Group"
    }

    fn as_group(&self) -> Option<&dyn GroupNode> {
        Some(self)
    }
}

impl GroupNode for Group {
    fn add_child(&self, child: NodeRef) -> bool {
        tracing::trace!(target: targets::SCENE, class = child.class_name(), "group add child");
        self.children.write().push(child);
        true
    }

    fn remove_child(&self, child: &NodeRef) -> bool {
        let mut children = self.children.write();
        match children.iter().position(|c| same_node(c, child)) {
            Some(index) => {
                children.remove(index);
                true
            }
            None => {
                tracing::trace!(target: targets::SCENE, class = child.class_name(), "child not in group");
                false
            }
        }
    }

    fn num_children(&self) -> usize {
        self.children.read().len()
    }

    fn child(&self, index: usize) -> Option<NodeRef> {
        self.children.read().get(index).cloned()
    }
}

/// An in-memory leaf node standing in for drawable geometry.
#[derive(Debug)]
pub struct Shape {
    label: String,
    mask: AtomicU32,
}

impl Shape {
    /// Create a fully visible leaf.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            mask: AtomicU32::new(NODE_MASK_ALL),
        }
    }

    /// Create a leaf behind a [`NodeRef`].
    pub fn new_ref(label: impl Into<String>) -> NodeRef {
        Arc::new(Self::new(label))
    }

    /// The label given at construction.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl SceneNode for Shape {
    fn node_mask(&self) -> NodeMask {
        self.mask.load(Ordering::Acquire)
    }

    fn set_node_mask(&self, mask: NodeMask) {
        self.mask.store(mask, Ordering::Release);
    }

    fn class_name(&self) -> &'static str {
        "Shape"
    }
}
