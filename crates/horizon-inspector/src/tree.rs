//! The hierarchical display tree.
//!
//! A [`DisplayTree`] mirrors selected nodes of an external scene graph as a
//! tree of check-box rows. Names use `::` to describe hierarchy:
//!
//! ```text
//! add("Robot::Arm::Gripper", node)
//!
//! All Displayed Items          (root, bound to the widget's root group)
//! └── Robot                    (group handle, backed by an empty Group)
//!     └── Arm                  (group handle)
//!         └── Gripper          (item handle, bound to `node`)
//! ```
//!
//! Unchecking a row hides its node (mask zero) and cascades to every
//! descendant; re-checking restores the masks remembered at hide time.
//!
//! # Locking
//!
//! The tree serializes every mutation on its own re-entrant lock. Scene-graph
//! edits additionally take the render widget's scene lock, always inside the
//! tree lock. The tree never touches the main window's lock.
//!
//! Callbacks and signals always run after the tree state is no longer
//! borrowed, so they may call back into the tree. Those raised by
//! [`DisplayTree::add`] and [`DisplayTree::attach_widget`] still run under the
//! tree lock, including the click callback of a row added hidden. Those
//! raised by [`DisplayTree::clicked`], [`DisplayTree::expanded`] and
//! [`DisplayTree::collapsed`] run after the tree lock is released.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use horizon_inspector_core::logging::targets;
use horizon_inspector_core::scene::Group;
use horizon_inspector_core::{
    AccessGuard, NODE_MASK_HIDDEN, NodeMask, NodeRef, PerfSpan, SceneError, Signal,
};
use parking_lot::ReentrantMutex;
use slotmap::{SlotMap, new_key_type};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::TreeConfig;
use crate::error::{TreeError, TreeResult};
use crate::widget::{RenderWidget, ViewInteraction};

/// Separates hierarchy levels in a display name.
pub const PATH_SEPARATOR: &str = "::";

new_key_type! {
    /// Identifies one row of a [`DisplayTree`].
    pub struct HandleId;
}

/// Check box state of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckState {
    Unchecked,
    PartiallyChecked,
    #[default]
    Checked,
}

impl CheckState {
    pub fn is_checked(self) -> bool {
        self == CheckState::Checked
    }

    /// The state a user click on the check box moves to.
    pub fn toggled(self) -> Self {
        match self {
            CheckState::Checked => CheckState::Unchecked,
            CheckState::Unchecked | CheckState::PartiallyChecked => CheckState::Checked,
        }
    }
}

/// What a row stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// The synthetic top-level row bound to the scene root.
    Root,
    /// A container created for an intermediate name segment.
    Group,
    /// A user-supplied node.
    Item,
}

/// A snapshot of one row, handed to callbacks and returned by queries.
#[derive(Clone)]
pub struct DisplayItem {
    pub id: HandleId,
    pub name: String,
    /// Full `::` path from the root, excluding the root label.
    pub path: String,
    pub kind: HandleKind,
    pub node: NodeRef,
    pub prior_mask: NodeMask,
    pub enabled: bool,
    pub check_state: CheckState,
    pub expanded: bool,
}

impl fmt::Debug for DisplayItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayItem")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("class", &self.node.class_name())
            .field("mask", &self.node.node_mask())
            .field("prior_mask", &self.prior_mask)
            .field("enabled", &self.enabled)
            .field("check_state", &self.check_state)
            .finish()
    }
}

/// Callback run with a snapshot of a row.
pub type ItemCallback = Arc<dyn Fn(&DisplayItem) + Send + Sync>;

/// Options for [`DisplayTree::add`].
#[derive(Clone)]
pub struct AddOptions {
    /// Start checked (visible). When `false` the new row is unchecked
    /// immediately, exactly as if the user had clicked it.
    pub show: bool,
    /// Attach the node to its parent's scene-graph group.
    pub add_to_display: bool,
    /// Runs after the row is clicked, expanded or collapsed.
    pub on_click: Option<ItemCallback>,
    /// Runs for every row the add creates, group rows included.
    pub on_create: Option<ItemCallback>,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            show: true,
            add_to_display: true,
            on_click: None,
            on_create: None,
        }
    }
}

impl AddOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(mut self, show: bool) -> Self {
        self.show = show;
        self
    }

    pub fn add_to_display(mut self, add_to_display: bool) -> Self {
        self.add_to_display = add_to_display;
        self
    }

    pub fn on_click<F>(mut self, f: F) -> Self
    where
        F: Fn(&DisplayItem) + Send + Sync + 'static,
    {
        self.on_click = Some(Arc::new(f));
        self
    }

    pub fn on_create<F>(mut self, f: F) -> Self
    where
        F: Fn(&DisplayItem) + Send + Sync + 'static,
    {
        self.on_create = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for AddOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddOptions")
            .field("show", &self.show)
            .field("add_to_display", &self.add_to_display)
            .field("on_click", &self.on_click.is_some())
            .field("on_create", &self.on_create.is_some())
            .finish()
    }
}

/// One visible row, in display order, for a toolkit view.
#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: HandleId,
    pub depth: usize,
    pub label: String,
    pub check_state: CheckState,
    pub enabled: bool,
    pub expanded: bool,
    pub has_children: bool,
}

/// Signals emitted by a [`DisplayTree`].
#[derive(Debug, Default)]
pub struct TreeSignals {
    /// The first column was resized to fit its contents. Emitted once for
    /// every row insertion and every expand or collapse.
    pub column_resized: Signal<f32>,
    /// A row was appended: `(parent, row)`.
    pub row_inserted: Signal<(HandleId, usize)>,
}

struct Handle {
    name: String,
    path: String,
    node: NodeRef,
    prior_mask: NodeMask,
    enabled: bool,
    check_state: CheckState,
    expanded: bool,
    kind: HandleKind,
    on_click: Option<ItemCallback>,
    parent: Option<HandleId>,
    children: Vec<HandleId>,
}

/// Deferred work collected while the tree state is borrowed.
enum Effect {
    Callback(ItemCallback, DisplayItem),
    RowInserted(HandleId, usize),
    ColumnResized(f32),
}

struct TreeState {
    handles: SlotMap<HandleId, Handle>,
    root: Option<HandleId>,
    widget: Option<Arc<dyn RenderWidget>>,
    column_width: f32,
}

/// The hierarchical display tree.
pub struct DisplayTree {
    state: ReentrantMutex<RefCell<TreeState>>,
    signals: TreeSignals,
    config: TreeConfig,
}

static_assertions::assert_impl_all!(DisplayTree: Send, Sync);

/// Set a node's visibility mask. Requires the scene lock.
fn set_mask(scene: &AccessGuard<'_>, node: &NodeRef, mask: NodeMask) {
    debug_assert!(scene.lock().is_held_by_current_thread());
    tracing::trace!(target: targets::TREE, class = node.class_name(), mask, "set node mask");
    node.set_node_mask(mask);
}

impl DisplayTree {
    /// Create an empty tree. It has no rows until a widget is attached.
    pub fn new(config: TreeConfig) -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(TreeState {
                handles: SlotMap::with_key(),
                root: None,
                widget: None,
                column_width: 0.0,
            })),
            signals: TreeSignals::default(),
            config,
        }
    }

    pub fn signals(&self) -> &TreeSignals {
        &self.signals
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Bind the tree to a render widget and create the root row for the
    /// widget's root group. The root starts expanded.
    pub fn attach_widget(&self, widget: Arc<dyn RenderWidget>) -> TreeResult<HandleId> {
        let guard = self.state.lock();
        let mut effects = Vec::new();
        let root = {
            let mut state = guard.borrow_mut();
            if state.widget.is_some() {
                return Err(TreeError::AlreadyAttached);
            }
            let node = widget.root_group();
            let label = self.config.root_label.clone();
            let root = state.handles.insert(Handle {
                name: label.clone(),
                path: label,
                prior_mask: node.node_mask(),
                node,
                enabled: true,
                check_state: CheckState::Checked,
                expanded: true,
                kind: HandleKind::Root,
                on_click: None,
                parent: None,
                children: Vec::new(),
            });
            state.root = Some(root);
            state.widget = Some(widget);
            let width = state.resize_column(&self.config);
            effects.push(Effect::ColumnResized(width));
            root
        };
        self.flush(effects);
        tracing::debug!(target: targets::TREE, "render widget attached");
        Ok(root)
    }

    /// Whether a render widget has been attached.
    pub fn is_attached(&self) -> bool {
        self.state.lock().borrow().widget.is_some()
    }

    /// The attached render widget.
    pub fn widget(&self) -> Option<Arc<dyn RenderWidget>> {
        self.state.lock().borrow().widget.clone()
    }

    /// Add `node` under the `::`-separated `name`.
    ///
    /// Missing intermediate segments become group rows. An existing row with
    /// the same full name is rebound to `node` in place. Fails if an
    /// intermediate segment names an existing row whose node is not a group;
    /// rows created before the failure stay.
    pub fn add(&self, name: &str, node: NodeRef, options: AddOptions) -> TreeResult<HandleId> {
        let _span = PerfSpan::new("display_tree_add");
        let guard = self.state.lock();
        let mut effects = Vec::new();
        let result = {
            let mut state = guard.borrow_mut();
            let root = state.root;
            match root {
                Some(root) => state.add_under(root, name, &node, &options, &self.config, &mut effects),
                None => Err(TreeError::NoWidget),
            }
        };
        self.flush(effects);
        drop(guard);

        match &result {
            Ok(id) => tracing::debug!(target: targets::TREE, name, ?id, "added display node"),
            Err(err) => tracing::error!(target: targets::TREE, name, %err, "failed to add display node"),
        }
        result
    }

    /// Re-apply a row's check state to its node and every descendant, then
    /// run its click callback.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a row of this tree: the view and the model have
    /// fallen out of sync.
    pub fn clicked(&self, id: HandleId) {
        let mut effects = Vec::new();
        {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            if !state.handles.contains_key(id) {
                drop(state);
                panic!("display tree has no item for interaction index {id:?}");
            }
            state.apply_click(id, &mut effects);
        }
        self.flush(effects);
    }

    /// Flip a row's check box as a user click would, then apply it.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a row of this tree.
    pub fn toggle(&self, id: HandleId) {
        {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            match state.handles.get_mut(id) {
                Some(handle) => handle.check_state = handle.check_state.toggled(),
                None => {
                    drop(state);
                    panic!("display tree has no item for interaction index {id:?}");
                }
            }
        }
        self.clicked(id);
    }

    /// Check or uncheck a row programmatically.
    pub fn set_checked(&self, id: HandleId, checked: bool) -> TreeResult<()> {
        {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            let handle = state.handles.get_mut(id).ok_or(TreeError::UnknownHandle)?;
            handle.check_state = if checked {
                CheckState::Checked
            } else {
                CheckState::Unchecked
            };
        }
        self.clicked(id);
        Ok(())
    }

    /// A row was expanded in the view.
    pub fn expanded(&self, id: HandleId) {
        self.set_expanded(id, true);
    }

    /// A row was collapsed in the view.
    pub fn collapsed(&self, id: HandleId) {
        self.set_expanded(id, false);
    }

    fn set_expanded(&self, id: HandleId, expanded: bool) {
        let mut effects = Vec::new();
        {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            if let Some(handle) = state.handles.get_mut(id) {
                handle.expanded = expanded;
            }
            let width = state.resize_column(&self.config);
            effects.push(Effect::ColumnResized(width));
            if let Some(handle) = state.handles.get(id)
                && let Some(callback) = handle.on_click.clone()
            {
                effects.push(Effect::Callback(callback, state.snapshot(id)));
            }
        }
        self.flush(effects);
    }

    /// Apply an interaction reported by a toolkit view.
    pub fn apply_interaction(&self, interaction: ViewInteraction) {
        tracing::trace!(target: targets::TREE, ?interaction, "applying view interaction");
        match interaction {
            ViewInteraction::Toggled(id) => self.toggle(id),
            ViewInteraction::Clicked(id) => self.clicked(id),
            ViewInteraction::Expanded(id) => self.expanded(id),
            ViewInteraction::Collapsed(id) => self.collapsed(id),
        }
    }

    /// The synthetic root row.
    pub fn root(&self) -> Option<HandleId> {
        self.state.lock().borrow().root
    }

    /// Find a row by its `::` path below the root. The empty path is the root.
    pub fn find(&self, path: &str) -> Option<HandleId> {
        let guard = self.state.lock();
        let state = guard.borrow();
        let mut current = state.root?;
        if path.is_empty() {
            return Some(current);
        }
        for segment in path.split(PATH_SEPARATOR) {
            current = state.find_child(current, segment)?;
        }
        Some(current)
    }

    pub fn item(&self, id: HandleId) -> Option<DisplayItem> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.handles.contains_key(id).then(|| state.snapshot(id))
    }

    pub fn children(&self, id: HandleId) -> Vec<HandleId> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state
            .handles
            .get(id)
            .map(|h| h.children.clone())
            .unwrap_or_default()
    }

    pub fn parent(&self, id: HandleId) -> Option<HandleId> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.handles.get(id).and_then(|h| h.parent)
    }

    /// Distance from the root; the root itself is at depth 0.
    pub fn depth(&self, id: HandleId) -> Option<usize> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.handles.contains_key(id).then(|| state.depth_of(id))
    }

    /// Number of rows, root included.
    pub fn len(&self) -> usize {
        self.state.lock().borrow().handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current width of the first column.
    pub fn column_width(&self) -> f32 {
        self.state.lock().borrow().column_width
    }

    /// Rows a view would show, in display order.
    pub fn visible_rows(&self) -> Vec<RowView> {
        let guard = self.state.lock();
        let state = guard.borrow();
        state.visible_rows()
    }

    /// Like [`visible_rows`](Self::visible_rows), but returns `None` instead
    /// of waiting when another thread holds the tree lock.
    pub fn try_visible_rows(&self) -> Option<Vec<RowView>> {
        let guard = self.state.try_lock()?;
        let state = guard.try_borrow().ok()?;
        Some(state.visible_rows())
    }

    fn flush(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Callback(callback, item) => callback(&item),
                Effect::RowInserted(parent, row) => self.signals.row_inserted.emit((parent, row)),
                Effect::ColumnResized(width) => self.signals.column_resized.emit(width),
            }
        }
    }
}

impl fmt::Debug for DisplayTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayTree")
            .field("rows", &self.len())
            .field("attached", &self.is_attached())
            .field("column_width", &self.column_width())
            .finish()
    }
}

impl TreeState {
    fn widget(&self) -> TreeResult<Arc<dyn RenderWidget>> {
        self.widget.clone().ok_or(TreeError::NoWidget)
    }

    fn not_a_group(&self, id: HandleId, err: SceneError) -> TreeError {
        let SceneError::NotAGroup { class_name } = err;
        TreeError::NotAGroup {
            name: self.handles[id].name.clone(),
            class_name,
        }
    }

    fn find_child(&self, parent: HandleId, name: &str) -> Option<HandleId> {
        self.handles[parent]
            .children
            .iter()
            .copied()
            .find(|child| self.handles[*child].name == name)
    }

    fn depth_of(&self, id: HandleId) -> usize {
        let mut depth = 0;
        let mut current = self.handles[id].parent;
        while let Some(parent) = current {
            depth += 1;
            current = self.handles[parent].parent;
        }
        depth
    }

    fn snapshot(&self, id: HandleId) -> DisplayItem {
        let handle = &self.handles[id];
        DisplayItem {
            id,
            name: handle.name.clone(),
            path: handle.path.clone(),
            kind: handle.kind,
            node: handle.node.clone(),
            prior_mask: handle.prior_mask,
            enabled: handle.enabled,
            check_state: handle.check_state,
            expanded: handle.expanded,
        }
    }

    fn add_under(
        &mut self,
        parent: HandleId,
        name: &str,
        node: &NodeRef,
        options: &AddOptions,
        config: &TreeConfig,
        effects: &mut Vec<Effect>,
    ) -> TreeResult<HandleId> {
        match name.split_once(PATH_SEPARATOR) {
            Some((group_name, rest)) => {
                let group = self.resolve_group(parent, group_name, options, config, effects)?;
                self.add_under(group, rest, node, options, config, effects)
            }
            None => match self.find_child(parent, name) {
                Some(existing) => self.replace_node(existing, parent, node, options),
                None => self.create_entry(parent, name, node, options, config, effects),
            },
        }
    }

    /// Find or create the group row `name` under `parent`.
    fn resolve_group(
        &mut self,
        parent: HandleId,
        name: &str,
        options: &AddOptions,
        config: &TreeConfig,
        effects: &mut Vec<Effect>,
    ) -> TreeResult<HandleId> {
        let id = match self.find_child(parent, name) {
            Some(id) => id,
            None => {
                let widget = self.widget()?;
                let group = Group::new_ref();
                {
                    let _scene = widget.scene_lock().guard();
                    let parent_node = &self.handles[parent].node;
                    let parent_group = horizon_inspector_core::require_group(parent_node)
                        .map_err(|err| self.not_a_group(parent, err))?;
                    parent_group.add_child(group.clone());
                }
                let id = self.insert_row(
                    parent,
                    name,
                    group,
                    HandleKind::Group,
                    options.on_click.clone(),
                    config,
                    effects,
                );
                if let Some(on_create) = &options.on_create {
                    effects.push(Effect::Callback(on_create.clone(), self.snapshot(id)));
                }
                id
            }
        };

        let node = &self.handles[id].node;
        if node.as_group().is_none() {
            return Err(TreeError::NotAGroup {
                name: name.to_string(),
                class_name: node.class_name(),
            });
        }
        Ok(id)
    }

    fn create_entry(
        &mut self,
        parent: HandleId,
        name: &str,
        node: &NodeRef,
        options: &AddOptions,
        config: &TreeConfig,
        effects: &mut Vec<Effect>,
    ) -> TreeResult<HandleId> {
        let widget = self.widget()?;
        if options.add_to_display {
            horizon_inspector_core::require_group(&self.handles[parent].node)
                .map_err(|err| self.not_a_group(parent, err))?;
        }

        let id = self.insert_row(
            parent,
            name,
            node.clone(),
            HandleKind::Item,
            options.on_click.clone(),
            config,
            effects,
        );

        if options.add_to_display {
            let _scene = widget.scene_lock().guard();
            if let Some(group) = self.handles[parent].node.as_group() {
                group.add_child(node.clone());
            }
        }

        if !options.show {
            self.handles[id].check_state = CheckState::Unchecked;
            self.apply_click(id, effects);
        }

        if let Some(on_create) = &options.on_create {
            effects.push(Effect::Callback(on_create.clone(), self.snapshot(id)));
        }
        Ok(id)
    }

    /// Rebind an existing row to `node`, carrying over the current mask.
    fn replace_node(
        &mut self,
        entry: HandleId,
        parent: HandleId,
        node: &NodeRef,
        options: &AddOptions,
    ) -> TreeResult<HandleId> {
        let widget = self.widget()?;
        let parent_node = self.handles[parent].node.clone();
        let parent_group = if options.add_to_display {
            Some(
                horizon_inspector_core::require_group(&parent_node)
                    .map_err(|err| self.not_a_group(parent, err))?,
            )
        } else {
            None
        };

        let scene = widget.scene_lock().guard();
        let old = self.handles[entry].node.clone();
        set_mask(&scene, node, old.node_mask());
        if let Some(group) = parent_group {
            group.remove_child(&old);
        }

        let handle = &mut self.handles[entry];
        handle.node = node.clone();
        handle.enabled = true;
        if let Some(on_click) = &options.on_click {
            handle.on_click = Some(on_click.clone());
        }

        if let Some(group) = parent_group {
            group.add_child(node.clone());
        }
        tracing::debug!(target: targets::TREE, path = %handle.path, "replaced display node");
        Ok(entry)
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_row(
        &mut self,
        parent: HandleId,
        name: &str,
        node: NodeRef,
        kind: HandleKind,
        on_click: Option<ItemCallback>,
        config: &TreeConfig,
        effects: &mut Vec<Effect>,
    ) -> HandleId {
        let path = match self.handles[parent].kind {
            HandleKind::Root => name.to_string(),
            _ => format!("{}{PATH_SEPARATOR}{name}", self.handles[parent].path),
        };
        let id = self.handles.insert(Handle {
            name: name.to_string(),
            path,
            prior_mask: node.node_mask(),
            node,
            enabled: true,
            check_state: CheckState::Checked,
            expanded: false,
            kind,
            on_click,
            parent: Some(parent),
            children: Vec::new(),
        });
        let siblings = &mut self.handles[parent].children;
        siblings.push(id);
        let row = siblings.len() - 1;
        effects.push(Effect::RowInserted(parent, row));

        let width = self.resize_column(config);
        effects.push(Effect::ColumnResized(width));
        id
    }

    /// Apply a row's check state to its node and cascade to its children.
    fn apply_click(&mut self, id: HandleId, effects: &mut Vec<Effect>) {
        let Some(widget) = self.widget.clone() else {
            return;
        };
        {
            let scene = widget.scene_lock().guard();
            let handle = &mut self.handles[id];
            let checked = handle.check_state.is_checked();
            if checked {
                let mask = if handle.enabled {
                    handle.prior_mask
                } else {
                    NODE_MASK_HIDDEN
                };
                set_mask(&scene, &handle.node, mask);
            } else {
                if handle.enabled {
                    handle.prior_mask = handle.node.node_mask();
                }
                set_mask(&scene, &handle.node, NODE_MASK_HIDDEN);
            }

            for child in handle.children.clone() {
                self.update_children(&scene, child, checked);
            }
        }

        tracing::debug!(
            target: targets::TREE,
            path = %self.handles[id].path,
            checked = self.handles[id].check_state.is_checked(),
            "display item clicked"
        );
        if let Some(on_click) = self.handles[id].on_click.clone() {
            effects.push(Effect::Callback(on_click, self.snapshot(id)));
        }
    }

    /// Push the parent's checked state down into `id`'s subtree.
    ///
    /// `id` becomes enabled iff the parent is checked. Its children are only
    /// visited while `id` itself is checked.
    fn update_children(&mut self, scene: &AccessGuard<'_>, id: HandleId, checked: bool) {
        let handle = &mut self.handles[id];
        handle.enabled = checked;
        let item_checked = handle.check_state.is_checked();

        if item_checked {
            for child in handle.children.clone() {
                self.update_children(scene, child, checked);
            }
        }

        let handle = &mut self.handles[id];
        if checked && item_checked {
            set_mask(scene, &handle.node, handle.prior_mask);
        } else if item_checked {
            handle.prior_mask = handle.node.node_mask();
            set_mask(scene, &handle.node, NODE_MASK_HIDDEN);
        } else {
            set_mask(scene, &handle.node, NODE_MASK_HIDDEN);
        }
    }

    fn visible_rows(&self) -> Vec<RowView> {
        let mut rows = Vec::new();
        let Some(root) = self.root else {
            return rows;
        };
        let mut stack = vec![(root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let handle = &self.handles[id];
            rows.push(RowView {
                id,
                depth,
                label: handle.name.clone(),
                check_state: handle.check_state,
                enabled: handle.enabled,
                expanded: handle.expanded,
                has_children: !handle.children.is_empty(),
            });
            if handle.expanded {
                stack.extend(handle.children.iter().rev().map(|c| (*c, depth + 1)));
            }
        }
        rows
    }

    /// Recompute the first column's width from the visible rows.
    fn resize_column(&mut self, config: &TreeConfig) -> f32 {
        let width = self
            .visible_rows()
            .iter()
            .map(|row| {
                config.indentation * row.depth as f32
                    + config.checkbox_width
                    + config.char_width * row.label.graphemes(true).count() as f32
            })
            .fold(0.0_f32, f32::max);
        self.column_width = width;
        width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessWidget;
    use horizon_inspector_core::scene::Shape;
    use horizon_inspector_core::{GroupNode, NODE_MASK_ALL, same_node};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn attached_tree() -> (DisplayTree, Arc<HeadlessWidget>) {
        let tree = DisplayTree::new(TreeConfig::default());
        let widget = Arc::new(HeadlessWidget::new());
        tree.attach_widget(widget.clone()).unwrap();
        (tree, widget)
    }

    fn group_of(node: &NodeRef) -> &dyn GroupNode {
        node.as_group().unwrap()
    }

    #[test]
    fn test_add_without_widget_fails() {
        let tree = DisplayTree::new(TreeConfig::default());
        let err = tree.add("A", Shape::new_ref("a"), AddOptions::new()).unwrap_err();
        assert_eq!(err, TreeError::NoWidget);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_attach_twice_fails() {
        let (tree, _widget) = attached_tree();
        let err = tree.attach_widget(Arc::new(HeadlessWidget::new())).unwrap_err();
        assert_eq!(err, TreeError::AlreadyAttached);
    }

    #[test]
    fn test_root_row() {
        let (tree, widget) = attached_tree();
        let root = tree.root().unwrap();
        let item = tree.item(root).unwrap();
        assert_eq!(item.name, "All Displayed Items");
        assert_eq!(item.kind, HandleKind::Root);
        assert!(item.expanded);
        assert!(same_node(&item.node, &widget.root_group()));
        assert_eq!(tree.find(""), Some(root));
    }

    #[test]
    fn test_leaf_attached_to_root_group() {
        let (tree, widget) = attached_tree();
        let node = Shape::new_ref("a");
        let id = tree.add("A", node.clone(), AddOptions::new()).unwrap();

        assert_eq!(tree.depth(id), Some(1));
        assert!(group_of(&widget.root_group()).contains(&node));
        assert_eq!(node.node_mask(), NODE_MASK_ALL);
    }

    #[test]
    fn test_add_without_display_leaves_scene_alone() {
        let (tree, widget) = attached_tree();
        let node = Shape::new_ref("a");
        tree.add("A", node.clone(), AddOptions::new().add_to_display(false)).unwrap();
        assert_eq!(group_of(&widget.root_group()).num_children(), 0);
    }

    #[test]
    fn test_same_name_replaces_in_place() {
        let (tree, widget) = attached_tree();
        let first = Shape::new_ref("first");
        let second = Shape::new_ref("second");

        let id = tree.add("Thing", first.clone(), AddOptions::new()).unwrap();
        first.set_node_mask(0x0f);
        let again = tree
            .add("Thing", second.clone(), AddOptions::new().add_to_display(false))
            .unwrap();

        assert_eq!(id, again);
        let root = tree.root().unwrap();
        assert_eq!(tree.children(root).len(), 1);
        assert!(same_node(&tree.item(id).unwrap().node, &second));
        assert_eq!(second.node_mask(), 0x0f);
        // without add_to_display the scene graph still holds the old node
        assert!(group_of(&widget.root_group()).contains(&first));
        assert!(!group_of(&widget.root_group()).contains(&second));
    }

    #[test]
    fn test_replace_swaps_scene_child() {
        let (tree, widget) = attached_tree();
        let first = Shape::new_ref("first");
        let second = Shape::new_ref("second");

        tree.add("Thing", first.clone(), AddOptions::new()).unwrap();
        tree.add("Thing", second.clone(), AddOptions::new()).unwrap();

        let root_group = widget.root_group();
        assert!(!group_of(&root_group).contains(&first));
        assert!(group_of(&root_group).contains(&second));
        assert_eq!(group_of(&root_group).num_children(), 1);
    }

    #[test]
    fn test_name_decomposition() {
        let (tree, widget) = attached_tree();
        let leaf = Shape::new_ref("leaf");
        let id = tree.add("Group::Sub::Leaf", leaf.clone(), AddOptions::new()).unwrap();

        assert_eq!(tree.depth(id), Some(3));
        assert_eq!(tree.len(), 4);

        let group = tree.find("Group").unwrap();
        let sub = tree.find("Group::Sub").unwrap();
        assert_eq!(tree.item(group).unwrap().kind, HandleKind::Group);
        assert_eq!(tree.item(sub).unwrap().kind, HandleKind::Group);
        assert_eq!(tree.item(id).unwrap().kind, HandleKind::Item);
        assert_eq!(tree.item(id).unwrap().path, "Group::Sub::Leaf");
        assert_eq!(tree.find("Group::Sub::Leaf"), Some(id));

        let sub_node = tree.item(sub).unwrap().node;
        assert_eq!(group_of(&sub_node).num_children(), 1);
        assert!(group_of(&sub_node).contains(&leaf));
        assert_eq!(group_of(&widget.root_group()).num_children(), 1);
    }

    #[test]
    fn test_separator_splits_at_first_occurrence() {
        let (tree, _widget) = attached_tree();
        tree.add("A::B::C", Shape::new_ref("c"), AddOptions::new()).unwrap();
        tree.add("A::D", Shape::new_ref("d"), AddOptions::new()).unwrap();

        let a = tree.find("A").unwrap();
        assert_eq!(tree.children(a).len(), 2);
        assert!(tree.find("B").is_none());
    }

    #[test]
    fn test_group_conflict_leaves_leaf_untouched() {
        let (tree, _widget) = attached_tree();
        let leaf = Shape::new_ref("a");
        let a = tree.add("A", leaf.clone(), AddOptions::new()).unwrap();
        leaf.set_node_mask(0x3);

        let err = tree.add("A::B", Shape::new_ref("b"), AddOptions::new()).unwrap_err();
        assert_eq!(
            err,
            TreeError::NotAGroup {
                name: "A".to_string(),
                class_name: "Shape",
            }
        );

        let item = tree.item(a).unwrap();
        assert!(same_node(&item.node, &leaf));
        assert!(tree.children(a).is_empty());
        assert_eq!(leaf.node_mask(), 0x3);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_user_group_node_can_host_children() {
        let (tree, _widget) = attached_tree();
        let group = Group::new_ref();
        tree.add("Robot", group.clone(), AddOptions::new()).unwrap();
        let arm = Shape::new_ref("arm");
        tree.add("Robot::Arm", arm.clone(), AddOptions::new()).unwrap();
        assert!(group_of(&group).contains(&arm));
    }

    #[test]
    fn test_hidden_add() {
        let (tree, _widget) = attached_tree();
        let node = Shape::new_ref("n");
        let id = tree.add("N", node.clone(), AddOptions::new().show(false)).unwrap();

        let item = tree.item(id).unwrap();
        assert_eq!(item.check_state, CheckState::Unchecked);
        assert_eq!(node.node_mask(), NODE_MASK_HIDDEN);
        assert_eq!(item.prior_mask, NODE_MASK_ALL);

        tree.toggle(id);
        assert_eq!(node.node_mask(), NODE_MASK_ALL);
    }

    #[test]
    fn test_visibility_cascade() {
        let (tree, _widget) = attached_tree();
        let a = Shape::new_ref("a");
        let b = Shape::new_ref("b");
        a.set_node_mask(0x1);
        b.set_node_mask(0x2);
        tree.add("P::A", a.clone(), AddOptions::new()).unwrap();
        tree.add("P::B", b.clone(), AddOptions::new()).unwrap();
        let p = tree.find("P").unwrap();
        let p_node = tree.item(p).unwrap().node;

        tree.toggle(p);
        assert_eq!(p_node.node_mask(), 0);
        assert_eq!(a.node_mask(), 0);
        assert_eq!(b.node_mask(), 0);
        let a_item = tree.item(tree.find("P::A").unwrap()).unwrap();
        assert!(!a_item.enabled);
        assert_eq!(a_item.prior_mask, 0x1);

        tree.toggle(p);
        assert_eq!(p_node.node_mask(), NODE_MASK_ALL);
        assert_eq!(a.node_mask(), 0x1);
        assert_eq!(b.node_mask(), 0x2);
        assert!(tree.item(tree.find("P::A").unwrap()).unwrap().enabled);
    }

    #[test]
    fn test_unchecked_child_stays_hidden() {
        let (tree, _widget) = attached_tree();
        let a = Shape::new_ref("a");
        let b = Shape::new_ref("b");
        let a_id = tree.add("P::A", a.clone(), AddOptions::new()).unwrap();
        tree.add("P::B", b.clone(), AddOptions::new()).unwrap();
        let p = tree.find("P").unwrap();

        tree.toggle(a_id);
        assert_eq!(a.node_mask(), 0);

        tree.toggle(p);
        tree.toggle(p);
        assert_eq!(a.node_mask(), 0);
        assert_eq!(b.node_mask(), NODE_MASK_ALL);

        tree.toggle(a_id);
        assert_eq!(a.node_mask(), NODE_MASK_ALL);
    }

    #[test]
    fn test_disabled_row_forced_hidden() {
        let (tree, _widget) = attached_tree();
        let a = Shape::new_ref("a");
        let a_id = tree.add("P::A", a.clone(), AddOptions::new()).unwrap();
        let p = tree.find("P").unwrap();

        tree.set_checked(p, false).unwrap();
        assert!(!tree.item(a_id).unwrap().enabled);

        // re-applying a checked but disabled row keeps it hidden
        tree.clicked(a_id);
        assert_eq!(a.node_mask(), 0);
    }

    #[test]
    fn test_unchecked_subtree_not_descended() {
        let (tree, _widget) = attached_tree();
        let c = Shape::new_ref("c");
        let c_id = tree.add("P::Q::C", c.clone(), AddOptions::new()).unwrap();
        let p = tree.find("P").unwrap();
        let q = tree.find("P::Q").unwrap();

        tree.toggle(q);
        assert_eq!(c.node_mask(), 0);
        assert_eq!(tree.item(c_id).unwrap().prior_mask, NODE_MASK_ALL);

        c.set_node_mask(0x5);
        tree.toggle(p);
        // Q was already unchecked, so C was not revisited
        assert!(!tree.item(q).unwrap().enabled);
        assert_eq!(c.node_mask(), 0x5);
        assert_eq!(tree.item(c_id).unwrap().prior_mask, NODE_MASK_ALL);
    }

    #[test]
    #[should_panic(expected = "no item for interaction index")]
    fn test_click_unknown_handle_panics() {
        let (tree, _widget) = attached_tree();
        let other = DisplayTree::new(TreeConfig::default());
        other.attach_widget(Arc::new(HeadlessWidget::new())).unwrap();
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(other.add(&format!("n{i}"), Shape::new_ref("n"), AddOptions::new()).unwrap());
        }
        tree.clicked(ids[2]);
    }

    #[test]
    fn test_set_checked_unknown_handle() {
        let (tree, _widget) = attached_tree();
        let other = DisplayTree::new(TreeConfig::default());
        other.attach_widget(Arc::new(HeadlessWidget::new())).unwrap();
        let id = other.add("x::y", Shape::new_ref("y"), AddOptions::new()).unwrap();
        assert_eq!(tree.set_checked(id, false), Err(TreeError::UnknownHandle));
    }

    #[test]
    fn test_column_resized_once_per_structural_event() {
        let tree = DisplayTree::new(TreeConfig::default());
        let resizes = Arc::new(AtomicUsize::new(0));
        let r = resizes.clone();
        tree.signals().column_resized.connect(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        });

        tree.attach_widget(Arc::new(HeadlessWidget::new())).unwrap();
        assert_eq!(resizes.load(Ordering::SeqCst), 1);

        tree.add("A::B::C", Shape::new_ref("c"), AddOptions::new()).unwrap();
        assert_eq!(resizes.load(Ordering::SeqCst), 4);

        // replacing is not structural
        tree.add("A::B::C", Shape::new_ref("c2"), AddOptions::new()).unwrap();
        assert_eq!(resizes.load(Ordering::SeqCst), 4);

        let a = tree.find("A").unwrap();
        tree.expanded(a);
        tree.collapsed(a);
        assert_eq!(resizes.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_row_inserted_reports_parent_and_row() {
        let (tree, _widget) = attached_tree();
        let rows = Arc::new(Mutex::new(Vec::new()));
        let r = rows.clone();
        tree.signals().row_inserted.connect(move |(parent, row)| r.lock().push((*parent, *row)));

        tree.add("A", Shape::new_ref("a"), AddOptions::new()).unwrap();
        tree.add("B", Shape::new_ref("b"), AddOptions::new()).unwrap();
        let root = tree.root().unwrap();
        assert_eq!(*rows.lock(), vec![(root, 0), (root, 1)]);
    }

    #[test]
    fn test_column_width_tracks_visible_rows() {
        let (tree, _widget) = attached_tree();
        let config = TreeConfig::default();
        let root_width = config.checkbox_width + config.char_width * config.root_label.len() as f32;
        assert_eq!(tree.column_width(), root_width);

        let long = "A".repeat(40);
        tree.add(&format!("G::{long}"), Shape::new_ref("x"), AddOptions::new()).unwrap();
        // G is collapsed, so the long label is not visible yet
        assert_eq!(tree.column_width(), root_width);

        tree.expanded(tree.find("G").unwrap());
        let expected = 2.0 * config.indentation + config.checkbox_width + 40.0 * config.char_width;
        assert_eq!(tree.column_width(), expected);
    }

    #[test]
    fn test_callbacks() {
        let (tree, _widget) = attached_tree();
        let created = Arc::new(Mutex::new(Vec::new()));
        let clicks = Arc::new(AtomicUsize::new(0));
        let (c, k) = (created.clone(), clicks.clone());
        let options = AddOptions::new()
            .on_create(move |item| c.lock().push(item.path.clone()))
            .on_click(move |_| {
                k.fetch_add(1, Ordering::SeqCst);
            });

        let id = tree.add("G::Leaf", Shape::new_ref("l"), options).unwrap();
        assert_eq!(*created.lock(), ["G", "G::Leaf"]);

        tree.toggle(id);
        tree.expanded(id);
        tree.collapsed(id);
        assert_eq!(clicks.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_hidden_add_runs_click_before_create() {
        let (tree, _widget) = attached_tree();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (order.clone(), order.clone());
        let options = AddOptions::new()
            .show(false)
            .on_click(move |_| a.lock().push("click"))
            .on_create(move |_| b.lock().push("create"));
        tree.add("N", Shape::new_ref("n"), options).unwrap();
        assert_eq!(*order.lock(), ["click", "create"]);
    }

    #[test]
    fn test_hidden_add_click_runs_under_tree_lock() {
        let tree = Arc::new(DisplayTree::new(TreeConfig::default()));
        tree.attach_widget(Arc::new(HeadlessWidget::new())).unwrap();
        let seen = Arc::new(Mutex::new(None));
        let (inner, s) = (tree.clone(), seen.clone());
        let options = AddOptions::new().show(false).on_click(move |item| {
            // same thread may re-enter, other threads find the tree busy
            let found = inner.find(&item.path).is_some();
            let other = inner.clone();
            let busy = std::thread::spawn(move || other.try_visible_rows().is_none())
                .join()
                .unwrap();
            *s.lock() = Some((found, busy));
        });
        tree.add("N", Shape::new_ref("n"), options).unwrap();
        assert_eq!(*seen.lock(), Some((true, true)));

        // clicks from the view run after the lock is released
        tree.clicked(tree.find("N").unwrap());
        assert_eq!(*seen.lock(), Some((true, false)));
    }

    #[test]
    fn test_create_callback_may_reenter_tree() {
        let tree = Arc::new(DisplayTree::new(TreeConfig::default()));
        tree.attach_widget(Arc::new(HeadlessWidget::new())).unwrap();
        let inner = tree.clone();
        let options = AddOptions::new().on_create(move |item| {
            assert!(inner.find(&item.path).is_some());
        });
        tree.add("A::B", Shape::new_ref("b"), options).unwrap();
    }

    #[test]
    fn test_visible_rows() {
        let (tree, _widget) = attached_tree();
        tree.add("A::X", Shape::new_ref("x"), AddOptions::new()).unwrap();
        tree.add("B", Shape::new_ref("b"), AddOptions::new()).unwrap();

        let labels: Vec<_> = tree.visible_rows().into_iter().map(|r| (r.label, r.depth)).collect();
        assert_eq!(
            labels,
            [
                ("All Displayed Items".to_string(), 0),
                ("A".to_string(), 1),
                ("B".to_string(), 1)
            ]
        );

        tree.apply_interaction(ViewInteraction::Expanded(tree.find("A").unwrap()));
        let rows = tree.try_visible_rows().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[2].label, "X");
        assert_eq!(rows[2].depth, 2);
    }

    #[test]
    fn test_concurrent_adds_are_serialized() {
        let tree = Arc::new(DisplayTree::new(TreeConfig::default()));
        tree.attach_widget(Arc::new(HeadlessWidget::new())).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tree = tree.clone();
                std::thread::spawn(move || {
                    for j in 0..10 {
                        tree.add(&format!("Shared::T{i}::N{j}"), Shape::new_ref("n"), AddOptions::new())
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let shared = tree.find("Shared").unwrap();
        assert_eq!(tree.children(shared).len(), 8);
        assert_eq!(tree.len(), 1 + 1 + 8 + 80);
    }
}
