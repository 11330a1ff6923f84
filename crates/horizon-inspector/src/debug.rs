//! Text rendering of a [`DisplayTree`] for logs and test failures.
//!
//! ```
//! use std::sync::Arc;
//! use horizon_inspector::{AddOptions, DisplayTree, TreeConfig, TreeDebug};
//! use horizon_inspector::headless::HeadlessWidget;
//! use horizon_inspector_core::scene::Shape;
//!
//! let tree = DisplayTree::new(TreeConfig::default());
//! tree.attach_widget(Arc::new(HeadlessWidget::new())).unwrap();
//! tree.add("Robot::Arm", Shape::new_ref("arm"), AddOptions::new()).unwrap();
//!
//! let text = TreeDebug::new().format(&tree);
//! assert!(text.contains("Arm"));
//! ```

use std::fmt::Write;

use crate::tree::{CheckState, DisplayTree, HandleId, HandleKind};

/// Branch drawing style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// ASCII characters for tree branches.
    Ascii,
    /// Unicode box-drawing characters.
    #[default]
    Unicode,
    /// Indentation only.
    Compact,
}

/// What [`TreeDebug`] prints for each row.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    pub style: TreeStyle,
    /// Print the check box state.
    pub show_state: bool,
    /// Print the node's current and remembered masks.
    pub show_masks: bool,
    /// Print the row kind and node class.
    pub show_types: bool,
    /// Skip the children of collapsed rows.
    pub visible_only: bool,
    /// Maximum depth to print (None for unlimited).
    pub max_depth: Option<usize>,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_state: true,
            show_masks: false,
            show_types: false,
            visible_only: false,
            max_depth: None,
        }
    }
}

impl TreeFormatOptions {
    /// Everything, including masks and types.
    pub fn detailed() -> Self {
        Self {
            show_masks: true,
            show_types: true,
            ..Default::default()
        }
    }

    /// Names only.
    pub fn minimal() -> Self {
        Self {
            show_state: false,
            ..Default::default()
        }
    }
}

/// Formats a display tree as indented text.
#[derive(Debug, Clone, Default)]
pub struct TreeDebug {
    options: TreeFormatOptions,
}

impl TreeDebug {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format the whole tree.
    pub fn format(&self, tree: &DisplayTree) -> String {
        let mut output = String::new();
        match tree.root() {
            Some(root) => self.format_subtree_into(tree, root, &mut Vec::new(), &mut output),
            None => output.push_str("(no render widget)\n"),
        }
        output
    }

    /// Format the subtree rooted at `id`.
    pub fn format_subtree(&self, tree: &DisplayTree, id: HandleId) -> String {
        let mut output = String::new();
        self.format_subtree_into(tree, id, &mut Vec::new(), &mut output);
        output
    }

    /// `lasts` holds, for every ancestor below the subtree root, whether it
    /// was the last of its siblings.
    fn format_subtree_into(
        &self,
        tree: &DisplayTree,
        id: HandleId,
        lasts: &mut Vec<bool>,
        output: &mut String,
    ) {
        let Some(item) = tree.item(id) else {
            return;
        };
        let depth = lasts.len();
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return;
        }

        output.push_str(&self.build_prefix(lasts));
        output.push_str(&item.name);

        if self.options.show_state {
            let state = match item.check_state {
                CheckState::Checked => "x",
                CheckState::PartiallyChecked => "~",
                CheckState::Unchecked => " ",
            };
            write!(output, " [{state}]").expect("write to String");
            if !item.enabled {
                output.push_str(" (disabled)");
            }
        }

        if self.options.show_types {
            let kind = match item.kind {
                HandleKind::Root => "root",
                HandleKind::Group => "group",
                HandleKind::Item => "item",
            };
            write!(output, " <{kind}: {}>", item.node.class_name()).expect("write to String");
        }

        if self.options.show_masks {
            write!(
                output,
                " mask={:#x} prior={:#x}",
                item.node.node_mask(),
                item.prior_mask
            )
            .expect("write to String");
        }
        output.push('\n');

        if self.options.visible_only && !item.expanded {
            return;
        }

        let children = tree.children(id);
        let count = children.len();
        for (i, child) in children.into_iter().enumerate() {
            lasts.push(i + 1 == count);
            self.format_subtree_into(tree, child, lasts, output);
            lasts.pop();
        }
    }

    fn build_prefix(&self, lasts: &[bool]) -> String {
        let Some((is_last, ancestors)) = lasts.split_last() else {
            return String::new();
        };

        let (pipe, tee, corner, blank) = match self.options.style {
            TreeStyle::Ascii => ("|   ", "+-- ", "`-- ", "    "),
            TreeStyle::Unicode => (
                "\u{2502}   ",
                "\u{251c}\u{2500}\u{2500} ",
                "\u{2514}\u{2500}\u{2500} ",
                "    ",
            ),
            TreeStyle::Compact => ("  ", "- ", "- ", "  "),
        };

        let mut prefix = String::new();
        for ancestor_last in ancestors {
            prefix.push_str(if *ancestor_last { blank } else { pipe });
        }
        prefix.push_str(if *is_last { corner } else { tee });
        prefix
    }
}
