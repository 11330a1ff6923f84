//! Error types for the core crate.

use thiserror::Error;

/// Errors raised when inspecting scene-graph nodes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The node cannot hold children.
    #[error("node of class {class_name} is not a group")]
    NotAGroup {
        /// Class name reported by the node.
        class_name: &'static str,
    },
}

/// Result type for scene-graph operations.
pub type SceneResult<T> = Result<T, SceneError>;
