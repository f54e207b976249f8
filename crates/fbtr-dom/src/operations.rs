//! DOM Node Operations
//!
//! Errors raised by node manipulation: appendChild, removeChild,
//! insertBefore, replaceChild.

use crate::NodeId;

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Node not found
    #[error("node {0} not found")]
    NotFound(NodeId),
    /// Inserting a node into itself or one of its descendants
    #[error("hierarchy request error: {0} cannot contain {1}")]
    HierarchyRequest(NodeId, NodeId),
    /// Operation requires an element
    #[error("node {0} is not an element")]
    NotAnElement(NodeId),
    /// Node is not a child of the given parent
    #[error("node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    /// Node has no parent
    #[error("node {0} is detached")]
    Detached(NodeId),
}
