//! Marker classes
//!
//! The engine tags what it has touched with classes. The observer only
//! reports `href` attribute changes, so these writes never feed back.

use fbtr_dom::{DomResult, DomTree, NodeId};

/// Element (and its subtree) already handled by the added-node pass
pub const PROCESSED_CLASS: &str = "FBTR-PROCESSED";
/// Element was rewritten by the engine
pub const STYLE_CLASS: &str = "fbtr-clean";
/// Engine-built replacement whose own listeners must stay reachable
pub const SAFE_CLASS: &str = "FBTR-SAFE";
/// Collapsed-content placeholder
pub const COLLAPSIBLE_CLASS: &str = "fbtrCollapsible";
/// Toggled on deferred-image controls
pub const HIDE_CLASS: &str = "fbtrHide";

/// Subtrees the pipeline never dispatches into
pub const SKIPPED_TAGS: &[&str] = &["script", "style", "link"];

pub fn mark_processed(tree: &mut DomTree, node: NodeId) -> DomResult<bool> {
    tree.add_class(node, PROCESSED_CLASS)
}

pub fn is_processed(tree: &DomTree, node: NodeId) -> bool {
    tree.has_class(node, PROCESSED_CLASS)
}

/// Mark `node` as rewritten
pub fn apply_style(tree: &mut DomTree, node: NodeId) -> DomResult<bool> {
    tree.add_class(node, STYLE_CLASS)
}

/// Should an added node go through sanitization?
pub fn is_dispatchable(tree: &DomTree, node: NodeId) -> bool {
    match tree.element(node) {
        Some(el) => !SKIPPED_TAGS.contains(&el.tag.as_str()) && !el.has_class(PROCESSED_CLASS),
        None => false,
    }
}
