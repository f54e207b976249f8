//! DOM Tree (arena-based allocation)
//!
//! Every mutating operation notifies the registered mutation observers,
//! whoever performs it. Nodes are never freed; a removed node simply loses
//! its parent and can be re-inserted later. A replaced node is discarded
//! along with its listeners.

use std::collections::HashMap;

use crate::events::Registration;
use crate::observer::MutationObserver;
use crate::{
    DOMTokenList, DomError, DomResult, ElementData, MutationObserverInit, MutationRecord, Node,
    NodeData, NodeId, ObserverId, dataset_key_to_attribute,
};

/// Arena-based DOM tree
pub struct DomTree {
    nodes: Vec<Node>,
    observers: Vec<MutationObserver>,
    next_observer: u32,
    pub(crate) listeners: HashMap<NodeId, Vec<Registration>>,
}

impl std::fmt::Debug for DomTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomTree")
            .field("nodes", &self.nodes.len())
            .field("observers", &self.observers.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            observers: Vec::new(),
            next_observer: 1,
            listeners: HashMap::new(),
        }
    }

    /// Document node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.nodes.get(id.index()).ok_or(DomError::NotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(DomError::NotFound(id))
    }

    /// Number of nodes ever allocated
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds its document node
    pub fn is_empty(&self) -> bool {
        false
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Create a detached element with attributes
    pub fn create_element_with_attrs(&mut self, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let mut node = Node::element(tag);
        if let Some(elem) = node.as_element_mut() {
            for (name, value) in attrs {
                elem.set_attr(name, value);
            }
        }
        self.push(node)
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(Node::comment(content))
    }

    /// Create a detached doctype node
    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        let mut node = Node::document();
        node.data = NodeData::Doctype { name: name.to_string() };
        self.push(node)
    }

    /// Copy a node (and with `deep`, its descendants). Listeners are not copied.
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> DomResult<NodeId> {
        let data = self.node(id)?.data.clone();
        let copy = self.push(Node {
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            prev_sibling: NodeId::NONE,
            next_sibling: NodeId::NONE,
            data,
        });
        if let Some(elem) = self.nodes[copy.index()].as_element_mut() {
            elem.playing = false;
        }
        if deep {
            for child in self.children(id) {
                let child_copy = self.clone_node(child, true)?;
                self.link_before(copy, child_copy, NodeId::NONE)?;
            }
        }
        Ok(copy)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.to_option())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child.to_option())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.to_option())
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.to_option())
    }

    /// Children in order (snapshot)
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.first_child(id);
        while let Some(child) = cur {
            out.push(child);
            cur = self.next_sibling(child);
        }
        out
    }

    /// Element children in order (snapshot)
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).into_iter().filter(|&c| self.is_element(c)).collect()
    }

    /// Strict ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Inclusive ancestors, starting with `id`
    pub fn ancestors_inclusive(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(id).chain(self.ancestors(id))
    }

    /// Descendants in document (pre-)order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root: id,
            next: self.first_child(id),
        }
    }

    /// Is `ancestor` a strict ancestor of `node`?
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Is `node` attached (reachable from the document node)?
    pub fn is_connected(&self, node: NodeId) -> bool {
        node == NodeId::ROOT || self.is_ancestor_of(NodeId::ROOT, node)
    }

    // ------------------------------------------------------------------
    // Element accessors
    // ------------------------------------------------------------------

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Lowercase tag name of an element
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag.as_str())
    }

    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id).is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.get_attr(name))
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    /// Set an attribute. Like the DOM, this queues a record even when the
    /// value does not change.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let elem = self.node_mut(id)?.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        let old = elem.set_attr(name, value);
        self.notify(MutationRecord::attribute(id, name, old));
        Ok(())
    }

    /// Remove an attribute; returns whether it existed
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<bool> {
        let elem = self.node_mut(id)?.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        match elem.remove_attr(name) {
            Some(old) => {
                self.notify(MutationRecord::attribute(id, name, Some(old)));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// `element.dataset[key]`
    pub fn dataset_get(&self, id: NodeId, key: &str) -> Option<&str> {
        self.get_attribute(id, &dataset_key_to_attribute(key))
    }

    /// `element.dataset[key] = value`
    pub fn dataset_set(&mut self, id: NodeId, key: &str, value: &str) -> DomResult<()> {
        self.set_attribute(id, &dataset_key_to_attribute(key), value)
    }

    /// `delete element.dataset[key]`
    pub fn dataset_remove(&mut self, id: NodeId, key: &str) -> DomResult<bool> {
        self.remove_attribute(id, &dataset_key_to_attribute(key))
    }

    pub fn class_list(&self, id: NodeId) -> DOMTokenList {
        self.element(id).map(ElementData::class_list).unwrap_or_default()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|e| e.has_class(class))
    }

    /// Add a class; writes (and notifies) only when it was missing
    pub fn add_class(&mut self, id: NodeId, class: &str) -> DomResult<bool> {
        let mut list = self.class_list(id);
        if !list.add(class) {
            return Ok(false);
        }
        self.set_attribute(id, "class", &list.value())?;
        Ok(true)
    }

    /// Toggle a class, returning the new state
    pub fn toggle_class(&mut self, id: NodeId, class: &str) -> DomResult<bool> {
        let mut list = self.class_list(id);
        let state = list.toggle(class);
        self.set_attribute(id, "class", &list.value())?;
        Ok(state)
    }

    /// Start playback of a media element
    pub fn play(&mut self, id: NodeId) -> DomResult<()> {
        let elem = self.node_mut(id)?.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        elem.playing = true;
        tracing::trace!("playing media element {}", id);
        Ok(())
    }

    pub fn is_playing(&self, id: NodeId) -> bool {
        self.element(id).is_some_and(|e| e.playing)
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.get(id).and_then(Node::as_text) {
            return text.to_string();
        }
        self.descendants(id)
            .filter_map(|n| self.get(n).and_then(Node::as_text))
            .collect()
    }

    /// Replace all children with a single text node (none for empty text)
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        self.node(id)?;
        for child in self.children(id) {
            self.remove_child(id, child)?;
        }
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structural mutation
    // ------------------------------------------------------------------

    /// Append `child` to `parent`, moving it if already attached elsewhere
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or at the end)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.check_insert(parent, child)?;
        if let Some(r) = reference {
            if self.parent(r) != Some(parent) {
                return Err(DomError::NotAChild { parent, child: r });
            }
        }
        // Moving a node before itself keeps it in place.
        if reference == Some(child) {
            return Ok(child);
        }
        self.detach_with_record(child)?;
        self.link_before(parent, child, reference.unwrap_or(NodeId::NONE))?;
        self.notify(MutationRecord::child_list(parent, vec![child], Vec::new()));
        Ok(child)
    }

    /// Remove `child` from `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.unlink(child)?;
        self.notify(MutationRecord::child_list(parent, Vec::new(), vec![child]));
        Ok(child)
    }

    /// `element.remove()`: detach from whatever parent it has
    pub fn remove(&mut self, id: NodeId) -> DomResult<()> {
        match self.parent(id) {
            Some(parent) => self.remove_child(parent, id).map(|_| ()),
            None => Ok(()),
        }
    }

    /// Replace `old` with `new` in a single step, so no intermediate state
    /// is visible to observers. Listeners on `old`'s subtree are dropped.
    pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> DomResult<NodeId> {
        if self.parent(old) != Some(parent) {
            return Err(DomError::NotAChild { parent, child: old });
        }
        if new == old {
            return Ok(old);
        }
        self.check_insert(parent, new)?;
        self.detach_with_record(new)?;
        let reference = self.next_sibling(old).unwrap_or(NodeId::NONE);
        self.unlink(old)?;
        self.link_before(parent, new, reference)?;
        self.remove_event_listeners(old);
        self.notify(MutationRecord::child_list(parent, vec![new], vec![old]));
        Ok(old)
    }

    /// Replace `old` with `new` using `old`'s current parent
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) -> DomResult<()> {
        let parent = self.parent(old).ok_or(DomError::Detached(old))?;
        self.replace_child(parent, new, old).map(|_| ())
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if child == parent || self.is_ancestor_of(child, parent) {
            return Err(DomError::HierarchyRequest(parent, child));
        }
        Ok(())
    }

    fn detach_with_record(&mut self, child: NodeId) -> DomResult<()> {
        if let Some(old_parent) = self.parent(child) {
            self.remove_child(old_parent, child)?;
        }
        Ok(())
    }

    fn link_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> DomResult<()> {
        let prev = if reference.is_valid() {
            self.node(reference)?.prev_sibling
        } else {
            self.node(parent)?.last_child
        };
        {
            let node = self.node_mut(child)?;
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = reference;
        }
        if prev.is_valid() {
            self.node_mut(prev)?.next_sibling = child;
        } else {
            self.node_mut(parent)?.first_child = child;
        }
        if reference.is_valid() {
            self.node_mut(reference)?.prev_sibling = child;
        } else {
            self.node_mut(parent)?.last_child = child;
        }
        Ok(())
    }

    fn unlink(&mut self, child: NodeId) -> DomResult<()> {
        let (parent, prev, next) = {
            let node = self.node(child)?;
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if !parent.is_valid() {
            return Ok(());
        }
        if prev.is_valid() {
            self.node_mut(prev)?.next_sibling = next;
        } else {
            self.node_mut(parent)?.first_child = next;
        }
        if next.is_valid() {
            self.node_mut(next)?.prev_sibling = prev;
        } else {
            self.node_mut(parent)?.last_child = prev;
        }
        let node = self.node_mut(child)?;
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutation observers
    // ------------------------------------------------------------------

    /// Register a new (idle) observer
    pub fn create_observer(&mut self) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push(MutationObserver::new(id));
        id
    }

    /// Start observing `target` with `options`
    pub fn observe(&mut self, observer: ObserverId, target: NodeId, options: MutationObserverInit) {
        if let Some(o) = self.observers.iter_mut().find(|o| o.id == observer) {
            o.observe(target, options);
        }
    }

    /// Stop observing and drop pending records
    pub fn disconnect(&mut self, observer: ObserverId) {
        if let Some(o) = self.observers.iter_mut().find(|o| o.id == observer) {
            o.disconnect();
        }
    }

    /// Drain the pending batch for `observer`
    pub fn take_records(&mut self, observer: ObserverId) -> Vec<crate::MutationRecord> {
        self.observers
            .iter_mut()
            .find(|o| o.id == observer)
            .map(MutationObserver::take_records)
            .unwrap_or_default()
    }

    /// Does `observer` have an undelivered batch?
    pub fn has_pending_records(&self, observer: ObserverId) -> bool {
        self.observers.iter().any(|o| o.id == observer && o.has_pending())
    }

    fn notify(&mut self, record: MutationRecord) {
        let interested: Vec<usize> = self
            .observers
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_observing() && o.wants(&record, |a, b| self.is_ancestor_of(a, b)))
            .map(|(i, _)| i)
            .collect();
        for i in interested {
            self.observers[i].push(record.clone());
        }
    }
}

/// Pre-order iterator over the descendants of a node
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = if let Some(child) = self.tree.first_child(current) {
            Some(child)
        } else {
            let mut cursor = Some(current);
            let mut following = None;
            while let Some(n) = cursor {
                if n == self.root {
                    break;
                }
                if let Some(sibling) = self.tree.next_sibling(n) {
                    following = Some(sibling);
                    break;
                }
                cursor = self.tree.parent(n);
            }
            following
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MutationType;

    fn list(tree: &mut DomTree) -> (NodeId, NodeId, NodeId, NodeId) {
        let ul = tree.create_element("ul");
        let a = tree.create_element("li");
        let b = tree.create_element("li");
        let c = tree.create_element("li");
        tree.append_child(NodeId::ROOT, ul).unwrap();
        for li in [a, b, c] {
            tree.append_child(ul, li).unwrap();
        }
        (ul, a, b, c)
    }

    #[test]
    fn test_append_and_children() {
        let mut tree = DomTree::new();
        let (ul, a, b, c) = list(&mut tree);
        assert_eq!(tree.children(ul), vec![a, b, c]);
        assert_eq!(tree.parent(b), Some(ul));
        assert!(tree.is_connected(c));
    }

    #[test]
    fn test_insert_before_and_move() {
        let mut tree = DomTree::new();
        let (ul, a, b, c) = list(&mut tree);
        tree.insert_before(ul, c, Some(a)).unwrap();
        assert_eq!(tree.children(ul), vec![c, a, b]);
    }

    #[test]
    fn test_remove_child() {
        let mut tree = DomTree::new();
        let (ul, a, b, c) = list(&mut tree);
        tree.remove_child(ul, b).unwrap();
        assert_eq!(tree.children(ul), vec![a, c]);
        assert!(!tree.is_connected(b));
        assert_eq!(tree.remove_child(ul, b), Err(DomError::NotAChild { parent: ul, child: b }));
    }

    #[test]
    fn test_hierarchy_error() {
        let mut tree = DomTree::new();
        let (ul, a, _, _) = list(&mut tree);
        assert_eq!(tree.append_child(a, ul), Err(DomError::HierarchyRequest(a, ul)));
    }

    #[test]
    fn test_replace_child_keeps_position() {
        let mut tree = DomTree::new();
        let (ul, a, b, c) = list(&mut tree);
        let d = tree.create_element("li");
        tree.replace_child(ul, d, b).unwrap();
        assert_eq!(tree.children(ul), vec![a, d, c]);
        assert_eq!(tree.parent(b), None);
    }

    #[test]
    fn test_descendants_preorder() {
        let mut tree = DomTree::new();
        let (ul, a, b, c) = list(&mut tree);
        let span = tree.create_element("span");
        tree.append_child(a, span).unwrap();
        let order: Vec<_> = tree.descendants(ul).collect();
        assert_eq!(order, vec![a, span, b, c]);
        assert_eq!(tree.descendants(a).collect::<Vec<_>>(), vec![span]);
    }

    #[test]
    fn test_clone_deep() {
        let mut tree = DomTree::new();
        let (ul, _, _, _) = list(&mut tree);
        tree.set_attribute(ul, "class", "menu").unwrap();
        let copy = tree.clone_node(ul, true).unwrap();
        assert_eq!(tree.children(copy).len(), 3);
        assert_eq!(tree.get_attribute(copy, "class"), Some("menu"));
        assert_eq!(tree.parent(copy), None);
    }

    #[test]
    fn test_observer_records_subtree_changes() {
        let mut tree = DomTree::new();
        let (ul, a, _, _) = list(&mut tree);
        let observer = tree.create_observer();
        tree.observe(observer, ul, MutationObserverInit {
            child_list: true,
            attributes: true,
            subtree: true,
            attribute_filter: Some(vec!["href".to_string()]),
        });

        let link = tree.create_element("a");
        tree.append_child(a, link).unwrap();
        tree.set_attribute(link, "href", "/x").unwrap();
        tree.set_attribute(link, "class", "ignored").unwrap();

        let records = tree.take_records(observer);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].mutation_type, MutationType::ChildList);
        assert_eq!(records[0].added_nodes, vec![link]);
        assert_eq!(records[1].attribute_name.as_deref(), Some("href"));
        assert!(!tree.has_pending_records(observer));
    }

    #[test]
    fn test_observer_ignores_outside_changes() {
        let mut tree = DomTree::new();
        let (ul, _, _, _) = list(&mut tree);
        let other = tree.create_element("div");
        tree.append_child(NodeId::ROOT, other).unwrap();
        let observer = tree.create_observer();
        tree.observe(observer, ul, MutationObserverInit {
            child_list: true,
            subtree: true,
            ..Default::default()
        });
        let p = tree.create_element("p");
        tree.append_child(other, p).unwrap();
        assert!(tree.take_records(observer).is_empty());
    }

    #[test]
    fn test_add_class_only_writes_when_missing() {
        let mut tree = DomTree::new();
        let (ul, _, _, _) = list(&mut tree);
        let observer = tree.create_observer();
        tree.observe(observer, ul, MutationObserverInit {
            attributes: true,
            ..Default::default()
        });
        assert!(tree.add_class(ul, "x").unwrap());
        assert!(!tree.add_class(ul, "x").unwrap());
        assert_eq!(tree.take_records(observer).len(), 1);
    }

    #[test]
    fn test_dataset_helpers() {
        let mut tree = DomTree::new();
        let (_, a, _, _) = list(&mut tree);
        tree.dataset_set(a, "hovercardReferrer", "abc").unwrap();
        assert_eq!(tree.get_attribute(a, "data-hovercard-referrer"), Some("abc"));
        assert!(tree.dataset_remove(a, "hovercardReferrer").unwrap());
        assert_eq!(tree.dataset_get(a, "hovercardReferrer"), None);
    }
}
