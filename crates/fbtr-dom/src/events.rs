//! DOM Events
//!
//! Listener registration and capture / target / bubble dispatch.

use std::rc::Rc;

use crate::{DomTree, NodeId};

/// Event listener callback. Receives the tree so handlers can mutate it.
pub type EventListener = Rc<dyn Fn(&mut DomTree, &mut Event)>;

/// Wrap a closure as an `EventListener`
pub fn listener<F>(f: F) -> EventListener
where
    F: Fn(&mut DomTree, &mut Event) + 'static,
{
    Rc::new(f)
}

/// Dispatch phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPhase {
    Capturing,
    AtTarget,
    Bubbling,
}

/// Listener registration options
#[derive(Debug, Clone, Default)]
pub struct ListenerOptions {
    pub capture: bool,
    /// Identity of the callback. Registering the same key twice for the same
    /// node, type and phase is a no-op, like re-adding the same function.
    pub key: Option<&'static str>,
}

impl ListenerOptions {
    pub fn capture() -> Self {
        Self { capture: true, key: None }
    }

    pub fn keyed(mut self, key: &'static str) -> Self {
        self.key = Some(key);
        self
    }
}

/// DOM event
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub target: NodeId,
    pub current_target: NodeId,
    pub phase: EventPhase,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl Event {
    pub fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            phase: EventPhase::AtTarget,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

/// One listener on one node. The tree keys these by node.
pub(crate) struct Registration {
    event_type: String,
    options: ListenerOptions,
    callback: EventListener,
}

impl DomTree {
    /// Register a listener; returns false when a keyed duplicate already exists
    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        options: ListenerOptions,
        callback: EventListener,
    ) -> bool {
        if let Some(key) = options.key {
            if self.has_event_listener(node, event_type, options.capture, key) {
                return false;
            }
        }
        self.listeners.entry(node).or_default().push(Registration {
            event_type: event_type.to_string(),
            options,
            callback,
        });
        true
    }

    /// Check for a keyed listener
    pub fn has_event_listener(&self, node: NodeId, event_type: &str, capture: bool, key: &str) -> bool {
        self.listeners.get(&node).is_some_and(|regs| {
            regs.iter().any(|r| {
                r.event_type == event_type && r.options.capture == capture && r.options.key == Some(key)
            })
        })
    }

    /// Number of listeners attached to `node`
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.listeners.get(&node).map_or(0, Vec::len)
    }

    /// Drop every listener on `node` and its descendants. Returns how many
    /// were dropped.
    pub fn remove_event_listeners(&mut self, node: NodeId) -> usize {
        if self.listeners.is_empty() {
            return 0;
        }
        let mut dropped = self.listeners.remove(&node).map_or(0, |regs| regs.len());
        let descendants: Vec<NodeId> = self.descendants(node).collect();
        for id in descendants {
            dropped += self.listeners.remove(&id).map_or(0, |regs| regs.len());
        }
        dropped
    }

    /// Dispatch an event at `target`. The propagation path is fixed before
    /// the first listener runs, so listeners may restructure the tree.
    pub fn dispatch_event(&mut self, target: NodeId, event_type: &str) -> Event {
        let mut event = Event::new(event_type, target);
        let mut path: Vec<NodeId> = self.ancestors(target).collect();
        path.reverse();

        for &node in &path {
            event.phase = EventPhase::Capturing;
            self.invoke(node, &mut event, true);
            if event.propagation_stopped {
                return event;
            }
        }

        event.phase = EventPhase::AtTarget;
        self.invoke(target, &mut event, true);
        if !event.immediate_propagation_stopped {
            self.invoke(target, &mut event, false);
        }
        if event.propagation_stopped {
            return event;
        }

        for &node in path.iter().rev() {
            event.phase = EventPhase::Bubbling;
            self.invoke(node, &mut event, false);
            if event.propagation_stopped {
                break;
            }
        }
        event
    }

    fn invoke(&mut self, node: NodeId, event: &mut Event, capture: bool) {
        let Some(regs) = self.listeners.get(&node) else {
            return;
        };
        let callbacks: Vec<EventListener> = regs
            .iter()
            .filter(|r| r.event_type == event.event_type && r.options.capture == capture)
            .map(|r| Rc::clone(&r.callback))
            .collect();

        event.current_target = node;
        for callback in callbacks {
            callback(self, event);
            if event.immediate_propagation_stopped {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn fixture() -> (DomTree, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("a");
        tree.append_child(NodeId::ROOT, outer).unwrap();
        tree.append_child(outer, inner).unwrap();
        (tree, outer, inner)
    }

    #[test]
    fn test_capture_then_bubble_order() {
        let (mut tree, outer, inner) = fixture();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (node, capture, label) in [(outer, true, "outer-capture"), (outer, false, "outer-bubble"), (inner, false, "target")] {
            let log = Rc::clone(&log);
            let options = ListenerOptions { capture, key: None };
            tree.add_event_listener(node, "click", options, listener(move |_, _| log.borrow_mut().push(label)));
        }

        tree.dispatch_event(inner, "click");
        assert_eq!(*log.borrow(), vec!["outer-capture", "target", "outer-bubble"]);
    }

    #[test]
    fn test_stop_propagation_blocks_ancestors() {
        let (mut tree, outer, inner) = fixture();
        let fired = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&fired);
        tree.add_event_listener(outer, "click", ListenerOptions::default(), listener(move |_, _| *flag.borrow_mut() = true));
        tree.add_event_listener(inner, "click", ListenerOptions::capture(), listener(|_, e| e.stop_propagation()));

        let event = tree.dispatch_event(inner, "click");
        assert!(event.propagation_stopped());
        assert!(!*fired.borrow());
    }

    #[test]
    fn test_replaced_subtree_loses_listeners() {
        let (mut tree, outer, inner) = fixture();
        tree.add_event_listener(outer, "click", ListenerOptions::capture(), listener(|_, _| {}));
        tree.add_event_listener(inner, "click", ListenerOptions::default(), listener(|_, _| {}));
        let fresh = tree.create_element("div");
        tree.add_event_listener(fresh, "click", ListenerOptions::default(), listener(|_, _| {}));

        tree.replace_with(outer, fresh).unwrap();
        assert_eq!(tree.listener_count(outer), 0);
        assert_eq!(tree.listener_count(inner), 0);
        assert_eq!(tree.listener_count(fresh), 1);
    }

    #[test]
    fn test_listener_replacing_its_own_node() {
        let (mut tree, outer, inner) = fixture();
        tree.add_event_listener(
            inner,
            "click",
            ListenerOptions::capture(),
            listener(|tree, event| {
                let video = tree.create_element("video");
                tree.replace_with(event.current_target, video).unwrap();
            }),
        );
        tree.dispatch_event(inner, "click");
        assert_eq!(tree.listener_count(inner), 0);
        assert_eq!(tree.tag_name(tree.first_child(outer).unwrap()), Some("video"));
    }

    #[test]
    fn test_keyed_listener_dedup() {
        let (mut tree, outer, _) = fixture();
        let options = ListenerOptions::capture().keyed("blocker");
        assert!(tree.add_event_listener(outer, "click", options.clone(), listener(|_, _| {})));
        assert!(!tree.add_event_listener(outer, "click", options, listener(|_, _| {})));
        assert_eq!(tree.listener_count(outer), 1);
    }
}
