//! fbtr DOM - Observable Document Object Model
//!
//! Arena-based DOM tree that records every structural and attribute change
//! for registered mutation observers, and dispatches DOM events through
//! capture/bubble listeners.

mod classlist;
mod dataset;
mod document;
mod events;
mod node;
mod observer;
mod operations;
mod serialize;
mod tree;

pub use classlist::DOMTokenList;
pub use dataset::{attribute_to_dataset_key, dataset_key_to_attribute};
pub use document::Document;
pub use events::{Event, EventListener, EventPhase, ListenerOptions, listener};
pub use node::{Attribute, ElementData, Node, NodeData};
pub use observer::{MutationObserverInit, MutationRecord, MutationType, ObserverId};
pub use operations::{DomError, DomResult};
pub use tree::{Descendants, DomTree};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root (document) node ID
    pub const ROOT: NodeId = NodeId(0);
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check that this ID refers to a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Convert sentinel into `Option`
    #[inline]
    pub fn to_option(self) -> Option<NodeId> {
        if self.is_valid() { Some(self) } else { None }
    }

    /// Raw arena index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
