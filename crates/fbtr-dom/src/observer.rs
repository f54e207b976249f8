//! Mutation Observers
//!
//! Observers register interest in a target (optionally its whole subtree)
//! and accumulate `MutationRecord`s until the host drains them with
//! `DomTree::take_records`. One drain is one delivery batch.

use crate::NodeId;

/// Observer handle returned by `DomTree::create_observer`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u32);

/// Mutation observer options
#[derive(Debug, Clone, Default)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub subtree: bool,
    /// Restrict attribute records to these (lowercase) names
    pub attribute_filter: Option<Vec<String>>,
}

/// Kind of change carried by a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    ChildList,
}

/// Mutation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
}

impl MutationRecord {
    pub fn child_list(target: NodeId, added_nodes: Vec<NodeId>, removed_nodes: Vec<NodeId>) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes,
            removed_nodes,
            attribute_name: None,
            old_value: None,
        }
    }

    pub fn attribute(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: Some(name.to_ascii_lowercase()),
            old_value,
        }
    }
}

/// Mutation observer
#[derive(Debug)]
pub(crate) struct MutationObserver {
    pub(crate) id: ObserverId,
    observations: Vec<(NodeId, MutationObserverInit)>,
    records: Vec<MutationRecord>,
}

impl MutationObserver {
    pub(crate) fn new(id: ObserverId) -> Self {
        Self {
            id,
            observations: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Observe a target; re-observing replaces its options
    pub(crate) fn observe(&mut self, target: NodeId, options: MutationObserverInit) {
        match self.observations.iter_mut().find(|(t, _)| *t == target) {
            Some(entry) => entry.1 = options,
            None => self.observations.push((target, options)),
        }
    }

    pub(crate) fn disconnect(&mut self) {
        self.observations.clear();
        self.records.clear();
    }

    pub(crate) fn is_observing(&self) -> bool {
        !self.observations.is_empty()
    }

    pub(crate) fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub(crate) fn push(&mut self, record: MutationRecord) {
        self.records.push(record);
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.records.is_empty()
    }

    /// Does any observation want this record? `is_ancestor(a, b)` answers
    /// whether `a` is a strict ancestor of `b` in the live tree.
    pub(crate) fn wants(
        &self,
        record: &MutationRecord,
        is_ancestor: impl Fn(NodeId, NodeId) -> bool,
    ) -> bool {
        self.observations.iter().any(|(observed, options)| {
            let in_scope = *observed == record.target
                || (options.subtree && is_ancestor(*observed, record.target));
            if !in_scope {
                return false;
            }
            match record.mutation_type {
                MutationType::ChildList => options.child_list,
                MutationType::Attributes => {
                    options.attributes
                        && match (&options.attribute_filter, &record.attribute_name) {
                            (Some(filter), Some(name)) => filter.iter().any(|f| f == name),
                            _ => true,
                        }
                }
            }
        })
    }
}
