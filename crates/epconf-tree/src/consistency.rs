//! Tree/registry invariant checks
//!
//! After every successful merge step:
//! - every registry entry resolves to a node reachable from the root
//! - every reachable record has exactly one registry entry, bound to itself
//! - every non-root record names its owner as parent
//! - the arena holds no node outside the tree

use crate::record::NodeKey;
use crate::tree::ConfigTree;
use epconf_core::RecordId;
use std::collections::HashSet;
use thiserror::Error;

/// A broken tree/registry invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// Registry entry for a node not reachable from the root
    #[error("registry entry {0} points at a detached node")]
    DanglingEntry(RecordId),

    /// Reachable record without a registry entry
    #[error("record {0} is reachable but not registered")]
    MissingEntry(RecordId),

    /// Registry binds the identifier to a different node
    #[error("record {0} is registered to another node")]
    WrongBinding(RecordId),

    /// Identifier carried by more than one reachable record
    #[error("identifier {0} appears more than once in the tree")]
    SharedIdentifier(RecordId),

    /// Parent link disagrees with ownership
    #[error("record {0} has a stale parent link")]
    ParentMismatch(RecordId),

    /// Arena nodes left over after a merge step
    #[error("{0} arena nodes are not reachable from the root")]
    LeakedNodes(usize),
}

impl ConfigTree {
    /// Verify the tree/registry invariants
    pub fn check_consistency(&self) -> Result<(), InvariantViolation> {
        let mut reachable: HashSet<NodeKey> = HashSet::new();
        let mut seen_ids: HashSet<RecordId> = HashSet::new();
        let mut stack: Vec<(NodeKey, Option<NodeKey>)> = vec![(self.root, None)];

        while let Some((key, owner)) = stack.pop() {
            let node = &self.nodes[key];
            if node.parent != owner {
                return Err(InvariantViolation::ParentMismatch(node.id));
            }
            if !seen_ids.insert(node.id) {
                return Err(InvariantViolation::SharedIdentifier(node.id));
            }
            match self.registry.resolve(&node.id) {
                Ok(bound) if bound == key => {}
                Ok(_) => return Err(InvariantViolation::WrongBinding(node.id)),
                Err(_) => return Err(InvariantViolation::MissingEntry(node.id)),
            }
            reachable.insert(key);
            stack.extend(node.children().into_iter().map(|child| (child, Some(key))));
        }

        for (id, key) in self.registry.entries() {
            if !reachable.contains(key) {
                return Err(InvariantViolation::DanglingEntry(*id));
            }
        }
        if self.nodes.len() != reachable.len() {
            return Err(InvariantViolation::LeakedNodes(self.nodes.len() - reachable.len()));
        }
        Ok(())
    }
}
