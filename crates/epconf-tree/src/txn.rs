//! Undo journal for a single delta application
//!
//! Merging is all-or-nothing per delta. Every registry change and arena allocation
//! made while applying a delta is journaled; detached subtrees are kept intact in
//! the arena until commit. Rollback replays the journal in reverse and restores the
//! target's original slots, leaving the tree exactly as it was before the delta.

use crate::record::{NodeKey, Slot};
use epconf_core::RecordId;

#[derive(Debug)]
pub(crate) enum Undo {
    Allocated(NodeKey),
    Registered(RecordId),
    Unregistered(RecordId, NodeKey),
}

#[derive(Debug, Default)]
pub(crate) struct Transaction {
    pub log: Vec<Undo>,
    /// Roots of subtrees cut out of the tree, freed on commit
    pub detached: Vec<NodeKey>,
    /// Slots of the delta target as they were before the first mutation
    pub saved_fields: Option<(NodeKey, Vec<Slot>)>,
    /// Previous root, when a full resync swapped it
    pub saved_root: Option<NodeKey>,
    pub installed: usize,
    pub decommissioned: usize,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the target's slots before they are touched
    pub fn save_fields(&mut self, key: NodeKey, fields: &[Slot]) {
        if self.saved_fields.is_none() {
            self.saved_fields = Some((key, fields.to_vec()));
        }
    }
}
