//! Arena nodes of the configuration tree
//!
//! Records live in a [`slab::Slab`] and refer to their children by arena key, so
//! the tree has single ownership without reference cycles and identifier lookups
//! stay O(1). Field slots hold primitives inline; record-typed values are always a
//! separate node with its own [`RecordId`].

use epconf_core::{GenericValue, RecordId, RecordSchema};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Arena index of a node
pub type NodeKey = usize;

/// A record in the arena
#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub id: RecordId,
    pub schema: Arc<RecordSchema>,
    /// One slot per schema field, in declaration order
    pub fields: Vec<Slot>,
    /// Owning record; `None` only for the root
    pub parent: Option<NodeKey>,
}

/// Stored value of a field, array element or map entry
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Slot {
    Null,
    /// Non-record, non-collection value
    Value(GenericValue),
    Record(NodeKey),
    Array(Vec<Slot>),
    Map(BTreeMap<String, Slot>),
}

impl Slot {
    /// Arena keys of the records directly held by this slot
    pub fn child_records(&self, out: &mut Vec<NodeKey>) {
        match self {
            Slot::Null | Slot::Value(_) => {}
            Slot::Record(key) => out.push(*key),
            Slot::Array(items) => items.iter().for_each(|item| item.child_records(out)),
            Slot::Map(entries) => entries.values().for_each(|entry| entry.child_records(out)),
        }
    }
}

impl Node {
    /// Arena keys of every record owned directly by this node
    pub fn children(&self) -> Vec<NodeKey> {
        let mut out = Vec::new();
        for slot in &self.fields {
            slot.child_records(&mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_records_walks_collections() {
        let slot = Slot::Array(vec![
            Slot::Record(1),
            Slot::Map(BTreeMap::from([
                ("a".to_string(), Slot::Record(2)),
                ("b".to_string(), Slot::Value(GenericValue::Int(3))),
            ])),
            Slot::Null,
        ]);
        let mut out = Vec::new();
        slot.child_records(&mut out);
        assert_eq!(out, vec![1, 2]);
    }
}
