//! Identifier registry
//!
//! Maps every [`RecordId`] present in the tree to the arena slot of the node that
//! currently holds it. Arena keys act as weak references: the registry never keeps
//! a node alive, and the tree guarantees no entry outlives its node across a merge
//! step boundary.

use crate::record::NodeKey;
use epconf_core::{ConfigError, ConfigResult, RecordId};
use std::collections::HashMap;

/// Identifier to node binding
#[derive(Debug, Default, Clone)]
pub struct IdentifierRegistry {
    entries: HashMap<RecordId, NodeKey>,
}

impl IdentifierRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Bind `id` to `key`
    ///
    /// Re-binding an identifier to the node it already denotes is a no-op.
    pub(crate) fn register(&mut self, id: RecordId, key: NodeKey) -> ConfigResult<()> {
        match self.entries.get(&id) {
            Some(existing) if *existing != key => Err(ConfigError::DuplicateIdentifier(id)),
            Some(_) => Ok(()),
            None => {
                tracing::trace!(%id, key, "registered record identifier");
                self.entries.insert(id, key);
                Ok(())
            }
        }
    }

    /// Drop the binding for `id`, returning the node it denoted
    pub(crate) fn unregister(&mut self, id: &RecordId) -> Option<NodeKey> {
        let removed = self.entries.remove(id);
        if let Some(key) = removed {
            tracing::trace!(%id, key, "unregistered record identifier");
        }
        removed
    }

    /// Node currently holding `id`
    pub fn resolve(&self, id: &RecordId) -> ConfigResult<NodeKey> {
        self.entries
            .get(id)
            .copied()
            .ok_or(ConfigError::UnknownIdentifier(*id))
    }

    /// Whether `id` is bound
    pub fn contains(&self, id: &RecordId) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of bound identifiers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is bound
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All bound identifiers, in no particular order
    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.entries.keys()
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&RecordId, &NodeKey)> {
        self.entries.iter()
    }
}
