//! Configuration tree
//!
//! [`ConfigTree`] owns the arena of record nodes and the identifier registry and
//! keeps the two in lockstep: every structural mutation that installs or detaches
//! record-typed values updates the registry in the same call.

use crate::record::{Node, NodeKey, Slot};
use crate::registry::IdentifierRegistry;
use crate::txn::{Transaction, Undo};
use crate::view::{RecordView, ViewValue};
use epconf_core::{
    ArraySelector, ConfigError, ConfigResult, FieldType, GenericRecord, GenericValue, RecordId,
    RecordSchema,
};
use slab::Slab;
use std::sync::Arc;

/// Default nesting bound for decoded values
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Schema-typed configuration tree with its identifier registry
#[derive(Debug)]
pub struct ConfigTree {
    pub(crate) schema: Arc<RecordSchema>,
    pub(crate) nodes: Slab<Node>,
    pub(crate) registry: IdentifierRegistry,
    pub(crate) root: NodeKey,
    pub(crate) max_depth: usize,
}

impl ConfigTree {
    /// Build a tree holding the schema's default record
    ///
    /// Fails if an explicit field default in the schema does not match its
    /// declared type.
    pub fn new(schema: Arc<RecordSchema>) -> ConfigResult<Self> {
        Self::with_max_depth(schema, DEFAULT_MAX_DEPTH)
    }

    /// Build a tree with a custom nesting bound for decoded values
    pub fn with_max_depth(schema: Arc<RecordSchema>, max_depth: usize) -> ConfigResult<Self> {
        let default_root = schema.default_record();
        default_root.validate(&schema, "", max_depth)?;

        let mut tree = Self {
            schema: schema.clone(),
            nodes: Slab::new(),
            registry: IdentifierRegistry::new(),
            root: 0,
            max_depth,
        };
        let mut txn = Transaction::new();
        tree.root = tree.install_record(&default_root, &schema, None, &mut txn)?;
        Ok(tree)
    }

    /// Schema of the root record
    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    /// Identifier of the current root
    pub fn root_id(&self) -> RecordId {
        self.nodes[self.root].id
    }

    /// Read-only access to the identifier registry
    pub fn registry(&self) -> &IdentifierRegistry {
        &self.registry
    }

    /// Number of record nodes in the tree
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nesting bound applied to decoded values
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Snapshot of the whole tree
    pub fn root_view(&self) -> Arc<RecordView> {
        self.view(self.root)
    }

    /// Snapshot of the subtree rooted at the record holding `id`
    pub fn view_of(&self, id: &RecordId) -> ConfigResult<Arc<RecordView>> {
        let key = self.registry.resolve(id)?;
        Ok(self.view(key))
    }

    /// Current value of one field of the record holding `id`
    pub fn read_field(&self, id: &RecordId, field: &str) -> ConfigResult<ViewValue> {
        let key = self.registry.resolve(id)?;
        let node = &self.nodes[key];
        let index = node.schema.field_index(field).ok_or_else(|| {
            ConfigError::schema_mismatch(
                field,
                format!("field of record {}", node.schema.name),
                "unknown field",
            )
        })?;
        Ok(self.view_slot(&node.fields[index]))
    }

    pub(crate) fn view(&self, key: NodeKey) -> Arc<RecordView> {
        let node = &self.nodes[key];
        let fields = node
            .schema
            .fields
            .iter()
            .zip(&node.fields)
            .map(|(field, slot)| (field.name.clone(), self.view_slot(slot)))
            .collect();
        Arc::new(RecordView::new(node.id, node.schema.name.clone(), fields))
    }

    fn view_slot(&self, slot: &Slot) -> ViewValue {
        match slot {
            Slot::Null => ViewValue::Null,
            Slot::Value(value) => ViewValue::from_primitive(value),
            Slot::Record(key) => ViewValue::Record(self.view(*key)),
            Slot::Array(items) => {
                ViewValue::Array(items.iter().map(|item| self.view_slot(item)).collect())
            }
            Slot::Map(entries) => ViewValue::Map(
                entries
                    .iter()
                    .map(|(key, entry)| (key.clone(), self.view_slot(entry)))
                    .collect(),
            ),
        }
    }

    // ------------------------------------------------------------------------
    // Installing and decommissioning subtrees
    // ------------------------------------------------------------------------

    /// Allocate a node for `record` and everything below it
    ///
    /// Missing fields take the schema default. The record keeps its upstream
    /// identifier if it carries one, otherwise a fresh one is minted.
    pub(crate) fn install_record(
        &mut self,
        record: &GenericRecord,
        schema: &Arc<RecordSchema>,
        parent: Option<NodeKey>,
        txn: &mut Transaction,
    ) -> ConfigResult<NodeKey> {
        let id = record.id.unwrap_or_else(RecordId::new);
        let key = self.nodes.insert(Node {
            id,
            schema: schema.clone(),
            fields: vec![Slot::Null; schema.fields.len()],
            parent,
        });
        txn.log.push(Undo::Allocated(key));
        self.registry.register(id, key)?;
        txn.log.push(Undo::Registered(id));
        txn.installed += 1;

        for (index, field) in schema.fields.iter().enumerate() {
            let default;
            let value = match record.fields.get(&field.name) {
                Some(value) => value,
                None => {
                    default = field.default_value();
                    &default
                }
            };
            let slot = self.install_value(value, &field.ty, key, txn)?;
            self.nodes[key].fields[index] = slot;
        }
        Ok(key)
    }

    /// Convert a validated value to a slot, installing any records it contains
    pub(crate) fn install_value(
        &mut self,
        value: &GenericValue,
        ty: &FieldType,
        parent: NodeKey,
        txn: &mut Transaction,
    ) -> ConfigResult<Slot> {
        match (ty, value) {
            (_, GenericValue::Null) => Ok(Slot::Null),
            (FieldType::Optional(inner), value) => self.install_value(value, inner, parent, txn),
            (FieldType::Record(schema), GenericValue::Record(record)) => {
                let key = self.install_record(record, schema, Some(parent), txn)?;
                Ok(Slot::Record(key))
            }
            (FieldType::Array(element), GenericValue::Array(items)) => {
                let mut slots = Vec::with_capacity(items.len());
                for item in items {
                    slots.push(self.install_value(item, element, parent, txn)?);
                }
                Ok(Slot::Array(slots))
            }
            (FieldType::Map(value_ty), GenericValue::Map(entries)) => {
                let mut slots = std::collections::BTreeMap::new();
                for (key, entry) in entries {
                    slots.insert(key.clone(), self.install_value(entry, value_ty, parent, txn)?);
                }
                Ok(Slot::Map(slots))
            }
            (FieldType::Record(_) | FieldType::Array(_) | FieldType::Map(_), other) => {
                Err(ConfigError::schema_mismatch("", ty.to_string(), other.kind_name()))
            }
            (_, primitive) => Ok(Slot::Value(primitive.clone())),
        }
    }

    /// Cut every record held by `slot` out of the registry
    ///
    /// Nodes stay in the arena until the transaction commits so a rollback can
    /// reattach them untouched.
    pub(crate) fn decommission(&mut self, slot: Slot, txn: &mut Transaction) {
        let mut roots = Vec::new();
        slot.child_records(&mut roots);
        for root in roots {
            let mut stack = vec![root];
            while let Some(key) = stack.pop() {
                let node = &self.nodes[key];
                let id = node.id;
                stack.extend(node.children());
                if self.registry.unregister(&id).is_some() {
                    txn.log.push(Undo::Unregistered(id, key));
                }
                txn.decommissioned += 1;
            }
            txn.detached.push(root);
        }
    }

    /// Restore the tree to its state before the transaction began
    pub(crate) fn rollback(&mut self, txn: Transaction) {
        if let Some((key, fields)) = txn.saved_fields {
            self.nodes[key].fields = fields;
        }
        if let Some(root) = txn.saved_root {
            self.root = root;
        }
        for undo in txn.log.into_iter().rev() {
            match undo {
                Undo::Allocated(key) => {
                    if self.nodes.contains(key) {
                        self.nodes.remove(key);
                    }
                }
                Undo::Registered(id) => {
                    self.registry.unregister(&id);
                }
                Undo::Unregistered(id, key) => {
                    // Reverse order guarantees the id is free again here.
                    let _ = self.registry.register(id, key);
                }
            }
        }
    }

    /// Free detached subtrees; the tree is consistent afterwards
    pub(crate) fn commit(&mut self, txn: Transaction) -> (usize, usize) {
        for root in &txn.detached {
            let mut stack = vec![*root];
            while let Some(key) = stack.pop() {
                if !self.nodes.contains(key) {
                    continue;
                }
                let node = self.nodes.remove(key);
                stack.extend(node.children());
            }
        }
        (txn.installed, txn.decommissioned)
    }

    // ------------------------------------------------------------------------
    // Field accessors (record model contract)
    // ------------------------------------------------------------------------

    /// Replace one field, decommissioning whatever it held
    pub(crate) fn replace_field(
        &mut self,
        key: NodeKey,
        index: usize,
        value: &GenericValue,
        ty: &FieldType,
        txn: &mut Transaction,
    ) -> ConfigResult<()> {
        let old = std::mem::replace(&mut self.nodes[key].fields[index], Slot::Null);
        self.decommission(old, txn);
        let slot = self.install_value(value, ty, key, txn)?;
        self.nodes[key].fields[index] = slot;
        Ok(())
    }

    pub(crate) fn array_insert(
        &mut self,
        key: NodeKey,
        index: usize,
        position: Option<usize>,
        value: &GenericValue,
        element: &FieldType,
        txn: &mut Transaction,
    ) -> ConfigResult<()> {
        let len = self.array_mut(key, index)?.len();
        let at = position.unwrap_or(len);
        if at > len {
            return Err(ConfigError::invalid_operation(format!(
                "array insert at {at} beyond length {len} of field {}",
                self.field_name(key, index)
            )));
        }
        let slot = self.install_value(value, element, key, txn)?;
        self.array_mut(key, index)?.insert(at, slot);
        Ok(())
    }

    pub(crate) fn array_remove(
        &mut self,
        key: NodeKey,
        index: usize,
        selector: ArraySelector,
        txn: &mut Transaction,
    ) -> ConfigResult<()> {
        let position = match selector {
            ArraySelector::Index(position) => {
                let len = self.array_mut(key, index)?.len();
                if position >= len {
                    return Err(ConfigError::invalid_operation(format!(
                        "array remove at {position} beyond length {len} of field {}",
                        self.field_name(key, index)
                    )));
                }
                position
            }
            ArraySelector::Record(id) => {
                let child = self.registry.resolve(&id)?;
                let found = self
                    .array_mut(key, index)?
                    .iter()
                    .position(|slot| *slot == Slot::Record(child));
                found.ok_or_else(|| {
                    ConfigError::invalid_operation(format!(
                        "field {} holds no element {id}",
                        self.field_name(key, index)
                    ))
                })?
            }
        };
        let removed = self.array_mut(key, index)?.remove(position);
        self.decommission(removed, txn);
        Ok(())
    }

    pub(crate) fn array_clear(
        &mut self,
        key: NodeKey,
        index: usize,
        txn: &mut Transaction,
    ) -> ConfigResult<()> {
        let items = std::mem::take(self.array_mut(key, index)?);
        self.decommission(Slot::Array(items), txn);
        Ok(())
    }

    pub(crate) fn map_insert(
        &mut self,
        key: NodeKey,
        index: usize,
        entry: &str,
        value: &GenericValue,
        value_ty: &FieldType,
        txn: &mut Transaction,
    ) -> ConfigResult<()> {
        if let Some(old) = self.map_mut(key, index)?.remove(entry) {
            self.decommission(old, txn);
        }
        let slot = self.install_value(value, value_ty, key, txn)?;
        self.map_mut(key, index)?.insert(entry.to_string(), slot);
        Ok(())
    }

    pub(crate) fn map_remove(
        &mut self,
        key: NodeKey,
        index: usize,
        entry: &str,
        txn: &mut Transaction,
    ) -> ConfigResult<()> {
        let removed = self.map_mut(key, index)?.remove(entry);
        match removed {
            Some(old) => {
                self.decommission(old, txn);
                Ok(())
            }
            None => Err(ConfigError::invalid_operation(format!(
                "map field {} has no key {entry:?}",
                self.field_name(key, index)
            ))),
        }
    }

    fn array_mut(&mut self, key: NodeKey, index: usize) -> ConfigResult<&mut Vec<Slot>> {
        let name = self.field_name(key, index);
        match &mut self.nodes[key].fields[index] {
            Slot::Array(items) => Ok(items),
            _ => Err(ConfigError::invalid_operation(format!(
                "field {name} does not hold an array"
            ))),
        }
    }

    fn map_mut(
        &mut self,
        key: NodeKey,
        index: usize,
    ) -> ConfigResult<&mut std::collections::BTreeMap<String, Slot>> {
        let name = self.field_name(key, index);
        match &mut self.nodes[key].fields[index] {
            Slot::Map(entries) => Ok(entries),
            _ => Err(ConfigError::invalid_operation(format!(
                "field {name} does not hold a map"
            ))),
        }
    }

    fn field_name(&self, key: NodeKey, index: usize) -> String {
        self.nodes[key].schema.fields[index].name.clone()
    }
}
