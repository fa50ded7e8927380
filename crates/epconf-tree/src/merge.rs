//! Delta merge engine
//!
//! Applies one decoded [`Delta`] to the tree:
//!
//! 1. Resolve the target (root sentinel or registered identifier)
//! 2. Validate the whole payload against the target's schema, without mutating
//! 3. Apply inside a [`Transaction`]; any failure rolls back to the exact prior state
//! 4. Commit, freeing detached subtrees
//!
//! Deltas are never reordered or coalesced; the caller applies them in arrival order.

use crate::record::{NodeKey, Slot};
use crate::tree::ConfigTree;
use crate::txn::Transaction;
use epconf_core::value::{join_field, join_key};
use epconf_core::{
    ConfigError, ConfigResult, Delta, DeltaPayload, FieldOp, FieldOpKind, GenericRecord,
    RecordId, RecordSchema, TargetIndex,
};
use std::sync::Arc;

/// Summary of a successfully applied delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Record the delta was applied to (the new root on full resync)
    pub target: RecordId,
    /// Whether the whole tree was replaced
    pub full_resync: bool,
    /// Record nodes created
    pub installed: usize,
    /// Record nodes removed along with their identifiers
    pub decommissioned: usize,
}

impl ConfigTree {
    /// Apply one delta, all-or-nothing
    ///
    /// # Errors
    ///
    /// - `UnresolvedTarget` if a partial delta addresses an unregistered record
    /// - `SchemaMismatch` if the payload shape disagrees with the schema
    /// - `DuplicateIdentifier` if an upstream identifier is already in use
    /// - `UnknownIdentifier` if an array removal names an unregistered record
    /// - `InvalidOperation` for out-of-range positions, missing keys or a
    ///   payload that does not fit the delta mode
    ///
    /// On error the tree and registry are unchanged.
    pub fn apply_delta(&mut self, delta: &Delta) -> ConfigResult<MergeOutcome> {
        if delta.full_resync {
            delta.check_mode()?;
            let DeltaPayload::Replace(record) = &delta.payload else {
                return Err(ConfigError::invalid_operation(
                    "full resync requires a replacement record",
                ));
            };
            return self.apply_full_resync(record);
        }

        let key = match delta.target {
            TargetIndex::Root => self.root,
            TargetIndex::Record(id) => self
                .registry
                .resolve(&id)
                .map_err(|_| ConfigError::UnresolvedTarget(delta.target))?,
        };
        // An unregistered target wins over a malformed payload.
        delta.check_mode()?;
        let schema = self.nodes[key].schema.clone();
        let target_id = self.nodes[key].id;

        match &delta.payload {
            DeltaPayload::Replace(record) => {
                if record.id.is_some_and(|id| id != target_id) {
                    return Err(ConfigError::invalid_operation(format!(
                        "replacement record for {target_id} carries a different identifier"
                    )));
                }
                self.validate_record(record, &schema)?;
            }
            DeltaPayload::Patch(ops) => {
                for op in ops {
                    self.validate_op(op, &schema)?;
                }
            }
        }

        let mut txn = Transaction::new();
        txn.save_fields(key, &self.nodes[key].fields);
        let applied = match &delta.payload {
            DeltaPayload::Replace(record) => self.replace_record(key, record, &schema, &mut txn),
            DeltaPayload::Patch(ops) => ops
                .iter()
                .try_for_each(|op| self.apply_op(key, op, &schema, &mut txn)),
        };

        match applied {
            Ok(()) => {
                let (installed, decommissioned) = self.commit(txn);
                Ok(MergeOutcome {
                    target: target_id,
                    full_resync: false,
                    installed,
                    decommissioned,
                })
            }
            Err(err) => {
                self.rollback(txn);
                Err(err)
            }
        }
    }

    fn apply_full_resync(&mut self, record: &GenericRecord) -> ConfigResult<MergeOutcome> {
        let schema = self.schema.clone();
        self.validate_record(record, &schema)?;

        let mut txn = Transaction::new();
        let old_root = self.root;
        txn.saved_root = Some(old_root);
        // Old identifiers go first so a resync may legitimately reuse them.
        self.decommission(Slot::Record(old_root), &mut txn);

        match self.install_record(record, &schema, None, &mut txn) {
            Ok(new_root) => {
                self.root = new_root;
                let target = self.nodes[new_root].id;
                let (installed, decommissioned) = self.commit(txn);
                Ok(MergeOutcome {
                    target,
                    full_resync: true,
                    installed,
                    decommissioned,
                })
            }
            Err(err) => {
                self.rollback(txn);
                Err(err)
            }
        }
    }

    fn validate_record(&self, record: &GenericRecord, schema: &RecordSchema) -> ConfigResult<()> {
        record.validate(schema, "", self.max_depth)
    }

    fn validate_op(&self, op: &FieldOp, schema: &RecordSchema) -> ConfigResult<()> {
        let field = schema.field(&op.field).ok_or_else(|| {
            ConfigError::schema_mismatch(
                op.field.as_str(),
                format!("field of record {}", schema.name),
                "unknown field",
            )
        })?;
        let path = join_field("", &op.field);
        let expect = |what: &str| {
            ConfigError::schema_mismatch(path.as_str(), field.ty.to_string(), what.to_string())
        };

        match &op.kind {
            FieldOpKind::Set(value) => value.validate(&field.ty, &path, self.max_depth),
            FieldOpKind::ArrayInsert { value, .. } => {
                let element = field.ty.array_element().ok_or_else(|| expect("array insert"))?;
                value.validate(element, &format!("{path}[+]"), self.max_depth)
            }
            FieldOpKind::ArrayRemove(_) => {
                field.ty.array_element().ok_or_else(|| expect("array remove"))?;
                Ok(())
            }
            FieldOpKind::ArrayReset => {
                field.ty.array_element().ok_or_else(|| expect("array reset"))?;
                Ok(())
            }
            FieldOpKind::MapInsert { key, value } => {
                let value_ty = field.ty.map_value().ok_or_else(|| expect("map insert"))?;
                value.validate(value_ty, &join_key(&path, key), self.max_depth)
            }
            FieldOpKind::MapRemove { .. } => {
                field.ty.map_value().ok_or_else(|| expect("map remove"))?;
                Ok(())
            }
        }
    }

    fn replace_record(
        &mut self,
        key: NodeKey,
        record: &GenericRecord,
        schema: &Arc<RecordSchema>,
        txn: &mut Transaction,
    ) -> ConfigResult<()> {
        // Detach everything first so nested identifiers can be carried over.
        for index in 0..schema.fields.len() {
            let old = std::mem::replace(&mut self.nodes[key].fields[index], Slot::Null);
            self.decommission(old, txn);
        }
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
        Ok(())
    }

    fn apply_op(
        &mut self,
        key: NodeKey,
        op: &FieldOp,
        schema: &RecordSchema,
        txn: &mut Transaction,
    ) -> ConfigResult<()> {
        let index = schema.field_index(&op.field).ok_or_else(|| {
            ConfigError::schema_mismatch(op.field.as_str(), "known field", "unknown field")
        })?;
        let ty = &schema.fields[index].ty;

        match &op.kind {
            FieldOpKind::Set(value) => self.replace_field(key, index, value, ty, txn),
            FieldOpKind::ArrayInsert { index: at, value } => {
                let element = ty
                    .array_element()
                    .ok_or_else(|| ConfigError::invalid_operation("not an array field"))?;
                self.array_insert(key, index, *at, value, element, txn)
            }
            FieldOpKind::ArrayRemove(selector) => self.array_remove(key, index, *selector, txn),
            FieldOpKind::ArrayReset => self.array_clear(key, index, txn),
            FieldOpKind::MapInsert { key: entry, value } => {
                let value_ty = ty
                    .map_value()
                    .ok_or_else(|| ConfigError::invalid_operation("not a map field"))?;
                self.map_insert(key, index, entry, value, value_ty, txn)
            }
            FieldOpKind::MapRemove { key: entry } => self.map_remove(key, index, entry, txn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use epconf_core::{ArraySelector, FieldType};

    fn tag_schema() -> Arc<RecordSchema> {
        RecordSchema::builder("Tag")
            .field("name", FieldType::String)
            .build()
    }

    fn schema() -> Arc<RecordSchema> {
        RecordSchema::builder("Config")
            .field("count", FieldType::Int)
            .field("tags", FieldType::array(FieldType::record(tag_schema())))
            .field("labels", FieldType::map(FieldType::record(tag_schema())))
            .build()
    }

    fn tag(name: &str) -> GenericRecord {
        GenericRecord::new().with("name", name)
    }

    fn seeded() -> ConfigTree {
        let mut tree = ConfigTree::new(schema()).unwrap();
        tree.apply_delta(&Delta::full_resync(
            GenericRecord::new()
                .with("count", 1)
                .with("tags", vec![tag("a").into(), tag("b").into()]),
        ))
        .unwrap();
        tree
    }

    fn tag_ids(tree: &ConfigTree) -> Vec<RecordId> {
        tree.root_view()
            .get_array("tags")
            .unwrap()
            .iter()
            .map(|v| v.as_record().unwrap().id())
            .collect()
    }

    #[test]
    fn full_resync_replaces_tree_and_registry() {
        let mut tree = seeded();
        let old_root = tree.root_id();
        let old_tags = tag_ids(&tree);

        let outcome = tree
            .apply_delta(&Delta::full_resync(GenericRecord::new().with("count", 2)))
            .unwrap();

        assert!(outcome.full_resync);
        assert_eq!(outcome.installed, 1);
        assert_eq!(outcome.decommissioned, 3);
        assert_eq!(tree.root_view().get_int("count"), Some(2));
        assert!(!tree.registry().contains(&old_root));
        assert!(old_tags.iter().all(|id| !tree.registry().contains(id)));
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn full_resync_may_reuse_identifiers() {
        let mut tree = seeded();
        let snapshot = tree.root_view().to_generic();
        tree.apply_delta(&Delta::full_resync(snapshot.clone())).unwrap();
        assert_eq!(tree.root_view().to_generic(), snapshot);
    }

    #[test]
    fn patch_root_inserts_and_registers() {
        let mut tree = seeded();
        tree.apply_delta(&Delta::patch(
            TargetIndex::Root,
            vec![FieldOp::array_insert("tags", 0, tag("z"))],
        ))
        .unwrap();
        let ids = tag_ids(&tree);
        assert_eq!(ids.len(), 3);
        assert!(tree.registry().contains(&ids[0]));
        assert_eq!(
            tree.root_view().get_array("tags").unwrap()[0]
                .as_record()
                .unwrap()
                .get_str("name"),
            Some("z")
        );
    }

    #[test]
    fn patch_nested_target_by_identifier() {
        let mut tree = seeded();
        let second = tag_ids(&tree)[1];
        tree.apply_delta(&Delta::patch(second, vec![FieldOp::set("name", "y")]))
            .unwrap();
        assert_eq!(tree.view_of(&second).unwrap().get_str("name"), Some("y"));
    }

    #[test]
    fn remove_by_identifier_decommissions() {
        let mut tree = seeded();
        let first = tag_ids(&tree)[0];
        tree.apply_delta(&Delta::patch(
            TargetIndex::Root,
            vec![FieldOp::array_remove("tags", ArraySelector::Record(first))],
        ))
        .unwrap();
        assert!(!tree.registry().contains(&first));
        assert_matches!(
            tree.apply_delta(&Delta::patch(first, vec![FieldOp::set("name", "q")])),
            Err(ConfigError::UnresolvedTarget(TargetIndex::Record(id))) if id == first
        );
    }

    #[test]
    fn failed_patch_leaves_tree_untouched() {
        let mut tree = seeded();
        let before = tree.root_view();
        let registered = tree.registry().len();

        // Second op is out of range; the first must not survive.
        let err = tree
            .apply_delta(&Delta::patch(
                TargetIndex::Root,
                vec![
                    FieldOp::array_push("tags", tag("c")),
                    FieldOp::array_remove("tags", ArraySelector::Index(9)),
                ],
            ))
            .unwrap_err();
        assert_matches!(err, ConfigError::InvalidOperation { .. });
        assert_eq!(tree.root_view(), before);
        assert_eq!(tree.registry().len(), registered);
        assert_eq!(tree.node_count(), registered);
    }

    #[test]
    fn schema_mismatch_is_rejected_before_mutation() {
        let mut tree = seeded();
        let before = tree.root_view();
        assert_matches!(
            tree.apply_delta(&Delta::patch(
                TargetIndex::Root,
                vec![FieldOp::set("count", 5), FieldOp::set("count", "five")],
            )),
            Err(ConfigError::SchemaMismatch { path, .. }) if path == "count"
        );
        assert_eq!(tree.root_view(), before);
    }

    #[test]
    fn duplicate_upstream_identifier_rolls_back() {
        let mut tree = seeded();
        let before = tree.root_view();
        let taken = tag_ids(&tree)[0];
        assert_matches!(
            tree.apply_delta(&Delta::patch(
                TargetIndex::Root,
                vec![
                    FieldOp::set("count", 9),
                    FieldOp::map_insert("labels", "k", GenericRecord::with_id(taken)),
                ],
            )),
            Err(ConfigError::DuplicateIdentifier(id)) if id == taken
        );
        assert_eq!(tree.root_view(), before);
    }

    #[test]
    fn map_insert_replaces_and_remove_requires_key() {
        let mut tree = seeded();
        tree.apply_delta(&Delta::patch(
            TargetIndex::Root,
            vec![FieldOp::map_insert("labels", "k", tag("one"))],
        ))
        .unwrap();
        let first = tree.root_view().get_map("labels").unwrap()["k"]
            .as_record()
            .unwrap()
            .id();

        tree.apply_delta(&Delta::patch(
            TargetIndex::Root,
            vec![FieldOp::map_insert("labels", "k", tag("two"))],
        ))
        .unwrap();
        assert!(!tree.registry().contains(&first));

        tree.apply_delta(&Delta::patch(
            TargetIndex::Root,
            vec![FieldOp::map_remove("labels", "k")],
        ))
        .unwrap();
        assert!(tree.root_view().get_map("labels").unwrap().is_empty());
        assert_matches!(
            tree.apply_delta(&Delta::patch(
                TargetIndex::Root,
                vec![FieldOp::map_remove("labels", "k")],
            )),
            Err(ConfigError::InvalidOperation { .. })
        );
    }

    #[test]
    fn array_reset_clears_and_unregisters() {
        let mut tree = seeded();
        let ids = tag_ids(&tree);
        tree.apply_delta(&Delta::patch(
            TargetIndex::Root,
            vec![FieldOp::array_reset("tags")],
        ))
        .unwrap();
        assert!(tag_ids(&tree).is_empty());
        assert!(ids.iter().all(|id| !tree.registry().contains(id)));
    }

    #[test]
    fn replace_keeps_target_identifier() {
        let mut tree = seeded();
        let target = tag_ids(&tree)[0];
        tree.apply_delta(&Delta::replace(target, tag("fresh"))).unwrap();
        assert_eq!(tree.view_of(&target).unwrap().get_str("name"), Some("fresh"));

        assert_matches!(
            tree.apply_delta(&Delta::replace(target, GenericRecord::with_id(RecordId::new()))),
            Err(ConfigError::InvalidOperation { .. })
        );
    }

    #[test]
    fn unknown_field_op_is_schema_mismatch() {
        let mut tree = seeded();
        assert_matches!(
            tree.apply_delta(&Delta::patch(
                TargetIndex::Root,
                vec![FieldOp::array_push("count", 1)],
            )),
            Err(ConfigError::SchemaMismatch { .. })
        );
        assert_matches!(
            tree.apply_delta(&Delta::patch(
                TargetIndex::Root,
                vec![FieldOp::set("nope", 1)],
            )),
            Err(ConfigError::SchemaMismatch { .. })
        );
    }

    #[test]
    fn empty_patch_on_unknown_target_is_unresolved() {
        let mut tree = seeded();
        let ghost = RecordId::new();
        assert_eq!(
            tree.apply_delta(&Delta::patch(ghost, Vec::new())),
            Err(ConfigError::UnresolvedTarget(TargetIndex::Record(ghost)))
        );
        assert_matches!(
            tree.apply_delta(&Delta::patch(TargetIndex::Root, Vec::new())),
            Err(ConfigError::InvalidOperation { .. })
        );
    }
}
